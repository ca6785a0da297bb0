use anyhow::Context as _;
use cpp_asdl::{
    frontend::CompileCommand,
    grammar::Grammar,
    verify::{collect_files, Batch, Exclusions, Verifier, VerifyOptions},
};

use crate::{args::VerifyCommand, Context};

impl Context {
    pub fn execute_verify(&mut self, cmd: VerifyCommand) -> Result<(), anyhow::Error> {
        let grammar = Grammar::cpp()?;
        let options = VerifyOptions {
            check_actions: cmd.check_actions,
            renderer: None,
        };
        let verifier = Verifier::new(&grammar, options)?;
        let front_end = cmd.front_end.front_end();

        let mut exclusions = match &cmd.exclusions {
            Some(path) => Exclusions::load(path)
                .with_context(|| format!("cannot read {}", path.display()))?,
            None => Exclusions::default(),
        };
        exclusions.extend(cmd.exclude);
        let batch = Batch::new(&verifier, &front_end)
            .exclusions(exclusions)
            .fail_fast(cmd.fail_fast);

        let report = if let Some(db) = &cmd.input.db {
            let commands = CompileCommand::load_database(db)?;
            batch.run_database(&commands)
        } else if let Some(dir) = &cmd.input.dir {
            let files = collect_files(dir)
                .with_context(|| format!("cannot list {}", dir.display()))?;
            batch.run_files(files)
        } else {
            batch.run_files(cmd.input.file)
        };

        for (file, failure) in &report.failed {
            eprintln!("{file}: {failure}");
        }
        println!("{report}");
        if !report.is_success() {
            anyhow::bail!("{} of {} files failed", report.failed.len(), report.total());
        }
        Ok(())
    }
}
