use std::fs;

use anyhow::Context as _;
use cpp_asdl::{convert, frontend::FrontEnd, grammar::Grammar, transition};

use crate::{args::ActionsCommand, Context};

impl Context {
    pub fn execute_actions(&mut self, cmd: ActionsCommand) -> Result<(), anyhow::Error> {
        let code = fs::read_to_string(&cmd.path)
            .with_context(|| format!("cannot read {}", cmd.path.display()))?;
        let grammar = Grammar::cpp()?;
        let native = cmd.front_end.front_end().parse_source(&code)?.build()?;
        let asdl = convert::to_asdl(&native, &grammar)?;
        for action in transition::encode(&asdl) {
            println!("{action}");
        }
        Ok(())
    }
}
