use cpp_asdl::{convert, grammar::Grammar};

use crate::Context;

impl Context {
    pub fn execute_grammar(&mut self) -> Result<(), anyhow::Error> {
        let grammar = Grammar::cpp()?;
        let drift = convert::schema_drift(&grammar);
        for line in &drift {
            eprintln!("{line}");
        }
        if !drift.is_empty() {
            anyhow::bail!(
                "grammar `{}` drifted from the native kinds",
                grammar.module_name()
            );
        }
        println!(
            "grammar `{}`: {} types, {} productions",
            grammar.module_name(),
            grammar.types().count(),
            grammar.productions().count()
        );
        Ok(())
    }
}
