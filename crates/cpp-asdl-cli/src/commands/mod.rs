use cpp_asdl::frontend::ClangFrontEnd;

use crate::{
    args::{CppAsdlCliArgs, CppAsdlCliCommand, FrontEndArgs},
    Context,
};

mod actions;
mod grammar;
mod verify;

impl Context {
    pub fn execute(&mut self, args: CppAsdlCliArgs) -> Result<(), anyhow::Error> {
        match args.cmd {
            CppAsdlCliCommand::Verify(cmd) => self.execute_verify(cmd),
            CppAsdlCliCommand::Actions(cmd) => self.execute_actions(cmd),
            CppAsdlCliCommand::Grammar => self.execute_grammar(),
        }
    }
}

impl FrontEndArgs {
    pub fn front_end(&self) -> ClangFrontEnd {
        ClangFrontEnd::new().clang(&self.clang).plugin(&self.plugin)
    }
}
