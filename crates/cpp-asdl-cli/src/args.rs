use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "cpp-asdl")]
#[command(bin_name = "cpp-asdl")]
#[command(version, about, long_about = None)]
pub struct CppAsdlCliArgs {
    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(long, global = true)]
    pub debug: bool,
    #[command(subcommand)]
    pub cmd: CppAsdlCliCommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CppAsdlCliCommand {
    /// Check that C++ sources survive the round trip through the ASDL tree.
    Verify(VerifyCommand),
    /// Print the construction actions of a C++ source.
    Actions(ActionsCommand),
    /// Check the bundled grammar against the native node kinds.
    Grammar,
}

#[derive(Debug, Clone, Args)]
pub struct FrontEndArgs {
    /// The clang binary.
    #[arg(long, default_value = "clang")]
    pub clang: PathBuf,
    /// The JSON dump plugin.
    #[arg(long, default_value = "libJSONDumpTypes.so")]
    pub plugin: PathBuf,
}

#[derive(Debug, Clone, Args)]
#[group(required = true, multiple = false)]
pub struct VerifyInput {
    /// Verify every source file under a directory.
    #[arg(long)]
    pub dir: Option<PathBuf>,
    /// Verify one source file.
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// Verify the files of a compilation database.
    #[arg(long)]
    pub db: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct VerifyCommand {
    #[command(flatten)]
    pub input: VerifyInput,
    /// Also replay the action encoding of every tree.
    #[arg(long)]
    pub check_actions: bool,
    /// Stop at the first failing file.
    #[arg(long)]
    pub fail_fast: bool,
    /// Skip a file, may be repeated.
    #[arg(long)]
    pub exclude: Vec<PathBuf>,
    /// A file listing the files to skip, one per line.
    #[arg(long)]
    pub exclusions: Option<PathBuf>,
    #[command(flatten)]
    pub front_end: FrontEndArgs,
}

#[derive(Debug, Clone, Args)]
pub struct ActionsCommand {
    /// The path of the C++ source.
    pub path: PathBuf,
    #[command(flatten)]
    pub front_end: FrontEndArgs,
}
