//! The parse front-end: clang, run with a plugin that dumps the AST and a
//! type summary as JSON.
//!
//! A source is first preprocessed, then the preprocessed text is fed to the
//! plugin on stdin, so the main file of every dump is `<stdin>`.

use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    process::{Command, Stdio},
    thread,
};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::{
    builder::{self, BuildError},
    tree::CppAst,
};

/// The front-end error type.
#[derive(Debug, Error)]
pub enum FrontEndError {
    #[error("front-end exited with code {}: {stderr}", exit_code_text(.exit_code))]
    FrontEndFailure {
        exit_code: Option<i32>,
        stderr: String,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("invalid json dump: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("json dump has no `{0}` section")]
    MissingSection(&'static str),
    #[error("invalid compile command: {0}")]
    InvalidCompileCommand(String),
}

fn exit_code_text(code: &Option<i32>) -> String {
    code.map_or_else(|| "none".to_owned(), |code| code.to_string())
}

/// A parsed translation unit: the preprocessed text and its JSON dump.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSource {
    pub source: String,
    pub document: Value,
}

impl ParsedSource {
    /// Checks that the dump has both sections read by the builder.
    pub fn new(source: String, document: Value) -> Result<Self, FrontEndError> {
        for section in ["Content", "TypeSummary"] {
            if document.get(section).is_none() {
                return Err(FrontEndError::MissingSection(section));
            }
        }
        Ok(ParsedSource { source, document })
    }

    /// Builds the native AST of this translation unit.
    pub fn build(&self) -> Result<CppAst, BuildError> {
        builder::build(&self.document, &self.source)
    }
}

/// Something that turns C++ into a [`ParsedSource`].
pub trait FrontEnd {
    /// Parses source text.
    fn parse_source(&self, code: &str) -> Result<ParsedSource, FrontEndError>;

    /// Parses the file of a compilation database entry.
    fn parse_command(&self, command: &CompileCommand) -> Result<ParsedSource, FrontEndError>;
}

/// An entry of `compile_commands.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompileCommand {
    pub directory: PathBuf,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub arguments: Option<Vec<String>>,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// The clang invocations derived from a compile command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Compiler arguments without the input file.
    pub arguments: Vec<String>,
    pub file: String,
}

impl Invocation {
    /// The preprocessing command line.
    pub fn preprocess(&self) -> Vec<String> {
        let mut arguments = self.arguments.clone();
        arguments.push("-E".to_owned());
        arguments.push(self.file.clone());
        arguments
    }

    /// The dump command line, reading the preprocessed text from stdin.
    pub fn dump(&self, plugin: &Path) -> Vec<String> {
        let mut arguments = self.arguments.clone();
        arguments.push(format!("-fplugin={}", plugin.display()));
        arguments.push("-fsyntax-only".to_owned());
        arguments.push("-".to_owned());
        arguments
    }
}

impl CompileCommand {
    /// Reads a compilation database.
    pub fn load_database(path: &Path) -> Result<Vec<CompileCommand>, FrontEndError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// The compiler arguments, splitting `command` when no `arguments` are given.
    pub fn argv(&self) -> Vec<String> {
        match (&self.arguments, &self.command) {
            (Some(arguments), _) => arguments.clone(),
            (None, Some(command)) => command.split_whitespace().map(str::to_owned).collect(),
            (None, None) => Vec::new(),
        }
    }

    /// The file compiled by this entry.
    pub fn source_file(&self) -> Option<PathBuf> {
        self.file
            .clone()
            .or_else(|| self.argv().last().map(PathBuf::from))
            .map(|file| if file.is_relative() { self.directory.join(file) } else { file })
    }

    /// Rewrites the compiler invocation for clang.
    ///
    /// The driver is replaced by `clang` with the language made explicit,
    /// `-o <output>` and `-c` are removed, and the last argument is taken as
    /// the input file.
    pub fn invocation(&self, clang: &Path) -> Result<Invocation, FrontEndError> {
        let mut argv = self.argv();
        let Some(driver) = argv.first().cloned() else {
            return Err(FrontEndError::InvalidCompileCommand("empty command".to_owned()));
        };
        let mut arguments = vec![clang.display().to_string()];
        if driver.ends_with("cc") {
            arguments.extend(["-x".to_owned(), "c".to_owned()]);
        } else if driver.ends_with("c++") {
            arguments.extend(["-x".to_owned(), "c++".to_owned()]);
        }

        let file = argv
            .pop()
            .filter(|_| !argv.is_empty())
            .ok_or_else(|| {
                FrontEndError::InvalidCompileCommand(format!("no input file in `{driver}`"))
            })?;
        let mut rest = argv.into_iter().skip(1);
        while let Some(argument) = rest.next() {
            match argument.as_str() {
                "-o" => {
                    rest.next();
                }
                "-c" => {}
                _ => arguments.push(argument),
            }
        }
        Ok(Invocation { arguments, file })
    }
}

/// The clang front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClangFrontEnd {
    clang: PathBuf,
    plugin: PathBuf,
    std: String,
    language: String,
}

impl Default for ClangFrontEnd {
    fn default() -> Self {
        ClangFrontEnd {
            clang: PathBuf::from("clang"),
            plugin: PathBuf::from("libJSONDumpTypes.so"),
            std: "c++14".to_owned(),
            language: "c++".to_owned(),
        }
    }
}

impl ClangFrontEnd {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clang(mut self, clang: impl Into<PathBuf>) -> Self {
        self.clang = clang.into();
        self
    }

    /// The path of the JSON dump plugin.
    pub fn plugin(mut self, plugin: impl Into<PathBuf>) -> Self {
        self.plugin = plugin.into();
        self
    }

    pub fn std(mut self, std: impl Into<String>) -> Self {
        self.std = std.into();
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    fn direct_arguments(&self) -> Vec<String> {
        vec![
            self.clang.display().to_string(),
            "-x".to_owned(),
            self.language.clone(),
            format!("-std={}", self.std),
        ]
    }

    fn dump(
        &self,
        arguments: &[String],
        preprocessed: Vec<u8>,
        cwd: Option<&Path>,
    ) -> Result<ParsedSource, FrontEndError> {
        let output = run(arguments, &preprocessed, cwd)?;
        let document = serde_json::from_slice(&output)?;
        let source = String::from_utf8_lossy(&preprocessed).into_owned();
        ParsedSource::new(source, document)
    }
}

impl FrontEnd for ClangFrontEnd {
    fn parse_source(&self, code: &str) -> Result<ParsedSource, FrontEndError> {
        let mut preprocess = self.direct_arguments();
        preprocess.extend(["-E".to_owned(), "-".to_owned()]);
        let preprocessed = run(&preprocess, code.as_bytes(), None)?;

        let mut dump = self.direct_arguments();
        dump.extend([
            format!("-fplugin={}", self.plugin.display()),
            "-fsyntax-only".to_owned(),
            "-".to_owned(),
        ]);
        self.dump(&dump, preprocessed, None)
    }

    fn parse_command(&self, command: &CompileCommand) -> Result<ParsedSource, FrontEndError> {
        let invocation = command.invocation(&self.clang)?;
        let cwd = Some(command.directory.as_path());
        let preprocessed = run(&invocation.preprocess(), &[], cwd)?;
        self.dump(&invocation.dump(&self.plugin), preprocessed, cwd)
    }
}

/// Runs a command with `input` on stdin and returns its stdout.
fn run(arguments: &[String], input: &[u8], cwd: Option<&Path>) -> Result<Vec<u8>, FrontEndError> {
    let (program, args) = arguments
        .split_first()
        .ok_or_else(|| FrontEndError::InvalidCompileCommand("empty command".to_owned()))?;
    log::debug!("running {}", arguments.join(" "));
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }
    let mut child = command.spawn()?;

    let stdin = child.stdin.take();
    let output = thread::scope(|scope| {
        let writer = scope.spawn(move || -> io::Result<()> {
            if let Some(mut stdin) = stdin {
                stdin.write_all(input)?;
            }
            Ok(())
        });
        let output = child.wait_with_output();
        let written = writer
            .join()
            .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked")));
        output.and_then(|output| written.map(|()| output))
    })?;

    if output.status.success() {
        Ok(output.stdout)
    } else {
        Err(FrontEndError::FrontEndFailure {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn entry(record: Value) -> CompileCommand {
        serde_json::from_value(record).unwrap()
    }

    #[test]
    fn test_invocation_from_command() {
        let command = entry(json!({
            "directory": "/build",
            "command": "/usr/bin/c++ -Iinclude -o obj/a.o -c src/a.cpp",
            "file": "src/a.cpp",
        }));
        let invocation = command.invocation(Path::new("clang")).unwrap();
        assert_eq!(invocation.arguments, ["clang", "-x", "c++", "-Iinclude"]);
        assert_eq!(invocation.file, "src/a.cpp");
        assert_eq!(
            invocation.preprocess(),
            ["clang", "-x", "c++", "-Iinclude", "-E", "src/a.cpp"]
        );
        assert_eq!(
            invocation.dump(Path::new("dump.so")),
            ["clang", "-x", "c++", "-Iinclude", "-fplugin=dump.so", "-fsyntax-only", "-"]
        );
        assert_eq!(
            command.source_file(),
            Some(PathBuf::from("/build/src/a.cpp"))
        );
    }

    #[test]
    fn test_invocation_from_arguments() {
        let command = entry(json!({
            "directory": "/build",
            "arguments": ["gcc", "-c", "-O2", "main.c"],
        }));
        let invocation = command.invocation(Path::new("/opt/clang")).unwrap();
        assert_eq!(invocation.arguments, ["/opt/clang", "-x", "c", "-O2"]);
        assert_eq!(invocation.file, "main.c");
    }

    #[test]
    fn test_invalid_commands() {
        let empty = entry(json!({"directory": "/"}));
        assert!(matches!(
            empty.invocation(Path::new("clang")),
            Err(FrontEndError::InvalidCompileCommand(_))
        ));
        let no_file = entry(json!({"directory": "/", "command": "c++"}));
        assert!(matches!(
            no_file.invocation(Path::new("clang")),
            Err(FrontEndError::InvalidCompileCommand(_))
        ));
    }

    #[test]
    fn test_missing_section() {
        let err = ParsedSource::new(String::new(), json!({"Content": {}})).unwrap_err();
        assert!(matches!(err, FrontEndError::MissingSection("TypeSummary")));
    }

    #[test]
    fn test_front_end_failure() {
        let front_end = ClangFrontEnd::new().clang("/nonexistent/clang");
        assert!(matches!(front_end.parse_source("int x;"), Err(FrontEndError::Io(_))));
    }
}
