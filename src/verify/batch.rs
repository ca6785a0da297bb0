//! Verification of many files, one report.

use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
};

use rustc_hash::FxHashSet;

use super::{Mismatch, Verdict, Verifier};
use crate::{
    errors::Error,
    frontend::{CompileCommand, FrontEnd, FrontEndError, ParsedSource},
};

/// The extensions of the files worth verifying.
pub const SOURCE_EXTENSIONS: &[&str] = &["cpp", "cc", "h", "i", "ii", "hpp"];

/// Returns true if the path has one of the [`SOURCE_EXTENSIONS`].
pub fn has_source_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

/// Lists every file under `dir`, sorted.
pub fn collect_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Files left out of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exclusions {
    paths: FxHashSet<PathBuf>,
}

impl Exclusions {
    /// Parses an exclusions file: one path per line, `#` starts a comment line.
    pub fn parse(text: &str) -> Self {
        let mut exclusions = Exclusions::default();
        exclusions.extend(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(PathBuf::from),
        );
        exclusions
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        Ok(Self::parse(&fs::read_to_string(path)?))
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>) {
        self.paths.insert(path.into());
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl Extend<PathBuf> for Exclusions {
    fn extend<T: IntoIterator<Item = PathBuf>>(&mut self, iter: T) {
        self.paths.extend(iter);
    }
}

/// Why a file failed.
#[derive(Debug)]
pub enum Failure {
    Mismatch(Box<Mismatch>),
    Error(Error),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Mismatch(mismatch) => write!(f, "{mismatch}"),
            Failure::Error(err) => write!(f, "{err}"),
        }
    }
}

/// The outcome of a batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub ok: usize,
    pub failed: Vec<(String, Failure)>,
    /// Files skipped for their extension.
    pub ignored: Vec<String>,
    /// Set when the batch stopped at its first failure.
    pub stopped: bool,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.ok + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.total() == 0 {
            write!(f, "No tests, no stats")?;
        } else {
            write!(
                f,
                "Success: {}/{} ({}%)",
                self.ok,
                self.total(),
                self.ok * 100 / self.total()
            )?;
        }
        if !self.ignored.is_empty() {
            write!(f, "\nIgnored: {}", self.ignored.join(", "))?;
        }
        Ok(())
    }
}

/// Runs a verifier over files or compilation database entries.
pub struct Batch<'v, 'g, 'r, F> {
    verifier: &'v Verifier<'g, 'r>,
    front_end: &'v F,
    exclusions: Exclusions,
    fail_fast: bool,
}

impl<'v, 'g, 'r, F: FrontEnd> Batch<'v, 'g, 'r, F> {
    pub fn new(verifier: &'v Verifier<'g, 'r>, front_end: &'v F) -> Self {
        Batch {
            verifier,
            front_end,
            exclusions: Exclusions::default(),
            fail_fast: false,
        }
    }

    pub fn exclusions(mut self, exclusions: Exclusions) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// Stop at the first failing file.
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Verifies source files. Excluded files are skipped and files without a
    /// source extension are reported as ignored.
    pub fn run_files<I>(&self, files: I) -> BatchReport
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let files: Vec<_> = files
            .into_iter()
            .filter(|file| !self.exclusions.contains(file))
            .collect();
        let total = files.len();
        let mut report = BatchReport::default();
        for (number, file) in files.into_iter().enumerate() {
            let name = file.display().to_string();
            if !has_source_extension(&file) {
                report.ignored.push(name);
                continue;
            }
            log::info!("testing file {:5}/{total:5} {name}", number + 1);
            let outcome = fs::read_to_string(&file)
                .map_err(Error::from)
                .and_then(|code| self.check(|| self.front_end.parse_source(&code)));
            if self.record(&mut report, name, outcome) {
                break;
            }
        }
        report
    }

    /// Verifies the files of a compilation database.
    pub fn run_database(&self, commands: &[CompileCommand]) -> BatchReport {
        let mut report = BatchReport::default();
        for (number, command) in commands.iter().enumerate() {
            let name = command.source_file().map_or_else(
                || command.directory.display().to_string(),
                |file| file.display().to_string(),
            );
            if self.exclusions.contains(Path::new(&name)) {
                continue;
            }
            log::info!("testing file {:5}/{:5} {name}", number + 1, commands.len());
            let outcome = self.check(|| self.front_end.parse_command(command));
            if self.record(&mut report, name, outcome) {
                break;
            }
        }
        report
    }

    fn check(
        &self,
        parse: impl FnOnce() -> Result<ParsedSource, FrontEndError>,
    ) -> Result<Verdict, Error> {
        let parsed = parse()?;
        self.verifier.verify(&parsed)
    }

    /// Adds one outcome to the report, returning true when the batch stops.
    fn record(
        &self,
        report: &mut BatchReport,
        name: String,
        outcome: Result<Verdict, Error>,
    ) -> bool {
        let failure = match outcome {
            Ok(Verdict::Ok) => {
                log::info!("success for file: {name}");
                report.ok += 1;
                return false;
            }
            Ok(Verdict::Mismatch(mismatch)) => Failure::Mismatch(mismatch),
            Err(err) => Failure::Error(err),
        };
        log::warn!("test failed for file: {name}: {failure}");
        report.failed.push((name, failure));
        report.stopped = self.fail_fast;
        self.fail_fast
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use serde_json::json;

    use super::*;
    use crate::{grammar::Grammar, verify::VerifyOptions};

    /// Answers every request with the same dump, failing on sources that
    /// contain `error`.
    struct Canned {
        calls: Cell<usize>,
    }

    impl FrontEnd for Canned {
        fn parse_source(&self, code: &str) -> Result<ParsedSource, FrontEndError> {
            self.calls.set(self.calls.get() + 1);
            if code.contains("error") {
                return Err(FrontEndError::FrontEndFailure {
                    exit_code: Some(1),
                    stderr: "error: expected ';'".to_owned(),
                });
            }
            let document = json!({
                "TypeSummary": [],
                "Content": {"kind": "TranslationUnitDecl", "id": "0x1", "inner": []},
            });
            ParsedSource::new(String::new(), document)
        }

        fn parse_command(&self, _: &CompileCommand) -> Result<ParsedSource, FrontEndError> {
            self.parse_source("")
        }
    }

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, text).unwrap();
        path
    }

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cpp-asdl-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("nested")).unwrap();
        dir
    }

    #[test]
    fn test_exclusions() {
        let exclusions = Exclusions::parse("# broken\n\ntest/a.cpp\n  test/b.cpp  \n");
        assert_eq!(exclusions.len(), 2);
        assert!(exclusions.contains(Path::new("test/b.cpp")));
        assert!(!exclusions.contains(Path::new("# broken")));
    }

    #[test]
    fn test_extensions() {
        assert!(has_source_extension(Path::new("a/b.cpp")));
        assert!(has_source_extension(Path::new("x.ii")));
        assert!(!has_source_extension(Path::new("exclusions.txt")));
        assert!(!has_source_extension(Path::new("Makefile")));
    }

    #[test]
    fn test_batch() {
        let dir = scratch("batch");
        let good = write(&dir, "good.cpp", "int x;");
        let bad = write(&dir, "nested/bad.hpp", "error");
        let excluded = write(&dir, "excluded.cc", "error");
        write(&dir, "notes.txt", "");
        let files = collect_files(&dir).unwrap();
        assert_eq!(files.len(), 4);

        let grammar = Grammar::cpp().unwrap();
        let verifier = Verifier::new(&grammar, VerifyOptions::default()).unwrap();
        let front_end = Canned {
            calls: Cell::new(0),
        };
        let mut exclusions = Exclusions::default();
        exclusions.insert(&excluded);
        let batch = Batch::new(&verifier, &front_end).exclusions(exclusions);

        let report = batch.run_files(files.clone());
        assert_eq!(report.ok, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, bad.display().to_string());
        assert!(matches!(report.failed[0].1, Failure::Error(Error::FrontEnd(_))));
        assert_eq!(report.ignored.len(), 1);
        assert!(!report.stopped);
        assert_eq!(front_end.calls.get(), 2);
        let summary = report.to_string();
        assert!(summary.starts_with("Success: 1/2 (50%)\nIgnored: "));

        let report = Batch::new(&verifier, &front_end)
            .fail_fast(true)
            .run_files(vec![bad, good]);
        assert_eq!(report.total(), 1);
        assert!(report.stopped);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_database() {
        let grammar = Grammar::cpp().unwrap();
        let verifier = Verifier::new(&grammar, VerifyOptions::default()).unwrap();
        let front_end = Canned {
            calls: Cell::new(0),
        };
        let commands: Vec<CompileCommand> = serde_json::from_value(json!([
            {"directory": "/src", "arguments": ["c++", "-c", "a.cpp"], "file": "a.cpp"},
            {"directory": "/src", "arguments": ["c++", "-c", "b.cpp"], "file": "b.cpp"},
        ]))
        .unwrap();
        let mut exclusions = Exclusions::default();
        exclusions.insert("/src/b.cpp");
        let report = Batch::new(&verifier, &front_end)
            .exclusions(exclusions)
            .run_database(&commands);
        assert_eq!(report.ok, 1);
        assert!(report.is_success());
        assert_eq!(BatchReport::default().to_string(), "No tests, no stats");
    }
}
