//! Regular expressions over type spellings and attribute source text.

use std::sync::OnceLock;

use regex::Regex;

use super::{BuildError, BuildErrorKind};

pub struct Patterns {
    /// A function type spelling ending with a C-style ellipsis.
    pub variadic: Regex,
    pub target: Regex,
    pub target_clones: Regex,
    /// `[un]signed _BitInt(N)`.
    pub bit_int: Regex,
}

impl Patterns {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Patterns {
            variadic: Regex::new(r"^.*, \.\.\.\)(( const.*)|( noexcept.*)|( ->.*)|( except.*))?$")?,
            target: Regex::new(r"^\s*__target__\s*\((.*)\)$")?,
            target_clones: Regex::new(r"^\s*target_clones\s*\((.*)\)$")?,
            bit_int: Regex::new(r"^((?:(?:un)signed)?) ?_BitInt\(([0-9]+)\)$")?,
        })
    }

    /// The compiled patterns, shared by every builder.
    pub fn get() -> Result<&'static Patterns, BuildError> {
        static PATTERNS: OnceLock<Result<Patterns, regex::Error>> = OnceLock::new();
        PATTERNS
            .get_or_init(Patterns::compile)
            .as_ref()
            .map_err(|err| BuildErrorKind::InvalidPattern(err.to_string()).into())
    }
}

/// Strips an attribute spelling down to its argument list.
pub fn strip_call<'t>(pattern: &Regex, text: &'t str) -> &'t str {
    pattern
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map_or(text, |group| group.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variadic() {
        let patterns = Patterns::get().unwrap();
        assert!(patterns.variadic.is_match("int (const char *, ...)"));
        assert!(patterns.variadic.is_match("void (int, ...) const"));
        assert!(!patterns.variadic.is_match("void (int)"));
        assert!(!patterns.variadic.is_match("void (...)"));
    }

    #[test]
    fn test_strip_call() {
        let patterns = Patterns::get().unwrap();
        assert_eq!(
            strip_call(&patterns.target, "__target__(\"sse4.2\")"),
            "\"sse4.2\""
        );
        assert_eq!(strip_call(&patterns.target, "\"avx\""), "\"avx\"");
        let captures = patterns.bit_int.captures("unsigned _BitInt(12)").unwrap();
        assert_eq!(&captures[1], "unsigned");
        assert_eq!(&captures[2], "12");
    }
}
