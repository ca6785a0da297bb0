//! Text normalization applied to both sides of a round trip.

use regex::Regex;

/// Strips comments and preprocessor lines, then drops whitespace and
/// parentheses and lowercases what is left.
#[derive(Debug, Clone)]
pub struct Normalizer {
    leading_directive: Regex,
    directive: Regex,
    block_comment: Regex,
    line_comment: Regex,
}

impl Normalizer {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Normalizer {
            leading_directive: Regex::new(r"^\s*#.*\n")?,
            directive: Regex::new(r"\s*#.*\n")?,
            block_comment: Regex::new(r"(?s)/\*.*?\*/")?,
            line_comment: Regex::new(r"//.*")?,
        })
    }

    /// Removes line markers, block comments and line comments.
    pub fn strip_comments(&self, text: &str) -> String {
        let text = self.leading_directive.replace(text, "");
        let text = self.directive.replace_all(&text, "");
        let text = self.block_comment.replace_all(&text, "");
        self.line_comment.replace_all(&text, "").into_owned()
    }

    pub fn normalize(&self, text: &str) -> String {
        simplify(&self.strip_comments(text))
    }
}

/// Drops whitespace and parentheses and lowercases.
pub fn simplify(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, ' ' | '\t' | '\n' | '(' | ')'))
        .collect::<String>()
        .trim()
        .to_lowercase()
}

/// The lines of preprocessed output that come from `<stdin>`.
pub fn stdin_section(preprocessed: &str) -> String {
    let mut lines = Vec::new();
    let mut in_stdin = false;
    for line in preprocessed.split('\n') {
        if line.starts_with('#') {
            in_stdin = line.contains("<stdin>");
        } else if in_stdin {
            lines.push(line);
        }
    }
    lines.join("\n")
}

/// Where two normalized texts stop agreeing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divergence {
    /// The length of the common prefix, in characters.
    pub offset: usize,
    /// The share of the expected text covered by the common prefix.
    pub percent: usize,
    /// The end of the common prefix.
    pub context: String,
}

/// How many characters of the common prefix are kept as context.
const CONTEXT: usize = 100;

/// Compares two texts, returning `None` when they are equal.
pub fn divergence(expected: &str, found: &str) -> Option<Divergence> {
    if expected == found {
        return None;
    }
    let offset = expected
        .chars()
        .zip(found.chars())
        .take_while(|(a, b)| a == b)
        .count();
    let total = expected.chars().count();
    let percent = if total == 0 { 0 } else { offset * 100 / total };
    let context = expected
        .chars()
        .take(offset)
        .skip(offset.saturating_sub(CONTEXT))
        .collect();
    Some(Divergence {
        offset,
        percent,
        context,
    })
}
