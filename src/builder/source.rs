//! Source locations of clang JSON nodes and the source-span accessor.
//!
//! A node's `range` covers `begin.offset .. end.offset + end.tokLen` of the
//! preprocessed text: the end location points at the first byte of the last
//! token, so its length has to be added. Nodes without offsets (implicit
//! nodes, builtin types) have no span.

use serde::{de::IgnoredAny, Deserialize};
use serde_json::Value;
use text_size::{TextRange, TextSize};

/// A location as dumped by clang. Every key is optional: clang omits keys
/// whose value did not change since the previously dumped location.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLoc<'a> {
    pub offset: Option<u32>,
    #[serde(borrow)]
    pub file: Option<&'a str>,
    pub line: Option<u32>,
    pub presumed_line: Option<u32>,
    pub col: Option<u32>,
    pub tok_len: Option<u32>,
    pub included_from: Option<IgnoredAny>,
    #[serde(borrow)]
    pub spelling_loc: Option<Box<SourceLoc<'a>>>,
    #[serde(borrow)]
    pub expansion_loc: Option<Box<SourceLoc<'a>>>,
    #[serde(borrow)]
    pub range: Option<Box<SourceRange<'a>>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceRange<'a> {
    #[serde(borrow, default)]
    pub begin: SourceLoc<'a>,
    #[serde(borrow, default)]
    pub end: SourceLoc<'a>,
}

impl<'a> SourceLoc<'a> {
    /// The `loc` of a node, if it has a well-formed one.
    pub fn of(node: &'a Value) -> Option<SourceLoc<'a>> {
        SourceLoc::deserialize(node.get("loc")?).ok()
    }

    /// The file named by this location or its spelling/expansion locations.
    pub fn file(&self) -> Option<&'a str> {
        self.file
            .or_else(|| self.spelling_loc.as_ref().and_then(|loc| loc.file))
            .or_else(|| self.expansion_loc.as_ref().and_then(|loc| loc.file))
    }

    /// Returns true if this location enters an included file.
    pub fn is_included(&self) -> bool {
        let included = |loc: &SourceLoc<'_>| loc.included_from.is_some();
        let range = self.range.as_deref();
        included(self)
            || self.spelling_loc.as_deref().is_some_and(included)
            || range.is_some_and(|range| included(&range.begin))
    }
}

impl<'a> SourceRange<'a> {
    /// The `range` of a node, if it has a well-formed one.
    pub fn of(node: &'a Value) -> Option<SourceRange<'a>> {
        SourceRange::deserialize(node.get("range")?).ok()
    }

    pub fn is_included(&self) -> bool {
        let included = |loc: &SourceLoc<'_>| loc.included_from.is_some();
        included(&self.begin) || self.begin.spelling_loc.as_deref().is_some_and(included)
    }

    /// The byte span covered, including the whole last token. `None` when
    /// the end does not fit in a [`TextSize`].
    pub fn span(&self) -> Option<TextRange> {
        let start = TextSize::new(self.begin.offset?);
        let end = TextSize::new(self.end.offset?)
            .checked_add(TextSize::new(self.end.tok_len.unwrap_or(0)))?;
        (start <= end).then(|| TextRange::new(start, end))
    }
}

/// The preprocessed source text the JSON dump was produced from.
#[derive(Debug, Clone, Copy)]
pub struct SourceText<'a> {
    text: &'a str,
}

impl<'a> SourceText<'a> {
    pub fn new(text: &'a str) -> Self {
        SourceText { text }
    }

    pub fn as_str(&self) -> &'a str {
        self.text
    }

    /// The source text of a node, empty when the node has no usable span.
    pub fn of(&self, node: &Value) -> &'a str {
        SourceRange::of(node)
            .and_then(|range| range.span())
            .and_then(|span| self.text.get(std::ops::Range::<usize>::from(span)))
            .unwrap_or_default()
    }
}

/// The last file named anywhere in a node's subtree, in dump order.
///
/// Clang only writes `file` when it differs from the previously dumped
/// location, so this is the file that nodes dumped after this subtree
/// default to.
pub fn last_file(node: &Value) -> Option<&str> {
    fn visit<'a>(value: &'a Value, last: &mut Option<&'a str>) {
        match value {
            Value::Object(map) => {
                for (key, value) in map {
                    match key.as_str() {
                        "file" => {
                            if let Some(file) = value.as_str() {
                                *last = Some(file);
                            }
                        }
                        // names the including file, not the file of this location
                        "includedFrom" => {}
                        _ => visit(value, last),
                    }
                }
            }
            Value::Array(items) => items.iter().for_each(|item| visit(item, last)),
            _ => {}
        }
    }

    let mut last = None;
    visit(node, &mut last);
    last
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_span() {
        let text = SourceText::new("int main() { goto end; end: return 0; }");
        let node = json!({
            "kind": "GotoStmt",
            "range": {
                "begin": {"offset": 13, "col": 14, "tokLen": 4},
                "end": {"offset": 18, "col": 19, "tokLen": 3},
            },
        });
        assert_eq!(text.of(&node), "goto end");
        assert_eq!(text.of(&json!({"kind": "BuiltinType"})), "");
        assert_eq!(text.of(&json!({"range": {"begin": {}, "end": {}}})), "");
    }

    #[test]
    fn test_span_overflow() {
        let node = json!({
            "range": {
                "begin": {"offset": 0},
                "end": {"offset": u32::MAX - 1, "tokLen": 4},
            },
        });
        assert_eq!(SourceRange::of(&node).unwrap().span(), None);
        assert_eq!(SourceText::new("int x;").of(&node), "");

        let node = json!({"range": {"begin": {"offset": 2}, "end": {"offset": u32::MAX}}});
        let span = SourceRange::of(&node).unwrap().span().unwrap();
        assert_eq!(u32::from(span.end()), u32::MAX);
    }

    #[test]
    fn test_loc() {
        let node = json!({
            "loc": {
                "spellingLoc": {"offset": 1, "file": "a.h", "includedFrom": {"file": "<stdin>"}},
                "expansionLoc": {"offset": 5, "file": "<stdin>"},
            },
        });
        let loc = SourceLoc::of(&node).unwrap();
        assert_eq!(loc.file(), Some("a.h"));
        assert!(loc.is_included());

        let node = json!({"loc": {"offset": 3, "line": 1, "col": 4, "tokLen": 1}});
        let loc = SourceLoc::of(&node).unwrap();
        assert_eq!(loc.file(), None);
        assert!(!loc.is_included());
    }

    #[test]
    fn test_last_file() {
        let node = json!({
            "loc": {"file": "a.h"},
            "inner": [
                {"loc": {"file": "b.h", "includedFrom": {"file": "<stdin>"}}},
                {"range": {"begin": {"line": 3}}},
            ],
        });
        assert_eq!(last_file(&node), Some("b.h"));
        assert_eq!(last_file(&json!({"kind": "x"})), None);
    }
}
