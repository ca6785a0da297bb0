//! Ingestion of the `TypeSummary` section.
//!
//! The summary is a flat list of records keyed by `node_id`, each carrying
//! facts the content tree leaves out: the resolved type of a declaration or
//! expression, constructor explicitness, inline assembly operands, attribute
//! arguments and `offsetof` components. Records may nest under `inner`.

use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap};
use serde::Deserialize;
use serde_json::Value;

use super::{json::JsonNode, BuildError, BuildErrorKind};

/// Summary keys holding attribute arguments.
const ATTR_KEYS: &[&str] = &[
    "aliasee",
    "cleanup_function",
    "deprecation_message",
    "section_name",
    "visibility",
    "tls_model",
    "name",
    "source_index",
    "size_index",
    "nmemb_index",
    "priority",
    "message",
    "options",
    "indices",
    "archetype",
    "fmt_index",
    "vargs_index",
    "count",
    "offset",
    "value",
];

#[derive(Debug, Deserialize)]
struct AsmRecord<'a> {
    #[serde(borrow)]
    asm_string: &'a str,
    #[serde(borrow, default)]
    output_constraints: Vec<AsmConstraint<'a>>,
    #[serde(borrow, default)]
    input_constraints: Vec<AsmConstraint<'a>>,
    #[serde(borrow, default)]
    clobbers: Vec<AsmClobber<'a>>,
    #[serde(borrow, default)]
    labels: Vec<AsmLabel<'a>>,
}

#[derive(Debug, Deserialize)]
struct AsmConstraint<'a> {
    id: &'a str,
    constraint: &'a str,
}

#[derive(Debug, Deserialize)]
struct AsmClobber<'a> {
    clobber: &'a str,
}

#[derive(Debug, Deserialize)]
struct AsmLabel<'a> {
    label: &'a str,
}

/// Inline assembly facts of one `GCCAsmStmt`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AsmInfo<'a> {
    pub asm_string: &'a str,
    /// Operand node id to constraint.
    pub output_constraints: FxHashMap<&'a str, &'a str>,
    pub input_constraints: FxHashMap<&'a str, &'a str>,
    pub clobbers: Vec<&'a str>,
    pub labels: Vec<&'a str>,
}

impl<'a> From<AsmRecord<'a>> for AsmInfo<'a> {
    fn from(record: AsmRecord<'a>) -> Self {
        AsmInfo {
            asm_string: record.asm_string,
            output_constraints: record
                .output_constraints
                .iter()
                .map(|c| (c.id, c.constraint))
                .collect(),
            input_constraints: record
                .input_constraints
                .iter()
                .map(|c| (c.id, c.constraint))
                .collect(),
            clobbers: record.clobbers.iter().map(|c| c.clobber).collect(),
            labels: record.labels.iter().map(|l| l.label).collect(),
        }
    }
}

pub type AttrInfo<'a> = IndexMap<&'static str, &'a Value, FxBuildHasher>;

/// The per-run tables filled from the type summary.
#[derive(Debug, Default)]
pub struct Summary<'a> {
    pub types: FxHashMap<&'a str, &'a Value>,
    pub explicit: FxHashMap<&'a str, bool>,
    pub exprs: FxHashMap<&'a str, &'a [Value]>,
    pub asms: FxHashMap<&'a str, AsmInfo<'a>>,
    pub attrs: FxHashMap<&'a str, AttrInfo<'a>>,
}

impl<'a> Summary<'a> {
    /// Records every entry of a summary list, recursing into nested lists.
    pub fn ingest(&mut self, entries: &'a Value) -> Result<(), BuildError> {
        let Some(entries) = entries.as_array() else {
            return Err(BuildErrorKind::InvalidRecord {
                node_id: "TypeSummary".into(),
                message: "expected a list of records".into(),
            }
            .into());
        };
        for entry in entries {
            self.ingest_entry(entry)?;
        }
        Ok(())
    }

    fn ingest_entry(&mut self, entry: &'a Value) -> Result<(), BuildError> {
        let id = entry.opt_str("node_id");

        if let Some(node_inner) = entry.get("node_inner") {
            let id = id.ok_or_else(|| record_error(entry, "`node_inner` without `node_id`"))?;
            match node_inner.as_array().map(Vec::as_slice) {
                Some([inner]) => {
                    self.types.insert(id, inner);
                }
                _ => return Err(record_error(entry, "`node_inner` must hold exactly one type")),
            }
        } else if let Some(id) = id {
            self.types.insert(id, entry);
        }

        if let Some(explicit) = entry.get("isExplicit") {
            let id = id.ok_or_else(|| record_error(entry, "`isExplicit` without `node_id`"))?;
            self
                .explicit
                .insert(id, explicit.as_bool().unwrap_or_default());
        }

        if let Some(inner) = entry.get("inner") {
            self.ingest(inner)?;
        }

        if let Some(exprs) = entry.get("expr_inner").and_then(Value::as_array) {
            let id = id.ok_or_else(|| record_error(entry, "`expr_inner` without `node_id`"))?;
            self.exprs.insert(id, exprs);
        }

        if entry.get("asm_string").is_some() {
            let id = id.ok_or_else(|| record_error(entry, "`asm_string` without `node_id`"))?;
            let record = AsmRecord::deserialize(entry)
                .map_err(|err| record_error(entry, &err.to_string()))?;
            self.asms.insert(id, record.into());
        }

        for key in ATTR_KEYS {
            let Some(value) = entry.get(*key) else {
                continue;
            };
            if let Some(id) = id {
                self.attrs.entry(id).or_default().insert(*key, value);
            }
        }
        Ok(())
    }

    /// An attribute argument recorded for `id`.
    pub fn attr(&self, id: &str, key: &str) -> Option<&'a Value> {
        self.attrs.get(id)?.get(key).copied()
    }
}

fn record_error(entry: &Value, message: &str) -> BuildError {
    BuildErrorKind::InvalidRecord {
        node_id: entry.opt_str("node_id").unwrap_or_default().into(),
        message: message.into(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_ingest() {
        let document = json!([
            {"node_id": "0x1", "node_inner": [{"kind": "BuiltinType", "type": {"qualType": "int"}}]},
            {"node_id": "0x2", "kind": "FunctionProtoType", "isExplicit": true, "inner": [
                {"node_id": "0x3", "aliasee": "target", "section_name": ".text"},
            ]},
            {"node_id": "0x4", "asm_string": "nop", "output_constraints": [{"id": "0x5", "constraint": "=r"}],
             "clobbers": [{"clobber": "memory"}]},
            {"node_id": "0x6", "expr_inner": [{"kind": "OffsetOfField", "field": "a"}]},
        ]);
        let mut summary = Summary::default();
        summary.ingest(&document).unwrap();

        assert_eq!(summary.types["0x1"]["kind"], "BuiltinType");
        assert_eq!(summary.types["0x2"]["kind"], "FunctionProtoType");
        assert_eq!(summary.explicit.get("0x2"), Some(&true));
        assert_eq!(summary.attr("0x3", "aliasee"), Some(&json!("target")));
        assert_eq!(summary.attr("0x3", "section_name"), Some(&json!(".text")));
        assert_eq!(summary.attr("0x3", "visibility"), None);
        let asm = &summary.asms["0x4"];
        assert_eq!(asm.asm_string, "nop");
        assert_eq!(asm.output_constraints.get("0x5"), Some(&"=r"));
        assert!(asm.input_constraints.is_empty());
        assert_eq!(asm.clobbers, ["memory"]);
        assert_eq!(summary.exprs["0x6"].len(), 1);
    }

    #[test]
    fn test_ingest_errors() {
        let mut summary = Summary::default();
        let document = json!([{"node_id": "0x1", "node_inner": []}]);
        assert!(matches!(
            summary.ingest(&document).unwrap_err().kind,
            BuildErrorKind::InvalidRecord { .. }
        ));
        let document = json!([{"node_id": "0x1", "asm_string": 3}]);
        assert!(summary.ingest(&document).is_err());
    }
}
