//! Accessors over clang JSON nodes.

use compact_str::{format_compact, CompactString};
use serde_json::Value;

use super::{BuildError, BuildErrorKind};

/// Field lookups on a clang JSON node.
///
/// Missing required keys are reported as [`BuildErrorKind::MalformedJson`]
/// carrying the node id.
pub trait JsonNode {
    fn kind(&self) -> Option<&str>;

    /// The node id, or an empty string for nodes without one.
    fn id(&self) -> &str;

    /// Truthiness of `key`: absent, `null`, `false`, `0`, `""`
    /// and empty containers are false.
    fn flag(&self, key: &str) -> bool;

    fn opt_str(&self, key: &str) -> Option<&str>;

    fn req(&self, key: &str) -> Result<&Value, BuildError>;

    fn req_str(&self, key: &str) -> Result<&str, BuildError>;

    /// Follows a path of object keys.
    fn at(&self, path: &[&str]) -> Option<&Value>;

    /// The child nodes under `inner`.
    fn inner(&self) -> &[Value];
}

impl JsonNode for Value {
    fn kind(&self) -> Option<&str> {
        self.get("kind").and_then(Value::as_str)
    }

    fn id(&self) -> &str {
        self.get("id").and_then(Value::as_str).unwrap_or_default()
    }

    fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(truthy)
    }

    fn opt_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    fn req(&self, key: &str) -> Result<&Value, BuildError> {
        self.get(key).ok_or_else(|| missing(self, key))
    }

    fn req_str(&self, key: &str) -> Result<&str, BuildError> {
        self.opt_str(key).ok_or_else(|| missing(self, key))
    }

    fn at(&self, path: &[&str]) -> Option<&Value> {
        path.iter().try_fold(self, |value, key| value.get(key))
    }

    fn inner(&self) -> &[Value] {
        self
            .get("inner")
            .and_then(Value::as_array)
            .map_or(&[], Vec::as_slice)
    }
}

pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Renders a scalar as a token: strings verbatim, numbers and booleans in
/// their JSON spelling.
pub fn scalar(value: &Value) -> CompactString {
    match value {
        Value::String(s) => s.as_str().into(),
        other => format_compact!("{other}"),
    }
}

pub fn missing(node: &Value, key: &str) -> BuildError {
    BuildErrorKind::MalformedJson {
        node_id: node.id().into(),
        missing_key: key.into(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_accessors() {
        let node = json!({
            "id": "0x1",
            "kind": "VarDecl",
            "name": "x",
            "isUsed": true,
            "init": "",
            "type": {"qualType": "int"},
            "inner": [{"kind": "IntegerLiteral"}],
        });
        assert_eq!(node.kind(), Some("VarDecl"));
        assert_eq!(node.id(), "0x1");
        assert!(node.flag("isUsed"));
        assert!(!node.flag("init"));
        assert!(!node.flag("missing"));
        assert_eq!(node.req_str("name"), Ok("x"));
        assert_eq!(
            node.at(&["type", "qualType"]).and_then(Value::as_str),
            Some("int")
        );
        assert_eq!(node.inner().len(), 1);
        assert_eq!(
            node.req_str("storageClass").unwrap_err().kind,
            BuildErrorKind::MalformedJson {
                node_id: "0x1".into(),
                missing_key: "storageClass".into(),
            }
        );
    }

    #[test]
    fn test_scalar() {
        assert_eq!(scalar(&json!("1.5")), "1.5");
        assert_eq!(scalar(&json!(42)), "42");
        assert_eq!(scalar(&json!(true)), "true");
    }
}
