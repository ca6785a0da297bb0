//! Attribute handlers. Attribute arguments are recorded in the summary
//! under the attribute's node id.

use compact_str::CompactString;
use serde_json::Value;

use super::{json, make, patterns, patterns::Patterns, Built, Builder, JsonNode};
use crate::tree::NodeKind;

impl<'a> Builder<'a> {
    /// An attribute with one required argument.
    pub(super) fn attr_arg(
        &mut self,
        node: &'a Value,
        kind: NodeKind,
        key: &str,
        field: &'static str,
    ) -> Built {
        let value = json::scalar(self.req_attr_info(node, key)?);
        make(kind, [(field, value.into())]).map(Some)
    }

    fn opt_attr_arg(&self, node: &Value, key: &str) -> Option<CompactString> {
        self.attr_info(node, key).map(json::scalar)
    }

    /// `deprecated` and `unavailable`, whose message may be empty.
    pub(super) fn message_attr(&mut self, node: &'a Value, kind: NodeKind) -> Built {
        let msg = self
            .opt_attr_arg(node, "deprecation_message")
            .filter(|msg| !msg.is_empty());
        make(kind, [("msg", msg.into())]).map(Some)
    }

    pub(super) fn priority_attr(&mut self, node: &'a Value, kind: NodeKind) -> Built {
        let priority = self.opt_attr_arg(node, "priority");
        make(kind, [("priority", priority.into())]).map(Some)
    }

    pub(super) fn aligned_attr(&mut self, node: &'a Value) -> Built {
        let size = self.optional_child(node)?;
        make(NodeKind::AlignedAttr, [("size", size.into())]).map(Some)
    }

    pub(super) fn alloc_size_attr(&mut self, node: &'a Value) -> Built {
        let size = json::scalar(self.req_attr_info(node, "size_index")?);
        let nmemb = self.opt_attr_arg(node, "nmemb_index");
        make(
            NodeKind::AllocSizeAttr,
            [("size", size.into()), ("nmemb", nmemb.into())],
        )
        .map(Some)
    }

    pub(super) fn format_attr(&mut self, node: &'a Value) -> Built {
        let archetype = json::scalar(self.req_attr_info(node, "archetype")?);
        let fmt_index = json::scalar(self.req_attr_info(node, "fmt_index")?);
        let vargs_index = json::scalar(self.req_attr_info(node, "vargs_index")?);
        make(
            NodeKind::FormatAttr,
            [
                ("archetype", archetype.into()),
                ("fmt_index", fmt_index.into()),
                ("vargs_index", vargs_index.into()),
            ],
        )
        .map(Some)
    }

    /// An attribute whose argument is a list, recorded under `field`.
    pub(super) fn list_attr(
        &mut self,
        node: &'a Value,
        kind: NodeKind,
        field: &'static str,
    ) -> Built {
        let items = self
            .req_attr_info(node, field)?
            .as_array()
            .ok_or_else(|| json::missing(node, field))?
            .iter()
            .map(json::scalar)
            .collect::<Vec<_>>();
        make(kind, [(field, items.into())]).map(Some)
    }

    pub(super) fn patchable_function_entry_attr(&mut self, node: &'a Value) -> Built {
        let count = json::scalar(self.req_attr_info(node, "count")?);
        let offset = self.opt_attr_arg(node, "offset");
        make(
            NodeKind::PatchableFunctionEntryAttr,
            [("count", count.into()), ("offset", offset.into())],
        )
        .map(Some)
    }

    /// `sentinel(value, offset)`. When only the offset is given the value
    /// defaults to zero.
    pub(super) fn sentinel_attr(&mut self, node: &'a Value) -> Built {
        let offset = self.opt_attr_arg(node, "offset");
        let value = match self.attr_info(node, "value") {
            Some(value) if json::truthy(value) => Some(json::scalar(value)),
            Some(_) => Some("0".into()),
            None if offset.is_some() => Some("0".into()),
            None => None,
        };
        make(
            NodeKind::SentinelAttr,
            [("value", value.into()), ("offset", offset.into())],
        )
        .map(Some)
    }

    /// `target` and `target_clones`. The description is kept as written,
    /// without the attribute name.
    pub(super) fn target_attr(&mut self, node: &'a Value, kind: NodeKind) -> Built {
        let patterns = Patterns::get()?;
        let pattern = if kind == NodeKind::TargetClonesAttr {
            &patterns.target_clones
        } else {
            &patterns.target
        };
        let desc = patterns::strip_call(pattern, self.source.of(node));
        make(kind, [("desc", desc.into())]).map(Some)
    }

    pub(super) fn weak_ref_attr(&mut self, node: &'a Value) -> Built {
        let name = self.opt_attr_arg(node, "name");
        make(NodeKind::WeakRefAttr, [("name", name.into())]).map(Some)
    }

    /// `used`; implied on some declarations, in which case it is not written.
    pub(super) fn used_attr(&mut self, node: &'a Value) -> Built {
        if node.flag("implicit") {
            return Ok(None);
        }
        self.marker(NodeKind::UsedAttr)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        builder::{BuildErrorKind, BuildOptions},
        tree::CppAst,
    };

    fn build_attr(
        attr: Value,
        summary: Value,
        source: &str,
    ) -> Result<Option<CppAst>, crate::builder::BuildError> {
        let parent = json!({"kind": "FunctionDecl"});
        let options = BuildOptions::default();
        let mut builder = Builder::new(source, &options);
        builder.summary.ingest(&summary)?;
        builder.stack.push(&parent);
        builder.node(&attr)
    }

    #[test]
    fn test_attr_args() {
        let summary = json!([{"node_id": "0x1", "aliasee": "impl", "cleanup_function": "release"}]);
        let alias = build_attr(json!({"id": "0x1", "kind": "AliasAttr"}), summary.clone(), "").unwrap();
        assert_eq!(alias.unwrap().token("aliasee"), Some("impl"));
        let cleanup = build_attr(json!({"id": "0x1", "kind": "CleanupAttr"}), summary, "").unwrap();
        assert_eq!(cleanup.unwrap().token("func"), Some("release"));

        let err = build_attr(json!({"id": "0x2", "kind": "SectionAttr"}), json!([]), "").unwrap_err();
        assert!(matches!(err.kind, BuildErrorKind::MalformedJson { .. }));
    }

    #[test]
    fn test_optional_args() {
        let summary = json!([
            {"node_id": "0x1", "deprecation_message": ""},
            {"node_id": "0x2", "deprecation_message": "use g"},
            {"node_id": "0x3", "size_index": 1},
        ]);
        let empty = build_attr(json!({"id": "0x1", "kind": "DeprecatedAttr"}), summary.clone(), "").unwrap();
        assert_eq!(empty.unwrap().token("msg"), None);
        let message = build_attr(json!({"id": "0x2", "kind": "UnavailableAttr"}), summary.clone(), "").unwrap();
        assert_eq!(message.unwrap().token("msg"), Some("use g"));
        let alloc = build_attr(json!({"id": "0x3", "kind": "AllocSizeAttr"}), summary.clone(), "")
            .unwrap()
            .unwrap();
        assert_eq!(alloc.token("size"), Some("1"));
        assert_eq!(alloc.token("nmemb"), None);
        let ctor = build_attr(json!({"id": "0x4", "kind": "ConstructorAttr"}), summary, "").unwrap();
        assert_eq!(ctor.unwrap().token("priority"), None);
    }

    #[test]
    fn test_list_attrs() {
        let summary = json!([{"node_id": "0x1", "indices": [1, 2]}, {"node_id": "0x2", "options": ["address"]}]);
        let nonnull = build_attr(json!({"id": "0x1", "kind": "NonNullAttr"}), summary.clone(), "")
            .unwrap()
            .unwrap();
        let indices: Vec<_> = nonnull
            .get("indices")
            .unwrap()
            .values()
            .iter()
            .filter_map(|v| v.as_token())
            .collect();
        assert_eq!(indices, ["1", "2"]);
        let sanitize = build_attr(json!({"id": "0x2", "kind": "NoSanitizeAttr"}), summary, "")
            .unwrap()
            .unwrap();
        assert_eq!(sanitize.get("options").unwrap().values().len(), 1);
    }

    #[test]
    fn test_sentinel() {
        let summary = json!([{"node_id": "0x1", "offset": 1}, {"node_id": "0x2", "value": 2}]);
        let offset_only = build_attr(json!({"id": "0x1", "kind": "SentinelAttr"}), summary.clone(), "")
            .unwrap()
            .unwrap();
        assert_eq!(offset_only.token("value"), Some("0"));
        assert_eq!(offset_only.token("offset"), Some("1"));
        let value = build_attr(json!({"id": "0x2", "kind": "SentinelAttr"}), summary.clone(), "")
            .unwrap()
            .unwrap();
        assert_eq!(value.token("value"), Some("2"));
        let bare = build_attr(json!({"id": "0x3", "kind": "SentinelAttr"}), summary, "")
            .unwrap()
            .unwrap();
        assert_eq!(bare.token("value"), None);
    }

    #[test]
    fn test_target() {
        let source = "__attribute__((__target__(\"avx2\"))) void f();";
        let attr = json!({"id": "0x1", "kind": "TargetAttr",
                          "range": {"begin": {"offset": 15}, "end": {"offset": 32, "tokLen": 1}}});
        let built = build_attr(attr, json!([]), source).unwrap().unwrap();
        assert_eq!(built.token("desc"), Some("\"avx2\""));
    }

    #[test]
    fn test_implicit_used() {
        let implicit = build_attr(json!({"id": "0x1", "kind": "UsedAttr", "implicit": true}), json!([]), "");
        assert_eq!(implicit.unwrap(), None);
        let written = build_attr(json!({"id": "0x1", "kind": "UsedAttr"}), json!([]), "");
        assert!(written.unwrap().is_some());
    }
}
