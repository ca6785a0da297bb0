use std::sync::Arc;

use crate::{
    grammar::{AsdlAst, Production},
    tree::{FieldValue, Value},
};

use super::Action;

/// Flattens a tree into its construction actions: depth first, fields in
/// declared order. A sequence ends with [`Action::Reduce`], and so does an
/// empty optional field.
pub fn encode(tree: &AsdlAst) -> Vec<Action> {
    let mut actions = Vec::with_capacity(tree.size() * 2);
    encode_node(tree, &mut actions);
    actions
}

fn encode_node(node: &AsdlAst, actions: &mut Vec<Action>) {
    actions.push(Action::ApplyRule(node.kind().clone()));
    for (_, value) in node.fields() {
        match value {
            FieldValue::Single(value) | FieldValue::Optional(Some(value)) => {
                encode_value(value, actions)
            }
            FieldValue::Optional(None) => actions.push(Action::Reduce),
            FieldValue::Sequence(values) => {
                for value in values {
                    encode_value(value, actions);
                }
                actions.push(Action::Reduce);
            }
        }
    }
}

fn encode_value(value: &Value<Arc<Production>>, actions: &mut Vec<Action>) {
    match value {
        Value::Token(token) => actions.push(Action::GenToken(token.clone())),
        Value::Node(node) => encode_node(node, actions),
    }
}
