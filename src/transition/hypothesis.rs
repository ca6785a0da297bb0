use std::{mem, sync::Arc};

use compact_str::CompactString;
use index_vec::IndexVec;
use thiserror::Error;

use crate::{
    grammar::{AsdlAst, Grammar, Production},
    tree::{Cardinality, FieldDecl, FieldValue, Node, TreeError, Value},
};

use super::{Action, Continuations};

index_vec::define_index_type! {
    /// A node under construction.
    pub struct SlotIdx = u32;
}

/// The decoder error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("illegal action {action} at step {step}: expected {expected} at {frontier}")]
    IllegalContinuation {
        step: usize,
        action: Action,
        expected: Continuations,
        frontier: String,
    },
    #[error("actions ended at step {step} with {frontier} still open")]
    Incomplete { step: usize, frontier: String },
    #[error("action {action} at step {step} follows a complete tree")]
    TrailingAction { step: usize, action: Action },
    #[error(transparent)]
    Tree(#[from] TreeError),
}

#[derive(Debug)]
struct Slot {
    production: Arc<Production>,
    parent: Option<SlotIdx>,
    /// The values of the fields closed so far.
    values: Vec<FieldValue<Arc<Production>>>,
    /// The items of the open sequence field.
    items: Vec<Value<Arc<Production>>>,
}

impl Slot {
    /// The field awaiting an action.
    fn frontier(&self) -> Option<&FieldDecl> {
        self.production.fields.get(self.values.len())
    }
}

/// A partial tree replaying construction actions.
///
/// The frontier is the next field of the innermost open node. Every action
/// is checked against the continuations of that field before it is applied.
#[derive(Debug)]
pub struct Hypothesis<'g> {
    grammar: &'g Grammar,
    root_type: CompactString,
    slots: IndexVec<SlotIdx, Slot>,
    frontier: Option<SlotIdx>,
    root: Option<AsdlAst>,
    step: usize,
}

impl<'g> Hypothesis<'g> {
    /// A hypothesis for a tree rooted at the grammar's first type.
    pub fn new(grammar: &'g Grammar) -> Self {
        Self::with_root(grammar, grammar.root_type())
    }

    /// A hypothesis for a tree rooted at a production of `root_type`.
    pub fn with_root(grammar: &'g Grammar, root_type: &str) -> Self {
        Hypothesis {
            grammar,
            root_type: root_type.into(),
            slots: IndexVec::new(),
            frontier: None,
            root: None,
            step: 0,
        }
    }

    /// The number of actions applied.
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn is_complete(&self) -> bool {
        self.root.is_some()
    }

    /// The actions legal at the frontier, or `None` once the tree is complete.
    pub fn valid_continuations(&self) -> Option<Continuations> {
        if self.root.is_some() {
            return None;
        }
        match self.frontier {
            None => Some(Continuations::new(&self.root_type, Cardinality::Single, false)),
            Some(idx) => {
                let field = self.slots[idx].frontier()?;
                Some(Continuations::new(&field.ty, field.cardinality, field.is_primitive()))
            }
        }
    }

    /// Describes the frontier as `Production.field`.
    pub fn frontier(&self) -> String {
        if self.root.is_some() {
            return "<complete>".to_owned();
        }
        match self.frontier {
            None => format!("<root {}>", self.root_type),
            Some(idx) => {
                let slot = &self.slots[idx];
                match slot.frontier() {
                    Some(field) => format!("{}.{} ({field})", slot.production.name, field.name),
                    None => slot.production.name.to_string(),
                }
            }
        }
    }

    /// Applies one action.
    pub fn apply(&mut self, action: Action) -> Result<(), DecodeError> {
        let Some(expected) = self.valid_continuations() else {
            return Err(DecodeError::TrailingAction {
                step: self.step,
                action,
            });
        };
        let known = match &action {
            Action::ApplyRule(production) => self
                .grammar
                .production(&production.name)
                .is_some_and(|declared| declared == production),
            _ => true,
        };
        if !known || !expected.accepts(&action) {
            return Err(DecodeError::IllegalContinuation {
                step: self.step,
                action,
                expected,
                frontier: self.frontier(),
            });
        }
        log::trace!("step {}: {action} at {}", self.step, self.frontier());
        self.step += 1;

        match action {
            Action::ApplyRule(production) => {
                let idx = self.slots.push(Slot {
                    production,
                    parent: self.frontier,
                    values: Vec::new(),
                    items: Vec::new(),
                });
                self.frontier = Some(idx);
                self.close_filled(idx)
            }
            Action::GenToken(token) => self.fill(Value::Token(token)),
            Action::Reduce => match self.frontier {
                Some(idx) => {
                    let slot = &mut self.slots[idx];
                    let value = match slot.frontier().map(|field| field.cardinality) {
                        Some(Cardinality::Sequence) => {
                            FieldValue::Sequence(mem::take(&mut slot.items))
                        }
                        _ => FieldValue::Optional(None),
                    };
                    slot.values.push(value);
                    self.close_filled(idx)
                }
                None => Ok(()),
            },
        }
    }

    /// Consumes the hypothesis, returning the finished tree.
    pub fn finish(self) -> Result<AsdlAst, DecodeError> {
        let frontier = self.frontier();
        self.root.ok_or(DecodeError::Incomplete {
            step: self.step,
            frontier,
        })
    }

    /// Puts a value into the frontier field.
    fn fill(&mut self, value: Value<Arc<Production>>) -> Result<(), DecodeError> {
        let Some(idx) = self.frontier else {
            if let Value::Node(node) = value {
                self.root = Some(node);
            }
            return Ok(());
        };
        let slot = &mut self.slots[idx];
        match slot.frontier().map(|field| field.cardinality) {
            Some(Cardinality::Sequence) => {
                slot.items.push(value);
                Ok(())
            }
            Some(Cardinality::Optional) => {
                slot.values.push(FieldValue::Optional(Some(value)));
                self.close_filled(idx)
            }
            _ => {
                slot.values.push(FieldValue::Single(value));
                self.close_filled(idx)
            }
        }
    }

    /// Closes the node at `idx` once all of its fields are filled, handing
    /// it to its parent.
    fn close_filled(&mut self, idx: SlotIdx) -> Result<(), DecodeError> {
        let slot = &mut self.slots[idx];
        if slot.frontier().is_some() {
            return Ok(());
        }
        let values = mem::take(&mut slot.values);
        let node = Node::from_values(slot.production.clone(), values)?;
        self.frontier = slot.parent;
        self.fill(Value::Node(node))
    }
}

/// Rebuilds the tree of `actions`, rooted at the grammar's first type.
pub fn decode(actions: &[Action], grammar: &Grammar) -> Result<AsdlAst, DecodeError> {
    decode_as(actions, grammar, grammar.root_type())
}

/// Rebuilds the tree of `actions`, rooted at a production of `root_type`.
pub fn decode_as(
    actions: &[Action],
    grammar: &Grammar,
    root_type: &str,
) -> Result<AsdlAst, DecodeError> {
    let mut hypothesis = Hypothesis::with_root(grammar, root_type);
    for action in actions {
        hypothesis.apply(action.clone())?;
    }
    hypothesis.finish()
}
