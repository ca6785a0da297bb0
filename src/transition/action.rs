use std::{fmt, sync::Arc};

use compact_str::CompactString;

use crate::{grammar::Production, tree::Cardinality, utils::Join};

/// A tree-construction action.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    /// Opens a node of the production at the frontier.
    ApplyRule(Arc<Production>),
    /// Closes the frontier field: ends a sequence or leaves an optional empty.
    Reduce,
    /// Fills the frontier primitive field with a token.
    GenToken(CompactString),
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::ApplyRule(_) => ActionKind::ApplyRule,
            Action::Reduce => ActionKind::Reduce,
            Action::GenToken(_) => ActionKind::GenToken,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::ApplyRule(production) => write!(f, "ApplyRule[{}]", production.name),
            Action::Reduce => write!(f, "Reduce"),
            Action::GenToken(token) => write!(f, "GenToken[{token}]"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    ApplyRule,
    Reduce,
    GenToken,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::ApplyRule => write!(f, "ApplyRule"),
            ActionKind::Reduce => write!(f, "Reduce"),
            ActionKind::GenToken => write!(f, "GenToken"),
        }
    }
}

/// The actions legal at a frontier: the frontier's declared type and the
/// action kinds that may fill it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Continuations {
    pub ty: CompactString,
    pub cardinality: Cardinality,
    pub kinds: Vec<ActionKind>,
}

impl Continuations {
    pub(super) fn new(ty: &str, cardinality: Cardinality, primitive: bool) -> Self {
        let fill = if primitive {
            ActionKind::GenToken
        } else {
            ActionKind::ApplyRule
        };
        let kinds = match cardinality {
            Cardinality::Single => vec![fill],
            Cardinality::Optional | Cardinality::Sequence => vec![fill, ActionKind::Reduce],
        };
        Continuations {
            ty: ty.into(),
            cardinality,
            kinds,
        }
    }

    /// Returns true if `action` may be applied at the frontier.
    pub fn accepts(&self, action: &Action) -> bool {
        match action {
            Action::ApplyRule(production) => {
                self.kinds.contains(&ActionKind::ApplyRule) && production.ty == self.ty
            }
            _ => self.kinds.contains(&action.kind()),
        }
    }
}

impl fmt::Display for Continuations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ty = format!("{}{}", self.ty, self.cardinality.suffix());
        let kinds = self
            .kinds
            .iter()
            .map(|kind| match kind {
                ActionKind::ApplyRule | ActionKind::GenToken => format!("{kind}[{ty}]"),
                ActionKind::Reduce => kind.to_string(),
            })
            .join(" | ");
        f.write_str(&kinds)
    }
}
