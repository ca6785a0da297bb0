//! Tree-construction actions.
//!
//! [`encode`] flattens an ASDL tree into the actions that build it and
//! [`decode`] replays them against a [`Hypothesis`], which rejects any
//! action that is not a legal continuation of the frontier.
//!
//! ```txt
//! CompoundStmt(stmts=[NullStmt])
//!
//! ApplyRule[CompoundStmt] ApplyRule[NullStmt] Reduce
//! ```

mod action;
mod encode;
mod hypothesis;

pub use self::{
    action::{Action, ActionKind, Continuations},
    encode::encode,
    hypothesis::{decode, decode_as, DecodeError, Hypothesis, SlotIdx},
};
