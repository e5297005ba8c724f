//! Contradiction resolution.
//!
//! [`ContradictionEngine`] decides whether a candidate statement retires an
//! existing item, retires the loser of a confirmed conflict, and finds
//! conflicts inside a batch of items. Which side of a conflict survives is
//! decided by [`tie_break::decide`].

mod engine;
mod group;
pub mod tie_break;

pub use engine::{CheckBeforeAdd, ContradictionEngine, GroupResolution, ResolveOutcome};
pub use tie_break::{TieBreak, TieBreakRule};
