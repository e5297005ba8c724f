//! Core types for tenet.

mod contradiction;
mod knowledge_item;
mod message;

pub use contradiction::*;
pub use knowledge_item::*;
pub use message::*;
