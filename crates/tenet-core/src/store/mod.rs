//! Knowledge store implementations.
//!
//! - [`InMemoryKnowledgeStore`]: an id-keyed arena, used in tests and by
//!   embedders that keep knowledge in process.
//! - [`SqliteKnowledgeStore`]: durable storage backed by SQLite.

mod memory;
mod sqlite;

pub use memory::InMemoryKnowledgeStore;
pub use sqlite::SqliteKnowledgeStore;
