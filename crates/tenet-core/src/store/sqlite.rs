//! SQLite-backed knowledge store.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so that text ordering matches time ordering.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use crate::config::TenetConfig;
use crate::error::{TenetError, TenetResult};
use crate::traits::{KnowledgeStore, SearchParams};
use crate::types::{KnowledgeItem, KnowledgeKind, KnowledgeSource, LifeArea, Supersession};

const COLUMNS: &str = "id, owner_id, kind, area, title, content, confidence, source, \
     validated_by_user, created_at, superseded_by_id, superseded_at, deleted_at";

/// SQLite-backed knowledge store.
pub struct SqliteKnowledgeStore {
    conn: Mutex<Connection>,
}

impl SqliteKnowledgeStore {
    /// Open (or create) a store at the given path.
    pub fn new(path: impl AsRef<Path>) -> TenetResult<Self> {
        if let Some(parent) = path.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Open the store at `config.database_path`.
    pub fn from_config(config: &TenetConfig) -> TenetResult<Self> {
        tracing::debug!(path = %config.database_path.display(), "Opening knowledge store");
        Self::new(&config.database_path)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> TenetResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> TenetResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| TenetError::database("Knowledge store connection lock poisoned"))
    }

    fn init_schema(&self) -> TenetResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS knowledge_items (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                area TEXT,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                confidence REAL NOT NULL,
                source TEXT NOT NULL,
                validated_by_user INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                superseded_by_id TEXT,
                superseded_at TEXT,
                deleted_at TEXT,
                CHECK ((superseded_by_id IS NULL) = (superseded_at IS NULL)),
                CHECK (superseded_by_id IS NULL OR superseded_by_id != id)
            );

            -- Scope lookups for contradiction checks
            CREATE INDEX IF NOT EXISTS idx_knowledge_scope
                ON knowledge_items(owner_id, kind, area);

            -- Supersession history
            CREATE INDEX IF NOT EXISTS idx_knowledge_superseded
                ON knowledge_items(owner_id, superseded_at);
        "#,
        )?;
        Ok(())
    }

    fn fetch(conn: &Connection, owner_id: &str, item_id: &str) -> TenetResult<Option<KnowledgeItem>> {
        let sql = format!(
            "SELECT {} FROM knowledge_items WHERE owner_id = ?1 AND id = ?2",
            COLUMNS
        );
        conn.query_row(&sql, params![owner_id, item_id], RawRow::from_row)
            .optional()?
            .map(RawRow::into_item)
            .transpose()
    }

    fn collect(
        conn: &Connection,
        sql: &str,
        values: Vec<Value>,
    ) -> TenetResult<Vec<KnowledgeItem>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params_from_iter(values), RawRow::from_row)?;
        let items = rows
            .map(|row| row.map_err(TenetError::from).and_then(RawRow::into_item))
            .collect::<TenetResult<Vec<_>>>();
        items
    }
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> TenetResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TenetError::parse(format!("Invalid timestamp '{}': {}", value, e)))
}

fn parse_enum<T: FromStr>(field: &str, value: &str) -> TenetResult<T> {
    T::from_str(value).map_err(|_| TenetError::invalid_enum(field, value))
}

fn limit_value(limit: Option<usize>) -> Value {
    // SQLite treats a negative LIMIT as unbounded
    Value::Integer(limit.map(|l| l as i64).unwrap_or(-1))
}

/// A row as stored, before enum and timestamp parsing.
struct RawRow {
    id: String,
    owner_id: String,
    kind: String,
    area: Option<String>,
    title: String,
    content: String,
    confidence: f64,
    source: String,
    validated_by_user: bool,
    created_at: String,
    superseded_by_id: Option<String>,
    superseded_at: Option<String>,
    deleted_at: Option<String>,
}

impl RawRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            kind: row.get(2)?,
            area: row.get(3)?,
            title: row.get(4)?,
            content: row.get(5)?,
            confidence: row.get(6)?,
            source: row.get(7)?,
            validated_by_user: row.get(8)?,
            created_at: row.get(9)?,
            superseded_by_id: row.get(10)?,
            superseded_at: row.get(11)?,
            deleted_at: row.get(12)?,
        })
    }

    fn into_item(self) -> TenetResult<KnowledgeItem> {
        let supersession = match (self.superseded_by_id, self.superseded_at) {
            (Some(by), Some(at)) => Some(Supersession {
                by,
                at: parse_timestamp(&at)?,
            }),
            (None, None) => None,
            _ => {
                return Err(TenetError::database(format!(
                    "Knowledge item '{}' has a half-set supersession",
                    self.id
                )))
            }
        };

        Ok(KnowledgeItem {
            kind: parse_enum::<KnowledgeKind>("kind", &self.kind)?,
            area: self
                .area
                .as_deref()
                .map(|a| parse_enum::<LifeArea>("area", a))
                .transpose()?,
            source: parse_enum::<KnowledgeSource>("source", &self.source)?,
            created_at: parse_timestamp(&self.created_at)?,
            deleted_at: self.deleted_at.as_deref().map(parse_timestamp).transpose()?,
            id: self.id,
            owner_id: self.owner_id,
            title: self.title,
            content: self.content,
            confidence: self.confidence as f32,
            validated_by_user: self.validated_by_user,
            supersession,
        })
    }
}

#[async_trait]
impl KnowledgeStore for SqliteKnowledgeStore {
    async fn create(&self, item: KnowledgeItem) -> TenetResult<KnowledgeItem> {
        let conn = self.conn()?;
        let kind: &'static str = item.kind.into();
        let area: Option<&'static str> = item.area.map(Into::into);
        let source: &'static str = item.source.into();

        conn.execute(
            r#"INSERT INTO knowledge_items
               (id, owner_id, kind, area, title, content, confidence, source,
                validated_by_user, created_at, superseded_by_id, superseded_at, deleted_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"#,
            params![
                item.id,
                item.owner_id,
                kind,
                area,
                item.title,
                item.content,
                item.confidence as f64,
                source,
                item.validated_by_user,
                timestamp(&item.created_at),
                item.superseded_by_id(),
                item.superseded_at().as_ref().map(timestamp),
                item.deleted_at.as_ref().map(timestamp),
            ],
        )?;
        tracing::debug!(item_id = %item.id, owner_id = %item.owner_id, "Knowledge item stored");
        Ok(item)
    }

    async fn find_by_id(&self, owner_id: &str, item_id: &str) -> TenetResult<Option<KnowledgeItem>> {
        let conn = self.conn()?;
        Self::fetch(&conn, owner_id, item_id)
    }

    async fn find_active_by_scope(
        &self,
        owner_id: &str,
        kind: KnowledgeKind,
        area: Option<LifeArea>,
        limit: Option<usize>,
    ) -> TenetResult<Vec<KnowledgeItem>> {
        let conn = self.conn()?;
        let kind: &'static str = kind.into();
        let area: Option<&'static str> = area.map(Into::into);
        // `IS` so that a NULL area matches only NULL
        let sql = format!(
            r#"SELECT {} FROM knowledge_items
               WHERE owner_id = ?1 AND kind = ?2 AND area IS ?3
                 AND superseded_by_id IS NULL AND deleted_at IS NULL
               ORDER BY created_at DESC, id ASC
               LIMIT ?4"#,
            COLUMNS
        );
        Self::collect(
            &conn,
            &sql,
            vec![
                Value::Text(owner_id.to_string()),
                Value::Text(kind.to_string()),
                area.map(|a| Value::Text(a.to_string())).unwrap_or(Value::Null),
                limit_value(limit),
            ],
        )
    }

    async fn supersede(
        &self,
        owner_id: &str,
        item_id: &str,
        superseded_by_id: &str,
    ) -> TenetResult<Option<KnowledgeItem>> {
        let conn = self.conn()?;
        let changed = conn.execute(
            r#"UPDATE knowledge_items
               SET superseded_by_id = ?3, superseded_at = ?4
               WHERE owner_id = ?1 AND id = ?2
                 AND superseded_by_id IS NULL AND id != ?3"#,
            params![owner_id, item_id, superseded_by_id, timestamp(&Utc::now())],
        )?;

        if changed == 0 {
            return Ok(None);
        }
        Self::fetch(&conn, owner_id, item_id)
    }

    async fn search(&self, owner_id: &str, params: &SearchParams) -> TenetResult<Vec<KnowledgeItem>> {
        let conn = self.conn()?;
        let mut clauses = vec!["owner_id = ?".to_string()];
        let mut values = vec![Value::Text(owner_id.to_string())];

        if !params.include_superseded {
            clauses.push("superseded_by_id IS NULL".to_string());
        }
        if !params.include_deleted {
            clauses.push("deleted_at IS NULL".to_string());
        }
        if let Some(kind) = params.kind {
            let kind: &'static str = kind.into();
            clauses.push("kind = ?".to_string());
            values.push(Value::Text(kind.to_string()));
        }
        if let Some(area) = params.area {
            let area: &'static str = area.into();
            clauses.push("area = ?".to_string());
            values.push(Value::Text(area.to_string()));
        }
        if let Some(source) = params.source {
            let source: &'static str = source.into();
            clauses.push("source = ?".to_string());
            values.push(Value::Text(source.to_string()));
        }
        if let Some(min) = params.min_confidence {
            clauses.push("confidence >= ?".to_string());
            values.push(Value::Real(min as f64));
        }

        let sql = format!(
            "SELECT {} FROM knowledge_items WHERE {} ORDER BY created_at DESC, id ASC LIMIT ? OFFSET ?",
            COLUMNS,
            clauses.join(" AND ")
        );

        // SQLite's lower() only folds ASCII, so text queries are matched
        // here and paged afterwards.
        if params.query.is_none() {
            values.push(limit_value(params.limit));
            values.push(Value::Integer(params.offset as i64));
            return Self::collect(&conn, &sql, values);
        }

        values.push(limit_value(None));
        values.push(Value::Integer(0));
        let items = Self::collect(&conn, &sql, values)?
            .into_iter()
            .filter(|item| params.matches_query(item))
            .skip(params.offset)
            .take(params.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(items)
    }

    async fn find_superseded(
        &self,
        owner_id: &str,
        limit: Option<usize>,
        offset: usize,
    ) -> TenetResult<Vec<KnowledgeItem>> {
        let conn = self.conn()?;
        let sql = format!(
            r#"SELECT {} FROM knowledge_items
               WHERE owner_id = ?1 AND superseded_by_id IS NOT NULL
               ORDER BY superseded_at DESC, id ASC
               LIMIT ?2 OFFSET ?3"#,
            COLUMNS
        );
        Self::collect(
            &conn,
            &sql,
            vec![
                Value::Text(owner_id.to_string()),
                limit_value(limit),
                Value::Integer(offset as i64),
            ],
        )
    }

    async fn soft_delete(&self, owner_id: &str, item_id: &str) -> TenetResult<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            r#"UPDATE knowledge_items SET deleted_at = ?3
               WHERE owner_id = ?1 AND id = ?2 AND deleted_at IS NULL"#,
            params![owner_id, item_id, timestamp(&Utc::now())],
        )?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(id: &str, content: &str) -> KnowledgeItem {
        KnowledgeItem::new("user-1", KnowledgeKind::Fact, content)
            .with_id(id)
            .with_area(LifeArea::Relationships)
    }

    #[tokio::test]
    async fn test_create_and_find_round_trips_fields() {
        let store = SqliteKnowledgeStore::in_memory().unwrap();
        let item = fact("a", "User is single")
            .with_source(KnowledgeSource::UserInput)
            .with_validated_by_user(true)
            .with_confidence(0.75);
        store.create(item.clone()).await.unwrap();

        let found = store.find_by_id("user-1", "a").await.unwrap().unwrap();
        assert_eq!(found.kind, KnowledgeKind::Fact);
        assert_eq!(found.area, Some(LifeArea::Relationships));
        assert_eq!(found.source, KnowledgeSource::UserInput);
        assert!(found.validated_by_user);
        assert!((found.confidence - 0.75).abs() < 1e-6);
        assert_eq!(found.created_at.timestamp_micros(), item.created_at.timestamp_micros());
        assert!(found.is_active());
    }

    #[tokio::test]
    async fn test_find_by_id_is_owner_scoped() {
        let store = SqliteKnowledgeStore::in_memory().unwrap();
        store.create(fact("a", "x")).await.unwrap();
        assert!(store.find_by_id("user-2", "a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_null_area_matches_only_null() {
        let store = SqliteKnowledgeStore::in_memory().unwrap();
        store.create(fact("scoped", "x")).await.unwrap();
        store.create(fact("bare", "y").with_area(None)).await.unwrap();

        let bare = store
            .find_active_by_scope("user-1", KnowledgeKind::Fact, None, None)
            .await
            .unwrap();
        assert_eq!(bare.len(), 1);
        assert_eq!(bare[0].id, "bare");
    }

    #[tokio::test]
    async fn test_supersede_is_conditional() {
        let store = SqliteKnowledgeStore::in_memory().unwrap();
        store.create(fact("old", "single")).await.unwrap();
        store.create(fact("new", "dating")).await.unwrap();

        let updated = store.supersede("user-1", "old", "new").await.unwrap().unwrap();
        assert_eq!(updated.superseded_by_id(), Some("new"));
        assert!(updated.superseded_at().is_some());

        assert!(store.supersede("user-1", "old", "other").await.unwrap().is_none());
        assert!(store.supersede("user-1", "new", "new").await.unwrap().is_none());
        assert!(store.supersede("user-2", "new", "old").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_filters() {
        let store = SqliteKnowledgeStore::in_memory().unwrap();
        store.create(fact("a", "Loves Hiking").with_confidence(0.95)).await.unwrap();
        store.create(fact("b", "Owns a cat").with_confidence(0.4)).await.unwrap();
        store
            .create(
                KnowledgeItem::new("user-1", KnowledgeKind::Preference, "Hiking boots")
                    .with_id("c")
                    .with_area(LifeArea::Health),
            )
            .await
            .unwrap();

        let hits = store
            .search("user-1", &SearchParams::new().query("hiking"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);

        let hits = store
            .search(
                "user-1",
                &SearchParams::new().kind(KnowledgeKind::Fact).min_confidence(0.9),
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a");

        let page = store
            .search("user-1", &SearchParams::new().limit(1).offset(1))
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
    }

    #[tokio::test]
    async fn test_search_query_folds_non_ascii() {
        let store = SqliteKnowledgeStore::in_memory().unwrap();
        store.create(fact("a", "Lives with Élia")).await.unwrap();
        store.create(fact("b", "Visits ÉLIA on Sundays")).await.unwrap();
        store.create(fact("c", "Lives alone")).await.unwrap();

        for query in ["ÉLIA", "élia"] {
            let hits = store
                .search("user-1", &SearchParams::new().query(query))
                .await
                .unwrap();
            assert_eq!(hits.len(), 2, "query {}", query);
        }

        // Paging applies after the text match
        let page = store
            .search("user-1", &SearchParams::new().query("élia").limit(1).offset(1))
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_ne!(page[0].id, "c");
    }

    #[tokio::test]
    async fn test_from_config_opens_database_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = TenetConfig::builder()
            .database_path(dir.path().join("nested").join("knowledge.db"))
            .build();
        let store = SqliteKnowledgeStore::from_config(&config).unwrap();
        store.create(fact("a", "x")).await.unwrap();

        assert!(config.database_path.exists());
        let reopened = SqliteKnowledgeStore::from_config(&config).unwrap();
        assert!(reopened.find_by_id("user-1", "a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_soft_delete_hides_item() {
        let store = SqliteKnowledgeStore::in_memory().unwrap();
        store.create(fact("a", "x")).await.unwrap();
        assert!(store.soft_delete("user-1", "a").await.unwrap());
        assert!(!store.soft_delete("user-1", "a").await.unwrap());
        let active = store
            .find_active_by_scope("user-1", KnowledgeKind::Fact, Some(LifeArea::Relationships), None)
            .await
            .unwrap();
        assert!(active.is_empty());
    }
}
