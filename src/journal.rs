//! Journal of blocked calls and messages.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::trace;

use crate::engine::EventKind;
use crate::store::{like_pattern, StoreError};

/// One blocked event as written to the journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalRecord {
    /// Row id; `None` until stored.
    pub id: Option<i64>,
    /// When the block was journaled (ms since epoch).
    pub time: i64,
    /// Call or SMS.
    pub kind: EventKind,
    /// Display name of the caller.
    pub caller: String,
    /// Number, omitted when it would repeat `caller`.
    pub number: Option<String>,
    /// Message body; `None` for calls.
    pub text: Option<String>,
}

impl JournalRecord {
    /// Record for a block of `kind`, journaled at `time`.
    ///
    /// `number` is dropped when equal to `caller`.
    pub fn blocked(
        kind: EventKind,
        time: i64,
        caller: &str,
        number: &str,
        text: Option<String>,
    ) -> Self {
        Self {
            id: None,
            time,
            kind,
            caller: caller.to_owned(),
            number: (number != caller).then(|| number.to_owned()),
            text,
        }
    }
}

/// Append-only view of the journal used while dispatching verdicts.
#[async_trait]
pub trait JournalSink: Send + Sync {
    /// Store `record`, returning its id.
    async fn append(&self, record: &JournalRecord) -> Result<i64, StoreError>;
}

type JournalRow = (i64, i64, String, String, Option<String>, Option<String>);

/// SQLite-backed journal.
#[derive(Debug, Clone)]
pub struct SqliteJournal {
    db: SqlitePool,
}

impl SqliteJournal {
    /// Journal over `db`.
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Journal records, newest first.
    ///
    /// `filter` matches caller, number or text as a case-insensitive
    /// substring.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on SQLite failure or
    /// [`StoreError::InvalidEnum`] on a corrupt row.
    pub async fn records(
        &self,
        limit: Option<u32>,
        filter: Option<&str>,
    ) -> Result<Vec<JournalRecord>, StoreError> {
        let limit = limit.map_or(-1, i64::from);
        let rows: Vec<JournalRow> = match filter {
            Some(filter) => {
                sqlx::query_as(
                    "SELECT id, time, kind, caller, number, text FROM journal \
                     WHERE caller LIKE ?1 ESCAPE '\\' \
                        OR number LIKE ?1 ESCAPE '\\' \
                        OR text LIKE ?1 ESCAPE '\\' \
                     ORDER BY time DESC, id DESC LIMIT ?2",
                )
                .bind(like_pattern(filter))
                .bind(limit)
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT id, time, kind, caller, number, text FROM journal \
                     ORDER BY time DESC, id DESC LIMIT ?1",
                )
                .bind(limit)
                .fetch_all(&self.db)
                .await?
            }
        };

        rows.into_iter()
            .map(|(id, time, kind, caller, number, text)| {
                Ok(JournalRecord {
                    id: Some(id),
                    time,
                    kind: EventKind::parse(&kind)?,
                    caller,
                    number,
                    text,
                })
            })
            .collect()
    }

    /// Delete one record. Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on SQLite failure.
    pub async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let removed = sqlx::query("DELETE FROM journal WHERE id = ?1")
            .bind(id)
            .execute(&self.db)
            .await?
            .rows_affected();
        Ok(removed > 0)
    }

    /// Delete every record. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on SQLite failure.
    pub async fn clear(&self) -> Result<u64, StoreError> {
        let removed = sqlx::query("DELETE FROM journal")
            .execute(&self.db)
            .await?
            .rows_affected();
        Ok(removed)
    }
}

#[async_trait]
impl JournalSink for SqliteJournal {
    async fn append(&self, record: &JournalRecord) -> Result<i64, StoreError> {
        let id = sqlx::query(
            "INSERT INTO journal (time, kind, caller, number, text) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(record.time)
        .bind(record.kind.as_str())
        .bind(&record.caller)
        .bind(record.number.as_deref())
        .bind(record.text.as_deref())
        .execute(&self.db)
        .await?
        .last_insert_rowid();

        trace!(id, kind = record.kind.as_str(), "journal record appended");
        Ok(id)
    }
}
