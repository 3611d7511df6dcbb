//! SMS store: conversations, thread records and inbox writes.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::trace;

use super::address_book;
use super::sms_inbox::TYPE_INBOX;
use crate::store::StoreError;

/// Summary of one message thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsConversation {
    /// Thread identifier.
    pub thread_id: i64,
    /// Date of the newest message (ms since epoch).
    pub date: i64,
    /// Contact name of the newest message's sender, or its address.
    pub address: String,
    /// Body of the newest message.
    pub snippet: Option<String>,
    /// Unread received messages in the thread.
    pub unread: i64,
}

/// One stored message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsRecord {
    /// Row id.
    pub id: i64,
    /// Store type (1 = inbox, 2 = sent).
    pub kind: i64,
    /// Date stored (ms since epoch).
    pub date: i64,
    /// Resolved contact name, or the raw address.
    pub address: String,
    /// Message text.
    pub body: Option<String>,
}

/// Ordering of records within a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordOrder {
    /// Newest first.
    #[default]
    NewestFirst,
    /// Oldest first.
    OldestFirst,
}

/// Raw row shape shared by the record queries.
type SmsRow = (i64, i64, i64, Option<String>, Option<i64>, Option<String>);

/// Records in a thread, optionally limited.
///
/// The address of each record is replaced by the linked contact's name,
/// or by the name of the address-book contact owning the address.
///
/// # Errors
///
/// Returns [`StoreError::Database`] on SQLite failure.
pub async fn records_by_thread(
    db: &SqlitePool,
    thread_id: i64,
    order: RecordOrder,
    limit: Option<u32>,
) -> Result<Vec<SmsRecord>, StoreError> {
    let sql = match order {
        RecordOrder::NewestFirst => {
            "SELECT id, type, date, address, person, body FROM sms \
             WHERE thread_id = ?1 ORDER BY date DESC, id DESC LIMIT ?2"
        }
        RecordOrder::OldestFirst => {
            "SELECT id, type, date, address, person, body FROM sms \
             WHERE thread_id = ?1 ORDER BY date ASC, id ASC LIMIT ?2"
        }
    };
    // SQLite treats a negative LIMIT as unbounded.
    let limit = limit.map_or(-1, i64::from);
    let rows: Vec<SmsRow> = sqlx::query_as(sql)
        .bind(thread_id)
        .bind(limit)
        .fetch_all(db)
        .await?;

    let mut records = Vec::with_capacity(rows.len());
    for (id, kind, date, address, person, body) in rows {
        let address = address.unwrap_or_default();
        let contact = match person {
            Some(person) => address_book::find_by_id(db, person).await?,
            None => address_book::find_by_number(db, &address).await?,
        };
        let address = contact
            .and_then(|c| c.display_name().map(str::to_owned))
            .unwrap_or(address);
        records.push(SmsRecord {
            id,
            kind,
            date,
            address,
            body,
        });
    }
    Ok(records)
}

/// Number of unread received messages in a thread.
///
/// # Errors
///
/// Returns [`StoreError::Database`] on SQLite failure.
pub async fn unread_count(db: &SqlitePool, thread_id: i64) -> Result<i64, StoreError> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM sms WHERE type = ?1 AND thread_id = ?2 AND read = 0",
    )
    .bind(TYPE_INBOX)
    .bind(thread_id)
    .fetch_one(db)
    .await?;
    Ok(count)
}

/// All threads, newest first.
///
/// # Errors
///
/// Returns [`StoreError::Database`] on SQLite failure.
pub async fn conversations(db: &SqlitePool) -> Result<Vec<SmsConversation>, StoreError> {
    let threads: Vec<(i64, i64)> = sqlx::query_as(
        "SELECT thread_id, MAX(date) AS last FROM sms \
         GROUP BY thread_id ORDER BY last DESC, thread_id DESC",
    )
    .fetch_all(db)
    .await?;

    let mut conversations = Vec::with_capacity(threads.len());
    for (thread_id, _) in threads {
        let newest = records_by_thread(db, thread_id, RecordOrder::NewestFirst, Some(1)).await?;
        let Some(record) = newest.into_iter().next() else {
            continue;
        };
        conversations.push(SmsConversation {
            thread_id,
            date: record.date,
            address: record.address,
            snippet: record.body,
            unread: unread_count(db, thread_id).await?,
        });
    }
    Ok(conversations)
}

/// Mark every received message in a thread as read.
///
/// # Errors
///
/// Returns [`StoreError::Database`] on SQLite failure.
pub async fn mark_thread_read(db: &SqlitePool, thread_id: i64) -> Result<u64, StoreError> {
    let result =
        sqlx::query("UPDATE sms SET read = 1 WHERE type = ?1 AND thread_id = ?2 AND read = 0")
            .bind(TYPE_INBOX)
            .bind(thread_id)
            .execute(db)
            .await?;
    Ok(result.rows_affected())
}

/// Mark every received message as seen.
///
/// # Errors
///
/// Returns [`StoreError::Database`] on SQLite failure.
pub async fn mark_all_seen(db: &SqlitePool) -> Result<u64, StoreError> {
    let result = sqlx::query("UPDATE sms SET seen = 1 WHERE type = ?1 AND seen = 0")
        .bind(TYPE_INBOX)
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}

/// Delete a whole thread. Returns the number of removed messages.
///
/// # Errors
///
/// Returns [`StoreError::Database`] on SQLite failure.
pub async fn delete_thread(db: &SqlitePool, thread_id: i64) -> Result<u64, StoreError> {
    let result = sqlx::query("DELETE FROM sms WHERE thread_id = ?1")
        .bind(thread_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}

/// A message to be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSms {
    /// Sender or recipient address.
    pub address: String,
    /// Linked address-book contact.
    #[serde(default)]
    pub person: Option<i64>,
    /// Message text.
    #[serde(default)]
    pub body: Option<String>,
    /// Date stored (ms since epoch).
    pub date: i64,
    /// Date sent by the originator (ms since epoch).
    #[serde(default)]
    pub date_sent: Option<i64>,
    /// Store type (1 = inbox, 2 = sent).
    #[serde(default = "default_kind")]
    pub kind: i64,
    /// Already read.
    #[serde(default)]
    pub read: bool,
}

fn default_kind() -> i64 {
    TYPE_INBOX
}

/// Store a message, joining the address's existing thread or opening a new one.
/// Returns the new row id.
///
/// # Errors
///
/// Returns [`StoreError::Database`] on SQLite failure.
pub async fn insert(db: &SqlitePool, sms: &NewSms) -> Result<i64, StoreError> {
    let mut tx = db.begin().await?;

    let existing: Option<(i64,)> =
        sqlx::query_as("SELECT thread_id FROM sms WHERE address = ?1 LIMIT 1")
            .bind(&sms.address)
            .fetch_optional(&mut *tx)
            .await?;
    let thread_id = match existing {
        Some((thread_id,)) => thread_id,
        None => {
            let (next,): (i64,) =
                sqlx::query_as("SELECT COALESCE(MAX(thread_id), 0) + 1 FROM sms")
                    .fetch_one(&mut *tx)
                    .await?;
            next
        }
    };

    let id = sqlx::query(
        "INSERT INTO sms (thread_id, address, person, date, date_sent, body, type, read, seen) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
    )
    .bind(thread_id)
    .bind(&sms.address)
    .bind(sms.person)
    .bind(sms.date)
    .bind(sms.date_sent)
    .bind(&sms.body)
    .bind(sms.kind)
    .bind(sms.read)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();
    tx.commit().await?;

    trace!(sms_id = id, thread_id, "sms stored");
    Ok(id)
}
