//! Call history listing.
//!
//! The call log keeps one row per call, so the same caller shows up many
//! times. Rows are fetched newest first and collapsed client-side on the
//! `(number, cached name)` pair; the first (newest) row of each pair wins.

use std::collections::HashSet;

use sqlx::SqlitePool;
use tracing::trace;

use crate::contacts::{Contact, ContactNumber, ContactType};
use crate::store::{like_pattern, StoreError};

/// List distinct callers, newest first.
///
/// The filter matches the cached name as a substring. Rows without a
/// cached name are matched on the number instead.
///
/// # Errors
///
/// Returns [`StoreError::Database`] on SQLite failure.
pub async fn list(db: &SqlitePool, filter: Option<&str>) -> Result<Vec<Contact>, StoreError> {
    let pattern = like_pattern(filter.unwrap_or(""));
    let rows: Vec<(i64, String, Option<String>)> = sqlx::query_as(
        "SELECT id, number, cached_name FROM call_log \
         WHERE number IS NOT NULL \
         AND ((cached_name IS NULL AND number LIKE ?1 ESCAPE '\\') \
              OR cached_name LIKE ?1 ESCAPE '\\') \
         ORDER BY date DESC, id DESC",
    )
    .bind(&pattern)
    .fetch_all(db)
    .await?;

    let fetched = rows.len();
    let contacts = dedup(rows);
    trace!(fetched, listed = contacts.len(), "call log collapsed");
    Ok(contacts)
}

/// Collapse raw rows on `(number, cached name)`, keeping order.
fn dedup(rows: Vec<(i64, String, Option<String>)>) -> Vec<Contact> {
    let mut seen: HashSet<(String, Option<String>)> = HashSet::new();
    let mut contacts = Vec::new();
    for (id, number, cached_name) in rows {
        if !seen.insert((number.clone(), cached_name.clone())) {
            continue;
        }
        let numbers = vec![ContactNumber::new(0, &number, id)];
        contacts.push(Contact {
            id,
            name: cached_name.unwrap_or(number),
            contact_type: ContactType::None,
            numbers,
        });
    }
    contacts
}

/// Record a call. Returns the new row id.
///
/// # Errors
///
/// Returns [`StoreError::Database`] on SQLite failure.
pub async fn insert(
    db: &SqlitePool,
    number: Option<&str>,
    cached_name: Option<&str>,
    date: i64,
) -> Result<i64, StoreError> {
    let id = sqlx::query("INSERT INTO call_log (number, cached_name, date) VALUES (?1, ?2, ?3)")
        .bind(number)
        .bind(cached_name)
        .bind(date)
        .execute(db)
        .await?
        .last_insert_rowid();
    Ok(id)
}
