//! Listing senders from the SMS inbox.
//!
//! The store cannot express "distinct sender" together with "filter by the
//! linked contact's name", so this runs in two passes: fetch every inbox row
//! newest first, then collapse on address, resolve linked contacts and filter
//! on the resolved name.

use std::collections::HashSet;

use sqlx::SqlitePool;
use tracing::trace;

use super::address_book;
use crate::contacts::{Contact, ContactNumber, ContactType};
use crate::store::StoreError;

/// `sms.type` value for received messages.
pub const TYPE_INBOX: i64 = 1;

/// List distinct inbox senders, newest first.
///
/// When a row links to an address-book contact and `resolve_names` is set,
/// the contact's name becomes the row name and the filter is matched
/// against it. Otherwise the address is the name and the filter matches the
/// address.
///
/// # Errors
///
/// Returns [`StoreError::Database`] on SQLite failure.
pub async fn list(
    db: &SqlitePool,
    filter: Option<&str>,
    resolve_names: bool,
) -> Result<Vec<Contact>, StoreError> {
    let rows: Vec<(i64, String, Option<i64>)> = sqlx::query_as(
        "SELECT id, address, person FROM sms \
         WHERE type = ?1 AND address IS NOT NULL \
         ORDER BY date DESC, id DESC",
    )
    .bind(TYPE_INBOX)
    .fetch_all(db)
    .await?;

    let needle = filter.map(str::to_lowercase).unwrap_or_default();
    let mut seen: HashSet<String> = HashSet::new();
    let mut contacts = Vec::new();
    for (id, address, person) in rows {
        if !seen.insert(address.clone()) {
            continue;
        }

        let mut name = address.clone();
        if let Some(person) = person.filter(|_| resolve_names) {
            if let Some(contact) = address_book::find_by_id(db, person).await? {
                name = contact.name;
            }
        }
        if !name.to_lowercase().contains(&needle) {
            continue;
        }

        contacts.push(Contact {
            id,
            name,
            contact_type: ContactType::None,
            numbers: vec![ContactNumber::new(0, &address, id)],
        });
    }

    trace!(distinct = seen.len(), listed = contacts.len(), "sms inbox senders collapsed");
    Ok(contacts)
}

/// Whether any received message came from exactly `address`.
///
/// # Errors
///
/// Returns [`StoreError::Database`] on SQLite failure.
pub async fn contains_address(db: &SqlitePool, address: &str) -> Result<bool, StoreError> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM sms WHERE type = ?1 AND address = ?2 LIMIT 1")
            .bind(TYPE_INBOX)
            .bind(address)
            .fetch_optional(db)
            .await?;
    Ok(row.is_some())
}
