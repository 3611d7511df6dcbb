//! Address book queries.

use sqlx::SqlitePool;
use tracing::trace;

use crate::contacts::{normalize_number, Contact, ContactNumber, ContactType};
use crate::store::StoreError;

/// Find the first contact owning a number that normalizes to the same digits.
///
/// # Errors
///
/// Returns [`StoreError::Database`] on SQLite failure.
pub async fn find_by_number(db: &SqlitePool, number: &str) -> Result<Option<Contact>, StoreError> {
    let normalized = normalize_number(number);
    if normalized.is_empty() {
        return Ok(None);
    }
    let row: Option<(i64, Option<String>)> = sqlx::query_as(
        "SELECT c.id, c.display_name FROM address_book c \
         JOIN address_book_numbers n ON n.contact_id = c.id \
         WHERE n.normalized = ?1 \
         ORDER BY c.id ASC, n.id ASC LIMIT 1",
    )
    .bind(&normalized)
    .fetch_optional(db)
    .await?;

    match row {
        Some((id, name)) => Ok(Some(materialize(db, id, name.unwrap_or_default()).await?)),
        None => Ok(None),
    }
}

/// Load a visible contact with a name and at least one number.
///
/// # Errors
///
/// Returns [`StoreError::Database`] on SQLite failure.
pub async fn find_by_id(db: &SqlitePool, contact_id: i64) -> Result<Option<Contact>, StoreError> {
    let row: Option<(i64, String)> = sqlx::query_as(
        "SELECT c.id, c.display_name FROM address_book c \
         WHERE c.id = ?1 AND c.visible != 0 \
         AND c.display_name IS NOT NULL AND TRIM(c.display_name) != '' \
         AND EXISTS (SELECT 1 FROM address_book_numbers n WHERE n.contact_id = c.id)",
    )
    .bind(contact_id)
    .fetch_optional(db)
    .await?;

    match row {
        Some((id, name)) => Ok(Some(materialize(db, id, name).await?)),
        None => Ok(None),
    }
}

/// List named, visible contacts with numbers, sorted by name.
///
/// The name filter is a case-insensitive substring match applied after the
/// fetch so it also folds non-ASCII case.
///
/// # Errors
///
/// Returns [`StoreError::Database`] on SQLite failure.
pub async fn list(db: &SqlitePool, filter: Option<&str>) -> Result<Vec<Contact>, StoreError> {
    let rows: Vec<(i64, String)> = sqlx::query_as(
        "SELECT c.id, c.display_name FROM address_book c \
         WHERE c.visible != 0 \
         AND c.display_name IS NOT NULL AND TRIM(c.display_name) != '' \
         AND EXISTS (SELECT 1 FROM address_book_numbers n WHERE n.contact_id = c.id) \
         ORDER BY c.display_name COLLATE NOCASE ASC, c.id ASC",
    )
    .fetch_all(db)
    .await?;

    let needle = filter.map(str::to_lowercase).unwrap_or_default();
    let mut contacts = Vec::new();
    for (id, name) in rows {
        if !name.to_lowercase().contains(&needle) {
            continue;
        }
        contacts.push(materialize(db, id, name).await?);
    }
    Ok(contacts)
}

/// Insert a contact with its numbers. Returns the new contact id.
///
/// # Errors
///
/// Returns [`StoreError::Database`] on SQLite failure.
pub async fn insert(
    db: &SqlitePool,
    name: Option<&str>,
    numbers: &[String],
    visible: bool,
) -> Result<i64, StoreError> {
    let mut tx = db.begin().await?;
    let id = sqlx::query("INSERT INTO address_book (display_name, visible) VALUES (?1, ?2)")
        .bind(name)
        .bind(visible)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

    for number in numbers {
        sqlx::query(
            "INSERT INTO address_book_numbers (contact_id, number, normalized) \
             VALUES (?1, ?2, ?3)",
        )
        .bind(id)
        .bind(number)
        .bind(normalize_number(number))
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    trace!(contact_id = id, numbers = numbers.len(), "address book contact created");
    Ok(id)
}

async fn materialize(db: &SqlitePool, id: i64, name: String) -> Result<Contact, StoreError> {
    let numbers: Vec<(String,)> = sqlx::query_as(
        "SELECT number FROM address_book_numbers WHERE contact_id = ?1 ORDER BY id ASC",
    )
    .bind(id)
    .fetch_all(db)
    .await?;

    Ok(Contact {
        id,
        name,
        contact_type: ContactType::None,
        numbers: numbers
            .iter()
            .enumerate()
            .map(|(position, (number,))| ContactNumber::new(position, number, id))
            .collect(),
    })
}
