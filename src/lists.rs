//! Black and white lists.
//!
//! A list contact owns one or more number patterns, each with a
//! [`MatchMode`]. Patterns and queried numbers are both normalized before
//! comparison, so `+1-555-0100` on a list matches an incoming `+15550100`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{trace, warn};

use crate::contacts::{normalize_number, Contact, ContactNumber, ContactType};
use crate::store::StoreError;

/// How a list number pattern is compared with an incoming number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Whole number must be equal.
    #[default]
    Equals,
    /// Pattern appears anywhere in the number.
    Contains,
    /// Number starts with the pattern.
    StartsWith,
    /// Number ends with the pattern.
    EndsWith,
}

impl MatchMode {
    /// Returns the string representation stored in SQLite.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::Contains => "contains",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
        }
    }

    /// Parse from a SQLite text value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a recognised mode.
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        match s {
            "equals" => Ok(Self::Equals),
            "contains" => Ok(Self::Contains),
            "starts_with" => Ok(Self::StartsWith),
            "ends_with" => Ok(Self::EndsWith),
            other => Err(StoreError::InvalidEnum {
                field: "match_mode",
                value: other.to_owned(),
            }),
        }
    }

    /// Whether the normalized `number` matches the normalized `pattern`.
    pub fn matches(&self, pattern: &str, number: &str) -> bool {
        if pattern.is_empty() {
            return false;
        }
        match self {
            Self::Equals => number == pattern,
            Self::Contains => number.contains(pattern),
            Self::StartsWith => number.starts_with(pattern),
            Self::EndsWith => number.ends_with(pattern),
        }
    }
}

/// Membership queries the admission engine relies on.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Every list contact with a number pattern matching `number`, in
    /// insertion order.
    async fn find_contacts(&self, number: &str) -> Vec<Contact>;

    /// First contact on `list` matching `number`.
    async fn is_member(&self, number: &str, list: ContactType) -> Option<Contact> {
        self.find_contacts(number)
            .await
            .into_iter()
            .find(|c| c.contact_type == list)
    }
}

/// A number pattern when adding a list contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListNumber {
    /// The pattern, normalized on insert.
    pub number: String,
    /// Comparison mode.
    #[serde(default)]
    pub match_mode: MatchMode,
}

/// A list contact together with its patterns' match modes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEntry {
    /// The contact, tagged with its list.
    pub contact: Contact,
    /// Match mode of each number, parallel to `contact.numbers`.
    pub match_modes: Vec<MatchMode>,
}

type ListRow = (i64, String, String, String, String);

/// SQLite-backed black/white lists.
#[derive(Debug, Clone)]
pub struct SqliteListStore {
    db: SqlitePool,
}

impl SqliteListStore {
    /// Store over `db`.
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Add a contact with its number patterns to `list`. Returns the contact id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidEnum`] for [`ContactType::None`], or
    /// [`StoreError::Database`] on SQLite failure.
    pub async fn add_contact(
        &self,
        name: &str,
        list: ContactType,
        numbers: &[ListNumber],
    ) -> Result<i64, StoreError> {
        if list == ContactType::None {
            return Err(StoreError::InvalidEnum {
                field: "list_type",
                value: list.as_str().to_owned(),
            });
        }

        let mut tx = self.db.begin().await?;
        let id = sqlx::query("INSERT INTO list_contacts (name, list_type) VALUES (?1, ?2)")
            .bind(name)
            .bind(list.as_str())
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();
        for entry in numbers {
            sqlx::query(
                "INSERT INTO list_numbers (contact_id, number, match_mode) VALUES (?1, ?2, ?3)",
            )
            .bind(id)
            .bind(normalize_number(&entry.number))
            .bind(entry.match_mode.as_str())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        trace!(contact_id = id, list = list.as_str(), "list contact created");
        Ok(id)
    }

    /// Remove a list contact and its numbers. Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on SQLite failure.
    pub async fn remove_contact(&self, contact_id: i64) -> Result<bool, StoreError> {
        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM list_numbers WHERE contact_id = ?1")
            .bind(contact_id)
            .execute(&mut *tx)
            .await?;
        let removed = sqlx::query("DELETE FROM list_contacts WHERE id = ?1")
            .bind(contact_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(removed > 0)
    }

    /// Contacts on `list`, sorted by name, optionally filtered by a
    /// case-insensitive name substring.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on SQLite failure or
    /// [`StoreError::InvalidEnum`] on a corrupt row.
    pub async fn entries(
        &self,
        list: ContactType,
        filter: Option<&str>,
    ) -> Result<Vec<ListEntry>, StoreError> {
        let rows: Vec<ListRow> = sqlx::query_as(
            "SELECT c.id, c.name, c.list_type, n.number, n.match_mode \
             FROM list_contacts c JOIN list_numbers n ON n.contact_id = c.id \
             WHERE c.list_type = ?1 \
             ORDER BY c.name COLLATE NOCASE ASC, c.id ASC, n.id ASC",
        )
        .bind(list.as_str())
        .fetch_all(&self.db)
        .await?;

        let needle = filter.map(str::to_lowercase).unwrap_or_default();
        let entries = group(rows)?
            .into_iter()
            .filter(|e| e.contact.name.to_lowercase().contains(&needle))
            .collect();
        Ok(entries)
    }

    async fn matching(&self, number: &str) -> Result<Vec<Contact>, StoreError> {
        let rows: Vec<ListRow> = sqlx::query_as(
            "SELECT c.id, c.name, c.list_type, n.number, n.match_mode \
             FROM list_contacts c JOIN list_numbers n ON n.contact_id = c.id \
             ORDER BY c.id ASC, n.id ASC",
        )
        .fetch_all(&self.db)
        .await?;

        let normalized = normalize_number(number);
        let entries = group(rows)?
            .into_iter()
            .filter(|entry| {
                entry
                    .contact
                    .numbers
                    .iter()
                    .zip(&entry.match_modes)
                    .any(|(n, mode)| mode.matches(&n.number, &normalized))
            })
            .map(|entry| entry.contact)
            .collect();
        Ok(entries)
    }
}

#[async_trait]
impl MembershipStore for SqliteListStore {
    async fn find_contacts(&self, number: &str) -> Vec<Contact> {
        match self.matching(number).await {
            Ok(contacts) => contacts,
            Err(e) => {
                warn!(error = %e, "list lookup failed, treating as no match");
                Vec::new()
            }
        }
    }
}

/// Fold joined contact/number rows (ordered by contact) into entries.
fn group(rows: Vec<ListRow>) -> Result<Vec<ListEntry>, StoreError> {
    let mut entries: Vec<ListEntry> = Vec::new();
    for (id, name, list_type, number, match_mode) in rows {
        let mode = MatchMode::parse(&match_mode)?;
        let starts_new = entries.last().map_or(true, |last| last.contact.id != id);
        if starts_new {
            entries.push(ListEntry {
                contact: Contact {
                    id,
                    name,
                    contact_type: ContactType::parse(&list_type)?,
                    numbers: Vec::new(),
                },
                match_modes: Vec::new(),
            });
        }
        let Some(entry) = entries.last_mut() else {
            continue;
        };
        let position = entry.contact.numbers.len();
        entry.contact.numbers.push(ContactNumber {
            position,
            number,
            contact_id: id,
        });
        entry.match_modes.push(mode);
    }
    Ok(entries)
}
