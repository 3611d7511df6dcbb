//! Bulk import of device data from a JSON snapshot.
//!
//! A snapshot seeds the address book, call history, message store and
//! black/white lists in one transaction-per-section pass. Sections are
//! optional; an empty object imports nothing.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

use crate::contacts::ContactType;
use crate::directory::sms::NewSms;
use crate::directory::{address_book, call_log, sms};
use crate::lists::{ListNumber, SqliteListStore};
use crate::store::StoreError;

/// An address-book entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotContact {
    /// Display name; may be absent.
    #[serde(default)]
    pub name: Option<String>,
    /// Raw phone numbers.
    #[serde(default)]
    pub numbers: Vec<String>,
    /// Whether the contact is visible in the address book.
    #[serde(default = "default_visible")]
    pub visible: bool,
}

/// A call-history row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotCall {
    /// Caller number.
    #[serde(default)]
    pub number: Option<String>,
    /// Name cached at call time.
    #[serde(default)]
    pub cached_name: Option<String>,
    /// Call time (ms since epoch).
    pub date: i64,
}

/// A black- or white-list contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotListContact {
    /// Contact name.
    pub name: String,
    /// `black` or `white`.
    pub list: ContactType,
    /// Number patterns.
    #[serde(default)]
    pub numbers: Vec<ListNumber>,
}

/// Everything a snapshot can carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    /// Address-book entries.
    pub contacts: Vec<SnapshotContact>,
    /// Call history.
    pub calls: Vec<SnapshotCall>,
    /// Stored messages.
    pub messages: Vec<NewSms>,
    /// Black/white list contacts.
    pub lists: Vec<SnapshotListContact>,
}

/// Row counts written by [`import`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Address-book contacts.
    pub contacts: usize,
    /// Call-log rows.
    pub calls: usize,
    /// Messages.
    pub messages: usize,
    /// List contacts.
    pub lists: usize,
}

fn default_visible() -> bool {
    true
}

impl Snapshot {
    /// Read a snapshot from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot at {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse snapshot at {}", path.display()))
    }
}

/// Write every section of `snapshot` into `db`.
///
/// # Errors
///
/// Returns [`StoreError`] on the first failing insert; rows already written
/// by earlier sections stay in place.
pub async fn import(db: &SqlitePool, snapshot: &Snapshot) -> Result<ImportSummary, StoreError> {
    let mut summary = ImportSummary::default();

    for contact in &snapshot.contacts {
        address_book::insert(db, contact.name.as_deref(), &contact.numbers, contact.visible)
            .await?;
        summary.contacts = summary.contacts.saturating_add(1);
    }

    for call in &snapshot.calls {
        call_log::insert(db, call.number.as_deref(), call.cached_name.as_deref(), call.date)
            .await?;
        summary.calls = summary.calls.saturating_add(1);
    }

    for message in &snapshot.messages {
        sms::insert(db, message).await?;
        summary.messages = summary.messages.saturating_add(1);
    }

    let lists = SqliteListStore::new(db.clone());
    for entry in &snapshot.lists {
        lists.add_contact(&entry.name, entry.list, &entry.numbers).await?;
        summary.lists = summary.lists.saturating_add(1);
    }

    info!(
        contacts = summary.contacts,
        calls = summary.calls,
        messages = summary.messages,
        lists = summary.lists,
        "snapshot imported"
    );
    Ok(summary)
}
