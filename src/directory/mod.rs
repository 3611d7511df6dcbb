//! Contact directory: lookups and listings over the address book, the call
//! log and the SMS inbox.
//!
//! Every operation fails soft. A source the process is not authorized to
//! read, or a storage error, yields an absent or empty result and a `warn`
//! log line; callers never see an error from a lookup.

pub mod address_book;
pub mod call_log;
pub mod sms;
pub mod sms_inbox;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, warn};

use self::sms::{NewSms, RecordOrder, SmsConversation, SmsRecord};
use crate::config::{Permission, Permissions};
use crate::contacts::Contact;
use crate::store::StoreError;

/// Where a listing draws its contacts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactSource {
    /// The address book.
    Directory,
    /// Call history.
    CallLog,
    /// Received messages.
    SmsInbox,
}

impl ContactSource {
    /// Permission needed to list this source.
    pub fn required_permission(&self) -> Permission {
        match self {
            Self::Directory => Permission::ReadContacts,
            Self::CallLog => Permission::ReadCallLog,
            Self::SmsInbox => Permission::ReadSms,
        }
    }
}

/// A finite, restartable sequence of listed contacts.
///
/// Rows are fully materialized before the cursor is handed out, so the
/// underlying connection is already back in the pool; dropping the cursor
/// releases nothing else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactCursor {
    rows: Vec<Contact>,
    position: usize,
}

impl ContactCursor {
    /// Cursor over `rows`, positioned before the first row.
    pub fn new(rows: Vec<Contact>) -> Self {
        Self { rows, position: 0 }
    }

    /// Cursor with no rows (unavailable source or no matches).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Total number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the cursor has no rows at all.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the next row to be returned.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Move back before the first row.
    pub fn rewind(&mut self) {
        self.position = 0;
    }

    /// All rows, regardless of position.
    pub fn rows(&self) -> &[Contact] {
        &self.rows
    }

    /// Consume the cursor, returning every row.
    pub fn into_rows(self) -> Vec<Contact> {
        self.rows
    }
}

impl Iterator for ContactCursor {
    type Item = Contact;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.get(self.position)?.clone();
        self.position = self.position.saturating_add(1);
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.rows.len().saturating_sub(self.position);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ContactCursor {}

/// The two directory questions the admission engine asks.
#[async_trait]
pub trait ContactLookup: Send + Sync {
    /// Address-book contact owning `number`, if any.
    async fn resolve_by_number(&self, number: &str) -> Option<Contact>;

    /// Whether `number` has sent at least one message to the inbox.
    async fn contains_number_in_inbox(&self, number: &str) -> bool;
}

/// Delivery of an allowed message into the inbox.
#[async_trait]
pub trait InboxWriter: Send + Sync {
    /// Store a received message. Returns `false` if it was not written.
    async fn write_to_inbox(&self, address: &str, body: &str, sent_at_ms: i64) -> bool;
}

/// Directory service over the SQLite-backed sources.
///
/// Constructed once by the composition root and shared by reference.
#[derive(Debug, Clone)]
pub struct ContactDirectory {
    db: SqlitePool,
    permissions: Permissions,
}

impl ContactDirectory {
    /// Directory over `db`, honouring `permissions`.
    pub fn new(db: SqlitePool, permissions: Permissions) -> Self {
        Self { db, permissions }
    }

    /// Permissions this directory was built with.
    pub fn permissions(&self) -> Permissions {
        self.permissions
    }

    fn granted(&self, permission: Permission, op: &'static str) -> bool {
        let granted = self.permissions.is_granted(permission);
        if !granted {
            debug!(op, permission = permission.as_str(), "source unavailable");
        }
        granted
    }

    /// Address-book contact owning `number`, matched on normalized digits.
    pub async fn resolve_by_number(&self, number: &str) -> Option<Contact> {
        if !self.granted(Permission::ReadContacts, "resolve_by_number") {
            return None;
        }
        soften(
            "resolve_by_number",
            address_book::find_by_number(&self.db, number).await,
        )
    }

    /// Visible address-book contact by id.
    pub async fn resolve_by_id(&self, id: i64) -> Option<Contact> {
        if !self.granted(Permission::ReadContacts, "resolve_by_id") {
            return None;
        }
        soften("resolve_by_id", address_book::find_by_id(&self.db, id).await)
    }

    /// List contacts from `source`, optionally filtered.
    pub async fn list_contacts(&self, source: ContactSource, filter: Option<&str>) -> ContactCursor {
        if !self.granted(source.required_permission(), "list_contacts") {
            return ContactCursor::empty();
        }
        let rows = match source {
            ContactSource::Directory => address_book::list(&self.db, filter).await,
            ContactSource::CallLog => call_log::list(&self.db, filter).await,
            ContactSource::SmsInbox => {
                let resolve_names = self.permissions.is_granted(Permission::ReadContacts);
                sms_inbox::list(&self.db, filter, resolve_names).await
            }
        };
        ContactCursor::new(soften("list_contacts", rows))
    }

    /// Whether `number` appears as the address of a received message.
    pub async fn contains_number_in_inbox(&self, number: &str) -> bool {
        if !self.granted(Permission::ReadSms, "contains_number_in_inbox") {
            return false;
        }
        soften(
            "contains_number_in_inbox",
            sms_inbox::contains_address(&self.db, number).await,
        )
    }

    /// Message threads, newest first.
    pub async fn conversations(&self) -> Vec<SmsConversation> {
        if !self.granted(Permission::ReadSms, "conversations") {
            return Vec::new();
        }
        soften("conversations", sms::conversations(&self.db).await)
    }

    /// Records of one thread. Needs both SMS and contacts read access.
    pub async fn records_by_thread(
        &self,
        thread_id: i64,
        order: RecordOrder,
        limit: Option<u32>,
    ) -> Vec<SmsRecord> {
        if !self.granted(Permission::ReadSms, "records_by_thread")
            || !self.granted(Permission::ReadContacts, "records_by_thread")
        {
            return Vec::new();
        }
        soften(
            "records_by_thread",
            sms::records_by_thread(&self.db, thread_id, order, limit).await,
        )
    }

    /// Unread received messages in a thread.
    pub async fn unread_count(&self, thread_id: i64) -> i64 {
        if !self.granted(Permission::ReadSms, "unread_count") {
            return 0;
        }
        soften("unread_count", sms::unread_count(&self.db, thread_id).await)
    }

    /// Mark a thread read. Returns `false` without write access.
    pub async fn mark_thread_read(&self, thread_id: i64) -> bool {
        if !self.granted(Permission::WriteSms, "mark_thread_read") {
            return false;
        }
        succeeded(
            "mark_thread_read",
            sms::mark_thread_read(&self.db, thread_id).await,
        )
    }

    /// Mark every received message seen. Returns `false` without write access.
    pub async fn mark_all_seen(&self) -> bool {
        if !self.granted(Permission::WriteSms, "mark_all_seen") {
            return false;
        }
        succeeded("mark_all_seen", sms::mark_all_seen(&self.db).await)
    }

    /// Delete a thread. Returns `true` if any message was removed.
    pub async fn delete_thread(&self, thread_id: i64) -> bool {
        if !self.granted(Permission::WriteSms, "delete_thread") {
            return false;
        }
        soften("delete_thread", sms::delete_thread(&self.db, thread_id).await) > 0
    }

    /// Store an allowed message in the inbox, linked to the address-book
    /// contact owning `address` when one is readable.
    ///
    /// Returns `false` without write access or on storage failure.
    pub async fn write_to_inbox(&self, address: &str, body: &str, sent_at_ms: i64) -> bool {
        if !self.granted(Permission::WriteSms, "write_to_inbox") {
            return false;
        }
        let person = self.resolve_by_number(address).await.map(|c| c.id);
        let sms = NewSms {
            address: address.to_owned(),
            person,
            body: Some(body.to_owned()),
            date: chrono::Utc::now().timestamp_millis(),
            date_sent: Some(sent_at_ms),
            kind: sms_inbox::TYPE_INBOX,
            read: false,
        };
        succeeded("write_to_inbox", sms::insert(&self.db, &sms).await)
    }
}

#[async_trait]
impl ContactLookup for ContactDirectory {
    async fn resolve_by_number(&self, number: &str) -> Option<Contact> {
        ContactDirectory::resolve_by_number(self, number).await
    }

    async fn contains_number_in_inbox(&self, number: &str) -> bool {
        ContactDirectory::contains_number_in_inbox(self, number).await
    }
}

#[async_trait]
impl InboxWriter for ContactDirectory {
    async fn write_to_inbox(&self, address: &str, body: &str, sent_at_ms: i64) -> bool {
        ContactDirectory::write_to_inbox(self, address, body, sent_at_ms).await
    }
}

/// Collapse a storage error into the empty value, logging it.
fn soften<T: Default>(op: &'static str, result: Result<T, StoreError>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(op, error = %e, "directory lookup failed, treating as unavailable");
            T::default()
        }
    }
}

fn succeeded<T>(op: &'static str, result: Result<T, StoreError>) -> bool {
    match result {
        Ok(_) => true,
        Err(e) => {
            warn!(op, error = %e, "directory write failed");
            false
        }
    }
}
