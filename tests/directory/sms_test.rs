//! SMS store operations: threads, records and inbox writes.

use callscreen::config::Permissions;
use callscreen::directory::sms::{NewSms, RecordOrder};
use callscreen::directory::{address_book, sms, ContactDirectory, ContactSource};
use callscreen::store::Store;

async fn store() -> Store {
    Store::open_in_memory()
        .await
        .expect("in-memory store should open")
}

fn message(address: &str, date: i64, kind: i64, read: bool) -> NewSms {
    NewSms {
        address: address.to_owned(),
        person: None,
        body: Some(format!("at {date}")),
        date,
        date_sent: None,
        kind,
        read,
    }
}

async fn insert(store: &Store, sms: NewSms) -> i64 {
    sms::insert(store.pool(), &sms)
        .await
        .expect("sms should insert")
}

async fn thread_of(store: &Store, id: i64) -> i64 {
    let (thread,): (i64,) = sqlx::query_as("SELECT thread_id FROM sms WHERE id = ?1")
        .bind(id)
        .fetch_one(store.pool())
        .await
        .expect("thread lookup should succeed");
    thread
}

#[tokio::test]
async fn messages_from_one_address_share_a_thread() {
    let store = store().await;
    let a = insert(&store, message("111", 100, 1, false)).await;
    let b = insert(&store, message("222", 200, 1, false)).await;
    let c = insert(&store, message("111", 300, 2, true)).await;

    assert_eq!(thread_of(&store, a).await, thread_of(&store, c).await);
    assert_ne!(thread_of(&store, a).await, thread_of(&store, b).await);
}

#[tokio::test]
async fn conversations_summarize_newest_message_and_unread() {
    let store = store().await;
    let alice = address_book::insert(store.pool(), Some("Alice"), &["111".to_owned()], true)
        .await
        .expect("contact should insert");
    insert(&store, message("111", 100, 1, false)).await;
    insert(&store, message("111", 300, 1, false)).await;
    insert(&store, message("222", 200, 1, true)).await;
    let directory = ContactDirectory::new(store.pool().clone(), Permissions::all());

    let conversations = directory.conversations().await;
    assert_eq!(conversations.len(), 2);
    assert_eq!(conversations[0].address, "Alice");
    assert_eq!(conversations[0].snippet.as_deref(), Some("at 300"));
    assert_eq!(conversations[0].unread, 2);
    assert_eq!(conversations[1].address, "222");
    assert_eq!(conversations[1].unread, 0);
    assert!(alice > 0);
}

#[tokio::test]
async fn records_respect_order_and_limit() {
    let store = store().await;
    let first = insert(&store, message("111", 100, 1, false)).await;
    insert(&store, message("111", 200, 2, true)).await;
    insert(&store, message("111", 300, 1, false)).await;
    let thread = thread_of(&store, first).await;
    let directory = ContactDirectory::new(store.pool().clone(), Permissions::all());

    let newest = directory
        .records_by_thread(thread, RecordOrder::NewestFirst, Some(2))
        .await;
    let dates: Vec<i64> = newest.iter().map(|r| r.date).collect();
    assert_eq!(dates, [300, 200]);

    let oldest = directory
        .records_by_thread(thread, RecordOrder::OldestFirst, None)
        .await;
    let dates: Vec<i64> = oldest.iter().map(|r| r.date).collect();
    assert_eq!(dates, [100, 200, 300]);
    assert_eq!(oldest[1].kind, 2);
}

#[tokio::test]
async fn records_need_contacts_access_too() {
    let store = store().await;
    let first = insert(&store, message("111", 100, 1, false)).await;
    let thread = thread_of(&store, first).await;
    let permissions = Permissions {
        read_contacts: false,
        ..Permissions::all()
    };
    let directory = ContactDirectory::new(store.pool().clone(), permissions);

    assert!(directory
        .records_by_thread(thread, RecordOrder::NewestFirst, None)
        .await
        .is_empty());
}

#[tokio::test]
async fn mark_read_seen_and_delete() {
    let store = store().await;
    let first = insert(&store, message("111", 100, 1, false)).await;
    insert(&store, message("111", 200, 1, false)).await;
    let thread = thread_of(&store, first).await;
    let directory = ContactDirectory::new(store.pool().clone(), Permissions::all());

    assert_eq!(directory.unread_count(thread).await, 2);
    assert!(directory.mark_thread_read(thread).await);
    assert_eq!(directory.unread_count(thread).await, 0);

    assert!(directory.mark_all_seen().await);
    let (unseen,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sms WHERE seen = 0")
        .fetch_one(store.pool())
        .await
        .expect("count should succeed");
    assert_eq!(unseen, 0);

    assert!(directory.delete_thread(thread).await);
    assert!(!directory.delete_thread(thread).await);
    assert!(directory.conversations().await.is_empty());
}

#[tokio::test]
async fn writes_need_write_access() {
    let store = store().await;
    let permissions = Permissions {
        write_sms: false,
        ..Permissions::all()
    };
    let directory = ContactDirectory::new(store.pool().clone(), permissions);

    assert!(!directory.write_to_inbox("5550199", "hello", 10).await);
    assert!(!directory.mark_all_seen().await);
    assert!(!directory.contains_number_in_inbox("5550199").await);
}

#[tokio::test]
async fn inbox_write_links_known_contact() {
    let store = store().await;
    let alice = address_book::insert(store.pool(), Some("Alice"), &["555-0100".to_owned()], true)
        .await
        .expect("contact should insert");
    let directory = ContactDirectory::new(store.pool().clone(), Permissions::all());

    assert!(directory.write_to_inbox("5550100", "hello", 10).await);

    let (person, date_sent, kind, read): (Option<i64>, Option<i64>, i64, bool) =
        sqlx::query_as("SELECT person, date_sent, type, read FROM sms WHERE address = '5550100'")
            .fetch_one(store.pool())
            .await
            .expect("row should exist");
    assert_eq!(person, Some(alice));
    assert_eq!(date_sent, Some(10));
    assert_eq!(kind, 1);
    assert!(!read);

    let senders = directory
        .list_contacts(ContactSource::SmsInbox, None)
        .await
        .into_rows();
    assert_eq!(senders[0].name, "Alice");
}
