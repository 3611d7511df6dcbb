//! Address-book lookups and listing.

use callscreen::config::Permissions;
use callscreen::directory::{address_book, ContactDirectory, ContactSource};
use callscreen::store::Store;

async fn directory() -> (Store, ContactDirectory) {
    let store = Store::open_in_memory()
        .await
        .expect("in-memory store should open");
    let directory = ContactDirectory::new(store.pool().clone(), Permissions::all());
    (store, directory)
}

async fn add(store: &Store, name: Option<&str>, numbers: &[&str], visible: bool) -> i64 {
    let numbers: Vec<String> = numbers.iter().map(|n| (*n).to_owned()).collect();
    address_book::insert(store.pool(), name, &numbers, visible)
        .await
        .expect("contact should insert")
}

#[tokio::test]
async fn resolve_by_number_matches_normalized_digits() {
    let (store, directory) = directory().await;
    let id = add(&store, Some("Alice"), &["+1 (555) 010-0"], true).await;

    let contact = directory
        .resolve_by_number("+1-555-0100")
        .await
        .expect("contact should resolve");
    assert_eq!(contact.id, id);
    assert_eq!(contact.name, "Alice");
    assert_eq!(contact.numbers[0].number, "+15550100");
    assert_eq!(contact.numbers[0].contact_id, id);
}

#[tokio::test]
async fn resolve_by_number_returns_first_contact() {
    let (store, directory) = directory().await;
    let first = add(&store, Some("Alice"), &["5550100"], true).await;
    add(&store, Some("Alice (work)"), &["555-0100"], true).await;

    let contact = directory
        .resolve_by_number("5550100")
        .await
        .expect("contact should resolve");
    assert_eq!(contact.id, first);
}

#[tokio::test]
async fn unknown_number_resolves_to_none() {
    let (store, directory) = directory().await;
    add(&store, Some("Alice"), &["5550100"], true).await;

    assert!(directory.resolve_by_number("5550199").await.is_none());
    assert!(directory.resolve_by_number("").await.is_none());
}

#[tokio::test]
async fn resolve_by_id_requires_visible_named_contact_with_numbers() {
    let (store, directory) = directory().await;
    let ok = add(&store, Some("Bob"), &["999"], true).await;
    let hidden = add(&store, Some("Carol"), &["998"], false).await;
    let nameless = add(&store, None, &["997"], true).await;
    let blank = add(&store, Some("   "), &["996"], true).await;
    let no_numbers = add(&store, Some("Dave"), &[], true).await;

    assert_eq!(
        directory.resolve_by_id(ok).await.map(|c| c.name),
        Some("Bob".to_owned())
    );
    for id in [hidden, nameless, blank, no_numbers, 4242] {
        assert!(directory.resolve_by_id(id).await.is_none(), "id {id}");
    }
}

#[tokio::test]
async fn listing_is_sorted_and_filtered_by_name() {
    let (store, directory) = directory().await;
    add(&store, Some("charlie"), &["3"], true).await;
    add(&store, Some("Alice"), &["1"], true).await;
    add(&store, Some("Bob"), &["2", "22"], true).await;
    add(&store, Some("Zed"), &["4"], false).await;

    let names: Vec<String> = directory
        .list_contacts(ContactSource::Directory, None)
        .await
        .map(|c| c.name)
        .collect();
    assert_eq!(names, ["Alice", "Bob", "charlie"]);

    let filtered = directory
        .list_contacts(ContactSource::Directory, Some("LI"))
        .await
        .into_rows();
    let names: Vec<&str> = filtered.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["Alice", "charlie"]);

    let bob = directory
        .list_contacts(ContactSource::Directory, Some("bob"))
        .await
        .into_rows();
    assert_eq!(bob[0].numbers.len(), 2);
    assert_eq!(bob[0].numbers[1].position, 1);
}

#[tokio::test]
async fn cursor_can_be_rewound() {
    let (store, directory) = directory().await;
    add(&store, Some("Alice"), &["1"], true).await;
    add(&store, Some("Bob"), &["2"], true).await;

    let mut cursor = directory.list_contacts(ContactSource::Directory, None).await;
    assert_eq!(cursor.len(), 2);
    assert_eq!(cursor.next().map(|c| c.name), Some("Alice".to_owned()));
    assert_eq!(cursor.position(), 1);
    assert_eq!(cursor.by_ref().count(), 1);
    assert!(cursor.next().is_none());

    cursor.rewind();
    assert_eq!(cursor.next().map(|c| c.name), Some("Alice".to_owned()));
}
