//! Black/white list storage and membership.

use callscreen::contacts::ContactType;
use callscreen::lists::{ListNumber, MatchMode, MembershipStore, SqliteListStore};
use callscreen::store::{Store, StoreError};

async fn lists() -> (Store, SqliteListStore) {
    let store = Store::open_in_memory()
        .await
        .expect("in-memory store should open");
    let lists = SqliteListStore::new(store.pool().clone());
    (store, lists)
}

fn pattern(number: &str, match_mode: MatchMode) -> ListNumber {
    ListNumber {
        number: number.to_owned(),
        match_mode,
    }
}

#[tokio::test]
async fn membership_follows_match_modes() {
    let (_store, lists) = lists().await;
    lists
        .add_contact(
            "Telemarketing",
            ContactType::BlackList,
            &[
                pattern("0800", MatchMode::StartsWith),
                pattern("666", MatchMode::EndsWith),
            ],
        )
        .await
        .expect("list contact should insert");
    lists
        .add_contact(
            "Family",
            ContactType::WhiteList,
            &[pattern("555 01", MatchMode::Contains)],
        )
        .await
        .expect("list contact should insert");

    assert!(lists
        .is_member("0800-123", ContactType::BlackList)
        .await
        .is_some());
    assert!(lists
        .is_member("123666", ContactType::BlackList)
        .await
        .is_some());
    assert!(lists
        .is_member("+1 555 0199", ContactType::WhiteList)
        .await
        .is_some());
    assert!(lists
        .is_member("0800123", ContactType::WhiteList)
        .await
        .is_none());
    assert!(lists.find_contacts("4242").await.is_empty());
}

#[tokio::test]
async fn number_on_both_lists_yields_both_contacts_in_insertion_order() {
    let (_store, lists) = lists().await;
    let black = lists
        .add_contact(
            "Shop",
            ContactType::BlackList,
            &[pattern("5550100", MatchMode::Equals)],
        )
        .await
        .expect("list contact should insert");
    let white = lists
        .add_contact(
            "Shop (kept)",
            ContactType::WhiteList,
            &[pattern("555-0100", MatchMode::Equals)],
        )
        .await
        .expect("list contact should insert");

    let ids: Vec<i64> = lists
        .find_contacts("5550100")
        .await
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(ids, [black, white]);
}

#[tokio::test]
async fn entries_are_per_list_sorted_and_filtered() {
    let (_store, lists) = lists().await;
    lists
        .add_contact("zeta", ContactType::BlackList, &[pattern("1", MatchMode::Equals)])
        .await
        .expect("insert");
    lists
        .add_contact(
            "Alpha",
            ContactType::BlackList,
            &[
                pattern("2", MatchMode::Equals),
                pattern("3", MatchMode::StartsWith),
            ],
        )
        .await
        .expect("insert");
    lists
        .add_contact("Friend", ContactType::WhiteList, &[pattern("4", MatchMode::Equals)])
        .await
        .expect("insert");

    let black = lists
        .entries(ContactType::BlackList, None)
        .await
        .expect("entries should load");
    let names: Vec<&str> = black.iter().map(|e| e.contact.name.as_str()).collect();
    assert_eq!(names, ["Alpha", "zeta"]);
    assert_eq!(black[0].match_modes, [MatchMode::Equals, MatchMode::StartsWith]);
    assert!(black
        .iter()
        .all(|e| e.contact.contact_type == ContactType::BlackList));

    let filtered = lists
        .entries(ContactType::BlackList, Some("ZET"))
        .await
        .expect("entries should load");
    assert_eq!(filtered.len(), 1);
}

#[tokio::test]
async fn remove_contact_drops_its_numbers() {
    let (store, lists) = lists().await;
    let id = lists
        .add_contact("Spam", ContactType::BlackList, &[pattern("5550100", MatchMode::Equals)])
        .await
        .expect("insert");

    assert!(lists.remove_contact(id).await.expect("remove should succeed"));
    assert!(!lists.remove_contact(id).await.expect("remove should succeed"));
    assert!(lists.find_contacts("5550100").await.is_empty());

    let (numbers,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM list_numbers")
        .fetch_one(store.pool())
        .await
        .expect("count should succeed");
    assert_eq!(numbers, 0);
}

#[tokio::test]
async fn plain_contacts_cannot_be_listed() {
    let (_store, lists) = lists().await;
    let result = lists
        .add_contact("Nobody", ContactType::None, &[pattern("1", MatchMode::Equals)])
        .await;
    assert!(matches!(
        result,
        Err(StoreError::InvalidEnum {
            field: "list_type",
            ..
        })
    ));
}
