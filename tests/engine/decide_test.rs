//! Rule-order tests for `AdmissionEngine::decide` over in-memory fakes.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use callscreen::config::Labels;
use callscreen::contacts::{Contact, ContactNumber, ContactType};
use callscreen::directory::ContactLookup;
use callscreen::engine::{AdmissionEngine, IncomingEvent, Rule, Verdict};
use callscreen::lists::MembershipStore;
use callscreen::settings::{PolicySettings, Setting};

#[derive(Default)]
struct FakeDirectory {
    contacts: Vec<Contact>,
    inbox: HashSet<String>,
    lookups: AtomicUsize,
}

#[async_trait]
impl ContactLookup for FakeDirectory {
    async fn resolve_by_number(&self, number: &str) -> Option<Contact> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.contacts
            .iter()
            .find(|c| c.numbers.iter().any(|n| n.number == number))
            .cloned()
    }

    async fn contains_number_in_inbox(&self, number: &str) -> bool {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inbox.contains(number)
    }
}

#[derive(Default)]
struct FakeLists {
    contacts: Vec<Contact>,
}

#[async_trait]
impl MembershipStore for FakeLists {
    async fn find_contacts(&self, number: &str) -> Vec<Contact> {
        self.contacts
            .iter()
            .filter(|c| c.numbers.iter().any(|n| n.number == number))
            .cloned()
            .collect()
    }
}

fn contact(id: i64, name: &str, contact_type: ContactType, number: &str) -> Contact {
    Contact {
        id,
        name: name.to_owned(),
        contact_type,
        numbers: vec![ContactNumber::new(0, number, id)],
    }
}

fn engine(
    directory: FakeDirectory,
    lists: FakeLists,
    settings: PolicySettings,
) -> (AdmissionEngine, Arc<FakeDirectory>) {
    let directory = Arc::new(directory);
    let engine = AdmissionEngine::new(
        directory.clone(),
        Arc::new(lists),
        Arc::new(settings),
        Labels::default(),
    );
    (engine, directory)
}

fn block(rule: Rule, name: &str, number: &str) -> Verdict {
    Verdict::Block {
        rule,
        name: Some(name.to_owned()),
        number: Some(number.to_owned()),
    }
}

#[tokio::test]
async fn hidden_sms_is_blocked_with_hidden_label() {
    let settings = PolicySettings::new().with(Setting::BlockHiddenSms, true);
    let (engine, _) = engine(FakeDirectory::default(), FakeLists::default(), settings);

    let verdict = engine.decide(&IncomingEvent::sms(None, &["hi"], 1)).await;
    assert_eq!(verdict, block(Rule::HiddenNumber, "Hidden", "Hidden"));

    let verdict = engine.decide(&IncomingEvent::sms(Some("-2"), &["hi"], 1)).await;
    assert_eq!(verdict, block(Rule::HiddenNumber, "Hidden", "Hidden"));
}

#[tokio::test]
async fn hidden_number_is_allowed_when_setting_off() {
    let settings = PolicySettings::new()
        .with(Setting::BlockHiddenCalls, false)
        .with(Setting::BlockAllCalls, true);
    let (engine, _) = engine(FakeDirectory::default(), FakeLists::default(), settings);

    let verdict = engine.decide(&IncomingEvent::call(Some("-1"), 1)).await;
    assert_eq!(
        verdict,
        Verdict::Allow {
            rule: Rule::HiddenNumber
        }
    );
}

#[tokio::test]
async fn block_all_beats_white_list() {
    let lists = FakeLists {
        contacts: vec![contact(1, "Mum", ContactType::WhiteList, "5550001")],
    };
    let settings = PolicySettings::new().with(Setting::BlockAllSms, true);
    let (engine, _) = engine(FakeDirectory::default(), lists, settings);

    let verdict = engine
        .decide(&IncomingEvent::sms(Some("5550001"), &["x"], 1))
        .await;
    assert_eq!(verdict, block(Rule::BlockAll, "Mum", "5550001"));
}

#[tokio::test]
async fn block_all_without_list_contact_uses_number() {
    let settings = PolicySettings::new().with(Setting::BlockAllCalls, true);
    let (engine, _) = engine(FakeDirectory::default(), FakeLists::default(), settings);

    let verdict = engine.decide(&IncomingEvent::call(Some("5550002"), 1)).await;
    assert_eq!(verdict, block(Rule::BlockAll, "5550002", "5550002"));
}

#[tokio::test]
async fn white_list_beats_every_later_rule() {
    let lists = FakeLists {
        contacts: vec![
            contact(1, "Spam", ContactType::BlackList, "5550003"),
            contact(2, "Friend", ContactType::WhiteList, "5550003"),
        ],
    };
    let settings = PolicySettings::new()
        .with(Setting::BlockSmsFromBlackList, true)
        .with(Setting::BlockSmsNotFromContacts, true)
        .with(Setting::BlockSmsNotFromInbox, true);
    let (engine, directory) = engine(FakeDirectory::default(), lists, settings);

    let verdict = engine
        .decide(&IncomingEvent::sms(Some("5550003"), &["x"], 1))
        .await;
    assert_eq!(
        verdict,
        Verdict::Allow {
            rule: Rule::WhiteList
        }
    );
    assert_eq!(directory.lookups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn black_list_member_is_blocked_with_contact_name() {
    let lists = FakeLists {
        contacts: vec![contact(7, "Spam Co", ContactType::BlackList, "+1-555-0100")],
    };
    let (engine, _) = engine(FakeDirectory::default(), lists, PolicySettings::new());

    let verdict = engine
        .decide(&IncomingEvent::sms(Some("+15550100"), &["buy now"], 1))
        .await;
    assert_eq!(verdict, block(Rule::BlackList, "Spam Co", "+15550100"));
}

#[tokio::test]
async fn black_list_is_ignored_when_setting_off() {
    let lists = FakeLists {
        contacts: vec![contact(7, "Spam Co", ContactType::BlackList, "5550100")],
    };
    let settings = PolicySettings::new().with(Setting::BlockCallsFromBlackList, false);
    let (engine, _) = engine(FakeDirectory::default(), lists, settings);

    let verdict = engine.decide(&IncomingEvent::call(Some("5550100"), 1)).await;
    assert_eq!(
        verdict,
        Verdict::Allow {
            rule: Rule::NoRuleMatched
        }
    );
}

#[tokio::test]
async fn black_list_contact_with_blank_name_yields_nameless_block() {
    let lists = FakeLists {
        contacts: vec![contact(7, "  ", ContactType::BlackList, "5550100")],
    };
    let (engine, _) = engine(FakeDirectory::default(), lists, PolicySettings::new());

    let verdict = engine.decide(&IncomingEvent::call(Some("5550100"), 1)).await;
    assert!(verdict.is_block());
    assert_eq!(verdict.name(), None);
    assert_eq!(verdict.number(), Some("5550100"));
}

#[tokio::test]
async fn known_contact_is_allowed() {
    let directory = FakeDirectory {
        contacts: vec![contact(3, "Alice", ContactType::None, "5550004")],
        ..FakeDirectory::default()
    };
    let settings = PolicySettings::new().with(Setting::BlockCallsNotFromContacts, true);
    let (engine, _) = engine(directory, FakeLists::default(), settings);

    let verdict = engine.decide(&IncomingEvent::call(Some("5550004"), 1)).await;
    assert_eq!(
        verdict,
        Verdict::Allow {
            rule: Rule::KnownContact
        }
    );
}

#[tokio::test]
async fn inbox_history_overrides_not_in_contacts() {
    let directory = FakeDirectory {
        inbox: HashSet::from(["5550199".to_owned()]),
        ..FakeDirectory::default()
    };
    let settings = PolicySettings::new()
        .with(Setting::BlockSmsNotFromContacts, true)
        .with(Setting::BlockSmsNotFromInbox, true);
    let (engine, _) = engine(directory, FakeLists::default(), settings);

    let verdict = engine
        .decide(&IncomingEvent::sms(Some("5550199"), &["hello"], 1))
        .await;
    assert_eq!(
        verdict,
        Verdict::Allow {
            rule: Rule::InboxHistory
        }
    );
}

#[tokio::test]
async fn unknown_sender_without_history_is_blocked_by_number() {
    let settings = PolicySettings::new()
        .with(Setting::BlockSmsNotFromContacts, true)
        .with(Setting::BlockSmsNotFromInbox, true);
    let (engine, _) = engine(FakeDirectory::default(), FakeLists::default(), settings);

    let verdict = engine
        .decide(&IncomingEvent::sms(Some("5550199"), &["hello"], 1))
        .await;
    assert_eq!(verdict, block(Rule::UnknownNumber, "5550199", "5550199"));
}

#[tokio::test]
async fn inbox_rule_does_not_apply_to_calls() {
    let settings = PolicySettings::new()
        .with(Setting::BlockSmsNotFromInbox, true)
        .with(Setting::BlockSmsNotFromContacts, true);
    let (engine, directory) = engine(FakeDirectory::default(), FakeLists::default(), settings);

    let verdict = engine.decide(&IncomingEvent::call(Some("5550199"), 1)).await;
    assert_eq!(
        verdict,
        Verdict::Allow {
            rule: Rule::NoRuleMatched
        }
    );
    assert_eq!(directory.lookups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn known_contact_skips_inbox_check() {
    let directory = FakeDirectory {
        contacts: vec![contact(3, "Alice", ContactType::None, "5550004")],
        ..FakeDirectory::default()
    };
    let settings = PolicySettings::new()
        .with(Setting::BlockSmsNotFromContacts, true)
        .with(Setting::BlockSmsNotFromInbox, true);
    let (engine, directory) = engine(directory, FakeLists::default(), settings);

    let verdict = engine
        .decide(&IncomingEvent::sms(Some("5550004"), &["hi"], 1))
        .await;
    assert_eq!(verdict.rule(), Rule::KnownContact);
    assert_eq!(directory.lookups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn defaults_allow_unlisted_numbers() {
    let (engine, _) = engine(
        FakeDirectory::default(),
        FakeLists::default(),
        PolicySettings::new(),
    );

    let verdict = engine
        .decide(&IncomingEvent::sms(Some("ACME"), &["promo"], 1))
        .await;
    assert!(verdict.is_allow());
    assert_eq!(verdict.rule(), Rule::NoRuleMatched);
}
