//! Admission decision engine.
//!
//! Applies the screening rules to one incoming event, in this order, and
//! returns at the first terminal outcome:
//!
//! 1. withheld number: block if the hidden-number setting is on, else allow
//! 2. block-all setting: block, named after the first linked list contact
//! 3. white-list member: allow
//! 4. black-list member, if black-list blocking is on: block
//! 5. not-in-contacts check, if on: allow known contacts, else pending block
//! 6. not-in-inbox check (SMS only), if on: allow senders with history,
//!    else pending block
//! 7. pending block: block, named after the raw number
//! 8. allow
//!
//! The order is part of the contract: a white-list entry beats every rule
//! after block-all, and inbox history overrides a pending block from rule 5.
//!
//! `decide` only reads its collaborators. Journaling and notification are
//! driven from the returned [`Verdict`] by [`crate::dispatch`].

pub mod event;
pub mod verdict;

use std::sync::Arc;

use tracing::debug;

pub use self::event::{is_private_number, EventKind, IncomingEvent, PolicyKeys};
pub use self::verdict::{Rule, Verdict};
use crate::config::Labels;
use crate::contacts::ContactType;
use crate::directory::ContactLookup;
use crate::lists::MembershipStore;
use crate::settings::SettingsProvider;

/// Progress through rules 5 and 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    /// No rule has fired yet.
    Undecided,
    /// A check failed; later checks may still allow.
    PendingBlock(Rule),
    /// A check passed; evaluation stops.
    Allowed(Rule),
}

/// Where evaluation ends once every check has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settled {
    Allowed(Rule),
    /// A pending block stood.
    Blocked(Rule),
}

impl Admission {
    fn is_terminal(self) -> bool {
        matches!(self, Self::Allowed(_))
    }

    /// Rule 5 outcome.
    fn contacts_checked(self, known: bool) -> Self {
        match self {
            Self::Allowed(_) => self,
            _ if known => Self::Allowed(Rule::KnownContact),
            _ => Self::PendingBlock(Rule::UnknownNumber),
        }
    }

    /// Rule 6 outcome. History overrides a pending block.
    fn inbox_checked(self, has_history: bool) -> Self {
        match self {
            Self::Allowed(_) => self,
            _ if has_history => Self::Allowed(Rule::InboxHistory),
            _ => Self::PendingBlock(Rule::UnknownNumber),
        }
    }

    /// Rules 7 and 8: no further checks, settle what is left.
    fn settle(self) -> Settled {
        match self {
            Self::Undecided => Settled::Allowed(Rule::NoRuleMatched),
            Self::Allowed(rule) => Settled::Allowed(rule),
            Self::PendingBlock(rule) => Settled::Blocked(rule),
        }
    }

    fn finish(self, number: &str) -> Verdict {
        match self.settle() {
            Settled::Allowed(rule) => Verdict::Allow { rule },
            Settled::Blocked(rule) => Verdict::Block {
                rule,
                name: Some(number.to_owned()),
                number: Some(number.to_owned()),
            },
        }
    }
}

/// Screening engine over injected collaborators.
pub struct AdmissionEngine {
    directory: Arc<dyn ContactLookup>,
    membership: Arc<dyn MembershipStore>,
    settings: Arc<dyn SettingsProvider>,
    labels: Labels,
}

impl AdmissionEngine {
    /// Engine reading from the given collaborators.
    pub fn new(
        directory: Arc<dyn ContactLookup>,
        membership: Arc<dyn MembershipStore>,
        settings: Arc<dyn SettingsProvider>,
        labels: Labels,
    ) -> Self {
        Self {
            directory,
            membership,
            settings,
            labels,
        }
    }

    /// Decide whether `event` is let through.
    ///
    /// Total: lookups that fail are treated as "no match" by the
    /// collaborators, so this always produces a verdict.
    pub async fn decide(&self, event: &IncomingEvent) -> Verdict {
        let keys = event.kind.policy();
        let settings = self.settings.as_ref();

        // Rule 1.
        let number = match event.number.as_deref() {
            Some(number) if !is_private_number(Some(number)) => number,
            _ => {
                if settings.get_bool(keys.block_hidden) {
                    debug!(kind = event.kind.as_str(), "withheld number blocked");
                    return Verdict::Block {
                        rule: Rule::HiddenNumber,
                        name: Some(self.labels.hidden.clone()),
                        number: Some(self.labels.hidden.clone()),
                    };
                }
                return Verdict::Allow {
                    rule: Rule::HiddenNumber,
                };
            }
        };

        let linked = self.membership.find_contacts(number).await;
        debug!(
            kind = event.kind.as_str(),
            number,
            linked = linked.len(),
            "list contacts resolved"
        );

        // Rule 2.
        if settings.get_bool(keys.block_all) {
            let name = match linked.first() {
                Some(contact) => contact.display_name().map(str::to_owned),
                None => Some(number.to_owned()),
            };
            return Verdict::Block {
                rule: Rule::BlockAll,
                name,
                number: Some(number.to_owned()),
            };
        }

        // Rule 3.
        if linked
            .iter()
            .any(|c| c.contact_type == ContactType::WhiteList)
        {
            return Verdict::Allow {
                rule: Rule::WhiteList,
            };
        }

        // Rule 4.
        if settings.get_bool(keys.block_black_list) {
            if let Some(contact) = linked
                .iter()
                .find(|c| c.contact_type == ContactType::BlackList)
            {
                return Verdict::Block {
                    rule: Rule::BlackList,
                    name: contact.display_name().map(str::to_owned),
                    number: Some(number.to_owned()),
                };
            }
        }

        // Rules 5 and 6.
        let mut state = Admission::Undecided;
        if settings.get_bool(keys.block_not_in_contacts) {
            let known = self.directory.resolve_by_number(number).await.is_some();
            state = state.contacts_checked(known);
            debug!(number, known, ?state, "contacts check");
        }
        if !state.is_terminal() {
            if let Some(key) = keys.block_not_in_inbox {
                if settings.get_bool(key) {
                    let has_history = self.directory.contains_number_in_inbox(number).await;
                    state = state.inbox_checked(has_history);
                    debug!(number, has_history, ?state, "inbox check");
                }
            }
        }

        state.finish(number)
    }
}
