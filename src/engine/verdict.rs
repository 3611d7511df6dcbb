//! Engine output.

use serde::{Deserialize, Serialize};

/// The rule that settled a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Rule 1: the number was withheld.
    HiddenNumber,
    /// Rule 2: everything of this kind is blocked.
    BlockAll,
    /// Rule 3: the number is on the white list.
    WhiteList,
    /// Rule 4: the number is on the black list.
    BlackList,
    /// Rule 5: the number belongs to an address-book contact.
    KnownContact,
    /// Rule 6: the number has sent to the inbox before.
    InboxHistory,
    /// Rule 7: rules 5/6 left a pending block standing.
    UnknownNumber,
    /// Rule 8: nothing applied.
    NoRuleMatched,
}

impl Rule {
    /// Short name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HiddenNumber => "hidden_number",
            Self::BlockAll => "block_all",
            Self::WhiteList => "white_list",
            Self::BlackList => "black_list",
            Self::KnownContact => "known_contact",
            Self::InboxHistory => "inbox_history",
            Self::UnknownNumber => "unknown_number",
            Self::NoRuleMatched => "no_rule_matched",
        }
    }
}

/// Whether to let an event through.
///
/// A block carries the display name and number to journal. Both are
/// optional at the type level; a block missing either is never journaled
/// or notified (see [`crate::dispatch`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// Deliver the event.
    Allow {
        /// Rule that allowed it.
        rule: Rule,
    },
    /// Suppress the event.
    Block {
        /// Rule that blocked it.
        rule: Rule,
        /// Contact name, raw number or hidden label.
        name: Option<String>,
        /// Originating number, or the hidden label.
        number: Option<String>,
    },
}

impl Verdict {
    /// Whether the event should be suppressed.
    pub fn is_block(&self) -> bool {
        matches!(self, Self::Block { .. })
    }

    /// Whether the event should be delivered.
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow { .. })
    }

    /// Rule that produced this verdict.
    pub fn rule(&self) -> Rule {
        match self {
            Self::Allow { rule } | Self::Block { rule, .. } => *rule,
        }
    }

    /// Display name of a block.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Block { name, .. } => name.as_deref(),
            Self::Allow { .. } => None,
        }
    }

    /// Number of a block.
    pub fn number(&self) -> Option<&str> {
        match self {
            Self::Block { number, .. } => number.as_deref(),
            Self::Allow { .. } => None,
        }
    }
}
