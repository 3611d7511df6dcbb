//! Incoming events and the per-kind policy keys.

use serde::{Deserialize, Serialize};

use crate::settings::Setting;
use crate::store::StoreError;

/// What arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Incoming voice call.
    Call,
    /// Incoming text message.
    Sms,
}

impl EventKind {
    /// Returns the string representation stored in SQLite.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Sms => "sms",
        }
    }

    /// Parse from a SQLite text value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a recognised kind.
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        match s {
            "call" => Ok(Self::Call),
            "sms" => Ok(Self::Sms),
            other => Err(StoreError::InvalidEnum {
                field: "kind",
                value: other.to_owned(),
            }),
        }
    }

    /// Settings consulted for this kind of event.
    pub fn policy(&self) -> PolicyKeys {
        match self {
            Self::Sms => PolicyKeys {
                block_hidden: Setting::BlockHiddenSms,
                block_all: Setting::BlockAllSms,
                block_black_list: Setting::BlockSmsFromBlackList,
                block_not_in_contacts: Setting::BlockSmsNotFromContacts,
                block_not_in_inbox: Some(Setting::BlockSmsNotFromInbox),
                show_notifications: Setting::ShowSmsNotifications,
            },
            Self::Call => PolicyKeys {
                block_hidden: Setting::BlockHiddenCalls,
                block_all: Setting::BlockAllCalls,
                block_black_list: Setting::BlockCallsFromBlackList,
                block_not_in_contacts: Setting::BlockCallsNotFromContacts,
                block_not_in_inbox: None,
                show_notifications: Setting::ShowCallsNotifications,
            },
        }
    }
}

/// The setting behind each rule for one event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyKeys {
    /// Rule 1: block withheld numbers.
    pub block_hidden: Setting,
    /// Rule 2: block everything.
    pub block_all: Setting,
    /// Rule 4: block black-list members.
    pub block_black_list: Setting,
    /// Rule 5: block numbers missing from the address book.
    pub block_not_in_contacts: Setting,
    /// Rule 6: block numbers without inbox history. SMS only.
    pub block_not_in_inbox: Option<Setting>,
    /// Notify on block.
    pub show_notifications: Setting,
}

/// One incoming call or message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingEvent {
    /// Call or SMS.
    pub kind: EventKind,
    /// Originating number; absent when withheld by the network.
    #[serde(default)]
    pub number: Option<String>,
    /// Message parts in arrival order. Empty for calls.
    #[serde(default)]
    pub body_parts: Vec<String>,
    /// Arrival time (ms since epoch).
    pub timestamp_ms: i64,
}

impl IncomingEvent {
    /// An incoming call.
    pub fn call(number: Option<&str>, timestamp_ms: i64) -> Self {
        Self {
            kind: EventKind::Call,
            number: number.map(str::to_owned),
            body_parts: Vec::new(),
            timestamp_ms,
        }
    }

    /// An incoming message made of `parts`.
    pub fn sms(number: Option<&str>, parts: &[&str], timestamp_ms: i64) -> Self {
        Self {
            kind: EventKind::Sms,
            number: number.map(str::to_owned),
            body_parts: parts.iter().map(|p| (*p).to_owned()).collect(),
            timestamp_ms,
        }
    }

    /// Message body: all parts concatenated in arrival order.
    pub fn body(&self) -> String {
        self.body_parts.concat()
    }
}

/// A number is private when absent or when it parses as a negative integer.
///
/// Any other string, numeric or not, is an ordinary number.
pub fn is_private_number(number: Option<&str>) -> bool {
    match number {
        None => true,
        Some(n) => n.parse::<i64>().is_ok_and(|v| v < 0),
    }
}
