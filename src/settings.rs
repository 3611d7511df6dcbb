//! Screening policy toggles.
//!
//! The engine only reads settings through [`SettingsProvider`]. The
//! configuration-backed [`PolicySettings`] is what the binary wires in.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A named boolean policy setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Setting {
    /// Block SMS from withheld numbers.
    BlockHiddenSms,
    /// Block every SMS.
    BlockAllSms,
    /// Block SMS from black-listed numbers.
    BlockSmsFromBlackList,
    /// Block SMS from numbers missing from the address book.
    BlockSmsNotFromContacts,
    /// Block SMS from numbers with no inbox history.
    BlockSmsNotFromInbox,
    /// Notify the user when an SMS is blocked.
    ShowSmsNotifications,
    /// Block calls from withheld numbers.
    BlockHiddenCalls,
    /// Block every call.
    BlockAllCalls,
    /// Block calls from black-listed numbers.
    BlockCallsFromBlackList,
    /// Block calls from numbers missing from the address book.
    BlockCallsNotFromContacts,
    /// Notify the user when a call is blocked.
    ShowCallsNotifications,
}

impl Setting {
    /// Every known setting.
    pub const ALL: [Setting; 11] = [
        Self::BlockHiddenSms,
        Self::BlockAllSms,
        Self::BlockSmsFromBlackList,
        Self::BlockSmsNotFromContacts,
        Self::BlockSmsNotFromInbox,
        Self::ShowSmsNotifications,
        Self::BlockHiddenCalls,
        Self::BlockAllCalls,
        Self::BlockCallsFromBlackList,
        Self::BlockCallsNotFromContacts,
        Self::ShowCallsNotifications,
    ];

    /// Canonical setting name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BlockHiddenSms => "BLOCK_HIDDEN_SMS",
            Self::BlockAllSms => "BLOCK_ALL_SMS",
            Self::BlockSmsFromBlackList => "BLOCK_SMS_FROM_BLACK_LIST",
            Self::BlockSmsNotFromContacts => "BLOCK_SMS_NOT_FROM_CONTACTS",
            Self::BlockSmsNotFromInbox => "BLOCK_SMS_NOT_FROM_INBOX",
            Self::ShowSmsNotifications => "SHOW_SMS_NOTIFICATIONS",
            Self::BlockHiddenCalls => "BLOCK_HIDDEN_CALLS",
            Self::BlockAllCalls => "BLOCK_ALL_CALLS",
            Self::BlockCallsFromBlackList => "BLOCK_CALLS_FROM_BLACK_LIST",
            Self::BlockCallsNotFromContacts => "BLOCK_CALLS_NOT_FROM_CONTACTS",
            Self::ShowCallsNotifications => "SHOW_CALLS_NOTIFICATIONS",
        }
    }

    /// Value used when nothing is configured.
    ///
    /// Black-list blocking and notifications start enabled; everything else
    /// is opt-in.
    pub fn default_value(&self) -> bool {
        matches!(
            self,
            Self::BlockSmsFromBlackList
                | Self::ShowSmsNotifications
                | Self::BlockCallsFromBlackList
                | Self::ShowCallsNotifications
        )
    }
}

/// Errors from parsing settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The setting name is not recognised.
    #[error("unknown setting: {0}")]
    UnknownSetting(String),

    /// An assignment was not of the form `NAME=true|false`.
    #[error("invalid setting assignment: {0}")]
    InvalidAssignment(String),
}

impl FromStr for Setting {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|setting| setting.as_str() == wanted)
            .ok_or_else(|| SettingsError::UnknownSetting(s.to_owned()))
    }
}

/// Read-only view of the policy settings.
pub trait SettingsProvider: Send + Sync {
    /// Current value of `setting`.
    fn get_bool(&self, setting: Setting) -> bool;
}

/// Settings backed by an explicit map, falling back to [`Setting::default_value`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicySettings {
    values: BTreeMap<Setting, bool>,
}

impl PolicySettings {
    /// Settings with nothing overridden.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style override.
    pub fn with(mut self, setting: Setting, value: bool) -> Self {
        self.values.insert(setting, value);
        self
    }

    /// Override a single setting.
    pub fn set(&mut self, setting: Setting, value: bool) {
        self.values.insert(setting, value);
    }

    /// Apply a `NAME=true|false` assignment, as given on the command line.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown names or non-boolean values.
    pub fn apply_assignment(&mut self, assignment: &str) -> Result<(), SettingsError> {
        let (name, value) = assignment
            .split_once('=')
            .ok_or_else(|| SettingsError::InvalidAssignment(assignment.to_owned()))?;
        let setting: Setting = name.parse()?;
        let value = match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "on" | "yes" => true,
            "false" | "0" | "off" | "no" => false,
            _ => return Err(SettingsError::InvalidAssignment(assignment.to_owned())),
        };
        self.set(setting, value);
        Ok(())
    }

    /// Effective value of every setting, defaults included.
    pub fn effective(&self) -> BTreeMap<Setting, bool> {
        Setting::ALL
            .into_iter()
            .map(|s| (s, self.get_bool(s)))
            .collect()
    }
}

impl SettingsProvider for PolicySettings {
    fn get_bool(&self, setting: Setting) -> bool {
        self.values
            .get(&setting)
            .copied()
            .unwrap_or_else(|| setting.default_value())
    }
}
