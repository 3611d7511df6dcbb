//! Contact value types shared by the directory, the screening lists and the engine.

use serde::{Deserialize, Serialize};

use crate::store::StoreError;

/// Which list, if any, a contact belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactType {
    /// Plain contact from a backing source.
    #[default]
    None,
    /// Member of the black list.
    #[serde(rename = "black")]
    BlackList,
    /// Member of the white list.
    #[serde(rename = "white")]
    WhiteList,
}

impl ContactType {
    /// Returns the string representation stored in SQLite.
    ///
    /// `None` has no stored form; list rows are always black or white.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::BlackList => "black",
            Self::WhiteList => "white",
        }
    }

    /// Parse from a SQLite text value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a recognised list type.
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        match s {
            "none" => Ok(Self::None),
            "black" => Ok(Self::BlackList),
            "white" => Ok(Self::WhiteList),
            other => Err(StoreError::InvalidEnum {
                field: "list_type",
                value: other.to_owned(),
            }),
        }
    }
}

/// One phone number belonging to a contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactNumber {
    /// Position of this number within its owner.
    pub position: usize,
    /// Number with separators stripped (see [`normalize_number`]).
    pub number: String,
    /// Identifier of the owning contact.
    pub contact_id: i64,
}

impl ContactNumber {
    /// Build a number entry, normalizing `raw`.
    pub fn new(position: usize, raw: &str, contact_id: i64) -> Self {
        Self {
            position,
            number: normalize_number(raw),
            contact_id,
        }
    }
}

/// A contact materialized from one of the backing sources or a screening list.
///
/// Identifiers are scoped to their source: an address-book id and a call-log
/// id with the same value are unrelated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Source-scoped identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// List membership tag.
    pub contact_type: ContactType,
    /// Numbers in source order.
    pub numbers: Vec<ContactNumber>,
}

impl Contact {
    /// Display name, or `None` when it is blank.
    pub fn display_name(&self) -> Option<&str> {
        let trimmed = self.name.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(self.name.as_str())
        }
    }
}

/// Strip the separators `-`, `(`, `)` and spaces from a phone number.
///
/// Idempotent: the output contains none of the stripped characters.
pub fn normalize_number(number: &str) -> String {
    number
        .chars()
        .filter(|c| !matches!(c, '-' | '(' | ')' | ' '))
        .collect()
}
