//! callscreen: call and SMS screening.
//!
//! Decides, for each incoming call or text message, whether it is let
//! through or blocked, based on black/white lists, the address book, the
//! SMS inbox history and a handful of boolean policy settings. Blocked
//! events are journaled and optionally surfaced as notifications.
//!
//! See `DESIGN.md` for how the pieces fit together.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod logging;
pub mod settings;
pub mod store;

pub mod contacts;
pub mod directory;
pub mod lists;

pub mod engine;

pub mod dispatch;
pub mod journal;
pub mod notify;

pub mod snapshot;
