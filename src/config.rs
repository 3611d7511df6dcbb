//! Configuration loading and validation.
//!
//! Loads `config.toml` from `$CALLSCREEN_CONFIG` or `~/.callscreen/config.toml`.
//! Every section is optional, so a missing or empty file is valid.
//!
//! Precedence: env vars > config file > defaults.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::settings::PolicySettings;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Filesystem locations.
    pub paths: PathsConfig,

    /// Log level and optional log directory.
    pub logging: LoggingConfig,

    /// User-visible labels substituted into verdicts and the journal.
    pub labels: Labels,

    /// Which backing sources the process may read or write.
    pub permissions: Permissions,

    /// Screening policy toggles (`NAME = bool`).
    pub settings: PolicySettings,
}

/// Filesystem locations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// SQLite database path. Defaults to `~/.callscreen/callscreen.db`.
    pub database: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub level: String,

    /// When set, JSON logs are also written here with daily rotation.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
        }
    }
}

/// Localized labels.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Labels {
    /// Shown as both name and number for withheld callers.
    pub hidden: String,

    /// Journal text for an SMS with a blank body.
    pub empty_sms: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            hidden: default_hidden_label(),
            empty_sms: default_empty_sms_label(),
        }
    }
}

/// A runtime authorization over one backing source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Read the address book.
    ReadContacts,
    /// Read the call history.
    ReadCallLog,
    /// Read the SMS store.
    ReadSms,
    /// Write to the SMS store.
    WriteSms,
}

impl Permission {
    /// Short name used in logs and errors.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadContacts => "read_contacts",
            Self::ReadCallLog => "read_call_log",
            Self::ReadSms => "read_sms",
            Self::WriteSms => "write_sms",
        }
    }
}

/// Granted permissions. All granted unless configured otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Permissions {
    /// Address book read access.
    pub read_contacts: bool,
    /// Call history read access.
    pub read_call_log: bool,
    /// SMS store read access.
    pub read_sms: bool,
    /// SMS store write access.
    pub write_sms: bool,
}

impl Default for Permissions {
    fn default() -> Self {
        Self::all()
    }
}

impl Permissions {
    /// Every permission granted.
    pub fn all() -> Self {
        Self {
            read_contacts: true,
            read_call_log: true,
            read_sms: true,
            write_sms: true,
        }
    }

    /// Nothing granted.
    pub fn none() -> Self {
        Self {
            read_contacts: false,
            read_call_log: false,
            read_sms: false,
            write_sms: false,
        }
    }

    /// Whether `permission` is granted.
    pub fn is_granted(&self, permission: Permission) -> bool {
        match permission {
            Permission::ReadContacts => self.read_contacts,
            Permission::ReadCallLog => self.read_call_log,
            Permission::ReadSms => self.read_sms,
            Permission::WriteSms => self.write_sms,
        }
    }
}

fn default_log_level() -> String {
    "info".to_owned()
}
fn default_hidden_label() -> String {
    "Hidden".to_owned()
}
fn default_empty_sms_label() -> String {
    "(empty message)".to_owned()
}

impl Config {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// `explicit` wins over `$CALLSCREEN_CONFIG`, which wins over the default
    /// location. A missing file at the default location yields defaults; a
    /// missing file that was asked for explicitly is an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_with(explicit, |key| std::env::var(key).ok())
    }

    /// Load using a custom env resolver (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with(
        explicit: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let requested = explicit
            .map(Path::to_path_buf)
            .or_else(|| env("CALLSCREEN_CONFIG").map(PathBuf::from));

        let mut config = match requested {
            Some(path) => load_config(&path)?,
            None => {
                let path = config_dir()?.join("config.toml");
                if path.exists() {
                    load_config(&path)?
                } else {
                    tracing::debug!(path = %path.display(), "no config file found, using defaults");
                    Self::default()
                }
            }
        };
        config.apply_overrides(env);
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// Takes a resolver function so tests avoid mutating the process env.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("CALLSCREEN_DATABASE") {
            self.paths.database = Some(PathBuf::from(v));
        }
        if let Some(v) = env("CALLSCREEN_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = env("CALLSCREEN_LOG_DIR") {
            self.logging.dir = Some(PathBuf::from(v));
        }
    }

    /// Resolved database path.
    ///
    /// # Errors
    ///
    /// Returns an error if no path is configured and the home directory is unknown.
    pub fn database_path(&self) -> anyhow::Result<PathBuf> {
        match &self.paths.database {
            Some(path) => Ok(path.clone()),
            None => Ok(config_dir()?.join("callscreen.db")),
        }
    }
}

/// Load a config file from a TOML path.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;
    let config: Config = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config at {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Resolve the default config directory (`~/.callscreen/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".callscreen"))
}
