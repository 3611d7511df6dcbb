//! callscreen CLI entry point.
//!
//! Opens the configured store, then runs one subcommand and prints its
//! result as JSON on stdout. Logs go to stderr.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;

use callscreen::config::Config;
use callscreen::contacts::ContactType;
use callscreen::directory::sms::RecordOrder;
use callscreen::directory::{ContactDirectory, ContactSource};
use callscreen::dispatch::Dispatcher;
use callscreen::engine::{AdmissionEngine, EventKind, IncomingEvent};
use callscreen::journal::SqliteJournal;
use callscreen::lists::{ListNumber, MatchMode, MembershipStore, SqliteListStore};
use callscreen::logging;
use callscreen::notify::CollectingNotifier;
use callscreen::snapshot::{self, Snapshot};
use callscreen::store::Store;

/// callscreen: screen incoming calls and messages.
#[derive(Parser)]
#[command(name = "callscreen", version, about)]
struct Cli {
    /// Config file (default: `$CALLSCREEN_CONFIG` or `~/.callscreen/config.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overriding the config.
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Override a policy setting, e.g. `--set BLOCK_ALL_SMS=true`.
    #[arg(long = "set", global = true, value_name = "NAME=BOOL")]
    settings: Vec<String>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Create the database and schema.
    Init,
    /// Load address book, call log, messages and lists from a JSON snapshot.
    Import {
        /// Snapshot file.
        path: PathBuf,
    },
    /// Decide on one incoming event and act on the verdict.
    Decide {
        /// Read the event as JSON from this file instead of the flags below.
        #[arg(long)]
        event: Option<PathBuf>,
        /// Event kind.
        #[arg(long, value_enum, default_value_t = KindArg::Call)]
        kind: KindArg,
        /// Originating number; omit for a withheld number.
        #[arg(long, allow_hyphen_values = true)]
        number: Option<String>,
        /// Message part, repeatable, in arrival order.
        #[arg(long = "part")]
        parts: Vec<String>,
        /// Arrival time (ms since epoch); defaults to now.
        #[arg(long)]
        timestamp: Option<i64>,
        /// Print the verdict without journaling, notifying or writing the inbox.
        #[arg(long)]
        dry_run: bool,
    },
    /// List contacts from one source.
    Contacts {
        /// Source to list.
        #[arg(long, value_enum, default_value_t = SourceArg::Directory)]
        source: SourceArg,
        /// Case-insensitive substring filter.
        #[arg(long)]
        filter: Option<String>,
    },
    /// Show everything known about a number.
    Lookup {
        /// Number to look up.
        #[arg(allow_hyphen_values = true)]
        number: String,
    },
    /// Manage the black and white lists.
    Lists {
        /// List operation.
        #[command(subcommand)]
        command: ListsCommand,
    },
    /// Inspect or clear the block journal.
    Journal {
        /// Journal operation.
        #[command(subcommand)]
        command: JournalCommand,
    },
    /// List message threads, or the messages of one thread.
    Conversations {
        /// Show the messages of this thread.
        #[arg(long)]
        thread: Option<i64>,
        /// Maximum number of messages.
        #[arg(long)]
        limit: Option<u32>,
        /// Oldest message first.
        #[arg(long)]
        oldest_first: bool,
    },
}

/// List subcommands.
#[derive(Subcommand)]
enum ListsCommand {
    /// Add a contact with one or more number patterns.
    Add {
        /// Target list.
        #[arg(long, value_enum)]
        list: ListArg,
        /// Contact name.
        #[arg(long)]
        name: String,
        /// Number pattern, repeatable.
        #[arg(long = "number", required = true, allow_hyphen_values = true)]
        numbers: Vec<String>,
        /// How every pattern is matched.
        #[arg(long, value_enum, default_value_t = ModeArg::Equals)]
        match_mode: ModeArg,
    },
    /// Remove a contact by id.
    Remove {
        /// Contact id.
        id: i64,
    },
    /// Show the contacts on a list.
    Show {
        /// List to show.
        #[arg(long, value_enum)]
        list: ListArg,
        /// Case-insensitive name filter.
        #[arg(long)]
        filter: Option<String>,
    },
}

/// Journal subcommands.
#[derive(Subcommand)]
enum JournalCommand {
    /// Show records, newest first.
    Show {
        /// Maximum number of records.
        #[arg(long)]
        limit: Option<u32>,
        /// Case-insensitive filter on caller, number or text.
        #[arg(long)]
        filter: Option<String>,
    },
    /// Delete every record.
    Clear,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Call,
    Sms,
}

impl From<KindArg> for EventKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Call => Self::Call,
            KindArg::Sms => Self::Sms,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SourceArg {
    Directory,
    CallLog,
    SmsInbox,
}

impl From<SourceArg> for ContactSource {
    fn from(source: SourceArg) -> Self {
        match source {
            SourceArg::Directory => Self::Directory,
            SourceArg::CallLog => Self::CallLog,
            SourceArg::SmsInbox => Self::SmsInbox,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ListArg {
    Black,
    White,
}

impl From<ListArg> for ContactType {
    fn from(list: ListArg) -> Self {
        match list {
            ListArg::Black => Self::BlackList,
            ListArg::White => Self::WhiteList,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Equals,
    Contains,
    StartsWith,
    EndsWith,
}

impl From<ModeArg> for MatchMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Equals => Self::Equals,
            ModeArg::Contains => Self::Contains,
            ModeArg::StartsWith => Self::StartsWith,
            ModeArg::EndsWith => Self::EndsWith,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(database) = cli.database {
        config.paths.database = Some(database);
    }
    for assignment in &cli.settings {
        config
            .settings
            .apply_assignment(assignment)
            .with_context(|| format!("invalid --set {assignment}"))?;
    }

    let _logging_guard = logging::init(config.logging.dir.as_deref(), &config.logging.level)?;

    let db_path = config.database_path()?;
    let store = Store::open(&db_path).await?;

    let result = run(cli.command, &config, &store).await;
    store.close().await;
    result
}

async fn run(command: Command, config: &Config, store: &Store) -> anyhow::Result<()> {
    let directory = Arc::new(ContactDirectory::new(
        store.pool().clone(),
        config.permissions,
    ));
    let lists = Arc::new(SqliteListStore::new(store.pool().clone()));

    match command {
        Command::Init => {
            let path = config.database_path()?;
            info!(path = %path.display(), "database ready");
            print_json(&serde_json::json!({ "database": path }))
        }
        Command::Import { path } => {
            let snapshot = Snapshot::load(&path)?;
            let summary = snapshot::import(store.pool(), &snapshot)
                .await
                .with_context(|| format!("failed to import {}", path.display()))?;
            print_json(&summary)
        }
        Command::Decide {
            event,
            kind,
            number,
            parts,
            timestamp,
            dry_run,
        } => {
            let event = match event {
                Some(path) => read_event(&path)?,
                None => IncomingEvent {
                    kind: kind.into(),
                    number,
                    body_parts: parts,
                    timestamp_ms: timestamp
                        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis()),
                },
            };
            let settings = Arc::new(config.settings.clone());
            let engine = AdmissionEngine::new(
                directory.clone(),
                lists,
                settings.clone(),
                config.labels.clone(),
            );
            let verdict = engine.decide(&event).await;
            if dry_run {
                return print_json(&verdict);
            }

            let notifier = Arc::new(CollectingNotifier::new());
            let dispatcher = Dispatcher::new(
                Arc::new(SqliteJournal::new(store.pool().clone())),
                notifier.clone(),
                directory.clone(),
                directory,
                settings,
                config.labels.clone(),
            );
            let report = dispatcher.dispatch(&event, &verdict).await;
            print_json(&serde_json::json!({
                "report": report,
                "notifications": notifier.drain(),
            }))
        }
        Command::Contacts { source, filter } => {
            let cursor = directory
                .list_contacts(source.into(), filter.as_deref())
                .await;
            print_json(&cursor.into_rows())
        }
        Command::Lookup { number } => {
            let report = LookupReport {
                contact: directory.resolve_by_number(&number).await,
                lists: lists.find_contacts(&number).await,
                in_inbox: directory.contains_number_in_inbox(&number).await,
            };
            print_json(&report)
        }
        Command::Lists { command } => run_lists(command, &lists).await,
        Command::Journal { command } => {
            let journal = SqliteJournal::new(store.pool().clone());
            match command {
                JournalCommand::Show { limit, filter } => {
                    let records = journal.records(limit, filter.as_deref()).await?;
                    print_json(&records)
                }
                JournalCommand::Clear => {
                    let removed = journal.clear().await?;
                    info!(removed, "journal cleared");
                    print_json(&serde_json::json!({ "removed": removed }))
                }
            }
        }
        Command::Conversations {
            thread,
            limit,
            oldest_first,
        } => match thread {
            Some(thread_id) => {
                let order = if oldest_first {
                    RecordOrder::OldestFirst
                } else {
                    RecordOrder::NewestFirst
                };
                let records = directory.records_by_thread(thread_id, order, limit).await;
                print_json(&records)
            }
            None => print_json(&directory.conversations().await),
        },
    }
}

async fn run_lists(command: ListsCommand, lists: &SqliteListStore) -> anyhow::Result<()> {
    match command {
        ListsCommand::Add {
            list,
            name,
            numbers,
            match_mode,
        } => {
            let numbers: Vec<ListNumber> = numbers
                .into_iter()
                .map(|number| ListNumber {
                    number,
                    match_mode: match_mode.into(),
                })
                .collect();
            let id = lists.add_contact(&name, list.into(), &numbers).await?;
            print_json(&serde_json::json!({ "id": id }))
        }
        ListsCommand::Remove { id } => {
            let removed = lists.remove_contact(id).await?;
            print_json(&serde_json::json!({ "removed": removed }))
        }
        ListsCommand::Show { list, filter } => {
            let entries = lists.entries(list.into(), filter.as_deref()).await?;
            print_json(&entries)
        }
    }
}

/// Everything the store knows about one number.
#[derive(Serialize)]
struct LookupReport {
    contact: Option<callscreen::contacts::Contact>,
    lists: Vec<callscreen::contacts::Contact>,
    in_inbox: bool,
}

fn read_event(path: &std::path::Path) -> anyhow::Result<IncomingEvent> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read event at {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse event at {}", path.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{out}");
    Ok(())
}
