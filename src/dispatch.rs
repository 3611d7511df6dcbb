//! Acting on a verdict: journal and notify on block, inbox write on allow.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::Labels;
use crate::directory::{ContactLookup, InboxWriter};
use crate::engine::{EventKind, IncomingEvent, Verdict};
use crate::journal::{JournalRecord, JournalSink};
use crate::notify::{Notification, Notifier};
use crate::settings::SettingsProvider;

/// What happened to the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    /// Let through.
    Delivered,
    /// Blocked and journaled.
    Suppressed,
    /// Blocked without a name or number to record; nothing was written.
    Dropped,
}

/// Outcome of dispatching one verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// The verdict acted on.
    pub verdict: Verdict,
    /// Final disposition.
    pub delivery: Delivery,
    /// Journal row written for a block.
    pub journal_id: Option<i64>,
    /// Whether an allowed message was stored in the inbox.
    pub written_to_inbox: bool,
    /// Whether a notification was raised.
    pub notified: bool,
}

impl DispatchReport {
    fn new(verdict: &Verdict, delivery: Delivery) -> Self {
        Self {
            verdict: verdict.clone(),
            delivery,
            journal_id: None,
            written_to_inbox: false,
            notified: false,
        }
    }
}

/// Performs the side effects a verdict calls for.
pub struct Dispatcher {
    journal: Arc<dyn JournalSink>,
    notifier: Arc<dyn Notifier>,
    directory: Arc<dyn ContactLookup>,
    inbox: Arc<dyn InboxWriter>,
    settings: Arc<dyn SettingsProvider>,
    labels: Labels,
}

impl Dispatcher {
    /// Dispatcher over the given sinks.
    pub fn new(
        journal: Arc<dyn JournalSink>,
        notifier: Arc<dyn Notifier>,
        directory: Arc<dyn ContactLookup>,
        inbox: Arc<dyn InboxWriter>,
        settings: Arc<dyn SettingsProvider>,
        labels: Labels,
    ) -> Self {
        Self {
            journal,
            notifier,
            directory,
            inbox,
            settings,
            labels,
        }
    }

    /// Act on `verdict` for `event`.
    pub async fn dispatch(&self, event: &IncomingEvent, verdict: &Verdict) -> DispatchReport {
        match verdict {
            Verdict::Block { rule, name, number } => {
                let (Some(name), Some(number)) = (
                    name.as_deref().filter(|n| !n.trim().is_empty()),
                    number.as_deref().filter(|n| !n.trim().is_empty()),
                ) else {
                    warn!(
                        kind = event.kind.as_str(),
                        rule = rule.as_str(),
                        "block verdict without name or number, dropping"
                    );
                    return DispatchReport::new(verdict, Delivery::Dropped);
                };
                self.suppress(event, verdict, name, number).await
            }
            Verdict::Allow { rule } => {
                info!(
                    kind = event.kind.as_str(),
                    rule = rule.as_str(),
                    "event allowed"
                );
                match event.kind {
                    EventKind::Sms => self.deliver_sms(event, verdict).await,
                    EventKind::Call => DispatchReport::new(verdict, Delivery::Delivered),
                }
            }
        }
    }

    async fn suppress(
        &self,
        event: &IncomingEvent,
        verdict: &Verdict,
        name: &str,
        number: &str,
    ) -> DispatchReport {
        let mut report = DispatchReport::new(verdict, Delivery::Suppressed);

        let text = match event.kind {
            EventKind::Call => None,
            EventKind::Sms => {
                let body = event.body();
                Some(if body.trim().is_empty() {
                    self.labels.empty_sms.clone()
                } else {
                    body
                })
            }
        };
        let record = JournalRecord::blocked(
            event.kind,
            chrono::Utc::now().timestamp_millis(),
            name,
            number,
            text,
        );
        match self.journal.append(&record).await {
            Ok(id) => report.journal_id = Some(id),
            Err(e) => error!(error = %e, "failed to journal blocked event"),
        }

        if self.settings.get_bool(event.kind.policy().show_notifications) {
            self.notifier.notify(Notification::Blocked {
                kind: event.kind,
                name: name.to_owned(),
            });
            report.notified = true;
        }

        info!(
            kind = event.kind.as_str(),
            rule = verdict.rule().as_str(),
            caller = name,
            journal_id = report.journal_id,
            "event blocked"
        );
        report
    }

    async fn deliver_sms(&self, event: &IncomingEvent, verdict: &Verdict) -> DispatchReport {
        let mut report = DispatchReport::new(verdict, Delivery::Delivered);
        let address = event
            .number
            .clone()
            .unwrap_or_else(|| self.labels.hidden.clone());

        if !self
            .inbox
            .write_to_inbox(&address, &event.body(), event.timestamp_ms)
            .await
        {
            return report;
        }
        report.written_to_inbox = true;

        let name = match self.directory.resolve_by_number(&address).await {
            Some(contact) => contact
                .display_name()
                .map_or_else(|| address.clone(), str::to_owned),
            None => address,
        };
        self.notifier.notify(Notification::Received { name });
        report.notified = true;
        report
    }
}
