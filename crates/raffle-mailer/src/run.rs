//! End-to-end raffle: draw, ledger, token, batched delivery, organizer summary.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use raffle_core::{Assignment, draw};
use rand::Rng;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::acquire_app_token;
use crate::config::{GraphCredentials, RaffleConfig};
use crate::dispatch::{DeliveryReport, Dispatcher, Notification};
use crate::errors::MailerError;
use crate::graph::{OutgoingMail, send_mail};
use crate::http::{HttpClient, HttpMode};
use crate::ledger::{Ledger, LedgerEntry};
use crate::template::{ledger_html, ledger_subject, notification_html};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunFailure {
    pub to: String,
    pub giver: String,
    pub error: String,
}

/// Outcome of a run. Carries no receivers, so it is safe to print.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
    pub ledger_file: PathBuf,
    pub dry_run: bool,
    pub ledger_mail_sent: bool,
    pub failures: Vec<RunFailure>,
}

impl RunReport {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Draws every configured group under the configured attempt cap.
pub fn draw_assignments<R: Rng + ?Sized>(
    config: &RaffleConfig,
    rng: &mut R,
) -> Result<Vec<Assignment>, MailerError> {
    let groups = config.groups()?;
    Ok(draw(&groups, config.delivery.max_attempts, rng)?)
}

pub fn notifications(config: &RaffleConfig, assignments: &[Assignment]) -> Vec<Notification> {
    assignments
        .iter()
        .map(|a| Notification {
            giver: a.giver.name.clone(),
            receiver: a.receiver.name.clone(),
            mail: OutgoingMail::new(
                a.giver.email.clone(),
                config.event.subject.clone(),
                notification_html(&config.event, &a.giver.name, &a.receiver.name),
            ),
        })
        .collect()
}

pub struct RaffleRun<'a> {
    config: &'a RaffleConfig,
    client: &'a HttpClient,
    creds: &'a GraphCredentials,
}

impl<'a> RaffleRun<'a> {
    pub fn new(
        config: &'a RaffleConfig,
        client: &'a HttpClient,
        creds: &'a GraphCredentials,
    ) -> Self {
        Self {
            config,
            client,
            creds,
        }
    }

    /// The ledger is on disk before any mail leaves; a draw, ledger or token
    /// failure aborts with nothing sent.
    pub fn execute<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<RunReport, MailerError> {
        let assignments = draw_assignments(self.config, rng)?;
        let notifications = notifications(self.config, &assignments);

        let tz = self.config.ledger.timezone()?;
        let entry = LedgerEntry::new(&assignments, Utc::now(), tz)
            .with_dry_run(self.client.mode() == HttpMode::Mock);
        let ledger = Ledger::from_config(&self.config.ledger);
        let ledger_file = ledger.record(&entry)?;
        info!(run_id = %entry.run_id, total = entry.total, "draw recorded");

        let token = acquire_app_token(self.client, self.creds)?;
        let delivery = &self.config.delivery;
        let report = Dispatcher::new(self.client, self.creds, &token)
            .batch_size(delivery.batch_size)
            .batch_delay(Duration::from_millis(delivery.batch_delay_ms))
            .save_to_sent_items(delivery.save_to_sent_items)
            .dispatch(&notifications);

        let ledger_mail_sent = self.send_ledger_mail(&token, &entry, &report);

        Ok(RunReport {
            run_id: entry.run_id,
            total: report.total,
            sent: report.sent,
            failed: report.failed,
            ledger_file,
            dry_run: entry.dry_run,
            ledger_mail_sent,
            failures: report
                .failures()
                .map(|outcome| RunFailure {
                    to: outcome.to.clone(),
                    giver: outcome.giver.clone(),
                    error: outcome.error.clone().unwrap_or_default(),
                })
                .collect(),
        })
    }

    fn send_ledger_mail(&self, token: &str, entry: &LedgerEntry, report: &DeliveryReport) -> bool {
        let Some(recipient) = self.config.ledger.recipient.as_deref() else {
            return false;
        };
        let event = &self.config.event;
        let mail = OutgoingMail::new(
            recipient,
            ledger_subject(event, entry),
            ledger_html(event, entry, report.sent, report.failed),
        )
        .high_importance();
        match send_mail(
            self.client,
            self.creds,
            token,
            &mail,
            self.config.delivery.save_to_sent_items,
        ) {
            Ok(()) => {
                info!(to = recipient, "organizer summary sent");
                true
            }
            Err(err) => {
                warn!(to = recipient, error = %err, "organizer summary failed");
                false
            }
        }
    }
}
