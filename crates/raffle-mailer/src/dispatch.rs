use std::thread;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::{GraphCredentials, MAX_BATCH_SIZE};
use crate::graph::{OutgoingMail, send_mail};
use crate::http::HttpClient;

/// A mail for one giver. `receiver` stays out of logs and reports.
#[derive(Debug, Clone)]
pub struct Notification {
    pub giver: String,
    pub receiver: String,
    pub mail: OutgoingMail,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryOutcome {
    pub to: String,
    pub giver: String,
    #[serde(skip)]
    pub receiver: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DeliveryReport {
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
    pub outcomes: Vec<DeliveryOutcome>,
}

impl DeliveryReport {
    pub fn success(&self) -> bool {
        self.failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &DeliveryOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.ok)
    }
}

/// Sends notifications in fixed-size batches. Mails inside a batch go out
/// concurrently; batches are separated by `batch_delay`.
pub struct Dispatcher<'a> {
    client: &'a HttpClient,
    creds: &'a GraphCredentials,
    token: &'a str,
    batch_size: usize,
    batch_delay: Duration,
    save_to_sent_items: bool,
}

impl<'a> Dispatcher<'a> {
    pub fn new(client: &'a HttpClient, creds: &'a GraphCredentials, token: &'a str) -> Self {
        Self {
            client,
            creds,
            token,
            batch_size: 2,
            batch_delay: Duration::from_secs(1),
            save_to_sent_items: true,
        }
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
        self
    }

    pub fn batch_delay(mut self, batch_delay: Duration) -> Self {
        self.batch_delay = batch_delay;
        self
    }

    pub fn save_to_sent_items(mut self, save: bool) -> Self {
        self.save_to_sent_items = save;
        self
    }

    pub fn dispatch(&self, notifications: &[Notification]) -> DeliveryReport {
        let total = notifications.len();
        let batches = total.div_ceil(self.batch_size);
        let mut report = DeliveryReport {
            total,
            ..DeliveryReport::default()
        };
        for (index, batch) in notifications.chunks(self.batch_size).enumerate() {
            info!(
                batch = index + 1,
                of = batches,
                mails = batch.len(),
                "sending batch"
            );
            for outcome in self.send_batch(batch) {
                if outcome.ok {
                    report.sent += 1;
                    info!(to = %outcome.to, giver = %outcome.giver, "notification sent");
                } else {
                    report.failed += 1;
                    warn!(
                        to = %outcome.to,
                        giver = %outcome.giver,
                        error = outcome.error.as_deref().unwrap_or_default(),
                        "notification failed"
                    );
                }
                report.outcomes.push(outcome);
            }
            if index + 1 < batches && !self.batch_delay.is_zero() {
                thread::sleep(self.batch_delay);
            }
        }
        info!(
            sent = report.sent,
            failed = report.failed,
            total = report.total,
            "dispatch finished"
        );
        report
    }

    fn send_batch(&self, batch: &[Notification]) -> Vec<DeliveryOutcome> {
        thread::scope(|scope| {
            let handles: Vec<_> = batch
                .iter()
                .map(|notification| {
                    let handle = scope.spawn(move || {
                        send_mail(
                            self.client,
                            self.creds,
                            self.token,
                            &notification.mail,
                            self.save_to_sent_items,
                        )
                    });
                    (notification, handle)
                })
                .collect();
            handles
                .into_iter()
                .map(|(notification, handle)| {
                    let error = match handle.join() {
                        Ok(Ok(())) => None,
                        Ok(Err(err)) => Some(err.to_string()),
                        Err(_) => Some("delivery thread panicked".to_string()),
                    };
                    DeliveryOutcome {
                        to: notification.mail.to.clone(),
                        giver: notification.giver.clone(),
                        receiver: notification.receiver.clone(),
                        ok: error.is_none(),
                        error,
                    }
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpError, HttpResponse};
    use std::time::Instant;

    fn notification(giver: &str, to: &str) -> Notification {
        Notification {
            giver: giver.into(),
            receiver: "SECRET".into(),
            mail: OutgoingMail::new(to, "Hola", "<p>x</p>"),
        }
    }

    #[test]
    fn one_failure_does_not_stop_the_rest() {
        let client = HttpClient::mock_with(|req| {
            let body = String::from_utf8_lossy(req.body.as_deref().unwrap_or_default()).into_owned();
            if body.contains("bad@x.cl") {
                Ok(HttpResponse::new(
                    400,
                    br#"{"error":{"message":"Invalid recipient"}}"#.to_vec(),
                ))
            } else {
                Ok(HttpResponse::new(202, Vec::new()))
            }
        });
        let creds = GraphCredentials::placeholder();
        let notifications = vec![
            notification("ANA", "a@x.cl"),
            notification("BAD", "bad@x.cl"),
            notification("LUIS", "l@x.cl"),
        ];
        let report = Dispatcher::new(&client, &creds, "tok")
            .batch_delay(Duration::ZERO)
            .dispatch(&notifications);
        assert_eq!(report.total, 3);
        assert_eq!(report.sent, 2);
        assert_eq!(report.failed, 1);
        assert!(!report.success());
        let failed: Vec<_> = report.failures().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].to, "bad@x.cl");
        assert!(failed[0].error.as_deref().unwrap().contains("Invalid recipient"));
        assert_eq!(client.calls().len(), 3);
    }

    #[test]
    fn outcomes_follow_input_order_across_batches() {
        let client = HttpClient::mock();
        let creds = GraphCredentials::placeholder();
        let notifications: Vec<_> = (0..5)
            .map(|i| notification(&format!("P{i}"), &format!("p{i}@x.cl")))
            .collect();
        let report = Dispatcher::new(&client, &creds, "tok")
            .batch_size(2)
            .batch_delay(Duration::ZERO)
            .dispatch(&notifications);
        let order: Vec<&str> = report.outcomes.iter().map(|o| o.giver.as_str()).collect();
        assert_eq!(order, vec!["P0", "P1", "P2", "P3", "P4"]);
        assert!(report.success());
    }

    #[test]
    fn transport_errors_become_failed_outcomes() {
        let client = HttpClient::mock_with(|_| Err(HttpError::new("http_transport_error", "reset")));
        let creds = GraphCredentials::placeholder();
        let report = Dispatcher::new(&client, &creds, "tok")
            .batch_delay(Duration::ZERO)
            .dispatch(&[notification("ANA", "a@x.cl")]);
        assert_eq!(report.failed, 1);
        assert!(report.outcomes[0].error.as_deref().unwrap().contains("reset"));
    }

    #[test]
    fn report_json_never_contains_receivers() {
        let client = HttpClient::mock();
        let creds = GraphCredentials::placeholder();
        let report = Dispatcher::new(&client, &creds, "tok")
            .batch_delay(Duration::ZERO)
            .dispatch(&[notification("ANA", "a@x.cl")]);
        let json = serde_json::to_string(&report).unwrap();
        assert!(!json.contains("SECRET"));
    }

    #[test]
    fn sleeps_between_batches_but_not_after_the_last() {
        let client = HttpClient::mock();
        let creds = GraphCredentials::placeholder();
        let notifications: Vec<_> = (0..4)
            .map(|i| notification(&format!("P{i}"), &format!("p{i}@x.cl")))
            .collect();
        let delay = Duration::from_millis(200);
        let started = Instant::now();
        let report = Dispatcher::new(&client, &creds, "tok")
            .batch_size(2)
            .batch_delay(delay)
            .dispatch(&notifications);
        let elapsed = started.elapsed();
        assert_eq!(report.sent, 4);
        assert!(elapsed >= delay, "elapsed {elapsed:?}");
        assert!(elapsed < delay * 2, "elapsed {elapsed:?}");
    }

    #[test]
    fn oversized_batches_are_capped() {
        let client = HttpClient::mock();
        let creds = GraphCredentials::placeholder();
        let dispatcher = Dispatcher::new(&client, &creds, "tok").batch_size(5000);
        assert_eq!(dispatcher.batch_size, MAX_BATCH_SIZE);
    }

    #[test]
    fn zero_batch_size_is_clamped() {
        let client = HttpClient::mock();
        let creds = GraphCredentials::placeholder();
        let report = Dispatcher::new(&client, &creds, "tok")
            .batch_size(0)
            .batch_delay(Duration::ZERO)
            .dispatch(&[notification("ANA", "a@x.cl"), notification("LUIS", "l@x.cl")]);
        assert_eq!(report.sent, 2);
    }
}
