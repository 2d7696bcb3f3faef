//! Raffle delivery: configuration, Microsoft Graph mail transport, notification
//! templates, batched dispatch and the assignment ledger.

pub mod auth;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod graph;
pub mod http;
pub mod ledger;
pub mod run;
pub mod template;

pub use config::{
    ConfigError, DeliveryConfig, EventConfig, GraphCredentials, GroupConfig, LedgerConfig,
    RaffleConfig,
};
pub use dispatch::{DeliveryOutcome, DeliveryReport, Dispatcher, Notification};
pub use errors::MailerError;
pub use graph::OutgoingMail;
pub use http::{HttpCall, HttpClient, HttpError, HttpHistory, HttpMode, HttpRequest, HttpResponse};
pub use ledger::{Ledger, LedgerAssignment, LedgerEntry, LedgerError};
pub use run::{RaffleRun, RunFailure, RunReport, draw_assignments};
