use raffle_core::DrawError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::http::HttpError;
use crate::ledger::LedgerError;

#[derive(Debug, Error)]
pub enum MailerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("draw failed: {0}")]
    Draw(#[from] DrawError),
    #[error("transport error: {0}")]
    Http(#[from] HttpError),
    #[error("token endpoint returned status {status} body={body}")]
    Token { status: u16, body: String },
    #[error("invalid token response: {0}")]
    TokenResponse(String),
    #[error("graph request returned {status}: {message}")]
    Graph { status: u16, message: String },
    #[error("graph response decode failed: {0}")]
    Decode(String),
    #[error("ledger failure: {0}")]
    Ledger(#[from] LedgerError),
}

impl MailerError {
    /// Transport hiccups and throttling/server errors may succeed on a later run.
    pub fn is_retryable(&self) -> bool {
        match self {
            MailerError::Draw(err) => err.is_retryable(),
            MailerError::Http(_) => true,
            MailerError::Token { status, .. } | MailerError::Graph { status, .. } => {
                *status == 429 || *status >= 500
            }
            MailerError::Config(_)
            | MailerError::TokenResponse(_)
            | MailerError::Decode(_)
            | MailerError::Ledger(_) => false,
        }
    }
}

/// Cuts a response body for error messages, on a char boundary.
pub(crate) fn truncate_body(body: &str, max: usize) -> String {
    if body.len() <= max {
        return body.to_string();
    }
    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttling_is_retryable() {
        let err = MailerError::Graph {
            status: 429,
            message: "slow down".into(),
        };
        assert!(err.is_retryable());
        let err = MailerError::Graph {
            status: 400,
            message: "bad recipient".into(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn truncates_on_char_boundary() {
        assert_eq!(truncate_body("abc", 10), "abc");
        assert_eq!(truncate_body("añb", 2), "a...");
    }
}
