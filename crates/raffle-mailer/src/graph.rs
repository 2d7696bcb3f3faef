use serde::Serialize;
use serde_json::{Value, json};

use crate::config::GraphCredentials;
use crate::errors::{MailerError, truncate_body};
use crate::http::{HttpClient, HttpRequest};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub importance: Option<String>,
}

impl OutgoingMail {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            html: html.into(),
            importance: None,
        }
    }

    pub fn high_importance(mut self) -> Self {
        self.importance = Some("high".into());
        self
    }
}

pub fn graph_base_url(creds: &GraphCredentials) -> String {
    creds.base_url.trim_end_matches('/').to_string()
}

pub fn send_mail_url(creds: &GraphCredentials) -> String {
    format!(
        "{}/users/{}/sendMail",
        graph_base_url(creds),
        urlencoding::encode(&creds.mailbox)
    )
}

pub fn send_mail_body(mail: &OutgoingMail, save_to_sent_items: bool) -> Value {
    let mut message = json!({
        "subject": mail.subject,
        "body": { "contentType": "HTML", "content": mail.html },
        "toRecipients": [
            { "emailAddress": { "address": mail.to } }
        ]
    });
    if let Some(importance) = &mail.importance {
        message["importance"] = Value::String(importance.clone());
    }
    json!({
        "message": message,
        "saveToSentItems": save_to_sent_items
    })
}

/// Sends `mail` from the credentials' mailbox.
pub fn send_mail(
    client: &HttpClient,
    creds: &GraphCredentials,
    token: &str,
    mail: &OutgoingMail,
    save_to_sent_items: bool,
) -> Result<(), MailerError> {
    let body = send_mail_body(mail, save_to_sent_items);
    graph_post(client, token, &send_mail_url(creds), &body).map(|_| ())
}

pub fn graph_post(
    client: &HttpClient,
    token: &str,
    url: &str,
    body: &Value,
) -> Result<Value, MailerError> {
    let bytes = serde_json::to_vec(body).map_err(|e| MailerError::Decode(e.to_string()))?;
    let request = HttpRequest::post(url)
        .header("Authorization", format!("Bearer {token}"))
        .header("Content-Type", "application/json")
        .body(bytes);
    let resp = client.send(&request)?;
    if !resp.is_success() {
        return Err(MailerError::Graph {
            status: resp.status,
            message: graph_error_message(&resp.body),
        });
    }
    if resp.body.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&resp.body).map_err(|e| MailerError::Decode(e.to_string()))
}

/// `error.message` of a Graph error envelope, else the raw (truncated) body.
fn graph_error_message(body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| truncate_body(&String::from_utf8_lossy(body), 500))
}
