use serde_json::Value;
use tracing::debug;
use urlencoding::encode as url_encode;

use crate::config::GraphCredentials;
use crate::errors::{MailerError, truncate_body};
use crate::http::{HttpClient, HttpRequest};

const GRAPH_APP_SCOPE: &str = "https://graph.microsoft.com/.default";

pub fn token_endpoint(creds: &GraphCredentials) -> String {
    format!(
        "{}/{}/oauth2/v2.0/token",
        creds.authority.trim_end_matches('/'),
        creds.tenant_id.trim_matches('/')
    )
}

/// App-only token through the client_credentials grant.
pub fn acquire_app_token(
    client: &HttpClient,
    creds: &GraphCredentials,
) -> Result<String, MailerError> {
    let form = format!(
        "client_id={}&client_secret={}&scope={}&grant_type=client_credentials",
        url_encode(&creds.client_id),
        url_encode(&creds.client_secret),
        url_encode(GRAPH_APP_SCOPE)
    );
    let request = HttpRequest::post(token_endpoint(creds))
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(form.into_bytes())
        .sensitive();
    let resp = client.send(&request)?;
    if !resp.is_success() {
        return Err(MailerError::Token {
            status: resp.status,
            body: truncate_body(&resp.body_text(), 500),
        });
    }
    let parsed: Value = serde_json::from_slice(&resp.body)
        .map_err(|e| MailerError::TokenResponse(e.to_string()))?;
    let token = parsed
        .get("access_token")
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or_else(|| MailerError::TokenResponse("missing access_token".into()))?;
    debug!(tenant = %creds.tenant_id, "graph app token acquired");
    Ok(token)
}
