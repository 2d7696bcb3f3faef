use std::fmt;
use std::io::Read;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::{Engine, engine::general_purpose::STANDARD};
use http::{Request, Response as RawResponse};
use serde::Serialize;
use thiserror::Error;
use ureq::{Agent, Body};

pub type HttpHistory = Arc<Mutex<Vec<HttpCall>>>;

type Responder = dyn Fn(&HttpRequest) -> Result<HttpResponse, HttpError> + Send + Sync;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HttpMode {
    #[default]
    Mock,
    Real,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct HttpError {
    pub code: String,
    pub message: String,
}

impl HttpError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    /// Keeps the body out of the recorded history (credentials).
    pub sensitive: bool,
}

impl HttpRequest {
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: "POST".into(),
            url: url.into(),
            headers: Vec::new(),
            body: None,
            sensitive: false,
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HttpCall {
    pub request: RequestRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestRecord {
    pub method: String,
    pub url: String,
    pub headers: Vec<Header>,
    pub body_b64: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseRecord {
    pub status: u16,
    pub headers: Vec<Header>,
    pub body_b64: Option<String>,
}

impl RequestRecord {
    fn from_request(req: &HttpRequest) -> Self {
        let body_b64 = if req.sensitive {
            None
        } else {
            req.body.as_ref().map(|bytes| STANDARD.encode(bytes))
        };
        let headers = req
            .headers
            .iter()
            .map(|(name, value)| Header {
                name: name.clone(),
                value: if name.eq_ignore_ascii_case("authorization") {
                    "<redacted>".to_string()
                } else {
                    value.clone()
                },
            })
            .collect();
        Self {
            method: req.method.clone(),
            url: req.url.clone(),
            headers,
            body_b64,
        }
    }

    /// Decodes the recorded body; `None` when it was withheld or absent.
    pub fn body_json(&self) -> Option<serde_json::Value> {
        let bytes = STANDARD.decode(self.body_b64.as_deref()?).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

impl ResponseRecord {
    fn from_response(resp: &HttpResponse) -> Self {
        let body_b64 = if resp.body.is_empty() {
            None
        } else {
            Some(STANDARD.encode(&resp.body))
        };
        let headers = resp
            .headers
            .iter()
            .map(|(name, value)| Header {
                name: name.clone(),
                value: value.clone(),
            })
            .collect();
        Self {
            status: resp.status,
            headers,
            body_b64,
        }
    }
}

pub fn new_history() -> HttpHistory {
    Arc::new(Mutex::new(Vec::new()))
}

const MOCK_TOKEN_BODY: &[u8] =
    br#"{"token_type":"Bearer","expires_in":3599,"access_token":"mock-access-token"}"#;

/// Token endpoints get a fake bearer token, everything else `202 Accepted`.
pub fn mock_response(req: &HttpRequest) -> Result<HttpResponse, HttpError> {
    if req.url.contains("/oauth2/") {
        return Ok(HttpResponse::new(200, MOCK_TOKEN_BODY));
    }
    Ok(HttpResponse::new(202, Vec::new()))
}

/// Blocking HTTP client that records every call. Cheap to clone; clones share history.
#[derive(Clone)]
pub struct HttpClient {
    mode: HttpMode,
    history: HttpHistory,
    agent: Agent,
    responder: Arc<Responder>,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    pub fn new(mode: HttpMode) -> Self {
        let config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build();
        Self {
            mode,
            history: new_history(),
            agent: Agent::new_with_config(config),
            responder: Arc::new(mock_response),
        }
    }

    pub fn mock() -> Self {
        Self::new(HttpMode::Mock)
    }

    /// Mock client answering with `responder` instead of [`mock_response`].
    pub fn mock_with(
        responder: impl Fn(&HttpRequest) -> Result<HttpResponse, HttpError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Arc::new(responder),
            ..Self::mock()
        }
    }

    pub fn mode(&self) -> HttpMode {
        self.mode
    }

    pub fn calls(&self) -> Vec<HttpCall> {
        self.history
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn send(&self, req: &HttpRequest) -> Result<HttpResponse, HttpError> {
        let result = match self.mode {
            HttpMode::Mock => (self.responder)(req),
            HttpMode::Real => self.send_real(req),
        };
        let call = HttpCall {
            request: RequestRecord::from_request(req),
            response: result.as_ref().ok().map(ResponseRecord::from_response),
            error: result.as_ref().err().map(ToString::to_string),
        };
        if let Ok(mut calls) = self.history.lock() {
            calls.push(call);
        }
        result
    }

    fn send_real(&self, req: &HttpRequest) -> Result<HttpResponse, HttpError> {
        let mut builder = Request::builder().method(req.method.as_str()).uri(&req.url);
        for (name, value) in &req.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let body_bytes = req.body.clone().unwrap_or_default();
        let request = builder
            .body(body_bytes)
            .map_err(|err| HttpError::new("http_request_build", err.to_string()))?;
        match self.agent.run(request) {
            Ok(resp) => build_response(resp),
            Err(err) => Err(HttpError::new("http_transport_error", err.to_string())),
        }
    }
}

fn build_response(resp: RawResponse<Body>) -> Result<HttpResponse, HttpError> {
    let status = resp.status();
    let headers = resp
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                value.to_str().unwrap_or_default().to_string(),
            )
        })
        .collect();
    let mut reader = resp.into_body().into_reader();
    let mut body = Vec::new();
    reader
        .read_to_end(&mut body)
        .map_err(|err| HttpError::new("http_read_error", err.to_string()))?;
    Ok(HttpResponse {
        status: status.as_u16(),
        headers,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mock_answers_token_and_mail() {
        let client = HttpClient::mock();
        let token = client
            .send(&HttpRequest::post(
                "https://login.microsoftonline.com/t/oauth2/v2.0/token",
            ))
            .unwrap();
        assert_eq!(token.status, 200);
        assert!(token.body_text().contains("access_token"));
        let mail = client
            .send(&HttpRequest::post("https://graph.microsoft.com/v1.0/users/x/sendMail"))
            .unwrap();
        assert_eq!(mail.status, 202);
        assert!(mail.is_success());
        assert_eq!(client.calls().len(), 2);
    }

    #[test]
    fn history_redacts_credentials() {
        let client = HttpClient::mock();
        let req = HttpRequest::post("https://login.microsoftonline.com/t/oauth2/v2.0/token")
            .header("Authorization", "Bearer abc")
            .body(b"client_secret=hunter2".to_vec())
            .sensitive();
        client.send(&req).unwrap();
        let calls = client.calls();
        let recorded = &calls[0].request;
        assert_eq!(recorded.body_b64, None);
        assert_eq!(recorded.headers[0].value, "<redacted>");
        let json = serde_json::to_string(&calls).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(!json.contains("Bearer abc"));
    }

    #[test]
    fn records_errors_from_responder() {
        let client =
            HttpClient::mock_with(|_| Err(HttpError::new("http_transport_error", "refused")));
        let err = client.send(&HttpRequest::post("https://example.invalid")).unwrap_err();
        assert_eq!(err.to_string(), "http_transport_error: refused");
        let calls = client.calls();
        assert!(calls[0].response.is_none());
        assert_eq!(calls[0].error.as_deref(), Some("http_transport_error: refused"));
    }

    #[test]
    fn recorded_body_decodes_back_to_json() {
        let client = HttpClient::mock();
        let req = HttpRequest::post("https://example.invalid")
            .body(serde_json::to_vec(&serde_json::json!({"a": 1})).unwrap());
        client.send(&req).unwrap();
        assert_eq!(
            client.calls()[0].request.body_json(),
            Some(serde_json::json!({"a": 1}))
        );
    }

    #[test]
    fn clones_share_history() {
        let client = HttpClient::mock();
        let clone = client.clone();
        clone.send(&HttpRequest::post("https://example.invalid")).unwrap();
        assert_eq!(client.calls().len(), 1);
        assert_eq!(client.mode(), HttpMode::Mock);
    }
}
