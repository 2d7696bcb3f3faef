use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use raffle_core::{DEFAULT_MAX_ATTEMPTS, GroupError, Participant, ParticipantGroup, valid_email};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const RAFFLE_CONFIG_SCHEMA_VERSION: u32 = 1;

/// Upper bound for `delivery.batch_size`; every mail in a batch runs on its own thread.
pub const MAX_BATCH_SIZE: usize = 4;

const DEFAULT_GRAPH_AUTHORITY: &str = "https://login.microsoftonline.com";
const DEFAULT_GRAPH_BASE: &str = "https://graph.microsoft.com/v1.0";

pub const ENV_TENANT_ID: &str = "TENANT_ID";
pub const ENV_CLIENT_ID: &str = "CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "CLIENT_SECRET";
pub const ENV_USER_EMAIL: &str = "USER_EMAIL";
pub const ENV_GRAPH_AUTHORITY: &str = "GRAPH_AUTHORITY";
pub const ENV_GRAPH_BASE_URL: &str = "GRAPH_BASE_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("unsupported schema version: expected {expected}, got {got}")]
    UnsupportedSchemaVersion { expected: u32, got: u32 },
    #[error("config validation failed: {0}")]
    Invalid(String),
    #[error("config validation failed: {0}")]
    Group(#[from] GroupError),
    #[error("missing environment variables: {}", .0.join(", "))]
    MissingEnv(Vec<String>),
}

fn default_schema_version() -> u32 {
    RAFFLE_CONFIG_SCHEMA_VERSION
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RaffleConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub event: EventConfig,
    pub groups: Vec<GroupConfig>,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EventConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_organization")]
    pub organization: String,
    #[serde(default = "default_subject")]
    pub subject: String,
    #[serde(default)]
    pub gift_budget: Option<String>,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            organization: default_organization(),
            subject: default_subject(),
            gift_budget: None,
        }
    }
}

fn default_title() -> String {
    "Amigo Secreto".to_string()
}

fn default_organization() -> String {
    "Ecotrans Chile".to_string()
}

fn default_subject() -> String {
    "🎁 ¡Tu Amigo Secreto ha sido revelado!".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct GroupConfig {
    pub name: String,
    pub participants: Vec<Participant>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DeliveryConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_save_to_sent_items")]
    pub save_to_sent_items: bool,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
            max_attempts: default_max_attempts(),
            save_to_sent_items: default_save_to_sent_items(),
        }
    }
}

fn default_batch_size() -> usize {
    2
}

fn default_batch_delay_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_save_to_sent_items() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    #[serde(default = "default_history_file")]
    pub history_file: String,
    /// Organizer address that receives the confidential summary.
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            dir: default_ledger_dir(),
            file_prefix: default_file_prefix(),
            history_file: default_history_file(),
            recipient: None,
            timezone: default_timezone(),
        }
    }
}

fn default_ledger_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_file_prefix() -> String {
    "amigo-secreto".to_string()
}

fn default_history_file() -> String {
    "historial-completo.json".to_string()
}

fn default_timezone() -> String {
    "America/Santiago".to_string()
}

impl LedgerConfig {
    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::Invalid(format!("unknown timezone {}", self.timezone)))
    }
}

impl RaffleConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    /// Parses and validates in one step.
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let mut cfg: RaffleConfig = serde_json::from_str(contents).map_err(ConfigError::Parse)?;
        cfg.ledger.recipient = cfg.ledger.recipient.map(|r| r.trim().to_string());
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schema_version != RAFFLE_CONFIG_SCHEMA_VERSION {
            return Err(ConfigError::UnsupportedSchemaVersion {
                expected: RAFFLE_CONFIG_SCHEMA_VERSION,
                got: self.schema_version,
            });
        }
        if self.event.subject.trim().is_empty() {
            return Err(ConfigError::Invalid("event.subject is required".into()));
        }
        if self.delivery.batch_size == 0 || self.delivery.batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::Invalid(format!(
                "delivery.batch_size must be between 1 and {MAX_BATCH_SIZE}, got {}",
                self.delivery.batch_size
            )));
        }
        if self.delivery.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "delivery.max_attempts must be greater than zero".into(),
            ));
        }
        if self.ledger.file_prefix.trim().is_empty() || self.ledger.history_file.trim().is_empty()
        {
            return Err(ConfigError::Invalid(
                "ledger.file_prefix and ledger.history_file cannot be empty".into(),
            ));
        }
        self.ledger.timezone()?;
        if let Some(recipient) = self.ledger.recipient.as_deref()
            && !valid_email(recipient)
        {
            return Err(ConfigError::Invalid(format!(
                "ledger.recipient '{recipient}' is not an email address"
            )));
        }
        self.groups().map(|_| ())
    }

    /// Validated participant groups in file order.
    pub fn groups(&self) -> Result<Vec<ParticipantGroup>, ConfigError> {
        if self.groups.is_empty() {
            return Err(ConfigError::Invalid("at least one group is required".into()));
        }
        let mut names = HashSet::new();
        let mut groups = Vec::with_capacity(self.groups.len());
        for group in &self.groups {
            let name = group.name.trim();
            if name.is_empty() {
                return Err(ConfigError::Invalid("group name cannot be empty".into()));
            }
            if !names.insert(name.to_lowercase()) {
                return Err(ConfigError::Invalid(format!("duplicate group name {name}")));
            }
            let validated = ParticipantGroup::new(name, group.participants.clone())?;
            if validated.len() < 2 {
                return Err(ConfigError::Invalid(format!(
                    "group {name} needs at least 2 participants, has {}",
                    validated.len()
                )));
            }
            groups.push(validated);
        }
        Ok(groups)
    }

    pub fn participant_count(&self) -> usize {
        self.groups.iter().map(|g| g.participants.len()).sum()
    }
}

/// App-only Graph credentials; read from the environment, never from the raffle file.
#[derive(Clone, PartialEq, Eq)]
pub struct GraphCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    /// Mailbox the notifications are sent from.
    pub mailbox: String,
    pub authority: String,
    pub base_url: String,
}

impl fmt::Debug for GraphCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphCredentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("mailbox", &self.mailbox)
            .field("authority", &self.authority)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GraphCredentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reports every missing variable at once.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut missing = Vec::new();
        let mut required = |key: &str| {
            get(key).unwrap_or_else(|| {
                missing.push(key.to_string());
                String::new()
            })
        };
        let tenant_id = required(ENV_TENANT_ID);
        let client_id = required(ENV_CLIENT_ID);
        let client_secret = required(ENV_CLIENT_SECRET);
        let mailbox = required(ENV_USER_EMAIL);
        if !missing.is_empty() {
            return Err(ConfigError::MissingEnv(missing));
        }
        Ok(Self {
            tenant_id,
            client_id,
            client_secret,
            mailbox,
            authority: get(ENV_GRAPH_AUTHORITY)
                .unwrap_or_else(|| DEFAULT_GRAPH_AUTHORITY.to_string()),
            base_url: get(ENV_GRAPH_BASE_URL).unwrap_or_else(|| DEFAULT_GRAPH_BASE.to_string()),
        })
    }

    /// Stand-in credentials for mock transport runs.
    pub fn placeholder() -> Self {
        Self {
            tenant_id: "mock-tenant".into(),
            client_id: "mock-client".into(),
            client_secret: "mock-secret".into(),
            mailbox: "raffle@example.invalid".into(),
            authority: DEFAULT_GRAPH_AUTHORITY.into(),
            base_url: DEFAULT_GRAPH_BASE.into(),
        }
    }
}
