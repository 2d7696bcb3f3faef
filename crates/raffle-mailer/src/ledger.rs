//! Audit log of a draw: one pretty JSON file per run plus a cumulative history.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Locale, Utc};
use chrono_tz::Tz;
use raffle_core::Assignment;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::config::LedgerConfig;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger io failed ({path}): {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("ledger history {path} is not valid json: {source}")]
    CorruptHistory {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("ledger serialization failed: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerAssignment {
    pub group: String,
    pub giver: String,
    pub email: String,
    pub receiver: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub run_id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub display_date: String,
    /// Set for mock-transport runs: nobody was mailed this draw.
    #[serde(default)]
    pub dry_run: bool,
    pub total: usize,
    pub assignments: Vec<LedgerAssignment>,
}

impl LedgerEntry {
    pub fn new(assignments: &[Assignment], now: DateTime<Utc>, tz: Tz) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            recorded_at: now,
            display_date: display_date(now, tz),
            dry_run: false,
            total: assignments.len(),
            assignments: assignments
                .iter()
                .map(|a| LedgerAssignment {
                    group: a.group.clone(),
                    giver: a.giver.name.clone(),
                    email: a.giver.email.clone(),
                    receiver: a.receiver.name.clone(),
                })
                .collect(),
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Spanish long date in `tz`, e.g. `1 de diciembre de 2025, 09:00:00`.
pub fn display_date(now: DateTime<Utc>, tz: Tz) -> String {
    now.with_timezone(&tz)
        .format_localized("%-d de %B de %Y, %H:%M:%S", Locale::es_CL)
        .to_string()
}

#[derive(Debug, Clone)]
pub struct Ledger {
    dir: PathBuf,
    file_prefix: String,
    history_file: String,
}

impl Ledger {
    pub fn new(dir: impl Into<PathBuf>, file_prefix: &str, history_file: &str) -> Self {
        Self {
            dir: dir.into(),
            file_prefix: file_prefix.to_string(),
            history_file: history_file.to_string(),
        }
    }

    pub fn from_config(cfg: &LedgerConfig) -> Self {
        Self::new(cfg.dir.clone(), &cfg.file_prefix, &cfg.history_file)
    }

    pub fn history_path(&self) -> PathBuf {
        self.dir.join(&self.history_file)
    }

    pub fn entry_path(&self, entry: &LedgerEntry) -> PathBuf {
        self.dir.join(format!(
            "{}-{}-{}.json",
            self.file_prefix,
            entry.recorded_at.format("%Y-%m-%d"),
            entry.recorded_at.timestamp_millis()
        ))
    }

    /// Writes the per-run file and appends to the history. The history is read
    /// first so a corrupt file fails the run before anything is written; both
    /// files are replaced atomically, and the per-run file is removed again if
    /// the history cannot be updated.
    pub fn record(&self, entry: &LedgerEntry) -> Result<PathBuf, LedgerError> {
        let mut history = self.history()?;
        fs::create_dir_all(&self.dir).map_err(|source| LedgerError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let entry_path = self.entry_path(entry);
        write_json(&entry_path, entry)?;

        history.push(entry.clone());
        if let Err(err) = write_json(&self.history_path(), &history) {
            let _ = fs::remove_file(&entry_path);
            return Err(err);
        }

        info!(
            path = %entry_path.display(),
            total = entry.total,
            dry_run = entry.dry_run,
            "ledger recorded"
        );
        Ok(entry_path)
    }

    /// Every recorded entry, oldest first; empty when no history exists yet.
    pub fn history(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        let path = self.history_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&path).map_err(|source| LedgerError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| LedgerError::CorruptHistory { path, source })
    }
}

/// Writes to a sibling temp file and renames it over `path`.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), LedgerError> {
    let json = serde_json::to_vec_pretty(value)?;
    let io_err = |source: std::io::Error| LedgerError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = NamedTempFile::new_in(dir).map_err(io_err)?;
    file.write_all(&json).map_err(io_err)?;
    file.as_file().sync_all().map_err(io_err)?;
    file.persist(path).map_err(|err| io_err(err.error))?;
    Ok(())
}
