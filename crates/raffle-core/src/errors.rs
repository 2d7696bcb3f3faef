use thiserror::Error;

/// Failures of a single derangement run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DerangementError {
    #[error("at least 2 participants are required, got {count}")]
    InsufficientParticipants { count: usize },
    #[error("no valid derangement found after {attempts} attempts")]
    DerangementNotFound { attempts: u32 },
}

impl DerangementError {
    /// Only an exhausted attempt cap is worth drawing again; a short list never heals.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DerangementError::DerangementNotFound { .. })
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GroupError {
    #[error("group {group}: participant #{index} has an empty name")]
    EmptyName { group: String, index: usize },
    #[error("group {group}: participant {name} has an invalid email '{email}'")]
    InvalidEmail {
        group: String,
        name: String,
        email: String,
    },
    #[error("group {group}: duplicate participant name {name}")]
    DuplicateName { group: String, name: String },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DrawError {
    #[error("no groups to draw")]
    NoGroups,
    #[error("group {group}: {source}")]
    Group {
        group: String,
        #[source]
        source: DerangementError,
    },
}

impl DrawError {
    pub fn is_retryable(&self) -> bool {
        match self {
            DrawError::NoGroups => false,
            DrawError::Group { source, .. } => source.is_retryable(),
        }
    }
}
