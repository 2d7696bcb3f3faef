use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::GroupError;

/// Identity used by the fixed-point check of the derangement generator.
pub trait Keyed {
    fn key(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Participant {
    pub name: String,
    pub email: String,
}

impl Participant {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            email: email.into().trim().to_string(),
        }
    }
}

impl Keyed for Participant {
    fn key(&self) -> &str {
        &self.name
    }
}

impl Keyed for String {
    fn key(&self) -> &str {
        self
    }
}

impl Keyed for &str {
    fn key(&self) -> &str {
        self
    }
}

/// A set of participants drawn independently of every other group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantGroup {
    name: String,
    participants: Vec<Participant>,
}

impl ParticipantGroup {
    /// Validates names and emails and rejects duplicate names
    /// (trimmed, case-insensitive).
    pub fn new(
        name: impl Into<String>,
        participants: Vec<Participant>,
    ) -> Result<Self, GroupError> {
        let name = name.into().trim().to_string();
        let mut seen = HashSet::new();
        let mut normalized = Vec::with_capacity(participants.len());
        for (index, participant) in participants.into_iter().enumerate() {
            let participant = Participant::new(participant.name, participant.email);
            if participant.name.is_empty() {
                return Err(GroupError::EmptyName {
                    group: name.clone(),
                    index,
                });
            }
            if !valid_email(&participant.email) {
                return Err(GroupError::InvalidEmail {
                    group: name.clone(),
                    name: participant.name,
                    email: participant.email,
                });
            }
            if !seen.insert(participant.name.to_lowercase()) {
                return Err(GroupError::DuplicateName {
                    group: name.clone(),
                    name: participant.name,
                });
            }
            normalized.push(participant);
        }
        Ok(Self {
            name,
            participants: normalized,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&Participant> {
        let wanted = name.trim().to_lowercase();
        self.participants
            .iter()
            .find(|p| p.name.to_lowercase() == wanted)
    }
}

/// Exactly one `@` with something on both sides, and no whitespace.
pub fn valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}
