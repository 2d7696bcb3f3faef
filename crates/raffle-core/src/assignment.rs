use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::derangement::derange_with_limit;
use crate::errors::DrawError;
use crate::participant::{Participant, ParticipantGroup};

/// One giver and the secret recipient they buy a gift for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub group: String,
    pub giver: Participant,
    pub receiver: Participant,
}

pub fn assign_group<R: Rng + ?Sized>(
    group: &ParticipantGroup,
    max_attempts: u32,
    rng: &mut R,
) -> Result<Vec<Assignment>, DrawError> {
    let receivers =
        derange_with_limit(group.participants(), max_attempts, rng).map_err(|source| {
            DrawError::Group {
                group: group.name().to_string(),
                source,
            }
        })?;
    Ok(group
        .participants()
        .iter()
        .cloned()
        .zip(receivers)
        .map(|(giver, receiver)| Assignment {
            group: group.name().to_string(),
            giver,
            receiver,
        })
        .collect())
}

/// Draws every group independently and concatenates the results in group order.
/// Any failing group fails the whole draw.
pub fn draw<R: Rng + ?Sized>(
    groups: &[ParticipantGroup],
    max_attempts: u32,
    rng: &mut R,
) -> Result<Vec<Assignment>, DrawError> {
    if groups.is_empty() {
        return Err(DrawError::NoGroups);
    }
    let mut assignments = Vec::with_capacity(groups.iter().map(ParticipantGroup::len).sum());
    for group in groups {
        let drawn = assign_group(group, max_attempts, rng)?;
        info!(group = group.name(), participants = drawn.len(), "group drawn");
        assignments.extend(drawn);
    }
    Ok(assignments)
}
