//! Rejection-sampling derangement generator.
//!
//! Each attempt shuffles a copy of the input uniformly (Fisher-Yates) and keeps
//! it only if no position still holds the element with the same key. Every
//! derangement of the input is reachable, cyclic or not. The number of attempts
//! is capped so a degenerate input or a broken random source ends in an error
//! instead of a loop.

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::errors::DerangementError;
use crate::participant::Keyed;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 1000;

pub fn derange<T, R>(list: &[T], rng: &mut R) -> Result<Vec<T>, DerangementError>
where
    T: Keyed + Clone,
    R: Rng + ?Sized,
{
    derange_with_limit(list, DEFAULT_MAX_ATTEMPTS, rng)
}

/// Returns a permutation of `list` where `out[i].key() != list[i].key()` for every `i`.
///
/// Fails with [`DerangementError::InsufficientParticipants`] for fewer than two
/// entries and with [`DerangementError::DerangementNotFound`] once
/// `max_attempts` shuffles were all rejected.
pub fn derange_with_limit<T, R>(
    list: &[T],
    max_attempts: u32,
    rng: &mut R,
) -> Result<Vec<T>, DerangementError>
where
    T: Keyed + Clone,
    R: Rng + ?Sized,
{
    if list.len() < 2 {
        return Err(DerangementError::InsufficientParticipants { count: list.len() });
    }
    let mut candidate = list.to_vec();
    for attempt in 1..=max_attempts {
        candidate.shuffle(rng);
        if is_derangement(list, &candidate) {
            debug!(attempt, size = list.len(), "derangement accepted");
            return Ok(candidate);
        }
    }
    debug!(max_attempts, size = list.len(), "derangement attempt cap exhausted");
    Err(DerangementError::DerangementNotFound {
        attempts: max_attempts,
    })
}

pub fn is_derangement<T: Keyed>(original: &[T], candidate: &[T]) -> bool {
    original.len() == candidate.len()
        && original
            .iter()
            .zip(candidate)
            .all(|(before, after)| before.key() != after.key())
}
