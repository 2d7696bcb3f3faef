//! Secret gift raffle core.
//! This crate holds the participant model, the rejection-sampling derangement
//! generator and the per-group assignment draw. It performs no I/O.

pub mod assignment;
pub mod derangement;
pub mod errors;
pub mod participant;

pub use assignment::{Assignment, assign_group, draw};
pub use derangement::{DEFAULT_MAX_ATTEMPTS, derange, derange_with_limit, is_derangement};
pub use errors::{DerangementError, DrawError, GroupError};
pub use participant::{Keyed, Participant, ParticipantGroup, valid_email};
