//! Selection engine: the priority ladder that picks the next camera subject
//! and the dwell-driven panel rotation.

use auteur_types::AuteurError;

mod candidate;
mod ladder;
mod panel;

pub use candidate::{Candidate, CandidateSelector, TierCandidates};
pub use ladder::{HoldPolicy, Ladder, Tier, TierOrder, WindowSizer};
pub use panel::{PanelDecision, PanelSelector, TRIGGER_KINDS};

pub fn engine_error(message: impl Into<String>) -> AuteurError {
    AuteurError::Selection(message.into())
}
