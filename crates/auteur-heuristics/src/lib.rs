//! Heuristic scanners turning match timeline facts into candidate observations.
//!
//! Every scanner is pure with respect to the timeline and only depends on the
//! configuration it was constructed with. The [`WindowAnalyzer`] runs a set of
//! scanners over one window and buckets their output by phenomenon.

use std::sync::Arc;

use auteur_types::{
    config::HeuristicsConfig,
    observation::{HeuristicKind, Observation, Window},
    timeline::{MatchTimeline, Team, Unit},
    AuteurError,
};

mod alive;
mod analyzer;
mod behaviour;
mod captures;
mod kills;
mod objectives;
mod proximity;
mod structures;

pub use alive::AliveHeuristic;
pub use analyzer::{WindowAnalysis, WindowAnalyzer};
pub use behaviour::{EmoteHeuristic, RoamingHeuristic, VehicleHeuristic};
pub use captures::{CampTier, CaptureHeuristic};
pub use kills::{DeathHeuristic, KillHeuristic, MultiKillHeuristic, RecentKillerHeuristic};
pub use objectives::{MapObjectiveHeuristic, TeamObjectiveHeuristic};
pub use proximity::{NearEnemyStructureHeuristic, ProximityHeuristic};
pub use structures::StructureHeuristic;

/// One phenomenon detector.
///
/// `scan` must only return observations whose `ready_at` lies inside `window`
/// and must return the same sequence for the same arguments.
pub trait Heuristic: Send + Sync {
    fn kind(&self) -> HeuristicKind;
    fn scan(&self, window: &Window, timeline: &MatchTimeline) -> Vec<Observation>;
}

/// The full scanner set, one per [`HeuristicKind`].
pub fn standard_heuristics(config: Arc<HeuristicsConfig>) -> Vec<Box<dyn Heuristic>> {
    let mut heuristics: Vec<Box<dyn Heuristic>> = vec![Box::new(KillHeuristic::new(config.clone()))];
    for required in 2..=5 {
        heuristics.push(Box::new(MultiKillHeuristic::new(config.clone(), required)));
    }
    heuristics.push(Box::new(DeathHeuristic::new(config.clone())));
    heuristics.push(Box::new(CaptureHeuristic::new(config.clone(), CampTier::Boss)));
    heuristics.push(Box::new(CaptureHeuristic::new(config.clone(), CampTier::Standard)));
    heuristics.push(Box::new(MapObjectiveHeuristic::new(config.clone())));
    heuristics.push(Box::new(TeamObjectiveHeuristic::new(config.clone())));
    heuristics.push(Box::new(NearEnemyStructureHeuristic::new(config.clone())));
    heuristics.push(Box::new(EmoteHeuristic::new(config.clone())));
    heuristics.push(Box::new(RoamingHeuristic::new(config.clone())));
    heuristics.push(Box::new(VehicleHeuristic::new(config.clone())));
    heuristics.push(Box::new(StructureHeuristic::new(config.clone())));
    heuristics.push(Box::new(ProximityHeuristic::new(config.clone())));
    heuristics.push(Box::new(RecentKillerHeuristic::new(config.clone())));
    heuristics.push(Box::new(AliveHeuristic::new(config)));
    heuristics
}

/// Team of a unit, falling back to its controller's team.
pub(crate) fn unit_team(timeline: &MatchTimeline, unit: &Unit) -> Option<Team> {
    unit.team
        .or_else(|| unit.owner.and_then(|owner| timeline.team_of(owner)))
}

/// Instants worth sampling positions at: the window start plus every sample
/// of the given units inside the window.
pub(crate) fn sample_instants(window: &Window, units: &[&Unit]) -> Vec<std::time::Duration> {
    if window.is_empty() {
        return Vec::new();
    }
    let mut instants = vec![window.start];
    for unit in units {
        instants.extend(unit.sample_times_within(window));
    }
    instants.sort();
    instants.dedup();
    instants
}

pub fn heuristic_error(message: impl Into<String>) -> AuteurError {
    AuteurError::Heuristic(message.into())
}
