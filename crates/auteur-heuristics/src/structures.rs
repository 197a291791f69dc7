use std::sync::Arc;

use auteur_types::{
    config::HeuristicsConfig,
    observation::{HeuristicKind, Observation, Window},
    timeline::{MatchTimeline, UnitCategory},
};

use crate::Heuristic;

/// Destroyed structures and cores with a killer, weighted by structure tier.
pub struct StructureHeuristic {
    config: Arc<HeuristicsConfig>,
}

impl StructureHeuristic {
    pub fn new(config: Arc<HeuristicsConfig>) -> Self {
        Self { config }
    }
}

impl Heuristic for StructureHeuristic {
    fn kind(&self) -> HeuristicKind {
        HeuristicKind::Structure
    }

    fn scan(&self, window: &Window, timeline: &MatchTimeline) -> Vec<Observation> {
        let mut observations: Vec<Observation> = timeline
            .units
            .iter()
            .filter(|u| matches!(u.category, UnitCategory::Structure | UnitCategory::Core))
            .filter_map(|unit| {
                let at = unit.died_within(window)?;
                let killer = unit.killer?;
                Some(
                    Observation::new(HeuristicKind::Structure, killer, at)
                        .with_unit(timeline.hero_of(killer, at).map(|u| u.id))
                        .with_weight(self.config.structure_weight(&unit.name))
                        .because(format!("{} destroyed {}", killer, unit.name)),
                )
            })
            .collect();
        observations.sort_by_key(|obs| obs.ready_at);
        observations
    }
}
