use std::sync::Arc;

use auteur_types::{
    config::HeuristicsConfig,
    observation::{HeuristicKind, Observation, Window},
    timeline::{MatchTimeline, Team, Unit, UnitCategory},
};

use crate::{sample_instants, unit_team, Heuristic};

fn controlled_heroes(timeline: &MatchTimeline) -> Vec<(&Unit, Team)> {
    timeline
        .heroes()
        .filter(|unit| unit.owner.is_some())
        .filter_map(|unit| unit_team(timeline, unit).map(|team| (unit, team)))
        .collect()
}

/// Opposing heroes within striking distance of each other. Both sides of a
/// pair are reported so the selector can choose between them.
pub struct ProximityHeuristic {
    config: Arc<HeuristicsConfig>,
}

impl ProximityHeuristic {
    pub fn new(config: Arc<HeuristicsConfig>) -> Self {
        Self { config }
    }
}

impl Heuristic for ProximityHeuristic {
    fn kind(&self) -> HeuristicKind {
        HeuristicKind::Proximity
    }

    fn scan(&self, window: &Window, timeline: &MatchTimeline) -> Vec<Observation> {
        let heroes = controlled_heroes(timeline);
        let mut observations = Vec::new();
        for (idx, (a, team_a)) in heroes.iter().enumerate() {
            for (b, team_b) in heroes.iter().skip(idx + 1) {
                if team_a == team_b {
                    continue;
                }
                let (Some(owner), Some(other)) = (a.owner, b.owner) else {
                    continue;
                };
                for at in sample_instants(window, &[*a, *b]) {
                    let (Some(pa), Some(pb)) = (a.position_at(at), b.position_at(at)) else {
                        continue;
                    };
                    let distance = pa.distance(&pb);
                    if distance < self.config.proximity_distance {
                        for (side, unit, opponent) in [(owner, a.id, other), (other, b.id, owner)] {
                            observations.push(
                                Observation::new(HeuristicKind::Proximity, side, at)
                                    .with_unit(Some(unit))
                                    .with_weight(self.config.weights.proximity)
                                    .because(format!(
                                        "{} within {:.1} of {}",
                                        side, distance, opponent
                                    )),
                            );
                        }
                        break;
                    }
                }
            }
        }
        observations.sort_by_key(|obs| obs.ready_at);
        observations
    }
}

/// A hero pressing a living enemy structure or core.
pub struct NearEnemyStructureHeuristic {
    config: Arc<HeuristicsConfig>,
}

impl NearEnemyStructureHeuristic {
    pub fn new(config: Arc<HeuristicsConfig>) -> Self {
        Self { config }
    }
}

impl Heuristic for NearEnemyStructureHeuristic {
    fn kind(&self) -> HeuristicKind {
        HeuristicKind::NearEnemyStructure
    }

    fn scan(&self, window: &Window, timeline: &MatchTimeline) -> Vec<Observation> {
        let structures: Vec<(&Unit, Team)> = timeline
            .units
            .iter()
            .filter(|u| matches!(u.category, UnitCategory::Structure | UnitCategory::Core))
            .filter_map(|u| u.team.map(|team| (u, team)))
            .collect();
        let mut observations = Vec::new();
        for (hero, team) in controlled_heroes(timeline) {
            let Some(owner) = hero.owner else {
                continue;
            };
            'instants: for at in sample_instants(window, &[hero]) {
                let Some(position) = hero.position_at(at) else {
                    continue;
                };
                for (structure, _) in structures.iter().filter(|(_, t)| *t != team) {
                    let Some(target) = structure.position_at(at) else {
                        continue;
                    };
                    if position.distance(&target) < self.config.structure_distance {
                        observations.push(
                            Observation::new(HeuristicKind::NearEnemyStructure, owner, at)
                                .with_unit(Some(hero.id))
                                .with_weight(self.config.weights.near_enemy_structure)
                                .because(format!("{} pressing {}", owner, structure.name)),
                        );
                        break 'instants;
                    }
                }
            }
        }
        observations.sort_by_key(|obs| obs.ready_at);
        observations
    }
}
