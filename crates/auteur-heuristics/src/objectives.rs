use std::sync::Arc;

use auteur_types::{
    config::HeuristicsConfig,
    observation::{HeuristicKind, Observation, Window},
    timeline::{FactKind, MatchTimeline, UnitCategory},
};
use tracing::debug;

use crate::Heuristic;

/// Map objective units (terrors, golems, shrines) destroyed by a participant.
pub struct MapObjectiveHeuristic {
    config: Arc<HeuristicsConfig>,
}

impl MapObjectiveHeuristic {
    pub fn new(config: Arc<HeuristicsConfig>) -> Self {
        Self { config }
    }
}

impl Heuristic for MapObjectiveHeuristic {
    fn kind(&self) -> HeuristicKind {
        HeuristicKind::MapObjective
    }

    fn scan(&self, window: &Window, timeline: &MatchTimeline) -> Vec<Observation> {
        let mut observations: Vec<Observation> = timeline
            .units
            .iter()
            .filter(|u| u.category == UnitCategory::MapObjective)
            .filter_map(|unit| {
                let at = unit.died_within(window)?;
                let killer = unit.killer?;
                Some(
                    Observation::new(HeuristicKind::MapObjective, killer, at)
                        .with_unit(timeline.hero_of(killer, at).map(|u| u.id))
                        .with_weight(self.config.weights.map_objective)
                        .because(format!("{} finished {}", killer, unit.name)),
                )
            })
            .collect();
        observations.sort_by_key(|obs| obs.ready_at);
        observations
    }
}

/// Objective tracker events carrying the participant who scored them.
pub struct TeamObjectiveHeuristic {
    config: Arc<HeuristicsConfig>,
}

impl TeamObjectiveHeuristic {
    pub fn new(config: Arc<HeuristicsConfig>) -> Self {
        Self { config }
    }
}

impl Heuristic for TeamObjectiveHeuristic {
    fn kind(&self) -> HeuristicKind {
        HeuristicKind::TeamObjective
    }

    fn scan(&self, window: &Window, timeline: &MatchTimeline) -> Vec<Observation> {
        let mut observations = Vec::new();
        for fact in timeline
            .facts_within(window)
            .filter(|fact| fact.kind == FactKind::Tracker)
        {
            let Some(event) = fact.event_name() else {
                debug!(at = ?fact.at, "tracker fact without event name; skipping");
                continue;
            };
            if !self.config.team_objective_events.iter().any(|e| e == event) {
                continue;
            }
            let Some(participant) = fact.participant else {
                continue;
            };
            observations.push(
                Observation::new(HeuristicKind::TeamObjective, participant, fact.at)
                    .with_unit(timeline.hero_of(participant, fact.at).map(|u| u.id))
                    .with_weight(self.config.weights.team_objective)
                    .because(format!("{} scored {}", participant, event)),
            );
        }
        observations.sort_by_key(|obs| obs.ready_at);
        observations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{secs, window};
    use auteur_types::timeline::{Team, TimelineBuilder, TimelineFact};

    #[test]
    fn objective_units_and_facts() {
        let mut b = TimelineBuilder::new("Garden of Terror", secs(900));
        let p = b.participant("p", "Thrall", Team::Blue);
        b.hero(p, secs(0));
        let terror = b.unit("GardenTerror", UnitCategory::MapObjective, Some(Team::Red), secs(0));
        b.kill(terror, secs(300), Some(p))
            .fact(TimelineFact::tracker(secs(305), "TributeCollected", Some(p)))
            .fact(TimelineFact::tracker(secs(306), "TributeCollected", None))
            .fact(TimelineFact::tracker(secs(307), "SomethingElse", Some(p)));
        let timeline = b.build();
        let config = Arc::new(HeuristicsConfig::default());

        let map = MapObjectiveHeuristic::new(config.clone()).scan(&window(290, 310), &timeline);
        assert_eq!(map.len(), 1);
        assert_eq!(map[0].ready_at, secs(300));

        let team = TeamObjectiveHeuristic::new(config).scan(&window(290, 310), &timeline);
        assert_eq!(team.len(), 1);
        assert_eq!(team[0].participant, p);
        assert_eq!(team[0].ready_at, secs(305));
    }
}
