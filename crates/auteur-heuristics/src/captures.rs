use std::{collections::BTreeMap, sync::Arc};

use auteur_types::{
    config::HeuristicsConfig,
    observation::{HeuristicKind, Observation, Window},
    timeline::{FactKind, MatchTimeline, ParticipantId, Team, TimelineFact, UnitCategory},
};
use tracing::debug;

use crate::Heuristic;

/// Which camp units earn capture credit. Boss and standard camps never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampTier {
    Standard,
    Boss,
}

impl CampTier {
    fn category(self) -> UnitCategory {
        match self {
            CampTier::Standard => UnitCategory::MercenaryCamp,
            CampTier::Boss => UnitCategory::BossCamp,
        }
    }

    fn kind(self) -> HeuristicKind {
        match self {
            CampTier::Standard => HeuristicKind::CampCapture,
            CampTier::Boss => HeuristicKind::BossCapture,
        }
    }
}

/// Credits a camp capture to the capturing team's participants who killed
/// qualifying camp units shortly before it.
pub struct CaptureHeuristic {
    config: Arc<HeuristicsConfig>,
    tier: CampTier,
}

impl CaptureHeuristic {
    pub fn new(config: Arc<HeuristicsConfig>, tier: CampTier) -> Self {
        Self { config, tier }
    }

    fn capturing_team(&self, fact: &TimelineFact) -> Option<Team> {
        if fact.kind != FactKind::Tracker
            || fact.event_name() != Some(self.config.camp_capture_event.as_str())
        {
            return None;
        }
        let team = fact.u64_field("team").and_then(Team::from_index);
        if team.is_none() {
            debug!(at = ?fact.at, "capture fact without a usable team id; skipping");
        }
        team
    }

    fn weight(&self) -> f64 {
        match self.tier {
            CampTier::Standard => self.config.weights.camp_capture,
            CampTier::Boss => self.config.weights.boss_capture,
        }
    }
}

impl Heuristic for CaptureHeuristic {
    fn kind(&self) -> HeuristicKind {
        self.tier.kind()
    }

    fn scan(&self, window: &Window, timeline: &MatchTimeline) -> Vec<Observation> {
        let credit = self.config.capture_credit();
        let mut observations = Vec::new();
        for fact in timeline.facts_within(window) {
            let Some(team) = self.capturing_team(fact) else {
                continue;
            };
            let earliest = fact.at.saturating_sub(credit);
            let mut credited: BTreeMap<ParticipantId, usize> = BTreeMap::new();
            for unit in timeline
                .units
                .iter()
                .filter(|u| u.category == self.tier.category())
            {
                let (Some(died), Some(killer)) = (unit.died_at, unit.killer) else {
                    continue;
                };
                if died < earliest || died > fact.at {
                    continue;
                }
                if timeline.team_of(killer) == Some(team) {
                    *credited.entry(killer).or_default() += 1;
                }
            }
            for (participant, count) in credited {
                observations.push(
                    Observation::new(self.tier.kind(), participant, fact.at)
                        .with_unit(timeline.hero_of(participant, fact.at).map(|u| u.id))
                        .with_weight(self.weight())
                        .because(format!(
                            "{} took {} camp unit(s) for {:?}",
                            participant, count, team
                        )),
                );
            }
        }
        observations.sort_by_key(|obs| obs.ready_at);
        observations
    }
}
