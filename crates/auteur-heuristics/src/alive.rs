use std::{collections::BTreeSet, sync::Arc};

use auteur_types::{
    config::HeuristicsConfig,
    observation::{HeuristicKind, Observation, Window},
    timeline::MatchTimeline,
};

use crate::Heuristic;

/// Fallback scanner: every participant with a living hero at the window start.
pub struct AliveHeuristic {
    config: Arc<HeuristicsConfig>,
}

impl AliveHeuristic {
    pub fn new(config: Arc<HeuristicsConfig>) -> Self {
        Self { config }
    }
}

impl Heuristic for AliveHeuristic {
    fn kind(&self) -> HeuristicKind {
        HeuristicKind::Alive
    }

    fn scan(&self, window: &Window, timeline: &MatchTimeline) -> Vec<Observation> {
        if window.is_empty() {
            return Vec::new();
        }
        let mut seen = BTreeSet::new();
        timeline
            .heroes()
            .filter(|hero| hero.alive_at(window.start))
            .filter_map(|hero| hero.owner.map(|owner| (owner, hero)))
            .filter(|(owner, _)| seen.insert(*owner))
            .map(|(owner, hero)| {
                Observation::new(HeuristicKind::Alive, owner, window.start)
                    .with_unit(Some(hero.id))
                    .with_weight(self.config.weights.alive)
                    .concluding_at(window.end)
                    .because(format!("{} alive", owner))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{secs, window};
    use auteur_types::timeline::{Team, TimelineBuilder};

    #[test]
    fn only_living_heroes_at_window_start() {
        let mut b = TimelineBuilder::new("Dragon Shire", secs(900));
        let up = b.participant("up", "Li Li", Team::Blue);
        let down = b.participant("down", "Raynor", Team::Red);
        b.hero(up, secs(0));
        let dead = b.hero(down, secs(0));
        b.kill(dead, secs(100), Some(up));
        let timeline = b.build();

        let obs = AliveHeuristic::new(Arc::new(HeuristicsConfig::default()))
            .scan(&window(100, 110), &timeline);
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].participant, up);
        assert_eq!(obs[0].ready_at, secs(100));
        assert_eq!(obs[0].concludes_at, secs(110));
    }

    #[test]
    fn empty_window_yields_nothing() {
        let mut b = TimelineBuilder::new("Dragon Shire", secs(900));
        let up = b.participant("up", "Li Li", Team::Blue);
        b.hero(up, secs(0));
        let timeline = b.build();

        let obs = AliveHeuristic::new(Arc::new(HeuristicsConfig::default()))
            .scan(&window(50, 50), &timeline);
        assert!(obs.is_empty());
    }
}
