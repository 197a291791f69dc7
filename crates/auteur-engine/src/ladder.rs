use std::{collections::BTreeSet, time::Duration};

use auteur_types::{
    config::{HeuristicsConfig, LadderConfig},
    director::TierId,
    observation::{HeuristicKind, Observation, Window},
    Result,
};

use crate::engine_error;

/// Where a tier looks relative to the current clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSizer {
    Ahead(Duration),
    Behind(Duration),
}

impl WindowSizer {
    pub fn window(&self, now: Duration) -> Window {
        match *self {
            WindowSizer::Ahead(length) => Window::ahead(now, length),
            WindowSizer::Behind(length) => Window::behind(now, length),
        }
    }

    pub fn length(&self) -> Duration {
        match *self {
            WindowSizer::Ahead(length) | WindowSizer::Behind(length) => length,
        }
    }
}

/// How long a subject picked from a tier is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldPolicy {
    /// Until the observed action concludes, plus a pad.
    Concluded(Duration),
    /// A fixed span from the decision instant.
    Fixed(Duration),
    /// Until the end of the tier's window.
    Window,
}

impl HoldPolicy {
    pub fn hold_until(&self, observation: &Observation, window: &Window, now: Duration) -> Duration {
        match *self {
            HoldPolicy::Concluded(pad) => observation.concludes_at + pad,
            HoldPolicy::Fixed(span) => now + span,
            HoldPolicy::Window => window.end,
        }
    }
}

/// Ordering of observations inside a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierOrder {
    /// Earliest `ready_at` first, heavier first on ties.
    EarliestReady,
    /// Most recent first; used for look-back tiers.
    LatestReady,
}

impl TierOrder {
    pub fn sort(&self, observations: &mut [Observation]) {
        observations.sort_by(|a, b| {
            let by_time = match self {
                TierOrder::EarliestReady => a.ready_at.cmp(&b.ready_at),
                TierOrder::LatestReady => b.ready_at.cmp(&a.ready_at),
            };
            by_time.then_with(|| b.weight.total_cmp(&a.weight))
        });
    }
}

/// One rung: which scanners feed it, over which window, and how its pick is held.
#[derive(Debug, Clone, PartialEq)]
pub struct Tier {
    pub id: TierId,
    pub sources: Vec<HeuristicKind>,
    pub sizer: WindowSizer,
    pub hold: HoldPolicy,
    pub order: TierOrder,
    /// Drop candidates whose participant has no living hero at decision time.
    pub require_alive: bool,
    /// Prefer someone other than the current subject.
    pub rotate: bool,
}

impl Tier {
    pub fn new(id: TierId, sources: &[HeuristicKind], sizer: WindowSizer, hold: HoldPolicy) -> Self {
        Self {
            id,
            sources: sources.to_vec(),
            sizer,
            hold,
            order: TierOrder::EarliestReady,
            require_alive: false,
            rotate: false,
        }
    }

    pub fn ordered(mut self, order: TierOrder) -> Self {
        self.order = order;
        self
    }

    pub fn alive_only(mut self) -> Self {
        self.require_alive = true;
        self
    }

    pub fn rotating(mut self) -> Self {
        self.rotate = true;
        self
    }
}

/// The ordered list of tiers, evaluated top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct Ladder {
    tiers: Vec<Tier>,
    minimum_hold: Duration,
}

impl Ladder {
    pub fn new(tiers: Vec<Tier>, minimum_hold: Duration) -> Result<Self> {
        if tiers.is_empty() {
            return Err(engine_error("ladder has no tiers"));
        }
        let mut seen = BTreeSet::new();
        for tier in &tiers {
            if !seen.insert(tier.id) {
                return Err(engine_error(format!("tier {} listed twice", tier.id)));
            }
            if tier.sources.is_empty() {
                return Err(engine_error(format!("tier {} has no scanners", tier.id)));
            }
        }
        Ok(Self {
            tiers,
            minimum_hold,
        })
    }

    /// The standard fifteen-rung ladder.
    pub fn from_config(heuristics: &HeuristicsConfig, ladder: &LadderConfig) -> Result<Self> {
        let secs = Duration::from_secs;
        let kill_window = secs(ladder.kill_window_secs);
        // A chain of n kills spans at most n - 1 streak timers.
        let streak = |kills: u32| {
            WindowSizer::Ahead(kill_window.max(heuristics.streak_timer() * (kills - 1)))
        };
        let streak_hold = HoldPolicy::Concluded(secs(ladder.streak_hold_pad_secs));
        let event_hold = HoldPolicy::Concluded(secs(ladder.event_hold_pad_secs));

        let tiers = vec![
            Tier::new(TierId::PentaKill, &[HeuristicKind::PentaKill], streak(5), streak_hold),
            Tier::new(TierId::QuadKill, &[HeuristicKind::QuadKill], streak(4), streak_hold),
            Tier::new(TierId::TripleKill, &[HeuristicKind::TripleKill], streak(3), streak_hold),
            Tier::new(TierId::DoubleKill, &[HeuristicKind::DoubleKill], streak(2), streak_hold),
            Tier::new(
                TierId::Kill,
                &[HeuristicKind::Kill],
                WindowSizer::Ahead(kill_window),
                HoldPolicy::Concluded(secs(ladder.kill_hold_pad_secs)),
            ),
            Tier::new(
                TierId::Death,
                &[HeuristicKind::Death],
                WindowSizer::Ahead(secs(ladder.death_window_secs)),
                HoldPolicy::Concluded(secs(ladder.death_hold_pad_secs)),
            ),
            Tier::new(
                TierId::BossCapture,
                &[HeuristicKind::BossCapture],
                WindowSizer::Ahead(secs(ladder.capture_window_secs)),
                event_hold,
            ),
            Tier::new(
                TierId::CampCapture,
                &[HeuristicKind::CampCapture],
                WindowSizer::Ahead(secs(ladder.capture_window_secs)),
                event_hold,
            ),
            Tier::new(
                TierId::MapObjective,
                &[HeuristicKind::MapObjective],
                WindowSizer::Ahead(secs(ladder.objective_window_secs)),
                event_hold,
            ),
            Tier::new(
                TierId::TeamObjective,
                &[HeuristicKind::TeamObjective],
                WindowSizer::Ahead(secs(ladder.objective_window_secs)),
                event_hold,
            ),
            Tier::new(
                TierId::NearEnemy,
                &[
                    HeuristicKind::NearEnemyStructure,
                    HeuristicKind::Emote,
                    HeuristicKind::Roaming,
                    HeuristicKind::Vehicle,
                ],
                WindowSizer::Ahead(secs(ladder.near_enemy_window_secs)),
                HoldPolicy::Window,
            ),
            Tier::new(
                TierId::Structure,
                &[HeuristicKind::Structure],
                WindowSizer::Ahead(secs(ladder.structure_window_secs)),
                event_hold,
            ),
            Tier::new(
                TierId::Proximity,
                &[HeuristicKind::Proximity],
                WindowSizer::Ahead(secs(ladder.proximity_window_secs)),
                HoldPolicy::Window,
            )
            .rotating(),
            Tier::new(
                TierId::RecentKiller,
                &[HeuristicKind::RecentKiller],
                WindowSizer::Behind(secs(ladder.recency_lookback_secs)),
                HoldPolicy::Fixed(secs(ladder.recency_hold_secs)),
            )
            .ordered(TierOrder::LatestReady)
            .alive_only(),
            Tier::new(
                TierId::Alive,
                &[HeuristicKind::Alive],
                WindowSizer::Ahead(secs(ladder.alive_window_secs)),
                HoldPolicy::Window,
            )
            .rotating(),
        ];
        Self::new(tiers, secs(ladder.minimum_hold_secs))
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn minimum_hold(&self) -> Duration {
        self.minimum_hold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_ladder_order_and_windows() {
        let ladder = Ladder::from_config(&HeuristicsConfig::default(), &LadderConfig::default())
            .unwrap();
        let ids: Vec<TierId> = ladder.tiers().iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), 15);
        for (idx, id) in ids.iter().enumerate() {
            assert_eq!(id.rank() as usize, idx + 1);
        }
        let penta = &ladder.tiers()[0];
        let proximity = &ladder.tiers()[12];
        assert_eq!(penta.sizer, WindowSizer::Ahead(Duration::from_secs(48)));
        assert!(penta.sizer.length() > proximity.sizer.length());
        assert!(proximity.rotate);
        assert!(matches!(ladder.tiers()[13].sizer, WindowSizer::Behind(_)));
    }

    #[test]
    fn duplicate_or_empty_tiers_are_rejected() {
        let tier = Tier::new(
            TierId::Alive,
            &[HeuristicKind::Alive],
            WindowSizer::Ahead(Duration::from_secs(5)),
            HoldPolicy::Window,
        );
        assert!(Ladder::new(vec![tier.clone(), tier.clone()], Duration::ZERO).is_err());
        assert!(Ladder::new(Vec::new(), Duration::ZERO).is_err());
        let hollow = Tier::new(
            TierId::Kill,
            &[],
            WindowSizer::Ahead(Duration::from_secs(5)),
            HoldPolicy::Window,
        );
        assert!(Ladder::new(vec![tier, hollow], Duration::ZERO).is_err());
    }

    #[test]
    fn tier_order_breaks_ties_by_weight() {
        let p = auteur_types::timeline::ParticipantId;
        let at = Duration::from_secs;
        let mut observations = vec![
            Observation::new(HeuristicKind::Emote, p(1), at(5)).with_weight(1.0),
            Observation::new(HeuristicKind::Roaming, p(2), at(3)).with_weight(1.0),
            Observation::new(HeuristicKind::Vehicle, p(3), at(5)).with_weight(4.0),
        ];
        TierOrder::EarliestReady.sort(&mut observations);
        let order: Vec<u32> = observations.iter().map(|o| o.participant.0).collect();
        assert_eq!(order, vec![2, 3, 1]);

        TierOrder::LatestReady.sort(&mut observations);
        assert_eq!(observations[2].participant, p(2));
    }
}
