use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

use crate::timeline::{ParticipantId, UnitId};

/// Half-open `[start, end)` span of match time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Window {
    #[serde(with = "crate::secs")]
    pub start: Duration,
    #[serde(with = "crate::secs")]
    pub end: Duration,
}

impl Window {
    /// Builds a window; an inverted range collapses to an empty one at `start`.
    pub fn new(start: Duration, end: Duration) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// `[now, now + length)`
    pub fn ahead(now: Duration, length: Duration) -> Self {
        Self::new(now, now.saturating_add(length))
    }

    /// `[now - length, now)`, clamped at the start of the match.
    pub fn behind(now: Duration, length: Duration) -> Self {
        Self::new(now.saturating_sub(length), now)
    }

    pub fn contains(&self, at: Duration) -> bool {
        self.start <= at && at < self.end
    }

    pub fn len(&self) -> Duration {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Same end, start moved back by `by` (used to look slightly before a window).
    pub fn extended_back(&self, by: Duration) -> Self {
        Self::new(self.start.saturating_sub(by), self.end)
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.1}s, {:.1}s)",
            self.start.as_secs_f64(),
            self.end.as_secs_f64()
        )
    }
}

/// Phenomenon a scanner detects; doubles as the bucket key of a window analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HeuristicKind {
    Kill,
    DoubleKill,
    TripleKill,
    QuadKill,
    PentaKill,
    Death,
    BossCapture,
    CampCapture,
    MapObjective,
    TeamObjective,
    NearEnemyStructure,
    Emote,
    Roaming,
    Vehicle,
    Structure,
    Proximity,
    RecentKiller,
    Alive,
}

impl HeuristicKind {
    pub const ALL: [HeuristicKind; 18] = [
        HeuristicKind::Kill,
        HeuristicKind::DoubleKill,
        HeuristicKind::TripleKill,
        HeuristicKind::QuadKill,
        HeuristicKind::PentaKill,
        HeuristicKind::Death,
        HeuristicKind::BossCapture,
        HeuristicKind::CampCapture,
        HeuristicKind::MapObjective,
        HeuristicKind::TeamObjective,
        HeuristicKind::NearEnemyStructure,
        HeuristicKind::Emote,
        HeuristicKind::Roaming,
        HeuristicKind::Vehicle,
        HeuristicKind::Structure,
        HeuristicKind::Proximity,
        HeuristicKind::RecentKiller,
        HeuristicKind::Alive,
    ];

    /// Kill-streak bucket for a required kill count (2..=5).
    pub fn multi_kill(required: usize) -> Option<Self> {
        match required {
            2 => Some(HeuristicKind::DoubleKill),
            3 => Some(HeuristicKind::TripleKill),
            4 => Some(HeuristicKind::QuadKill),
            5 => Some(HeuristicKind::PentaKill),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HeuristicKind::Kill => "kill",
            HeuristicKind::DoubleKill => "double-kill",
            HeuristicKind::TripleKill => "triple-kill",
            HeuristicKind::QuadKill => "quad-kill",
            HeuristicKind::PentaKill => "penta-kill",
            HeuristicKind::Death => "death",
            HeuristicKind::BossCapture => "boss-capture",
            HeuristicKind::CampCapture => "camp-capture",
            HeuristicKind::MapObjective => "map-objective",
            HeuristicKind::TeamObjective => "team-objective",
            HeuristicKind::NearEnemyStructure => "near-enemy-structure",
            HeuristicKind::Emote => "emote",
            HeuristicKind::Roaming => "roaming",
            HeuristicKind::Vehicle => "vehicle",
            HeuristicKind::Structure => "structure",
            HeuristicKind::Proximity => "proximity",
            HeuristicKind::RecentKiller => "recent-killer",
            HeuristicKind::Alive => "alive",
        }
    }
}

impl fmt::Display for HeuristicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A scored, time-anchored suggestion that a participant is worth showing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub source: HeuristicKind,
    pub unit: Option<UnitId>,
    pub participant: ParticipantId,
    pub weight: f64,
    /// Earliest offset at which the observation is valid.
    #[serde(with = "crate::secs")]
    pub ready_at: Duration,
    /// Offset at which the observed action is over; never before `ready_at`.
    #[serde(with = "crate::secs")]
    pub concludes_at: Duration,
    pub rationale: String,
}

impl Observation {
    pub fn new(source: HeuristicKind, participant: ParticipantId, ready_at: Duration) -> Self {
        Self {
            source,
            unit: None,
            participant,
            weight: 0.0,
            ready_at,
            concludes_at: ready_at,
            rationale: String::new(),
        }
    }

    pub fn with_unit(mut self, unit: Option<UnitId>) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn concluding_at(mut self, at: Duration) -> Self {
        self.concludes_at = at.max(self.ready_at);
        self
    }

    pub fn because(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = rationale.into();
        self
    }
}
