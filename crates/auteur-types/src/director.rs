use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

use crate::timeline::{ParticipantId, UnitId};

/// Coarse playback state of the observed match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Phase {
    #[default]
    NotStarted,
    Running,
    Paused,
    Ended,
}

impl Phase {
    /// `Running <-> Paused` may oscillate; everything else only moves forward
    /// and `Ended` is terminal.
    pub fn can_transition(self, next: Phase) -> bool {
        use Phase::*;
        match (self, next) {
            (a, b) if a == b => false,
            (Ended, _) => false,
            (_, NotStarted) => false,
            (NotStarted, Paused) => false,
            _ => true,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::NotStarted => "not-started",
            Phase::Running => "running",
            Phase::Paused => "paused",
            Phase::Ended => "ended",
        };
        f.write_str(label)
    }
}

/// Rungs of the priority ladder, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TierId {
    PentaKill,
    QuadKill,
    TripleKill,
    DoubleKill,
    Kill,
    Death,
    BossCapture,
    CampCapture,
    MapObjective,
    TeamObjective,
    NearEnemy,
    Structure,
    Proximity,
    RecentKiller,
    Alive,
}

impl TierId {
    /// 1-based position on the ladder.
    pub fn rank(self) -> u8 {
        self as u8 + 1
    }
}

impl fmt::Display for TierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}#{}", self, self.rank())
    }
}

/// The current camera target and how long to hold it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectorSubject {
    pub participant: ParticipantId,
    pub unit: Option<UnitId>,
    #[serde(with = "crate::secs")]
    pub anchor_time: Duration,
    #[serde(with = "crate::secs")]
    pub hold_until: Duration,
    pub classification: TierId,
}

impl DirectorSubject {
    pub fn remaining(&self, now: Duration) -> Duration {
        self.hold_until.saturating_sub(now)
    }

    pub fn is_expired(&self, now: Duration) -> bool {
        self.hold_until <= now
    }
}

/// Statistics panels the broadcast can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Panel {
    Kda,
    ActionsPerMinute,
    CarriedObjectives,
    CrowdControl,
    DeathDamageRole,
    Experience,
    Talents,
    TimeDead,
}

impl Panel {
    /// Rotation order; carried objectives are skipped on maps without them.
    pub const RING: [Panel; 8] = [
        Panel::Kda,
        Panel::ActionsPerMinute,
        Panel::CarriedObjectives,
        Panel::CrowdControl,
        Panel::DeathDamageRole,
        Panel::Experience,
        Panel::Talents,
        Panel::TimeDead,
    ];

    pub fn ring_successor(self) -> Panel {
        let idx = Self::RING.iter().position(|p| *p == self).unwrap_or(0);
        Self::RING[(idx + 1) % Self::RING.len()]
    }
}

/// Panel currently on screen and the match time it appeared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelState {
    pub panel: Panel,
    #[serde(with = "crate::secs")]
    pub shown_at: Duration,
}

/// Clock and phase as last accepted by the state loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ClockState {
    #[serde(with = "crate::secs")]
    pub clock: Duration,
    pub phase: Phase,
}

/// Outcome of one director session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SessionSummary {
    pub clock: ClockState,
    pub subject: Option<DirectorSubject>,
    pub panel: Option<PanelState>,
    pub accepted_samples: u64,
    pub unavailable_samples: u64,
    pub discarded_samples: u64,
}
