use std::time::Duration;

use auteur_types::director::{ClockState, Phase};
use tracing::{debug, warn};

/// Per-session clock sample counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleStats {
    pub accepted: u64,
    pub unavailable: u64,
    pub discarded: u64,
}

/// Result of feeding one clock reading to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// The reading was taken; carries the phase transition it caused, if any.
    Accepted(Option<(Phase, Phase)>),
    Discarded,
}

/// Phase machine driven by external clock samples.
#[derive(Debug, Clone)]
pub struct ClockTracker {
    state: ClockState,
    sanity_threshold: Duration,
    primed: bool,
    stats: SampleStats,
}

impl ClockTracker {
    pub fn new(sanity_threshold: Duration) -> Self {
        Self {
            state: ClockState::default(),
            sanity_threshold,
            primed: false,
            stats: SampleStats::default(),
        }
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn stats(&self) -> SampleStats {
        self.stats
    }

    pub fn record_unavailable(&mut self) {
        self.stats.unavailable += 1;
    }

    pub fn observe(&mut self, sample: Duration) -> SampleOutcome {
        let previous = self.state;
        if previous.phase == Phase::Ended {
            self.stats.discarded += 1;
            return SampleOutcome::Discarded;
        }
        // Jumps are only judged once a real reading has been seen, so joining
        // a replay mid-way is not mistaken for noise.
        if self.primed {
            let jump = if sample > previous.clock {
                sample - previous.clock
            } else {
                previous.clock - sample
            };
            if jump > self.sanity_threshold {
                warn!(
                    sample = ?sample,
                    previous = ?previous.clock,
                    "clock sample jumped too far; discarding"
                );
                self.stats.discarded += 1;
                return SampleOutcome::Discarded;
            }
        }

        let proposed = if sample > previous.clock {
            Phase::Running
        } else if sample == previous.clock && previous.phase == Phase::Running {
            Phase::Paused
        } else {
            previous.phase
        };
        let phase = if previous.phase.can_transition(proposed) {
            proposed
        } else {
            previous.phase
        };

        self.state = ClockState {
            clock: sample,
            phase,
        };
        self.primed |= !sample.is_zero();
        self.stats.accepted += 1;
        debug!(clock = ?sample, %phase, "clock sample accepted");
        SampleOutcome::Accepted((phase != previous.phase).then_some((previous.phase, phase)))
    }

    /// Marks a started match as over; returns the transition if one happened.
    pub fn end(&mut self) -> Option<(Phase, Phase)> {
        let previous = self.state.phase;
        if !matches!(previous, Phase::Running | Phase::Paused) {
            return None;
        }
        self.state.phase = Phase::Ended;
        Some((previous, Phase::Ended))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(value: u64) -> Duration {
        Duration::from_secs(value)
    }

    fn tracker() -> ClockTracker {
        ClockTracker::new(secs(30))
    }

    #[test]
    fn zero_clock_stays_not_started() {
        let mut t = tracker();
        assert_eq!(t.observe(Duration::ZERO), SampleOutcome::Accepted(None));
        assert_eq!(t.state().phase, Phase::NotStarted);
        assert_eq!(
            t.observe(Duration::from_millis(500)),
            SampleOutcome::Accepted(Some((Phase::NotStarted, Phase::Running)))
        );
    }

    #[test]
    fn running_pause_running() {
        let mut t = tracker();
        t.observe(secs(10));
        assert_eq!(
            t.observe(secs(10)),
            SampleOutcome::Accepted(Some((Phase::Running, Phase::Paused)))
        );
        assert_eq!(t.observe(secs(10)), SampleOutcome::Accepted(None));
        assert_eq!(
            t.observe(secs(11)),
            SampleOutcome::Accepted(Some((Phase::Paused, Phase::Running)))
        );
    }

    #[test]
    fn wild_jumps_are_discarded() {
        let mut t = tracker();
        t.observe(secs(100));
        assert_eq!(t.observe(secs(400)), SampleOutcome::Discarded);
        assert_eq!(t.observe(secs(20)), SampleOutcome::Discarded);
        assert_eq!(t.state().clock, secs(100));
        assert_eq!(t.observe(secs(95)), SampleOutcome::Accepted(None));
        assert_eq!(t.state().phase, Phase::Running);
        assert_eq!(t.stats().discarded, 2);
        assert_eq!(t.stats().accepted, 2);
    }

    #[test]
    fn first_reading_mid_match_is_trusted() {
        let mut t = tracker();
        assert_eq!(
            t.observe(secs(600)),
            SampleOutcome::Accepted(Some((Phase::NotStarted, Phase::Running)))
        );
    }

    #[test]
    fn unavailable_reads_keep_the_phase() {
        let mut t = tracker();
        t.observe(secs(10));
        t.observe(secs(11));
        for _ in 0..10 {
            t.record_unavailable();
        }
        assert_eq!(t.state().phase, Phase::Running);
        assert_eq!(t.stats().unavailable, 10);
    }

    #[test]
    fn ended_is_terminal() {
        let mut t = tracker();
        assert_eq!(t.end(), None);
        t.observe(secs(10));
        assert_eq!(t.end(), Some((Phase::Running, Phase::Ended)));
        assert_eq!(t.end(), None);
        assert_eq!(t.observe(secs(11)), SampleOutcome::Discarded);
        assert_eq!(t.state().phase, Phase::Ended);
    }
}
