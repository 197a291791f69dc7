use std::time::Duration;

use auteur_heuristics::WindowAnalysis;
use auteur_types::{
    config::PanelConfig,
    director::{Panel, PanelState},
    observation::{HeuristicKind, Window},
};
use serde::Serialize;
use tracing::debug;

/// Scanners whose output can force an early switch to the carried-objectives panel.
pub const TRIGGER_KINDS: [HeuristicKind; 2] =
    [HeuristicKind::MapObjective, HeuristicKind::TeamObjective];

/// What to show and when to ask again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PanelDecision {
    pub state: PanelState,
    #[serde(skip)]
    pub review_at: Duration,
}

impl PanelDecision {
    pub fn changed_from(&self, previous: Option<&PanelState>) -> bool {
        previous.map_or(true, |prev| prev.panel != self.state.panel)
    }
}

/// Dwell-based panel rotation with an early-game talent phase, pinned
/// schedule entries and objective triggers.
pub struct PanelSelector {
    config: PanelConfig,
    carried_objectives: bool,
}

impl PanelSelector {
    pub fn new(config: PanelConfig, map: &str) -> Self {
        let carried_objectives = config.supports_carried_objectives(map);
        Self {
            config,
            carried_objectives,
        }
    }

    /// Window the caller should analyse with [`TRIGGER_KINDS`] before selecting.
    pub fn trigger_window(&self, now: Duration) -> Window {
        Window::ahead(now, Duration::from_secs(self.config.trigger_window_secs))
    }

    pub fn dwell(&self, panel: Panel) -> Duration {
        self.config.dwell.dwell(panel)
    }

    /// Next panel in the ring, skipping carried objectives where the map lacks them.
    pub fn successor(&self, panel: Panel) -> Panel {
        let next = panel.ring_successor();
        if next == Panel::CarriedObjectives && !self.carried_objectives {
            return next.ring_successor();
        }
        next
    }

    pub fn select(
        &self,
        current: Option<&PanelState>,
        analysis: &WindowAnalysis,
        now: Duration,
    ) -> PanelDecision {
        let recheck = now + Duration::from_secs(self.config.recheck_secs);
        let cutoff = self.config.talent_cutoff();

        if now < cutoff {
            let state = match current {
                Some(state) if state.panel == Panel::Talents => *state,
                _ => self.show(Panel::Talents, now),
            };
            return PanelDecision {
                state,
                review_at: cutoff.min(recheck),
            };
        }

        let Some(current) = current else {
            let panel = self.pinned(now).unwrap_or(Panel::Kda);
            return self.decide(self.show(panel, now), now, recheck);
        };
        let dwell_ends = current.shown_at + self.dwell(current.panel);

        if current.panel == Panel::Talents {
            if now < dwell_ends {
                return self.hold(*current, dwell_ends, recheck);
            }
            let next = if current.shown_at < cutoff {
                // Leaving the early-game talent phase restarts the ring.
                Panel::Kda
            } else {
                self.successor(Panel::Talents)
            };
            let panel = self.pinned(now).unwrap_or(next);
            return self.decide(self.show(panel, now), now, recheck);
        }

        if let Some(pinned) = self.pinned(now) {
            if pinned != current.panel {
                debug!(?pinned, "pinned panel takes over");
                return self.decide(self.show(pinned, now), now, recheck);
            }
            return self.hold(*current, dwell_ends.max(self.pinned_until(now)), recheck);
        }

        if self.carried_objectives
            && current.panel != Panel::CarriedObjectives
            && TRIGGER_KINDS.iter().any(|kind| !analysis.get(*kind).is_empty())
        {
            debug!("objective in sight; switching to carried objectives");
            return self.decide(self.show(Panel::CarriedObjectives, now), now, recheck);
        }

        if now >= dwell_ends {
            let next = self.successor(current.panel);
            return self.decide(self.show(next, now), now, recheck);
        }
        self.hold(*current, dwell_ends, recheck)
    }

    fn show(&self, panel: Panel, now: Duration) -> PanelState {
        PanelState {
            panel,
            shown_at: now,
        }
    }

    fn decide(&self, state: PanelState, now: Duration, recheck: Duration) -> PanelDecision {
        self.hold(state, now + self.dwell(state.panel), recheck)
    }

    fn hold(&self, state: PanelState, until: Duration, recheck: Duration) -> PanelDecision {
        PanelDecision {
            state,
            review_at: until.min(recheck),
        }
    }

    fn pinned(&self, now: Duration) -> Option<Panel> {
        self.config
            .schedule
            .iter()
            .find(|entry| entry.covers(now))
            .map(|entry| entry.panel)
    }

    fn pinned_until(&self, now: Duration) -> Duration {
        self.config
            .schedule
            .iter()
            .find(|entry| entry.covers(now))
            .map(|entry| entry.until())
            .unwrap_or(now)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use auteur_heuristics::WindowAnalyzer;
    use auteur_types::{
        config::{HeuristicsConfig, PinnedPanel},
        timeline::{MatchTimeline, Team, TimelineBuilder, UnitCategory},
    };

    fn secs(value: u64) -> Duration {
        Duration::from_secs(value)
    }

    fn quiet(map: &str) -> MatchTimeline {
        TimelineBuilder::new(map, secs(1200)).build()
    }

    fn analysis(selector: &PanelSelector, timeline: &MatchTimeline, now: Duration) -> WindowAnalysis {
        WindowAnalyzer::standard(Arc::new(HeuristicsConfig::default()))
            .unwrap()
            .analyze_for(selector.trigger_window(now), timeline, &TRIGGER_KINDS)
    }

    fn run_cycle(map: &str) -> Vec<Panel> {
        let selector = PanelSelector::new(PanelConfig::default(), map);
        let timeline = quiet(map);
        let mut state = PanelState {
            panel: Panel::Kda,
            shown_at: secs(200),
        };
        let mut seen = vec![state.panel];
        let mut now = secs(200);
        while seen.len() < 9 {
            now += selector.dwell(state.panel);
            let decision = selector.select(Some(&state), &analysis(&selector, &timeline, now), now);
            assert!(decision.changed_from(Some(&state)));
            state = decision.state;
            seen.push(state.panel);
        }
        seen
    }

    #[test]
    fn ring_cycles_back_to_kda() {
        let plain = run_cycle("Braxis Holdout");
        assert_eq!(
            &plain[..3],
            &[Panel::Kda, Panel::ActionsPerMinute, Panel::CrowdControl]
        );
        assert!(!plain.contains(&Panel::CarriedObjectives));
        assert_eq!(plain[7], Panel::Kda);

        let bay = run_cycle("Blackheart's Bay");
        assert_eq!(bay[2], Panel::CarriedObjectives);
        assert_eq!(bay[8], Panel::Kda);
    }

    #[test]
    fn talents_before_cutoff_then_kda() {
        let selector = PanelSelector::new(PanelConfig::default(), "Hanamura");
        let timeline = quiet("Hanamura");
        let empty = analysis(&selector, &timeline, secs(0));

        let first = selector.select(None, &empty, secs(3));
        assert_eq!(first.state.panel, Panel::Talents);
        assert_eq!(first.review_at, secs(8));

        let kept = selector.select(Some(&first.state), &empty, secs(60));
        assert_eq!(kept.state, first.state);

        let after = selector.select(Some(&first.state), &empty, secs(90));
        assert_eq!(after.state.panel, Panel::Kda);
        assert_eq!(after.state.shown_at, secs(90));
    }

    #[test]
    fn pinned_panel_preempts_all_but_talents() {
        let mut config = PanelConfig::default();
        config.schedule.push(PinnedPanel {
            from_secs: 300,
            until_secs: 340,
            panel: Panel::Experience,
        });
        let selector = PanelSelector::new(config, "Hanamura");
        let timeline = quiet("Hanamura");
        let empty = analysis(&selector, &timeline, secs(0));

        let kda = PanelState {
            panel: Panel::Kda,
            shown_at: secs(295),
        };
        let pinned = selector.select(Some(&kda), &empty, secs(301));
        assert_eq!(pinned.state.panel, Panel::Experience);

        let held = selector.select(Some(&pinned.state), &empty, secs(320));
        assert_eq!(held.state, pinned.state);

        let talents = PanelState {
            panel: Panel::Talents,
            shown_at: secs(290),
        };
        let untouched = selector.select(Some(&talents), &empty, secs(305));
        assert_eq!(untouched.state, talents);
        assert_eq!(untouched.review_at, secs(310));
    }

    #[test]
    fn objective_trigger_switches_early_on_supported_maps() {
        let build = |map: &str| {
            let mut b = TimelineBuilder::new(map, secs(1200));
            let p = b.participant("p", "Muradin", Team::Blue);
            b.hero(p, secs(0));
            let boss = b.unit("SpiderQueen", UnitCategory::MapObjective, None, secs(0));
            b.kill(boss, secs(402), Some(p));
            b.build()
        };
        let kda = PanelState {
            panel: Panel::Kda,
            shown_at: secs(395),
        };

        let map = "Tomb of the Spider Queen";
        let selector = PanelSelector::new(PanelConfig::default(), map);
        let timeline = build(map);
        let decision =
            selector.select(Some(&kda), &analysis(&selector, &timeline, secs(400)), secs(400));
        assert_eq!(decision.state.panel, Panel::CarriedObjectives);

        let map = "Infernal Shrines";
        let selector = PanelSelector::new(PanelConfig::default(), map);
        let timeline = build(map);
        let decision =
            selector.select(Some(&kda), &analysis(&selector, &timeline, secs(400)), secs(400));
        assert_eq!(decision.state, kda);
        assert_eq!(decision.review_at, secs(405));
    }
}
