use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
    time::Duration,
};

use auteur_types::{
    config::HeuristicsConfig,
    observation::{HeuristicKind, Observation, Window},
    timeline::{FactKind, MatchTimeline, ParticipantId, UnitCategory, UnitId},
};
use tracing::debug;

use crate::{sample_instants, Heuristic};

/// B-stepping (bursts of hearth commands) and taunt/dance casts.
pub struct EmoteHeuristic {
    config: Arc<HeuristicsConfig>,
}

impl EmoteHeuristic {
    pub fn new(config: Arc<HeuristicsConfig>) -> Self {
        Self { config }
    }

    /// First instant inside `window` where a burst completes.
    fn burst_end(&self, times: &[Duration], window: &Window) -> Option<Duration> {
        let span = self.config.bstep_window();
        let needed = self.config.bstep_min_commands;
        let mut first = 0;
        for (last, at) in times.iter().enumerate() {
            while first < last && *at - times[first] >= span {
                first += 1;
            }
            if last + 1 - first >= needed && window.contains(*at) {
                return Some(*at);
            }
        }
        None
    }
}

impl Heuristic for EmoteHeuristic {
    fn kind(&self) -> HeuristicKind {
        HeuristicKind::Emote
    }

    fn scan(&self, window: &Window, timeline: &MatchTimeline) -> Vec<Observation> {
        // Look back so a burst straddling the window start still counts.
        let lookback = window.extended_back(self.config.bstep_window());
        let mut hearths: BTreeMap<ParticipantId, Vec<Duration>> = BTreeMap::new();
        let mut taunts: BTreeMap<ParticipantId, (Duration, String)> = BTreeMap::new();

        for fact in timeline
            .facts_within(&lookback)
            .filter(|fact| fact.kind == FactKind::Command)
        {
            let (Some(participant), Some(ability)) = (fact.participant, fact.ability()) else {
                debug!(at = ?fact.at, "command fact without participant or ability; skipping");
                continue;
            };
            if ability == self.config.hearth_ability {
                hearths.entry(participant).or_default().push(fact.at);
            } else if window.contains(fact.at)
                && self.config.taunt_abilities.iter().any(|t| t == ability)
            {
                let entry = taunts
                    .entry(participant)
                    .or_insert_with(|| (fact.at, ability.to_string()));
                if fact.at < entry.0 {
                    *entry = (fact.at, ability.to_string());
                }
            }
        }

        let mut observations = Vec::new();
        for (participant, mut times) in hearths {
            times.sort();
            if let Some(at) = self.burst_end(&times, window) {
                observations.push(
                    Observation::new(HeuristicKind::Emote, participant, at)
                        .with_unit(timeline.hero_of(participant, at).map(|u| u.id))
                        .with_weight(self.config.weights.emote)
                        .because(format!("{} b-stepping", participant)),
                );
            }
        }
        for (participant, (at, ability)) in taunts {
            observations.push(
                Observation::new(HeuristicKind::Emote, participant, at)
                    .with_unit(timeline.hero_of(participant, at).map(|u| u.id))
                    .with_weight(self.config.weights.emote)
                    .because(format!("{} cast {}", participant, ability)),
            );
        }
        observations.sort_by_key(|obs| obs.ready_at);
        observations
    }
}

/// Heroes far away from where they spawned.
pub struct RoamingHeuristic {
    config: Arc<HeuristicsConfig>,
}

impl RoamingHeuristic {
    pub fn new(config: Arc<HeuristicsConfig>) -> Self {
        Self { config }
    }
}

impl Heuristic for RoamingHeuristic {
    fn kind(&self) -> HeuristicKind {
        HeuristicKind::Roaming
    }

    fn scan(&self, window: &Window, timeline: &MatchTimeline) -> Vec<Observation> {
        let mut observations = Vec::new();
        for hero in timeline.heroes() {
            let (Some(owner), Some(spawn)) = (hero.owner, hero.spawn_position()) else {
                continue;
            };
            for at in sample_instants(window, &[hero]) {
                let Some(position) = hero.position_at(at) else {
                    continue;
                };
                let distance = position.distance(&spawn);
                if distance > self.config.roaming_distance {
                    observations.push(
                        Observation::new(HeuristicKind::Roaming, owner, at)
                            .with_unit(Some(hero.id))
                            .with_weight(self.config.weights.roaming)
                            .because(format!("{} roaming {:.0} from spawn", owner, distance)),
                    );
                    break;
                }
            }
        }
        observations.sort_by_key(|obs| obs.ready_at);
        observations
    }
}

#[derive(Debug, Clone, Copy)]
struct Occupancy {
    vehicle: UnitId,
    participant: ParticipantId,
    from: Duration,
    until: Duration,
}

/// Vehicle occupancy intervals rebuilt from ownership-change pairs.
pub struct VehicleHeuristic {
    config: Arc<HeuristicsConfig>,
}

impl VehicleHeuristic {
    pub fn new(config: Arc<HeuristicsConfig>) -> Self {
        Self { config }
    }

    fn occupancies(&self, timeline: &MatchTimeline) -> Vec<Occupancy> {
        let mut changes: Vec<_> = timeline
            .facts
            .iter()
            .filter(|fact| fact.kind == FactKind::OwnershipChange)
            .collect();
        changes.sort_by_key(|fact| fact.at);

        let vehicles: BTreeSet<UnitId> = timeline
            .units
            .iter()
            .filter(|u| u.category == UnitCategory::Vehicle)
            .map(|u| u.id)
            .collect();
        let mut open: BTreeMap<UnitId, (ParticipantId, Duration)> = BTreeMap::new();
        let mut intervals = Vec::new();

        for fact in changes {
            let Some(vehicle) = fact.unit() else {
                debug!(at = ?fact.at, "ownership change without unit id; skipping");
                continue;
            };
            if !vehicles.contains(&vehicle) {
                continue;
            }
            if let Some((participant, from)) = open.remove(&vehicle) {
                intervals.push(Occupancy {
                    vehicle,
                    participant,
                    from,
                    until: fact.at,
                });
            }
            if let Some(participant) = fact.participant {
                open.insert(vehicle, (participant, fact.at));
            }
        }
        for (vehicle, (participant, from)) in open {
            let until = timeline
                .unit(vehicle)
                .and_then(|u| u.died_at)
                .unwrap_or(timeline.length)
                .max(from);
            intervals.push(Occupancy {
                vehicle,
                participant,
                from,
                until,
            });
        }
        intervals
    }
}

impl Heuristic for VehicleHeuristic {
    fn kind(&self) -> HeuristicKind {
        HeuristicKind::Vehicle
    }

    fn scan(&self, window: &Window, timeline: &MatchTimeline) -> Vec<Observation> {
        if window.is_empty() {
            return Vec::new();
        }
        let mut observations: Vec<Observation> = self
            .occupancies(timeline)
            .into_iter()
            .filter(|occ| occ.from < window.end && occ.until > window.start)
            .map(|occ| {
                Observation::new(
                    HeuristicKind::Vehicle,
                    occ.participant,
                    occ.from.max(window.start),
                )
                .with_unit(Some(occ.vehicle))
                .with_weight(self.config.weights.vehicle)
                .concluding_at(occ.until)
                .because(format!("{} piloting {}", occ.participant, occ.vehicle))
            })
            .collect();
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
    fn bstep_burst_needs_four_commands_in_a_second() {
        let mut b = TimelineBuilder::new("Alterac Pass", secs(900));
        let busy = b.participant("busy", "Tracer", Team::Blue);
        let slow = b.participant("slow", "Nova", Team::Red);
        b.hero(busy, secs(0));
        b.hero(slow, secs(0));
        for ms in [10_000, 10_200, 10_400, 10_600] {
            b.fact(TimelineFact::command(Duration::from_millis(ms), busy, "Hearthstone"));
        }
        for ms in [10_000, 10_600, 11_200, 11_800] {
            b.fact(TimelineFact::command(Duration::from_millis(ms), slow, "Hearthstone"));
        }
        let timeline = b.build();

        let obs = EmoteHeuristic::new(Arc::new(HeuristicsConfig::default()))
            .scan(&window(10, 20), &timeline);
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].participant, busy);
        assert_eq!(obs[0].ready_at, Duration::from_millis(10_600));
    }

    #[test]
    fn zero_length_burst_window_finds_nothing() {
        let mut b = TimelineBuilder::new("Alterac Pass", secs(900));
        let busy = b.participant("busy", "Tracer", Team::Blue);
        b.hero(busy, secs(0));
        for ms in [10_000, 10_000, 10_200, 10_400] {
            b.fact(TimelineFact::command(Duration::from_millis(ms), busy, "Hearthstone"));
        }
        let timeline = b.build();

        let config = HeuristicsConfig {
            bstep_window_ms: 0,
            ..HeuristicsConfig::default()
        };
        let obs = EmoteHeuristic::new(Arc::new(config)).scan(&window(10, 20), &timeline);
        assert!(obs.is_empty());
    }

    #[test]
    fn taunts_and_malformed_commands() {
        let mut b = TimelineBuilder::new("Alterac Pass", secs(900));
        let p = b.participant("p", "Tracer", Team::Blue);
        b.hero(p, secs(0));
        b.fact(TimelineFact::command(secs(12), p, "Dance"))
            .fact(TimelineFact::command(secs(11), p, "Taunt"))
            .fact(TimelineFact {
                at: secs(13),
                kind: FactKind::Command,
                participant: Some(p),
                payload: serde_json::json!({ "ability": 17 }),
            });
        let timeline = b.build();

        let obs = EmoteHeuristic::new(Arc::new(HeuristicsConfig::default()))
            .scan(&window(10, 20), &timeline);
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].ready_at, secs(11));
        assert!(obs[0].rationale.contains("Taunt"));
    }

    #[test]
    fn roaming_far_from_spawn() {
        let mut b = TimelineBuilder::new("Sky Temple", secs(900));
        let p = b.participant("p", "Zeratul", Team::Red);
        let hero = b.hero(p, secs(0));
        b.sample(hero, secs(0), 0.0, 0.0)
            .sample(hero, secs(30), 40.0, 0.0)
            .sample(hero, secs(35), 120.0, 0.0);
        let timeline = b.build();

        let obs = RoamingHeuristic::new(Arc::new(HeuristicsConfig::default()))
            .scan(&window(28, 40), &timeline);
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].ready_at, secs(35));
    }

    #[test]
    fn vehicle_occupancy_from_ownership_pairs() {
        let mut b = TimelineBuilder::new("Volskaya Foundry", secs(900));
        let p = b.participant("p", "Arthas", Team::Blue);
        b.hero(p, secs(0));
        let robot = b.unit("VolskayaVehicle", UnitCategory::Vehicle, None, secs(200));
        let statue = b.unit("Statue", UnitCategory::Other, None, secs(0));
        b.fact(TimelineFact::ownership_change(secs(210), robot, Some(p)))
            .fact(TimelineFact::ownership_change(secs(240), robot, None))
            .fact(TimelineFact::ownership_change(secs(215), statue, Some(p)))
            .fact(TimelineFact {
                at: secs(216),
                kind: FactKind::OwnershipChange,
                participant: Some(p),
                payload: serde_json::Value::Null,
            });
        let timeline = b.build();
        let heuristic = VehicleHeuristic::new(Arc::new(HeuristicsConfig::default()));

        let obs = heuristic.scan(&window(220, 230), &timeline);
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].ready_at, secs(220));
        assert_eq!(obs[0].concludes_at, secs(240));
        assert_eq!(obs[0].unit, Some(robot));

        assert!(heuristic.scan(&window(240, 260), &timeline).is_empty());
    }
}
