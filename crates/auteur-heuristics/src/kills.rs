use std::{collections::BTreeMap, sync::Arc, time::Duration};

use auteur_types::{
    config::{HeroRange, HeuristicsConfig},
    observation::{HeuristicKind, Observation, Window},
    timeline::{MatchTimeline, ParticipantId, UnitId},
};

use crate::Heuristic;

/// A hero killed by a member of the opposing team.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct KillRecord {
    pub victim_unit: UnitId,
    pub victim: ParticipantId,
    pub killer: ParticipantId,
    pub at: Duration,
}

/// Enemy hero kills inside `window`, ordered by time.
pub(crate) fn enemy_hero_kills(timeline: &MatchTimeline, window: &Window) -> Vec<KillRecord> {
    let mut kills: Vec<KillRecord> = timeline
        .heroes()
        .filter_map(|unit| {
            let at = unit.died_within(window)?;
            let victim = unit.owner?;
            let killer = unit.killer?;
            let victim_team = timeline.team_of(victim)?;
            let killer_team = timeline.team_of(killer)?;
            (victim_team != killer_team).then_some(KillRecord {
                victim_unit: unit.id,
                victim,
                killer,
                at,
            })
        })
        .collect();
    kills.sort_by_key(|kill| (kill.at, kill.victim_unit));
    kills
}

fn group_by_killer(kills: Vec<KillRecord>) -> BTreeMap<ParticipantId, Vec<KillRecord>> {
    let mut groups: BTreeMap<ParticipantId, Vec<KillRecord>> = BTreeMap::new();
    for kill in kills {
        groups.entry(kill.killer).or_default().push(kill);
    }
    groups
}

fn by_ready_at(mut observations: Vec<Observation>) -> Vec<Observation> {
    observations.sort_by_key(|obs| obs.ready_at);
    observations
}

/// Kills grouped by killer. Ranged killers (and the always-redirect heroes)
/// hand the observation to each victim instead.
pub struct KillHeuristic {
    config: Arc<HeuristicsConfig>,
}

impl KillHeuristic {
    pub fn new(config: Arc<HeuristicsConfig>) -> Self {
        Self { config }
    }

    fn redirects(&self, timeline: &MatchTimeline, killer: ParticipantId) -> bool {
        let Some(hero) = timeline.participant(killer).map(|p| p.hero.as_str()) else {
            return false;
        };
        self.config.always_redirects(hero) || self.config.hero_range(hero) == HeroRange::Ranged
    }
}

impl Heuristic for KillHeuristic {
    fn kind(&self) -> HeuristicKind {
        HeuristicKind::Kill
    }

    fn scan(&self, window: &Window, timeline: &MatchTimeline) -> Vec<Observation> {
        let mut observations = Vec::new();
        for (killer, group) in group_by_killer(enemy_hero_kills(timeline, window)) {
            let weight = self.config.weights.kill_base + group.len() as f64;
            if self.redirects(timeline, killer) {
                for kill in &group {
                    observations.push(
                        Observation::new(HeuristicKind::Kill, kill.victim, kill.at)
                            .with_unit(Some(kill.victim_unit))
                            .with_weight(weight)
                            .because(format!("{} killed by ranged {}", kill.victim, killer)),
                    );
                }
            } else {
                let (Some(first), Some(last)) = (group.first(), group.last()) else {
                    continue;
                };
                observations.push(
                    Observation::new(HeuristicKind::Kill, killer, first.at)
                        .with_unit(timeline.hero_of(killer, first.at).map(|u| u.id))
                        .with_weight(weight)
                        .concluding_at(last.at)
                        .because(format!("{} scored {} kill(s)", killer, group.len())),
                );
            }
        }
        by_ready_at(observations)
    }
}

/// Kill chains of at least `required` kills where consecutive kills are no
/// further apart than the streak timer.
pub struct MultiKillHeuristic {
    config: Arc<HeuristicsConfig>,
    required: usize,
    kind: HeuristicKind,
}

impl MultiKillHeuristic {
    /// `required` is clamped to the 2..=5 range.
    pub fn new(config: Arc<HeuristicsConfig>, required: usize) -> Self {
        let required = required.clamp(2, 5);
        let kind = HeuristicKind::multi_kill(required).unwrap_or(HeuristicKind::DoubleKill);
        Self {
            config,
            required,
            kind,
        }
    }

    fn chains(&self, group: &[KillRecord]) -> Vec<Vec<KillRecord>> {
        let streak = self.config.streak_timer();
        let mut chains: Vec<Vec<KillRecord>> = Vec::new();
        let mut current: Vec<KillRecord> = Vec::new();
        for kill in group {
            if let Some(prev) = current.last() {
                if kill.at - prev.at > streak {
                    chains.push(std::mem::take(&mut current));
                }
            }
            current.push(*kill);
        }
        if !current.is_empty() {
            chains.push(current);
        }
        chains
    }
}

impl Heuristic for MultiKillHeuristic {
    fn kind(&self) -> HeuristicKind {
        self.kind
    }

    fn scan(&self, window: &Window, timeline: &MatchTimeline) -> Vec<Observation> {
        let mut observations = Vec::new();
        for (killer, group) in group_by_killer(enemy_hero_kills(timeline, window)) {
            for chain in self.chains(&group) {
                if chain.len() < self.required {
                    continue;
                }
                let (Some(first), Some(last)) = (chain.first(), chain.last()) else {
                    continue;
                };
                observations.push(
                    Observation::new(self.kind, killer, first.at)
                        .with_unit(timeline.hero_of(killer, first.at).map(|u| u.id))
                        .with_weight(self.config.weights.kill_base + chain.len() as f64)
                        .concluding_at(last.at)
                        .because(format!("{} chained {} kills", killer, chain.len())),
                );
            }
        }
        by_ready_at(observations)
    }
}

/// Hero deaths with no enemy to credit: self-kills, environment, teammates.
pub struct DeathHeuristic {
    config: Arc<HeuristicsConfig>,
}

impl DeathHeuristic {
    pub fn new(config: Arc<HeuristicsConfig>) -> Self {
        Self { config }
    }
}

impl Heuristic for DeathHeuristic {
    fn kind(&self) -> HeuristicKind {
        HeuristicKind::Death
    }

    fn scan(&self, window: &Window, timeline: &MatchTimeline) -> Vec<Observation> {
        let observations = timeline
            .heroes()
            .filter_map(|unit| {
                let at = unit.died_within(window)?;
                let victim = unit.owner?;
                let attributable = unit.killer.is_some_and(|killer| {
                    killer != victim && timeline.team_of(killer) != timeline.team_of(victim)
                });
                (!attributable).then(|| {
                    Observation::new(HeuristicKind::Death, victim, at)
                        .with_unit(Some(unit.id))
                        .with_weight(self.config.weights.death)
                        .because(format!("{} died without an enemy killer", victim))
                })
            })
            .collect();
        by_ready_at(observations)
    }
}

/// Every enemy kill credited to its killer, never redirected.
pub struct RecentKillerHeuristic {
    config: Arc<HeuristicsConfig>,
}

impl RecentKillerHeuristic {
    pub fn new(config: Arc<HeuristicsConfig>) -> Self {
        Self { config }
    }
}

impl Heuristic for RecentKillerHeuristic {
    fn kind(&self) -> HeuristicKind {
        HeuristicKind::RecentKiller
    }

    fn scan(&self, window: &Window, timeline: &MatchTimeline) -> Vec<Observation> {
        enemy_hero_kills(timeline, window)
            .into_iter()
            .map(|kill| {
                Observation::new(HeuristicKind::RecentKiller, kill.killer, kill.at)
                    .with_unit(timeline.hero_of(kill.killer, kill.at).map(|u| u.id))
                    .with_weight(self.config.weights.recent_killer)
                    .because(format!("{} killed {}", kill.killer, kill.victim))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{secs, window};
    use auteur_types::timeline::{Team, TimelineBuilder};

    struct Match {
        timeline: MatchTimeline,
        melee: ParticipantId,
        ranged: ParticipantId,
        abathur: ParticipantId,
        victims: Vec<ParticipantId>,
    }

    fn skirmish() -> Match {
        let mut b = TimelineBuilder::new("Cursed Hollow", secs(900));
        let melee = b.participant("blue-1", "Muradin", Team::Blue);
        let ranged = b.participant("blue-2", "Valla", Team::Blue);
        let abathur = b.participant("blue-3", "Abathur", Team::Blue);
        for p in [melee, ranged, abathur] {
            b.hero(p, secs(0));
        }
        let mut victims = Vec::new();
        for (idx, hero) in ["Jaina", "Thrall", "Nova", "Sonya", "Zeratul"].iter().enumerate() {
            victims.push(b.participant(&format!("red-{idx}"), hero, Team::Red));
        }
        let units: Vec<_> = victims.iter().map(|v| b.hero(*v, secs(0))).collect();
        // melee: two kills, ranged: one, abathur: one
        b.kill(units[0], secs(10), Some(melee));
        b.kill(units[1], secs(14), Some(melee));
        b.kill(units[2], secs(12), Some(ranged));
        b.kill(units[3], secs(16), Some(abathur));
        Match {
            timeline: b.build(),
            melee,
            ranged,
            abathur,
            victims,
        }
    }

    #[test]
    fn kill_weight_is_base_plus_group_size() {
        let m = skirmish();
        let config = Arc::new(HeuristicsConfig::default());
        let obs = KillHeuristic::new(config.clone()).scan(&window(0, 30), &m.timeline);

        let melee = obs
            .iter()
            .find(|o| o.participant == m.melee)
            .expect("melee killer observed");
        assert_eq!(melee.weight, config.weights.kill_base + 2.0);
        assert_eq!(melee.ready_at, secs(10));
        assert_eq!(melee.concludes_at, secs(14));
    }

    #[test]
    fn ranged_and_named_killers_redirect_to_victims() {
        let m = skirmish();
        let obs = KillHeuristic::new(Arc::new(HeuristicsConfig::default()))
            .scan(&window(0, 30), &m.timeline);

        assert!(obs.iter().all(|o| o.participant != m.ranged));
        assert!(obs.iter().all(|o| o.participant != m.abathur));
        assert!(obs.iter().any(|o| o.participant == m.victims[2]));
        assert!(obs.iter().any(|o| o.participant == m.victims[3]));
        assert!(obs.windows(2).all(|pair| pair[0].ready_at <= pair[1].ready_at));
    }

    #[test]
    fn triple_kill_chain_detected() {
        let mut b = TimelineBuilder::new("Dragon Shire", secs(900));
        let a = b.participant("a", "Illidan", Team::Blue);
        b.hero(a, secs(0));
        for (idx, at) in [10, 12, 14].iter().enumerate() {
            let victim = b.participant(&format!("v{idx}"), "Jaina", Team::Red);
            let unit = b.hero(victim, secs(0));
            b.kill(unit, secs(*at), Some(a));
        }
        let timeline = b.build();
        let config = Arc::new(HeuristicsConfig::default());

        let triple = MultiKillHeuristic::new(config.clone(), 3).scan(&window(0, 24), &timeline);
        assert_eq!(triple.len(), 1);
        assert_eq!(triple[0].participant, a);
        assert_eq!(triple[0].source, HeuristicKind::TripleKill);
        assert_eq!(triple[0].concludes_at, secs(14));
        assert_eq!(triple[0].weight, config.weights.kill_base + 3.0);

        let quad = MultiKillHeuristic::new(config, 4).scan(&window(0, 36), &timeline);
        assert!(quad.is_empty());
    }

    #[test]
    fn streak_breaks_on_long_gap() {
        let mut b = TimelineBuilder::new("Dragon Shire", secs(900));
        let a = b.participant("a", "Illidan", Team::Blue);
        b.hero(a, secs(0));
        for (idx, at) in [10, 30].iter().enumerate() {
            let victim = b.participant(&format!("v{idx}"), "Jaina", Team::Red);
            let unit = b.hero(victim, secs(0));
            b.kill(unit, secs(*at), Some(a));
        }
        let timeline = b.build();
        let double = MultiKillHeuristic::new(Arc::new(HeuristicsConfig::default()), 2)
            .scan(&window(0, 40), &timeline);
        assert!(double.is_empty());
    }

    #[test]
    fn deaths_without_enemy_killer() {
        let mut b = TimelineBuilder::new("Sky Temple", secs(900));
        let blue = b.participant("blue", "Muradin", Team::Blue);
        let mate = b.participant("mate", "Jaina", Team::Blue);
        let red = b.participant("red", "Nova", Team::Red);
        let suicide = b.hero(blue, secs(0));
        let environment = b.hero(mate, secs(0));
        let enemy_kill = b.hero(red, secs(0));
        b.kill(suicide, secs(5), Some(blue))
            .kill(environment, secs(6), None)
            .kill(enemy_kill, secs(7), Some(blue));
        let timeline = b.build();

        let obs = DeathHeuristic::new(Arc::new(HeuristicsConfig::default()))
            .scan(&window(0, 10), &timeline);
        let subjects: Vec<_> = obs.iter().map(|o| o.participant).collect();
        assert_eq!(subjects, vec![blue, mate]);
    }

    #[test]
    fn recent_killer_never_redirects() {
        let m = skirmish();
        let obs = RecentKillerHeuristic::new(Arc::new(HeuristicsConfig::default()))
            .scan(&window(0, 30), &m.timeline);
        assert_eq!(obs.len(), 4);
        assert!(obs.iter().any(|o| o.participant == m.ranged));
        assert!(obs.iter().any(|o| o.participant == m.abathur));
    }
}
