//! In-memory match timeline handed over by the replay parser.
//!
//! The timeline is immutable for the lifetime of a spectate session. Fact
//! payloads keep the parser's variable shape (`serde_json::Value`); every
//! accessor returns `Option` so callers can skip a malformed record.

use std::{collections::HashSet, fmt, fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{observation::Window, AuteurError, Result};

/// The two sides of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Team {
    Blue,
    Red,
}

impl Team {
    pub fn opponent(self) -> Self {
        match self {
            Team::Blue => Team::Red,
            Team::Red => Team::Blue,
        }
    }

    pub fn index(self) -> u8 {
        match self {
            Team::Blue => 0,
            Team::Red => 1,
        }
    }

    pub fn from_index(index: u64) -> Option<Self> {
        match index {
            0 => Some(Team::Blue),
            1 => Some(Team::Red),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub u32);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U{}", self.0)
    }
}

/// A team-affiliated player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub hero: String,
    pub team: Team,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitCategory {
    Hero,
    Structure,
    Core,
    MercenaryCamp,
    BossCamp,
    MapObjective,
    Vehicle,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    #[serde(with = "crate::secs")]
    pub at: Duration,
    pub position: Position,
}

/// An entity of the match: hero avatar, structure, camp member, map object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    pub category: UnitCategory,
    #[serde(default)]
    pub team: Option<Team>,
    #[serde(default)]
    pub owner: Option<ParticipantId>,
    #[serde(default)]
    pub killer: Option<ParticipantId>,
    #[serde(with = "crate::secs")]
    pub born_at: Duration,
    #[serde(default, with = "crate::secs::option")]
    pub died_at: Option<Duration>,
    #[serde(default)]
    pub positions: Vec<PositionSample>,
}

impl Unit {
    pub fn is_hero(&self) -> bool {
        self.category == UnitCategory::Hero
    }

    /// Alive from birth (inclusive) until death (exclusive).
    pub fn alive_at(&self, at: Duration) -> bool {
        self.born_at <= at && self.died_at.map_or(true, |died| at < died)
    }

    pub fn died_within(&self, window: &Window) -> Option<Duration> {
        self.died_at.filter(|died| window.contains(*died))
    }

    /// Latest known position at or before `at`, provided the unit is alive then.
    pub fn position_at(&self, at: Duration) -> Option<Position> {
        if !self.alive_at(at) {
            return None;
        }
        self.positions
            .iter()
            .filter(|sample| sample.at <= at)
            .max_by_key(|sample| sample.at)
            .map(|sample| sample.position)
    }

    pub fn spawn_position(&self) -> Option<Position> {
        self.positions
            .iter()
            .min_by_key(|sample| sample.at)
            .map(|sample| sample.position)
    }

    /// Sample instants falling inside `window`, in ascending order.
    pub fn sample_times_within(&self, window: &Window) -> Vec<Duration> {
        let mut times: Vec<Duration> = self
            .positions
            .iter()
            .map(|sample| sample.at)
            .filter(|at| window.contains(*at))
            .collect();
        times.sort();
        times.dedup();
        times
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactKind {
    Tracker,
    Command,
    OwnershipChange,
}

/// A timestamped raw record from the replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineFact {
    #[serde(with = "crate::secs")]
    pub at: Duration,
    pub kind: FactKind,
    #[serde(default)]
    pub participant: Option<ParticipantId>,
    #[serde(default)]
    pub payload: Value,
}

impl TimelineFact {
    pub fn tracker(at: Duration, event: &str, participant: Option<ParticipantId>) -> Self {
        Self {
            at,
            kind: FactKind::Tracker,
            participant,
            payload: json!({ "event": event }),
        }
    }

    pub fn command(at: Duration, participant: ParticipantId, ability: &str) -> Self {
        Self {
            at,
            kind: FactKind::Command,
            participant: Some(participant),
            payload: json!({ "ability": ability }),
        }
    }

    /// A unit changing controller; `participant` is the new controller, if any.
    pub fn ownership_change(at: Duration, unit: UnitId, participant: Option<ParticipantId>) -> Self {
        Self {
            at,
            kind: FactKind::OwnershipChange,
            participant,
            payload: json!({ "unit": unit.0 }),
        }
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        if let Value::Object(map) = &mut self.payload {
            map.insert(key.to_string(), value.into());
        } else {
            let mut map = serde_json::Map::new();
            map.insert(key.to_string(), value.into());
            self.payload = Value::Object(map);
        }
        self
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.payload.get(key)?.as_str()
    }

    pub fn u64_field(&self, key: &str) -> Option<u64> {
        self.payload.get(key)?.as_u64()
    }

    pub fn event_name(&self) -> Option<&str> {
        self.str_field("event")
    }

    pub fn ability(&self) -> Option<&str> {
        self.str_field("ability")
    }

    pub fn unit(&self) -> Option<UnitId> {
        self.u64_field("unit")
            .and_then(|raw| u32::try_from(raw).ok())
            .map(UnitId)
    }
}

/// Fully parsed, read-only match dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchTimeline {
    pub map: String,
    #[serde(with = "crate::secs")]
    pub length: Duration,
    pub participants: Vec<Participant>,
    pub units: Vec<Unit>,
    #[serde(default)]
    pub facts: Vec<TimelineFact>,
    #[serde(default)]
    pub award_tags: Vec<String>,
}

impl MatchTimeline {
    pub fn from_json_str(contents: &str) -> Result<Self> {
        serde_json::from_str(contents)
            .map_err(|err| AuteurError::Timeline(format!("failed to parse timeline: {err}")))
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|err| {
            AuteurError::Timeline(format!(
                "unable to read timeline file {}: {err}",
                path_ref.display()
            ))
        })?;
        Self::from_json_str(&contents)
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn team_of(&self, id: ParticipantId) -> Option<Team> {
        self.participant(id).map(|p| p.team)
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn heroes(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter().filter(|u| u.is_hero())
    }

    /// The hero unit a participant controls at `at`, falling back to the most
    /// recently born one.
    pub fn hero_of(&self, participant: ParticipantId, at: Duration) -> Option<&Unit> {
        let mut latest: Option<&Unit> = None;
        for unit in self
            .heroes()
            .filter(|u| u.owner == Some(participant) && u.born_at <= at)
        {
            if unit.alive_at(at) {
                return Some(unit);
            }
            if latest.map_or(true, |l| unit.born_at >= l.born_at) {
                latest = Some(unit);
            }
        }
        latest
    }

    /// Whether the participant has a living hero at `at`.
    pub fn is_alive(&self, participant: ParticipantId, at: Duration) -> bool {
        self.heroes()
            .any(|u| u.owner == Some(participant) && u.alive_at(at))
    }

    pub fn facts_within<'a>(&'a self, window: &'a Window) -> impl Iterator<Item = &'a TimelineFact> {
        self.facts.iter().filter(move |fact| window.contains(fact.at))
    }

    /// Structural consistency checks performed once before a session starts.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for participant in &self.participants {
            if !seen.insert(participant.id) {
                return Err(AuteurError::Timeline(format!(
                    "duplicate participant id {}",
                    participant.id
                )));
            }
        }
        let mut units = HashSet::new();
        for unit in &self.units {
            if !units.insert(unit.id) {
                return Err(AuteurError::Timeline(format!("duplicate unit id {}", unit.id)));
            }
            if let Some(died) = unit.died_at {
                if died < unit.born_at {
                    return Err(AuteurError::Timeline(format!(
                        "unit {} ({}) dies before it is born",
                        unit.id, unit.name
                    )));
                }
            }
            for reference in [unit.owner, unit.killer].into_iter().flatten() {
                if !seen.contains(&reference) {
                    return Err(AuteurError::Timeline(format!(
                        "unit {} references unknown participant {}",
                        unit.id, reference
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Programmatic construction of a timeline, mostly for fixtures.
#[derive(Debug, Clone)]
pub struct TimelineBuilder {
    timeline: MatchTimeline,
}

impl TimelineBuilder {
    pub fn new(map: impl Into<String>, length: Duration) -> Self {
        Self {
            timeline: MatchTimeline {
                map: map.into(),
                length,
                participants: Vec::new(),
                units: Vec::new(),
                facts: Vec::new(),
                award_tags: Vec::new(),
            },
        }
    }

    pub fn participant(&mut self, name: &str, hero: &str, team: Team) -> ParticipantId {
        let id = ParticipantId(self.timeline.participants.len() as u32);
        self.timeline.participants.push(Participant {
            id,
            name: name.to_string(),
            hero: hero.to_string(),
            team,
        });
        id
    }

    /// Spawn a hero unit controlled by `owner`.
    pub fn hero(&mut self, owner: ParticipantId, born_at: Duration) -> UnitId {
        let (name, team) = self
            .timeline
            .participant(owner)
            .map(|p| (p.hero.clone(), Some(p.team)))
            .unwrap_or_else(|| ("Hero".to_string(), None));
        let id = self.unit(&name, UnitCategory::Hero, team, born_at);
        self.owner(id, owner);
        id
    }

    pub fn unit(
        &mut self,
        name: &str,
        category: UnitCategory,
        team: Option<Team>,
        born_at: Duration,
    ) -> UnitId {
        let id = UnitId(self.timeline.units.len() as u32);
        self.timeline.units.push(Unit {
            id,
            name: name.to_string(),
            category,
            team,
            owner: None,
            killer: None,
            born_at,
            died_at: None,
            positions: Vec::new(),
        });
        id
    }

    pub fn owner(&mut self, unit: UnitId, owner: ParticipantId) -> &mut Self {
        if let Some(u) = self.unit_mut(unit) {
            u.owner = Some(owner);
        }
        self
    }

    pub fn kill(&mut self, unit: UnitId, at: Duration, killer: Option<ParticipantId>) -> &mut Self {
        if let Some(u) = self.unit_mut(unit) {
            u.died_at = Some(at);
            u.killer = killer;
        }
        self
    }

    pub fn sample(&mut self, unit: UnitId, at: Duration, x: f64, y: f64) -> &mut Self {
        if let Some(u) = self.unit_mut(unit) {
            u.positions.push(PositionSample {
                at,
                position: Position::new(x, y),
            });
        }
        self
    }

    pub fn fact(&mut self, fact: TimelineFact) -> &mut Self {
        self.timeline.facts.push(fact);
        self
    }

    pub fn award(&mut self, tag: &str) -> &mut Self {
        self.timeline.award_tags.push(tag.to_string());
        self
    }

    pub fn build(&self) -> MatchTimeline {
        let mut timeline = self.timeline.clone();
        timeline.facts.sort_by_key(|fact| fact.at);
        for unit in &mut timeline.units {
            unit.positions.sort_by_key(|sample| sample.at);
        }
        timeline
    }

    fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.timeline.units.iter_mut().find(|u| u.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(value: u64) -> Duration {
        Duration::from_secs(value)
    }

    #[test]
    fn team_opponent_and_index() {
        assert_eq!(Team::Blue.opponent(), Team::Red);
        assert_eq!(Team::from_index(1), Some(Team::Red));
        assert_eq!(Team::from_index(2), None);
        assert_eq!(Team::Red.index(), 1);
    }

    #[test]
    fn unit_alive_and_position() {
        let mut builder = TimelineBuilder::new("Cursed Hollow", secs(600));
        let p = builder.participant("alpha", "Valla", Team::Blue);
        let hero = builder.hero(p, secs(0));
        builder
            .sample(hero, secs(5), 10.0, 10.0)
            .sample(hero, secs(1), 1.0, 1.0)
            .kill(hero, secs(20), None);
        let timeline = builder.build();
        let unit = timeline.unit(hero).expect("hero present");

        assert!(unit.alive_at(secs(19)));
        assert!(!unit.alive_at(secs(20)));
        assert_eq!(unit.position_at(secs(3)), Some(Position::new(1.0, 1.0)));
        assert_eq!(unit.position_at(secs(10)), Some(Position::new(10.0, 10.0)));
        assert_eq!(unit.position_at(secs(25)), None);
        assert_eq!(unit.spawn_position(), Some(Position::new(1.0, 1.0)));
    }

    #[test]
    fn fact_accessors_tolerate_missing_fields() {
        let fact = TimelineFact::tracker(secs(3), "JungleCampCapture", None).with_field("team", 1);
        assert_eq!(fact.event_name(), Some("JungleCampCapture"));
        assert_eq!(fact.u64_field("team"), Some(1));
        assert_eq!(fact.ability(), None);
        assert_eq!(fact.unit(), None);

        let odd = TimelineFact {
            at: secs(4),
            kind: FactKind::Tracker,
            participant: None,
            payload: Value::String("garbage".into()),
        };
        assert_eq!(odd.event_name(), None);
    }

    #[test]
    fn validate_rejects_death_before_birth() {
        let mut builder = TimelineBuilder::new("Towers of Doom", secs(600));
        let p = builder.participant("alpha", "Muradin", Team::Blue);
        let hero = builder.hero(p, secs(30));
        builder.kill(hero, secs(10), None);
        assert!(builder.build().validate().is_err());
    }

    #[test]
    fn validate_rejects_unknown_killer() {
        let mut builder = TimelineBuilder::new("Towers of Doom", secs(600));
        let p = builder.participant("alpha", "Muradin", Team::Blue);
        let hero = builder.hero(p, secs(0));
        builder.kill(hero, secs(10), Some(ParticipantId(42)));
        assert!(builder.build().validate().is_err());
    }

    #[test]
    fn timeline_json_round_trip() {
        let mut builder = TimelineBuilder::new("Braxis Holdout", secs(900));
        let p = builder.participant("alpha", "Jaina", Team::Red);
        let hero = builder.hero(p, secs(0));
        builder
            .sample(hero, secs(2), 3.5, 4.0)
            .fact(TimelineFact::command(secs(8), p, "Taunt"))
            .award("AwardMVP");
        let timeline = builder.build();

        let doc = serde_json::to_string(&timeline).expect("serialize timeline");
        let loaded = MatchTimeline::from_json_str(&doc).expect("parse timeline");
        assert_eq!(loaded, timeline);
        assert!(loaded.validate().is_ok());
    }

    #[test]
    fn hero_of_prefers_living_unit() {
        let mut builder = TimelineBuilder::new("Cursed Hollow", secs(600));
        let p = builder.participant("alpha", "Abathur", Team::Blue);
        let first = builder.hero(p, secs(0));
        builder.kill(first, secs(50), None);
        let second = builder.hero(p, secs(60));
        let timeline = builder.build();

        assert_eq!(timeline.hero_of(p, secs(10)).map(|u| u.id), Some(first));
        assert_eq!(timeline.hero_of(p, secs(55)).map(|u| u.id), Some(first));
        assert_eq!(timeline.hero_of(p, secs(70)).map(|u| u.id), Some(second));
        assert!(!timeline.is_alive(p, secs(55)));
    }
}
