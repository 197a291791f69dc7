use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{director::Panel, AuteurError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeuristicWeights {
    pub kill_base: f64,
    pub death: f64,
    pub boss_capture: f64,
    pub camp_capture: f64,
    pub map_objective: f64,
    pub team_objective: f64,
    pub near_enemy_structure: f64,
    pub emote: f64,
    pub roaming: f64,
    pub vehicle: f64,
    pub proximity: f64,
    pub recent_killer: f64,
    pub alive: f64,
}

impl Default for HeuristicWeights {
    fn default() -> Self {
        Self {
            kill_base: 10.0,
            death: 8.0,
            boss_capture: 9.0,
            camp_capture: 6.0,
            map_objective: 7.0,
            team_objective: 7.0,
            near_enemy_structure: 4.0,
            emote: 2.0,
            roaming: 1.5,
            vehicle: 5.0,
            proximity: 3.0,
            recent_killer: 2.0,
            alive: 1.0,
        }
    }
}

impl HeuristicWeights {
    fn entries(&self) -> [(&'static str, f64); 13] {
        [
            ("kill_base", self.kill_base),
            ("death", self.death),
            ("boss_capture", self.boss_capture),
            ("camp_capture", self.camp_capture),
            ("map_objective", self.map_objective),
            ("team_objective", self.team_objective),
            ("near_enemy_structure", self.near_enemy_structure),
            ("emote", self.emote),
            ("roaming", self.roaming),
            ("vehicle", self.vehicle),
            ("proximity", self.proximity),
            ("recent_killer", self.recent_killer),
            ("alive", self.alive),
        ]
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum HeroRange {
    Melee,
    Ranged,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeroProfile {
    pub name: String,
    pub range: HeroRange,
}

impl HeroProfile {
    fn new(name: &str, range: HeroRange) -> Self {
        Self {
            name: name.into(),
            range,
        }
    }
}

/// Structure tiers, weakest first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum StructureClass {
    Wall,
    Gate,
    Cannon,
    TownHall,
    Core,
}

impl StructureClass {
    pub const ALL: [StructureClass; 5] = [
        StructureClass::Wall,
        StructureClass::Gate,
        StructureClass::Cannon,
        StructureClass::TownHall,
        StructureClass::Core,
    ];
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StructurePrefix {
    pub prefix: String,
    pub class: StructureClass,
}

impl StructurePrefix {
    fn new(prefix: &str, class: StructureClass) -> Self {
        Self {
            prefix: prefix.into(),
            class,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StructureWeights {
    pub wall: f64,
    pub gate: f64,
    pub cannon: f64,
    pub town_hall: f64,
    pub core: f64,
    /// Used when a structure name matches no prefix.
    pub generic: f64,
}

impl Default for StructureWeights {
    fn default() -> Self {
        Self {
            wall: 2.0,
            gate: 3.0,
            cannon: 4.0,
            town_hall: 6.0,
            core: 10.0,
            generic: 2.5,
        }
    }
}

impl StructureWeights {
    pub fn weight(&self, class: StructureClass) -> f64 {
        match class {
            StructureClass::Wall => self.wall,
            StructureClass::Gate => self.gate,
            StructureClass::Cannon => self.cannon,
            StructureClass::TownHall => self.town_hall,
            StructureClass::Core => self.core,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeuristicsConfig {
    pub weights: HeuristicWeights,
    pub streak_timer_secs: u64,
    /// How far before a capture a camp kill still earns credit.
    pub capture_credit_secs: u64,
    pub proximity_distance: f64,
    pub structure_distance: f64,
    pub roaming_distance: f64,
    /// Identical hearth commands needed inside `bstep_window_ms`.
    pub bstep_min_commands: usize,
    pub bstep_window_ms: u64,
    pub hearth_ability: String,
    pub taunt_abilities: Vec<String>,
    pub camp_capture_event: String,
    pub team_objective_events: Vec<String>,
    pub roster: Vec<HeroProfile>,
    /// Heroes whose kills always cut to the victim, whatever their range.
    pub always_redirect: Vec<String>,
    pub structure_prefixes: Vec<StructurePrefix>,
    pub structure_weights: StructureWeights,
}

impl Default for HeuristicsConfig {
    fn default() -> Self {
        use HeroRange::*;
        Self {
            weights: HeuristicWeights::default(),
            streak_timer_secs: 12,
            capture_credit_secs: 10,
            proximity_distance: 6.0,
            structure_distance: 10.0,
            roaming_distance: 90.0,
            bstep_min_commands: 4,
            bstep_window_ms: 1_000,
            hearth_ability: "Hearthstone".into(),
            taunt_abilities: vec!["Taunt".into(), "Dance".into()],
            camp_capture_event: "JungleCampCapture".into(),
            team_objective_events: vec![
                "TributeCollected".into(),
                "DoubloonsTurnedIn".into(),
                "SoulCageCaptured".into(),
                "AltarCaptured".into(),
                "BeaconCaptured".into(),
            ],
            roster: vec![
                HeroProfile::new("Abathur", Melee),
                HeroProfile::new("Arthas", Melee),
                HeroProfile::new("Chromie", Ranged),
                HeroProfile::new("Diablo", Melee),
                HeroProfile::new("Falstad", Ranged),
                HeroProfile::new("Hanzo", Ranged),
                HeroProfile::new("Illidan", Melee),
                HeroProfile::new("Jaina", Ranged),
                HeroProfile::new("Johanna", Melee),
                HeroProfile::new("Kael'thas", Ranged),
                HeroProfile::new("Li-Ming", Ranged),
                HeroProfile::new("Muradin", Melee),
                HeroProfile::new("Nazeebo", Ranged),
                HeroProfile::new("Nova", Ranged),
                HeroProfile::new("Raynor", Ranged),
                HeroProfile::new("Sonya", Melee),
                HeroProfile::new("Thrall", Melee),
                HeroProfile::new("Tracer", Ranged),
                HeroProfile::new("Valla", Ranged),
                HeroProfile::new("Zeratul", Melee),
            ],
            always_redirect: vec!["Abathur".into()],
            structure_prefixes: vec![
                StructurePrefix::new("TownWall", StructureClass::Wall),
                StructurePrefix::new("TownGate", StructureClass::Gate),
                StructurePrefix::new("TownCannon", StructureClass::Cannon),
                StructurePrefix::new("TownTownHall", StructureClass::TownHall),
                StructurePrefix::new("KingsCore", StructureClass::Core),
            ],
            structure_weights: StructureWeights::default(),
        }
    }
}

impl HeuristicsConfig {
    pub fn streak_timer(&self) -> Duration {
        Duration::from_secs(self.streak_timer_secs)
    }

    pub fn capture_credit(&self) -> Duration {
        Duration::from_secs(self.capture_credit_secs)
    }

    pub fn bstep_window(&self) -> Duration {
        Duration::from_millis(self.bstep_window_ms)
    }

    /// Unknown heroes count as melee.
    pub fn hero_range(&self, hero: &str) -> HeroRange {
        self.roster
            .iter()
            .find(|profile| profile.name.eq_ignore_ascii_case(hero))
            .map(|profile| profile.range)
            .unwrap_or(HeroRange::Melee)
    }

    pub fn always_redirects(&self, hero: &str) -> bool {
        self.always_redirect
            .iter()
            .any(|name| name.eq_ignore_ascii_case(hero))
    }

    /// Weight of a destroyed structure, by longest matching name prefix.
    pub fn structure_weight(&self, name: &str) -> f64 {
        self.structure_prefixes
            .iter()
            .filter(|entry| name.starts_with(entry.prefix.as_str()))
            .max_by_key(|entry| entry.prefix.len())
            .map(|entry| self.structure_weights.weight(entry.class))
            .unwrap_or(self.structure_weights.generic)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LadderConfig {
    pub kill_window_secs: u64,
    pub death_window_secs: u64,
    pub capture_window_secs: u64,
    pub objective_window_secs: u64,
    pub near_enemy_window_secs: u64,
    pub structure_window_secs: u64,
    pub proximity_window_secs: u64,
    pub recency_lookback_secs: u64,
    pub alive_window_secs: u64,
    pub kill_hold_pad_secs: u64,
    pub streak_hold_pad_secs: u64,
    pub death_hold_pad_secs: u64,
    pub event_hold_pad_secs: u64,
    pub recency_hold_secs: u64,
    pub minimum_hold_secs: u64,
}

impl Default for LadderConfig {
    fn default() -> Self {
        Self {
            kill_window_secs: 10,
            death_window_secs: 10,
            capture_window_secs: 10,
            objective_window_secs: 10,
            near_enemy_window_secs: 8,
            structure_window_secs: 10,
            proximity_window_secs: 5,
            recency_lookback_secs: 30,
            alive_window_secs: 10,
            kill_hold_pad_secs: 1,
            streak_hold_pad_secs: 2,
            death_hold_pad_secs: 1,
            event_hold_pad_secs: 3,
            recency_hold_secs: 6,
            minimum_hold_secs: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PanelDwell {
    pub kda_secs: u64,
    pub apm_secs: u64,
    pub carried_objectives_secs: u64,
    pub crowd_control_secs: u64,
    pub death_damage_role_secs: u64,
    pub experience_secs: u64,
    pub talents_secs: u64,
    pub time_dead_secs: u64,
}

impl Default for PanelDwell {
    fn default() -> Self {
        Self {
            kda_secs: 15,
            apm_secs: 12,
            carried_objectives_secs: 12,
            crowd_control_secs: 12,
            death_damage_role_secs: 15,
            experience_secs: 12,
            talents_secs: 20,
            time_dead_secs: 12,
        }
    }
}

impl PanelDwell {
    pub fn dwell(&self, panel: Panel) -> Duration {
        let secs = match panel {
            Panel::Kda => self.kda_secs,
            Panel::ActionsPerMinute => self.apm_secs,
            Panel::CarriedObjectives => self.carried_objectives_secs,
            Panel::CrowdControl => self.crowd_control_secs,
            Panel::DeathDamageRole => self.death_damage_role_secs,
            Panel::Experience => self.experience_secs,
            Panel::Talents => self.talents_secs,
            Panel::TimeDead => self.time_dead_secs,
        };
        Duration::from_secs(secs)
    }
}

/// A panel pinned to `[from_secs, until_secs)` of match time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PinnedPanel {
    pub from_secs: u64,
    pub until_secs: u64,
    pub panel: Panel,
}

impl PinnedPanel {
    pub fn covers(&self, at: Duration) -> bool {
        Duration::from_secs(self.from_secs) <= at && at < Duration::from_secs(self.until_secs)
    }

    pub fn until(&self) -> Duration {
        Duration::from_secs(self.until_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PanelConfig {
    pub talent_cutoff_secs: u64,
    pub dwell: PanelDwell,
    #[serde(default)]
    pub schedule: Vec<PinnedPanel>,
    pub carried_objective_maps: Vec<String>,
    pub trigger_window_secs: u64,
    pub recheck_secs: u64,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            talent_cutoff_secs: 90,
            dwell: PanelDwell::default(),
            schedule: Vec::new(),
            carried_objective_maps: vec![
                "Blackheart's Bay".into(),
                "Tomb of the Spider Queen".into(),
                "Haunted Mines".into(),
            ],
            trigger_window_secs: 5,
            recheck_secs: 5,
        }
    }
}

impl PanelConfig {
    pub fn talent_cutoff(&self) -> Duration {
        Duration::from_secs(self.talent_cutoff_secs)
    }

    pub fn supports_carried_objectives(&self, map: &str) -> bool {
        self.carried_objective_maps
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(map))
    }
}

/// Resolution of the on-screen match timer. Polling faster than this reads
/// the same value twice while the game is running.
pub const TIMER_RESOLUTION_MS: u64 = 1_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClockConfig {
    /// At least [`TIMER_RESOLUTION_MS`].
    pub poll_interval_ms: u64,
    pub max_retries: u8,
    pub retry_backoff_ms: u64,
    /// Larger jumps between consecutive samples are discarded.
    pub sanity_threshold_secs: u64,
    /// Trailing margin before the match length where end confirmation is asked.
    pub end_margin_secs: u64,
    pub idle_interval_ms: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: TIMER_RESOLUTION_MS,
            max_retries: 3,
            retry_backoff_ms: 100,
            sanity_threshold_secs: 30,
            end_margin_secs: 5,
            idle_interval_ms: 1_000,
        }
    }
}

impl ClockConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn sanity_threshold(&self) -> Duration {
        Duration::from_secs(self.sanity_threshold_secs)
    }

    pub fn end_margin(&self) -> Duration {
        Duration::from_secs(self.end_margin_secs)
    }

    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpsConfig {
    pub log_level: String,
}

impl Default for OpsConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AuteurConfig {
    #[serde(default)]
    pub heuristics: HeuristicsConfig,
    #[serde(default)]
    pub ladder: LadderConfig,
    #[serde(default)]
    pub panels: PanelConfig,
    #[serde(default)]
    pub clock: ClockConfig,
    #[serde(default)]
    pub ops: OpsConfig,
}

impl AuteurConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|err| {
            AuteurError::Configuration(format!(
                "unable to read config file {}: {err}",
                path_ref.display()
            ))
        })?;
        toml::from_str(&contents).map_err(|err| {
            AuteurError::Configuration(format!(
                "failed to parse config file {}: {err}",
                path_ref.display()
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        let heuristics = &self.heuristics;
        for (name, weight) in heuristics.weights.entries() {
            if !(weight > 0.0) {
                return Err(config_error(format!(
                    "heuristics.weights.{name} must be greater than zero"
                )));
            }
        }
        if heuristics.streak_timer_secs == 0 {
            return Err(config_error("heuristics.streak_timer_secs must be greater than zero"));
        }
        if heuristics.bstep_min_commands < 2 || heuristics.bstep_window_ms == 0 {
            return Err(config_error(
                "heuristics.bstep_min_commands must be at least 2 with a non-zero window",
            ));
        }
        for (name, distance) in [
            ("proximity_distance", heuristics.proximity_distance),
            ("structure_distance", heuristics.structure_distance),
            ("roaming_distance", heuristics.roaming_distance),
        ] {
            if !(distance > 0.0) {
                return Err(config_error(format!(
                    "heuristics.{name} must be greater than zero"
                )));
            }
        }
        for class in StructureClass::ALL {
            if !heuristics
                .structure_prefixes
                .iter()
                .any(|entry| entry.class == class && !entry.prefix.is_empty())
            {
                return Err(config_error(format!(
                    "heuristics.structure_prefixes has no entry for {class:?}"
                )));
            }
        }
        let weights = &heuristics.structure_weights;
        let ladder: Vec<f64> = StructureClass::ALL
            .iter()
            .map(|class| weights.weight(*class))
            .collect();
        if ladder.iter().any(|w| !(*w > 0.0)) || !(weights.generic > 0.0) {
            return Err(config_error(
                "heuristics.structure_weights must all be greater than zero",
            ));
        }
        if ladder.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(config_error(
                "heuristics.structure_weights must ascend wall < gate < cannon < town_hall < core",
            ));
        }

        if self.ladder.minimum_hold_secs == 0 || self.ladder.alive_window_secs == 0 {
            return Err(config_error(
                "ladder.minimum_hold_secs and ladder.alive_window_secs must be greater than zero",
            ));
        }

        if crate::director::Panel::RING
            .iter()
            .any(|panel| self.panels.dwell.dwell(*panel).is_zero())
        {
            return Err(config_error("panels.dwell entries must be greater than zero"));
        }
        if self.panels.recheck_secs == 0 {
            return Err(config_error("panels.recheck_secs must be greater than zero"));
        }
        if let Some(entry) = self
            .panels
            .schedule
            .iter()
            .find(|entry| entry.from_secs >= entry.until_secs)
        {
            return Err(config_error(format!(
                "panels.schedule entry for {:?} must start before it ends",
                entry.panel
            )));
        }

        if self.clock.poll_interval_ms < TIMER_RESOLUTION_MS {
            return Err(config_error(format!(
                "clock.poll_interval_ms must be at least the timer resolution ({TIMER_RESOLUTION_MS} ms)"
            )));
        }
        if self.clock.max_retries == 0 {
            return Err(config_error("clock.max_retries must be greater than zero"));
        }
        if self.clock.sanity_threshold_secs == 0 {
            return Err(config_error("clock.sanity_threshold_secs must be greater than zero"));
        }
        if self.clock.idle_interval_ms == 0 {
            return Err(config_error("clock.idle_interval_ms must be greater than zero"));
        }
        Ok(())
    }
}

fn config_error(message: impl Into<String>) -> AuteurError {
    AuteurError::Configuration(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn load_auteur_config_from_file() {
        let temp_path = std::env::temp_dir().join("auteur-config-test.toml");
        let mut config = AuteurConfig::default();
        config.heuristics.streak_timer_secs = 15;
        config.clock.max_retries = 5;
        config.panels.schedule.push(PinnedPanel {
            from_secs: 300,
            until_secs: 320,
            panel: Panel::Experience,
        });

        let doc = toml::to_string(&config).expect("serialize config");
        fs::write(&temp_path, doc).expect("write temp config");

        let loaded = AuteurConfig::from_file(&temp_path).expect("load config");
        assert_eq!(loaded.heuristics.streak_timer_secs, 15);
        assert_eq!(loaded.clock.max_retries, 5);
        assert_eq!(loaded.panels.schedule, config.panels.schedule);
        assert_eq!(loaded.heuristics.roster, config.heuristics.roster);
        fs::remove_file(&temp_path).expect("cleanup temp config");
    }

    #[test]
    fn partial_file_falls_back_to_section_defaults() {
        let config: AuteurConfig = toml::from_str(
            r#"
            [ops]
            log_level = "debug"
            "#,
        )
        .expect("parse partial config");
        assert_eq!(config.ops.log_level, "debug");
        assert_eq!(config.clock, ClockConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_configuration_rules() {
        let mut config = AuteurConfig::default();
        assert!(config.validate().is_ok());

        config.heuristics.weights.kill_base = 0.0;
        assert!(config.validate().is_err());
        config.heuristics.weights.kill_base = 10.0;

        config.heuristics.streak_timer_secs = 0;
        assert!(config.validate().is_err());
        config.heuristics.streak_timer_secs = 12;

        config
            .heuristics
            .structure_prefixes
            .retain(|entry| entry.class != StructureClass::Cannon);
        assert!(config.validate().is_err());
        config.heuristics.structure_prefixes = HeuristicsConfig::default().structure_prefixes;

        config.heuristics.structure_weights.gate = 1.0;
        assert!(config.validate().is_err());
        config.heuristics.structure_weights.gate = 3.0;

        config.panels.dwell.apm_secs = 0;
        assert!(config.validate().is_err());
        config.panels.dwell.apm_secs = 12;

        config.panels.schedule.push(PinnedPanel {
            from_secs: 50,
            until_secs: 50,
            panel: Panel::Kda,
        });
        assert!(config.validate().is_err());
        config.panels.schedule.clear();

        config.clock.max_retries = 0;
        assert!(config.validate().is_err());
        config.clock.max_retries = 1;

        config.clock.poll_interval_ms = 500;
        assert!(config.validate().is_err());
        config.clock.poll_interval_ms = TIMER_RESOLUTION_MS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn structure_weights_follow_prefix_table() {
        let heuristics = HeuristicsConfig::default();
        let wall = heuristics.structure_weight("TownWallRadial14");
        let hall = heuristics.structure_weight("TownTownHallL2");
        assert!(wall < hall);
        assert_eq!(
            heuristics.structure_weight("WatchTower"),
            heuristics.structure_weights.generic
        );
    }

    #[test]
    fn hero_roster_lookup() {
        let heuristics = HeuristicsConfig::default();
        assert_eq!(heuristics.hero_range("valla"), HeroRange::Ranged);
        assert_eq!(heuristics.hero_range("Muradin"), HeroRange::Melee);
        assert_eq!(heuristics.hero_range("Unlisted"), HeroRange::Melee);
        assert!(heuristics.always_redirects("Abathur"));
    }
}
