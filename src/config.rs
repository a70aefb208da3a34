use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::actors::UnitKind;
use crate::buildings::BuildingKind;
use crate::resources::ResourceKind;

fn default_name() -> String {
    "homestead".to_string()
}

fn default_seed() -> u64 {
    7
}

fn default_tick_seconds() -> f64 {
    1.0
}

fn default_map_radius() -> u32 {
    2
}

fn default_autosave_interval_ticks() -> u64 {
    30
}

fn default_log_capacity() -> usize {
    50
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: f64,
    #[serde(default = "default_map_radius")]
    pub map_radius: u32,
    #[serde(default)]
    pub actors: ActorTuning,
    #[serde(default)]
    pub harvest: HarvestRates,
    #[serde(default)]
    pub house: BuildingSpec,
    #[serde(default = "default_autosave_interval_ticks")]
    pub autosave_interval_ticks: u64,
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            seed: default_seed(),
            tick_seconds: default_tick_seconds(),
            map_radius: default_map_radius(),
            actors: ActorTuning::default(),
            harvest: HarvestRates::default(),
            house: BuildingSpec::default(),
            autosave_interval_ticks: default_autosave_interval_ticks(),
            log_capacity: default_log_capacity(),
            persistence: PersistenceConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl GameConfig {
    pub fn building(&self, kind: BuildingKind) -> &BuildingSpec {
        match kind {
            BuildingKind::House => &self.house,
        }
    }
}

fn default_unit_explore_secs() -> f64 {
    20.0
}

fn default_group_explore_secs() -> f64 {
    10.0
}

fn default_citizen_speed() -> f64 {
    1.0
}

fn default_scout_speed() -> f64 {
    2.0
}

fn default_hunter_speed() -> f64 {
    1.25
}

fn default_group_speed() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorTuning {
    #[serde(default = "default_unit_explore_secs")]
    pub unit_explore_secs: f64,
    #[serde(default = "default_group_explore_secs")]
    pub group_explore_secs: f64,
    #[serde(default = "default_citizen_speed")]
    pub citizen_speed: f64,
    #[serde(default = "default_scout_speed")]
    pub scout_speed: f64,
    #[serde(default = "default_hunter_speed")]
    pub hunter_speed: f64,
    #[serde(default = "default_group_speed")]
    pub group_speed: f64,
}

impl Default for ActorTuning {
    fn default() -> Self {
        Self {
            unit_explore_secs: default_unit_explore_secs(),
            group_explore_secs: default_group_explore_secs(),
            citizen_speed: default_citizen_speed(),
            scout_speed: default_scout_speed(),
            hunter_speed: default_hunter_speed(),
            group_speed: default_group_speed(),
        }
    }
}

impl ActorTuning {
    pub fn unit_speed(&self, kind: UnitKind) -> f64 {
        match kind {
            UnitKind::Citizen => self.citizen_speed,
            UnitKind::Scout => self.scout_speed,
            UnitKind::Hunter => self.hunter_speed,
        }
    }
}

fn default_food_rate() -> f64 {
    0.5
}

fn default_wood_rate() -> f64 {
    0.4
}

fn default_gold_rate() -> f64 {
    0.1
}

fn default_stone_rate() -> f64 {
    0.25
}

fn default_iron_rate() -> f64 {
    0.2
}

/// Units per second a single harvester pulls out of the discovery pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestRates {
    #[serde(default = "default_food_rate")]
    pub food: f64,
    #[serde(default = "default_wood_rate")]
    pub wood: f64,
    #[serde(default = "default_gold_rate")]
    pub gold: f64,
    #[serde(default = "default_stone_rate")]
    pub stone: f64,
    #[serde(default = "default_iron_rate")]
    pub iron: f64,
}

impl Default for HarvestRates {
    fn default() -> Self {
        Self {
            food: default_food_rate(),
            wood: default_wood_rate(),
            gold: default_gold_rate(),
            stone: default_stone_rate(),
            iron: default_iron_rate(),
        }
    }
}

impl HarvestRates {
    pub fn rate(&self, kind: ResourceKind) -> f64 {
        match kind {
            ResourceKind::Food => self.food,
            ResourceKind::Wood => self.wood,
            ResourceKind::Gold => self.gold,
            ResourceKind::Stone => self.stone,
            ResourceKind::Iron => self.iron,
        }
    }
}

fn default_house_cost() -> BTreeMap<ResourceKind, f64> {
    BTreeMap::from([(ResourceKind::Wood, 30.0), (ResourceKind::Stone, 10.0)])
}

fn default_house_duration_secs() -> f64 {
    30.0
}

fn default_house_capacity() -> u32 {
    4
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingSpec {
    #[serde(default = "default_house_cost")]
    pub cost: BTreeMap<ResourceKind, f64>,
    #[serde(default = "default_house_duration_secs")]
    pub duration_secs: f64,
    #[serde(default = "default_house_capacity")]
    pub population_capacity: u32,
}

impl Default for BuildingSpec {
    fn default() -> Self {
        Self {
            cost: default_house_cost(),
            duration_secs: default_house_duration_secs(),
            population_capacity: default_house_capacity(),
        }
    }
}

impl BuildingSpec {
    pub fn cost_list(&self) -> Vec<(ResourceKind, f64)> {
        self.cost.iter().map(|(kind, amount)| (*kind, *amount)).collect()
    }
}

fn default_save_dir() -> PathBuf {
    PathBuf::from("saves")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum PersistenceConfig {
    Local {
        #[serde(default = "default_save_dir")]
        dir: PathBuf,
    },
    Remote {
        url: String,
    },
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        PersistenceConfig::Local {
            dir: default_save_dir(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<GameConfig> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&data).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(data: &str) -> Result<GameConfig> {
        if data.trim().is_empty() {
            return Ok(GameConfig::default());
        }
        let config: GameConfig = serde_yaml::from_str(data)?;
        anyhow::ensure!(
            config.tick_seconds.is_finite() && config.tick_seconds > 0.0,
            "tick_seconds must be positive and finite, got {}",
            config.tick_seconds
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = ConfigLoader::parse("").unwrap();
        assert_eq!(config.map_radius, 2);
        assert_eq!(config.actors.unit_explore_secs, 20.0);
        assert_eq!(config.actors.group_explore_secs, 10.0);
        assert_eq!(config.house.population_capacity, 4);
        assert_eq!(config.persistence, PersistenceConfig::default());
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = ConfigLoader::parse(
            "seed: 99\nharvest:\n  wood: 0.2\npersistence:\n  backend: remote\n  url: redis://localhost:6379\n",
        )
        .unwrap();
        assert_eq!(config.seed, 99);
        assert_eq!(config.harvest.rate(ResourceKind::Wood), 0.2);
        assert_eq!(config.harvest.rate(ResourceKind::Food), 0.5);
        assert_eq!(
            config.persistence,
            PersistenceConfig::Remote {
                url: "redis://localhost:6379".into()
            }
        );
    }

    #[test]
    fn non_positive_tick_is_rejected() {
        assert!(ConfigLoader::parse("tick_seconds: 0").is_err());
    }

    #[test]
    fn unbounded_tick_is_rejected() {
        assert!(ConfigLoader::parse("tick_seconds: .inf").is_err());
        assert!(ConfigLoader::parse("tick_seconds: .nan").is_err());
        assert!(ConfigLoader::parse("tick_seconds: 0.5").is_ok());
    }
}
