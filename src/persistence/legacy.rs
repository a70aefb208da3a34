//! Saves from the first version of the game: resources at the top level,
//! units and buildings as plain counts per kind.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::actors::UnitKind;
use crate::buildings::BuildingKind;
use crate::resources::{ResourceKind, ResourceLedger};
use crate::world::World;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct LegacyGame {
    food: f64,
    wood: f64,
    gold: f64,
    stone: f64,
    iron: f64,
    population: u32,
    #[serde(rename = "populationLimit")]
    population_limit: u32,
    units: BTreeMap<String, u32>,
    buildings: BTreeMap<String, u32>,
}

/// Current saves keep resources under `ledger` and units as a list.
pub(crate) fn is_legacy(game: &Value) -> bool {
    if game.get("ledger").is_some() {
        return false;
    }
    game.get("units").is_some_and(Value::is_object)
        || game.get("populationLimit").is_some()
        || ResourceKind::ALL
            .iter()
            .any(|kind| game.get(kind.as_str()).is_some_and(Value::is_number))
}

impl From<LegacyGame> for World {
    fn from(legacy: LegacyGame) -> Self {
        let mut world = World::default();
        *world.ledger_mut() = ResourceLedger {
            food: legacy.food,
            wood: legacy.wood,
            gold: legacy.gold,
            stone: legacy.stone,
            iron: legacy.iron,
            population: legacy.population,
            population_limit: legacy.population_limit,
        };
        world.ledger_mut().clamp_non_negative();

        for kind in UnitKind::ALL {
            let count = legacy.units.get(kind.as_str()).copied().unwrap_or(0);
            for _ in 0..count {
                world.actors_mut().spawn_unit(kind);
            }
        }
        for (name, count) in &legacy.buildings {
            match name.as_str() {
                "house" => world.buildings_mut().set_count(BuildingKind::House, *count),
                other => warn!(building = other, "Skipping unknown building in old save"),
            }
        }
        debug!(units = world.actors().units().len(), "Converted old-format save");
        world
    }
}
