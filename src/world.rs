use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::actors::{Actor, ActorId, ActorRegistry, Group, GroupId, Order, UnitKind};
use crate::buildings::{BuildingCounts, BuildingKind};
use crate::map::{Terrain, Tile, TileCoord, WorldMap};
use crate::resources::{DiscoveryPool, ResourceKind, ResourceLedger};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryRecord {
    pub tile: TileCoord,
    pub terrain: Terrain,
    pub amounts: Vec<(ResourceKind, u64)>,
    pub actor: ActorId,
    pub tick: u64,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub building: BuildingKind,
    pub actor: ActorId,
    pub population_limit: u32,
    pub tick: u64,
    pub at: DateTime<Utc>,
}

/// Complete state of one player's game. This is also the persisted snapshot:
/// every field falls back to a fresh-game value when absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct World {
    tick: u64,
    elapsed_secs: f64,
    pub(crate) ledger: ResourceLedger,
    pub(crate) discoveries: DiscoveryPool,
    pub(crate) map: WorldMap,
    #[serde(flatten)]
    pub(crate) actors: ActorRegistry,
    pub(crate) buildings: BuildingCounts,
    pub(crate) discovery_log: Vec<DiscoveryRecord>,
    pub(crate) build_log: Vec<BuildRecord>,
}

impl World {
    /// Starting position of a new player: one citizen, no housing yet.
    /// The map is laid out separately by the engine.
    pub fn fresh() -> Self {
        let mut world = World::default();
        world.ledger.population = 1;
        world.actors.spawn_unit(UnitKind::Citizen);
        world
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }

    pub fn advance_time(&mut self, dt_secs: f64) {
        self.tick += 1;
        self.elapsed_secs += dt_secs;
    }

    pub fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut ResourceLedger {
        &mut self.ledger
    }

    pub fn discoveries(&self) -> &DiscoveryPool {
        &self.discoveries
    }

    pub fn discoveries_mut(&mut self) -> &mut DiscoveryPool {
        &mut self.discoveries
    }

    pub fn map(&self) -> &WorldMap {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut WorldMap {
        &mut self.map
    }

    pub fn actors(&self) -> &ActorRegistry {
        &self.actors
    }

    pub fn actors_mut(&mut self) -> &mut ActorRegistry {
        &mut self.actors
    }

    pub fn buildings(&self) -> &BuildingCounts {
        &self.buildings
    }

    pub fn buildings_mut(&mut self) -> &mut BuildingCounts {
        &mut self.buildings
    }

    pub fn discovery_log(&self) -> &[DiscoveryRecord] {
        &self.discovery_log
    }

    pub fn build_log(&self) -> &[BuildRecord] {
        &self.build_log
    }

    pub(crate) fn push_discovery(&mut self, record: DiscoveryRecord, capacity: usize) {
        push_capped(&mut self.discovery_log, record, capacity);
    }

    pub(crate) fn push_build(&mut self, record: BuildRecord, capacity: usize) {
        push_capped(&mut self.build_log, record, capacity);
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.actors.group(id)
    }

    pub fn view(&self) -> GameView {
        let actors = self
            .actors
            .units()
            .iter()
            .map(|unit| ActorView {
                id: unit.actor_id(),
                unit_kind: Some(unit.kind),
                members: Vec::new(),
                order: unit.order.name(),
                progress: progress_of(unit),
            })
            .chain(self.actors.groups().iter().map(|group| ActorView {
                id: group.actor_id(),
                unit_kind: None,
                members: group.members.iter().map(|id| id.0).collect(),
                order: group.order.name(),
                progress: progress_of(group),
            }))
            .collect();
        let unit_counts = UnitKind::ALL
            .iter()
            .map(|kind| (*kind, self.actors.unit_count(*kind)))
            .collect();
        GameView {
            tick: self.tick,
            elapsed_secs: self.elapsed_secs,
            ledger: self.ledger.clone(),
            discoveries: self.discoveries.clone(),
            houses: self.buildings.count(BuildingKind::House),
            unit_counts,
            actors,
            tiles: self.map.tiles().to_vec(),
            recent_discoveries: self.discovery_log.iter().rev().take(10).cloned().collect(),
            recent_builds: self.build_log.iter().rev().take(10).cloned().collect(),
        }
    }
}

fn push_capped<T>(log: &mut Vec<T>, record: T, capacity: usize) {
    log.push(record);
    if capacity > 0 && log.len() > capacity {
        let excess = log.len() - capacity;
        log.drain(..excess);
    }
}

fn progress_of(actor: &dyn Actor) -> Option<OrderProgressView> {
    match actor.order() {
        Order::Idle => None,
        Order::Explore { target, remaining } => Some(OrderProgressView {
            target: target.map(|coord| coord.to_string()),
            remaining_secs: Some(*remaining),
            carry: None,
        }),
        Order::Harvest { resource, carry } => Some(OrderProgressView {
            target: Some(resource.to_string()),
            remaining_secs: None,
            carry: Some(*carry),
        }),
        Order::Build {
            building,
            remaining,
        } => Some(OrderProgressView {
            target: Some(building.to_string()),
            remaining_secs: Some(*remaining),
            carry: None,
        }),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderProgressView {
    pub target: Option<String>,
    pub remaining_secs: Option<f64>,
    pub carry: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActorView {
    pub id: ActorId,
    pub unit_kind: Option<UnitKind>,
    pub members: Vec<u32>,
    pub order: &'static str,
    pub progress: Option<OrderProgressView>,
}

/// Read-only projection handed to the UI after every tick and command.
#[derive(Debug, Clone, Serialize)]
pub struct GameView {
    pub tick: u64,
    pub elapsed_secs: f64,
    pub ledger: ResourceLedger,
    pub discoveries: DiscoveryPool,
    pub houses: u32,
    pub unit_counts: Vec<(UnitKind, usize)>,
    pub actors: Vec<ActorView>,
    pub tiles: Vec<Tile>,
    pub recent_discoveries: Vec<DiscoveryRecord>,
    pub recent_builds: Vec<BuildRecord>,
}
