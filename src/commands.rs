//! Player commands. Each one validates fully before touching the world, so a
//! rejected command leaves the state exactly as it was.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::actors::{ActorId, GroupId, Order, UnitId, UnitKind};
use crate::buildings::BuildingKind;
use crate::config::GameConfig;
use crate::map::TileCoord;
use crate::resources::ResourceKind;
use crate::world::World;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("{0} does not exist")]
    UnknownActor(ActorId),

    #[error("{0} does not exist")]
    UnknownUnit(UnitId),

    #[error("{0} does not exist")]
    UnknownGroup(GroupId),

    #[error("tile {0} does not exist")]
    UnknownTile(TileCoord),

    #[error("tile {0} has not been discovered yet")]
    UndiscoveredTile(TileCoord),

    #[error("population cap reached ({population}/{limit}), build more houses")]
    PopulationCap { population: u32, limit: u32 },

    #[error("not enough {resource} for a {building}: need {needed}, have {available}")]
    InsufficientResources {
        building: BuildingKind,
        resource: ResourceKind,
        needed: f64,
        available: f64,
    },

    #[error("no discovered {0} left to harvest")]
    NothingToHarvest(ResourceKind),

    #[error("a group needs at least one member")]
    EmptyGroup,
}

/// Order as requested by the player, before any progress exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "order", rename_all = "snake_case")]
pub enum OrderRequest {
    Idle,
    Explore,
    Harvest { resource: ResourceKind },
    Build { building: BuildingKind },
}

impl World {
    pub fn spawn_unit(&mut self, kind: UnitKind) -> Result<UnitId, CommandError> {
        let ledger = &self.ledger;
        if !ledger.has_room() {
            return Err(CommandError::PopulationCap {
                population: ledger.population,
                limit: ledger.population_limit,
            });
        }
        self.ledger.population += 1;
        let id = self.actors.spawn_unit(kind);
        info!(
            unit = %id,
            kind = kind.as_str(),
            population = self.ledger.population,
            limit = self.ledger.population_limit,
            "Unit spawned"
        );
        Ok(id)
    }

    pub fn create_group(
        &mut self,
        members: &[UnitId],
        name: Option<String>,
    ) -> Result<GroupId, CommandError> {
        if members.is_empty() {
            return Err(CommandError::EmptyGroup);
        }
        if let Some(missing) = members.iter().find(|id| self.actors.unit(**id).is_none()) {
            return Err(CommandError::UnknownUnit(*missing));
        }
        let members: BTreeSet<UnitId> = members.iter().copied().collect();
        let size = members.len();
        let id = self.actors.insert_group(name, members);
        info!(group = %id, size, "Group formed");
        Ok(id)
    }

    /// Replaces the actor's current order. Progress of the previous order is
    /// dropped; a build order pays its full cost here.
    pub fn issue_order(
        &mut self,
        config: &GameConfig,
        actor: ActorId,
        request: OrderRequest,
    ) -> Result<(), CommandError> {
        if self.actors.actor(actor).is_none() {
            return Err(CommandError::UnknownActor(actor));
        }

        let order = match request {
            OrderRequest::Idle => Order::Idle,
            OrderRequest::Explore => Order::explore(),
            OrderRequest::Harvest { resource } => {
                if self.discoveries.available(resource) == 0 {
                    return Err(CommandError::NothingToHarvest(resource));
                }
                Order::Harvest {
                    resource,
                    carry: 0.0,
                }
            }
            OrderRequest::Build { building } => {
                let spec = config.building(building);
                let cost = spec.cost_list();
                if let Some((resource, needed)) = cost
                    .iter()
                    .find(|(kind, amount)| self.ledger.amount(*kind) < *amount)
                {
                    return Err(CommandError::InsufficientResources {
                        building,
                        resource: *resource,
                        needed: *needed,
                        available: self.ledger.amount(*resource),
                    });
                }
                for (resource, amount) in &cost {
                    self.ledger.debit(*resource, *amount);
                }
                Order::Build {
                    building,
                    remaining: spec.duration_secs,
                }
            }
        };

        let name = order.name();
        if let Some(target) = self.actors.actor_mut(actor) {
            target.set_order(order);
        }
        debug!(%actor, order = name, "Order issued");
        Ok(())
    }

    /// Stations a group on a discovered tile so the tile produces every tick.
    pub fn assign_tile(&mut self, coord: TileCoord, group: GroupId) -> Result<(), CommandError> {
        if self.actors.group(group).is_none() {
            return Err(CommandError::UnknownGroup(group));
        }
        let tile = self
            .map
            .tile_mut(coord)
            .ok_or(CommandError::UnknownTile(coord))?;
        if !tile.discovered {
            return Err(CommandError::UndiscoveredTile(coord));
        }
        tile.assigned_group = Some(group);
        info!(tile = %coord, %group, terrain = ?tile.terrain, "Tile assigned");
        Ok(())
    }

    pub fn release_tile(&mut self, coord: TileCoord) -> Result<Option<GroupId>, CommandError> {
        let tile = self
            .map
            .tile_mut(coord)
            .ok_or(CommandError::UnknownTile(coord))?;
        Ok(tile.assigned_group.take())
    }
}
