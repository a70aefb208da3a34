use anyhow::Result;
use chrono::Utc;
use tracing::{debug, info};

use crate::{
    actors::{ActorId, Order},
    engine::{System, SystemContext},
    map::TileCoord,
    rng::SystemRng,
    world::{DiscoveryRecord, World},
};

/// Advances every exploring unit and group.
///
/// An explorer without a target claims one from the map (which marks it
/// discovered right away) and counts down `base / speed` seconds at
/// `speed` per second. When the countdown runs out the tile's terrain
/// yield is banked into the discovery pool and the explorer is free to
/// claim another tile on its next tick.
pub struct ExplorationSystem;

impl ExplorationSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ExplorationSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for ExplorationSystem {
    fn name(&self) -> &str {
        "exploration"
    }

    fn run(&mut self, ctx: &SystemContext, world: &mut World, rng: &mut SystemRng) -> Result<()> {
        let dt = ctx.dt_secs;
        let tuning = &ctx.config.actors;
        let mut completed: Vec<(ActorId, TileCoord)> = Vec::new();

        for id in world.actors.actor_ids() {
            let Some(actor) = world.actors.actor_mut(id) else {
                continue;
            };
            let speed = actor.speed(tuning).max(f64::EPSILON);
            let base_secs = actor.explore_base_secs(tuning);
            let Order::Explore { target, remaining } = actor.order_mut() else {
                continue;
            };

            if target.is_none() {
                match world.map.pick_next_tile(rng) {
                    Some(coord) => {
                        *target = Some(coord);
                        *remaining = base_secs / speed;
                        debug!(actor = %id, tile = %coord, remaining = *remaining, "Exploration started");
                    }
                    None => continue,
                }
            }

            *remaining -= dt * speed;
            if *remaining <= 0.0 {
                *remaining = 0.0;
                if let Some(coord) = target.take() {
                    completed.push((id, coord));
                }
            }
        }

        for (actor, coord) in completed {
            let Some(tile) = world.map.tile(coord) else {
                continue;
            };
            let terrain = tile.terrain;
            let amounts = terrain.discovery_yield();
            for (kind, amount) in &amounts {
                world.discoveries.bank(*kind, *amount);
            }
            info!(%actor, tile = %coord, ?terrain, ?amounts, "Tile explored");
            world.push_discovery(
                DiscoveryRecord {
                    tile: coord,
                    terrain,
                    amounts,
                    actor,
                    tick: ctx.tick,
                    at: Utc::now(),
                },
                ctx.config.log_capacity,
            );
        }
        Ok(())
    }
}
