use anyhow::Result;
use chrono::Utc;
use tracing::info;

use crate::{
    actors::{ActorId, Order},
    buildings::BuildingKind,
    engine::{System, SystemContext},
    rng::SystemRng,
    world::{BuildRecord, World},
};

pub struct ConstructionSystem;

impl ConstructionSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConstructionSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for ConstructionSystem {
    fn name(&self) -> &str {
        "construction"
    }

    fn run(&mut self, ctx: &SystemContext, world: &mut World, _rng: &mut SystemRng) -> Result<()> {
        let dt = ctx.dt_secs;
        let mut finished: Vec<(ActorId, BuildingKind)> = Vec::new();
        for id in world.actors.actor_ids() {
            let Some(actor) = world.actors.actor_mut(id) else {
                continue;
            };
            let Order::Build {
                building,
                remaining,
            } = actor.order_mut()
            else {
                continue;
            };
            *remaining -= dt;
            if *remaining <= 0.0 {
                let building = *building;
                actor.set_order(Order::Idle);
                finished.push((id, building));
            }
        }

        for (actor, building) in finished {
            let spec = ctx.config.building(building);
            let count = world.buildings.record_completion(building);
            world.ledger.population_limit = world
                .ledger
                .population_limit
                .saturating_add(spec.population_capacity);
            let population_limit = world.ledger.population_limit;
            info!(
                %actor,
                %building,
                count,
                population_limit,
                "Construction finished"
            );
            world.push_build(
                BuildRecord {
                    building,
                    actor,
                    population_limit,
                    tick: ctx.tick,
                    at: Utc::now(),
                },
                ctx.config.log_capacity,
            );
        }
        Ok(())
    }
}
