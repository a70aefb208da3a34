use anyhow::Result;
use tracing::debug;

use crate::{
    actors::{ActorId, Order},
    engine::{System, SystemContext},
    rng::SystemRng,
    world::World,
};

const EPS: f64 = 1e-9;

/// Moves banked discoveries into the ledger, one harvester at a time.
///
/// Each harvester keeps a fractional `carry` so that rates below one unit
/// per second still pay out whole units over several ticks.
pub struct HarvestSystem;

impl HarvestSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HarvestSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for HarvestSystem {
    fn name(&self) -> &str {
        "harvest"
    }

    fn run(&mut self, ctx: &SystemContext, world: &mut World, _rng: &mut SystemRng) -> Result<()> {
        let dt = ctx.dt_secs;
        let ids: Vec<ActorId> = world.actors.actor_ids();
        for id in ids {
            let actor = match world.actors.actor_mut(id) {
                Some(actor) => actor,
                None => continue,
            };
            let (resource, carry) = match actor.order_mut() {
                Order::Harvest { resource, carry } => (*resource, carry),
                _ => continue,
            };

            if world.discoveries.available(resource) == 0 {
                debug!(actor = %id, %resource, "Harvest target exhausted");
                actor.set_order(Order::Idle);
                continue;
            }

            *carry += ctx.config.harvest.rate(resource) * dt;
            let whole = (*carry + EPS).floor();
            *carry = (*carry - whole).max(0.0);
            let taken = world.discoveries.draw(resource, whole as u64);
            world.ledger.credit(resource, taken as f64);
        }
        Ok(())
    }
}
