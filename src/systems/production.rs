use anyhow::Result;

use crate::{
    engine::{System, SystemContext},
    resources::ResourceKind,
    rng::SystemRng,
    world::World,
};

/// Garrison output: every tile with an assigned group pays its terrain
/// rates straight into the ledger, whatever the group is doing.
pub struct ProductionSystem;

impl ProductionSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ProductionSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for ProductionSystem {
    fn name(&self) -> &str {
        "production"
    }

    fn run(&mut self, ctx: &SystemContext, world: &mut World, _rng: &mut SystemRng) -> Result<()> {
        let dt = ctx.dt_secs;
        let yields: Vec<(ResourceKind, f64)> = world
            .map
            .assigned_tiles()
            .flat_map(|tile| tile.terrain.production().iter())
            .map(|(kind, rate)| (*kind, rate * dt))
            .collect();
        for (kind, amount) in yields {
            world.ledger.credit(kind, amount);
        }
        Ok(())
    }
}
