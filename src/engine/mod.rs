use std::time::Instant;

use anyhow::Result;
use tracing::{debug, trace};

use crate::{
    config::GameConfig,
    rng::{RngManager, SystemRng},
    systems::{ConstructionSystem, ExplorationSystem, HarvestSystem, ProductionSystem},
    world::{GameView, World},
};

const WORLD_MAP_STREAM: &str = "world_map";

pub struct EngineSettings {
    pub config: GameConfig,
}

impl EngineSettings {
    pub fn new(config: GameConfig) -> Self {
        Self { config }
    }
}

pub struct EngineBuilder {
    settings: EngineSettings,
    systems: Vec<Box<dyn System>>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            systems: Vec::new(),
        }
    }

    /// The game's tick pipeline: passive production, harvesting,
    /// construction, then exploration.
    pub fn standard(settings: EngineSettings) -> Self {
        Self::new(settings)
            .with_system(ProductionSystem::new())
            .with_system(HarvestSystem::new())
            .with_system(ConstructionSystem::new())
            .with_system(ExplorationSystem::new())
    }

    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    pub fn push_system(&mut self, system: impl System + 'static) {
        self.systems.push(Box::new(system));
    }

    pub fn build(self) -> Engine {
        Engine {
            rng: RngManager::new(self.settings.config.seed),
            systems: self.systems,
            settings: self.settings,
        }
    }
}

pub struct Engine {
    rng: RngManager,
    systems: Vec<Box<dyn System>>,
    settings: EngineSettings,
}

impl Engine {
    pub fn config(&self) -> &GameConfig {
        &self.settings.config
    }

    /// A new player's world with its map already laid out.
    pub fn new_world(&self) -> World {
        let mut world = World::fresh();
        self.restore(&mut world);
        world
    }

    /// Makes a loaded snapshot runnable. Snapshots saved before the map
    /// existed get one generated now, and id counters that lag behind the
    /// stored actors are moved past them.
    pub fn restore(&self, world: &mut World) {
        world.actors_mut().reconcile_counters();
        if !world.map().is_initialized() {
            let mut rng = self.rng.stream(WORLD_MAP_STREAM, 0);
            world
                .map_mut()
                .initialize(self.settings.config.map_radius, &mut rng);
            debug!(tiles = world.map().len(), "World map generated");
        }
    }

    pub fn tick(&mut self, world: &mut World) -> Result<TickSummary> {
        let current_tick = world.tick();
        let dt_secs = self.settings.config.tick_seconds;
        let mut system_reports = Vec::with_capacity(self.systems.len());
        for system in &mut self.systems {
            let mut rng_stream = self.rng.stream(system.name(), current_tick);
            let ctx = SystemContext {
                tick: current_tick,
                dt_secs,
                config: &self.settings.config,
            };
            let start = Instant::now();
            system.run(&ctx, world, &mut rng_stream)?;
            let elapsed = start.elapsed();
            trace!(system = system.name(), tick = current_tick, ?elapsed, "System ran");
            system_reports.push(SystemRunReport {
                name: system.name().to_string(),
                duration_ms: elapsed.as_secs_f64() * 1_000.0,
            });
        }
        world.ledger_mut().clamp_non_negative();
        world.advance_time(dt_secs);
        Ok(TickSummary {
            tick: world.tick(),
            system_reports,
        })
    }

    pub fn run(&mut self, world: &mut World, ticks: u64) -> Result<()> {
        for _ in 0..ticks {
            self.tick(world)?;
        }
        Ok(())
    }

    /// Runs `ticks` ticks, handing the UI view to `hook` after each one.
    pub fn run_with_hook<F>(&mut self, world: &mut World, ticks: u64, mut hook: F) -> Result<()>
    where
        F: FnMut(GameView),
    {
        for _ in 0..ticks {
            self.tick(world)?;
            hook(world.view());
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct SystemRunReport {
    pub name: String,
    pub duration_ms: f64,
}

#[derive(Clone, Debug)]
pub struct TickSummary {
    pub tick: u64,
    pub system_reports: Vec<SystemRunReport>,
}

pub struct SystemContext<'a> {
    pub tick: u64,
    pub dt_secs: f64,
    pub config: &'a GameConfig,
}

pub trait System: Send + Sync {
    fn name(&self) -> &str;
    fn run(&mut self, ctx: &SystemContext, world: &mut World, rng: &mut SystemRng) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingSystem {
        calls: u32,
    }

    impl System for CountingSystem {
        fn name(&self) -> &str {
            "counting"
        }

        fn run(&mut self, ctx: &SystemContext, _world: &mut World, _rng: &mut SystemRng) -> Result<()> {
            self.calls += 1;
            assert_eq!(ctx.tick + 1, u64::from(self.calls));
            Ok(())
        }
    }

    #[test]
    fn tick_advances_world_clock() {
        let mut engine = EngineBuilder::new(EngineSettings::new(GameConfig::default()))
            .with_system(CountingSystem { calls: 0 })
            .build();
        let mut world = engine.new_world();
        let summary = engine.tick(&mut world).unwrap();
        assert_eq!(summary.tick, 1);
        assert_eq!(summary.system_reports.len(), 1);
        assert_eq!(summary.system_reports[0].name, "counting");
        engine.run(&mut world, 4).unwrap();
        assert_eq!(world.tick(), 5);
        assert_eq!(world.elapsed_secs(), 5.0);
    }

    #[test]
    fn restore_keeps_existing_map() {
        let engine = EngineBuilder::standard(EngineSettings::new(GameConfig::default())).build();
        let world = engine.new_world();
        let mut restored = world.clone();
        engine.restore(&mut restored);
        assert_eq!(restored, world);
        assert_eq!(world.map().len(), 25);
    }

    #[test]
    fn engine_is_shareable_across_tasks() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
    }

    #[test]
    fn restore_moves_id_counters_past_stored_actors() {
        let engine = EngineBuilder::standard(EngineSettings::new(GameConfig::default())).build();
        let mut world: World = serde_json::from_str(
            r#"{"units":[{"id":1,"kind":"citizen"},{"id":4,"kind":"scout"}],
                "groups":[{"id":2,"members":[1]}]}"#,
        )
        .unwrap();
        assert_eq!(world.actors().next_unit_id(), 1);

        engine.restore(&mut world);
        assert_eq!(world.actors().next_unit_id(), 5);
        assert_eq!(world.actors().next_group_id(), 3);
    }
}
