pub mod accounts;
pub mod actors;
pub mod buildings;
pub mod commands;
pub mod config;
pub mod engine;
pub mod map;
pub mod persistence;
pub mod resources;
pub mod rng;
pub mod systems;
pub mod web;
pub mod world;

pub use commands::{CommandError, OrderRequest};
pub use config::{ConfigLoader, GameConfig};
pub use engine::{Engine, EngineBuilder, EngineSettings, TickSummary};
pub use world::{GameView, World};
