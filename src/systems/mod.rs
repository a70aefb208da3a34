mod construction;
mod exploration;
mod harvest;
mod production;

pub use construction::ConstructionSystem;
pub use exploration::ExplorationSystem;
pub use harvest::HarvestSystem;
pub use production::ProductionSystem;
