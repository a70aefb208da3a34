use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Food,
    Wood,
    Gold,
    Stone,
    Iron,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Food,
        ResourceKind::Wood,
        ResourceKind::Gold,
        ResourceKind::Stone,
        ResourceKind::Iron,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Food => "food",
            ResourceKind::Wood => "wood",
            ResourceKind::Gold => "gold",
            ResourceKind::Stone => "stone",
            ResourceKind::Iron => "iron",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Spendable stockpile plus the population counters.
///
/// Amounts are fractional because passive tile production credits
/// `rate * dt` every tick; debits never take an amount below zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceLedger {
    pub food: f64,
    pub wood: f64,
    pub gold: f64,
    pub stone: f64,
    pub iron: f64,
    pub population: u32,
    #[serde(alias = "populationLimit")]
    pub population_limit: u32,
}

impl ResourceLedger {
    pub fn amount(&self, kind: ResourceKind) -> f64 {
        match kind {
            ResourceKind::Food => self.food,
            ResourceKind::Wood => self.wood,
            ResourceKind::Gold => self.gold,
            ResourceKind::Stone => self.stone,
            ResourceKind::Iron => self.iron,
        }
    }

    fn slot_mut(&mut self, kind: ResourceKind) -> &mut f64 {
        match kind {
            ResourceKind::Food => &mut self.food,
            ResourceKind::Wood => &mut self.wood,
            ResourceKind::Gold => &mut self.gold,
            ResourceKind::Stone => &mut self.stone,
            ResourceKind::Iron => &mut self.iron,
        }
    }

    /// Negative or non-finite credits are ignored.
    pub fn credit(&mut self, kind: ResourceKind, amount: f64) {
        if amount.is_finite() && amount > 0.0 {
            *self.slot_mut(kind) += amount;
        }
    }

    /// Removes up to `amount`, returning what was actually taken.
    pub fn debit(&mut self, kind: ResourceKind, amount: f64) -> f64 {
        let slot = self.slot_mut(kind);
        let taken = amount.max(0.0).min(*slot);
        *slot -= taken;
        taken
    }

    pub fn has_room(&self) -> bool {
        self.population < self.population_limit
    }

    pub fn clamp_non_negative(&mut self) {
        for kind in ResourceKind::ALL {
            let slot = self.slot_mut(kind);
            if !slot.is_finite() || *slot < 0.0 {
                *slot = 0.0;
            }
        }
    }
}

/// Quantities banked by finished explorations, waiting for harvesters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryPool {
    pub food: u64,
    pub wood: u64,
    pub gold: u64,
    pub stone: u64,
    pub iron: u64,
}

impl DiscoveryPool {
    pub fn available(&self, kind: ResourceKind) -> u64 {
        match kind {
            ResourceKind::Food => self.food,
            ResourceKind::Wood => self.wood,
            ResourceKind::Gold => self.gold,
            ResourceKind::Stone => self.stone,
            ResourceKind::Iron => self.iron,
        }
    }

    fn slot_mut(&mut self, kind: ResourceKind) -> &mut u64 {
        match kind {
            ResourceKind::Food => &mut self.food,
            ResourceKind::Wood => &mut self.wood,
            ResourceKind::Gold => &mut self.gold,
            ResourceKind::Stone => &mut self.stone,
            ResourceKind::Iron => &mut self.iron,
        }
    }

    pub fn bank(&mut self, kind: ResourceKind, amount: u64) {
        let slot = self.slot_mut(kind);
        *slot = slot.saturating_add(amount);
    }

    /// Removes at most the available amount and returns what was removed.
    pub fn draw(&mut self, kind: ResourceKind, amount: u64) -> u64 {
        let slot = self.slot_mut(kind);
        let taken = amount.min(*slot);
        *slot -= taken;
        taken
    }

    pub fn total(&self) -> u64 {
        ResourceKind::ALL
            .iter()
            .map(|kind| self.available(*kind))
            .sum()
    }
}
