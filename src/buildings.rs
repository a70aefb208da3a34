use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingKind {
    House,
}

impl BuildingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BuildingKind::House => "house",
        }
    }
}

impl fmt::Display for BuildingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Completed building count per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildingCounts(BTreeMap<BuildingKind, u32>);

impl BuildingCounts {
    pub fn count(&self, kind: BuildingKind) -> u32 {
        self.0.get(&kind).copied().unwrap_or(0)
    }

    pub fn record_completion(&mut self, kind: BuildingKind) -> u32 {
        let count = self.0.entry(kind).or_insert(0);
        *count += 1;
        *count
    }

    pub(crate) fn set_count(&mut self, kind: BuildingKind, count: u32) {
        if count == 0 {
            self.0.remove(&kind);
        } else {
            self.0.insert(kind, count);
        }
    }
}
