use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::actors::GroupId;
use crate::resources::ResourceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}

impl TileCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    Forest,
    Berry,
    Stone,
    Game,
    River,
    Iron,
    Grass,
}

impl Terrain {
    pub const ALL: [Terrain; 7] = [
        Terrain::Forest,
        Terrain::Berry,
        Terrain::Stone,
        Terrain::Game,
        Terrain::River,
        Terrain::Iron,
        Terrain::Grass,
    ];

    /// Per-second yield of a tile of this terrain, used both for the
    /// exploration payout and for garrisoned passive production.
    pub fn production(self) -> &'static [(ResourceKind, f64)] {
        match self {
            Terrain::Forest => &[(ResourceKind::Wood, 0.15)],
            Terrain::Berry => &[(ResourceKind::Food, 0.2)],
            Terrain::Stone => &[(ResourceKind::Stone, 0.12)],
            Terrain::Game => &[(ResourceKind::Food, 0.25)],
            Terrain::River => &[(ResourceKind::Food, 0.1), (ResourceKind::Gold, 0.02)],
            Terrain::Iron => &[(ResourceKind::Iron, 0.08)],
            Terrain::Grass => &[(ResourceKind::Food, 0.05)],
        }
    }

    /// Amounts banked into the discovery pool when exploring a tile finishes.
    pub fn discovery_yield(self) -> Vec<(ResourceKind, u64)> {
        self.production()
            .iter()
            .map(|(kind, rate)| (*kind, (rate * 50.0 + 20.0).floor() as u64))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub coord: TileCoord,
    pub terrain: Terrain,
    #[serde(default)]
    pub discovered: bool,
    #[serde(default)]
    pub assigned_group: Option<GroupId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldMap {
    tiles: Vec<Tile>,
}

impl WorldMap {
    /// A map with a fixed layout, for scripted starts.
    pub fn from_tiles(tiles: Vec<Tile>) -> Self {
        Self { tiles }
    }

    pub fn is_initialized(&self) -> bool {
        !self.tiles.is_empty()
    }

    /// Lays out a `(2r + 1)²` grid around the origin with random terrain.
    /// Does nothing when the map already has tiles.
    pub fn initialize<R: Rng>(&mut self, radius: u32, rng: &mut R) {
        if self.is_initialized() {
            return;
        }
        let radius = radius as i32;
        for y in -radius..=radius {
            for x in -radius..=radius {
                let terrain = Terrain::ALL[rng.gen_range(0..Terrain::ALL.len())];
                self.tiles.push(Tile {
                    coord: TileCoord::new(x, y),
                    terrain,
                    discovered: false,
                    assigned_group: None,
                });
            }
        }
    }

    /// Chooses the next exploration target and marks it discovered.
    ///
    /// Undiscovered tiles are preferred; once every tile is known a random
    /// tile from the whole map is returned again.
    pub fn pick_next_tile<R: Rng>(&mut self, rng: &mut R) -> Option<TileCoord> {
        let undiscovered: Vec<usize> = self
            .tiles
            .iter()
            .enumerate()
            .filter(|(_, tile)| !tile.discovered)
            .map(|(index, _)| index)
            .collect();
        let index = match undiscovered.choose(rng) {
            Some(index) => *index,
            None if self.tiles.is_empty() => return None,
            None => rng.gen_range(0..self.tiles.len()),
        };
        let tile = &mut self.tiles[index];
        tile.discovered = true;
        Some(tile.coord)
    }

    pub fn tile(&self, coord: TileCoord) -> Option<&Tile> {
        self.tiles.iter().find(|tile| tile.coord == coord)
    }

    pub fn tile_mut(&mut self, coord: TileCoord) -> Option<&mut Tile> {
        self.tiles.iter_mut().find(|tile| tile.coord == coord)
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn assigned_tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles
            .iter()
            .filter(|tile| tile.assigned_group.is_some())
    }

    pub fn discovered_count(&self) -> usize {
        self.tiles.iter().filter(|tile| tile.discovered).count()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn initialize_builds_five_by_five_grid_once() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut map = WorldMap::default();
        map.initialize(2, &mut rng);
        assert_eq!(map.len(), 25);
        assert!(map.tile(TileCoord::new(-2, -2)).is_some());
        assert!(map.tile(TileCoord::new(2, 2)).is_some());
        assert!(map.tile(TileCoord::new(3, 0)).is_none());

        let before = map.clone();
        map.initialize(4, &mut rng);
        assert_eq!(map, before);
    }

    #[test]
    fn pick_prefers_undiscovered_then_revisits() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut map = WorldMap::default();
        map.initialize(1, &mut rng);

        let mut seen = std::collections::HashSet::new();
        for _ in 0..map.len() {
            let coord = map.pick_next_tile(&mut rng).unwrap();
            assert!(seen.insert(coord), "tile {coord} picked twice");
            assert!(map.tile(coord).unwrap().discovered);
        }
        assert_eq!(map.discovered_count(), 9);

        let revisit = map.pick_next_tile(&mut rng).unwrap();
        assert!(seen.contains(&revisit));
    }

    #[test]
    fn empty_map_has_nothing_to_pick() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut map = WorldMap::default();
        assert_eq!(map.pick_next_tile(&mut rng), None);
    }

    #[test]
    fn forest_discovery_yields_twenty_seven_wood() {
        assert_eq!(
            Terrain::Forest.discovery_yield(),
            vec![(ResourceKind::Wood, 27)]
        );
    }
}
