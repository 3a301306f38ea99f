use crate::types::{CityId, FlagSet, PlayerId, TileIndex};
use serde::{Deserialize, Serialize};

/// Longest side a map may have.
pub const MAX_LINEAR_SIZE: usize = 8192;
/// Most tiles a map may hold.
pub const MAX_TILES: usize = 2048 * 1000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    /// Ruleset terrain index; `None` is unknown terrain.
    pub terrain: Option<usize>,
    pub resource: Option<usize>,
    pub specials: FlagSet,
    pub bases: FlagSet,
    pub roads: FlagSet,
    pub owner: Option<PlayerId>,
    /// Tile whose influence last claimed this one.
    pub claimer: Option<TileIndex>,
    pub worked: Option<CityId>,
    /// Player slots that know this tile.
    pub known: FlagSet,
    pub spec_sprite: Option<String>,
    pub label: Option<String>,
}

/// Separator between nation names of a saved start position.
pub const NATION_SEPARATOR: &str = "#";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartPos {
    pub x: usize,
    pub y: usize,
    /// When true, `nations` lists the nations that may NOT start here.
    pub exclude: bool,
    /// Ruleset nation indices. Empty means every nation.
    pub nations: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Map {
    pub xsize: usize,
    pub ysize: usize,
    pub have_huts: bool,
    pub have_resources: bool,
    pub have_rivers_overlay: bool,
    /// Row-major, `xsize * ysize` entries.
    pub tiles: Vec<Tile>,
    pub start_positions: Vec<StartPos>,
}

impl Map {
    pub fn new(xsize: usize, ysize: usize) -> Self {
        Self {
            xsize,
            ysize,
            have_huts: false,
            have_resources: true,
            have_rivers_overlay: false,
            tiles: vec![Tile::default(); xsize * ysize],
            start_positions: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn index(&self, x: usize, y: usize) -> Option<TileIndex> {
        (x < self.xsize && y < self.ysize).then(|| y * self.xsize + x)
    }

    pub fn coords(&self, index: TileIndex) -> (usize, usize) {
        (index % self.xsize.max(1), index / self.xsize.max(1))
    }

    pub fn tile(&self, x: usize, y: usize) -> Option<&Tile> {
        self.index(x, y).map(|i| &self.tiles[i])
    }

    pub fn tile_mut(&mut self, x: usize, y: usize) -> Option<&mut Tile> {
        self.index(x, y).map(move |i| &mut self.tiles[i])
    }

    /// Row `y` of tiles.
    pub fn row(&self, y: usize) -> &[Tile] {
        &self.tiles[y * self.xsize..(y + 1) * self.xsize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_and_coords_agree() {
        let map = Map::new(5, 3);
        assert_eq!(map.index(4, 2), Some(14));
        assert_eq!(map.coords(14), (4, 2));
        assert_eq!(map.index(5, 0), None);
        assert_eq!(map.row(1).len(), 5);
    }
}
