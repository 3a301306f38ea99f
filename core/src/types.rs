//! Shared primitive types used across the whole save engine.

use serde::{Deserialize, Serialize};

/// Player slot number. Stable for the life of a game.
pub type PlayerId = usize;

/// City identity number. Never 0 for a live city.
pub type CityId = u32;

/// Unit identity number. Never 0 for a live unit.
pub type UnitId = u32;

/// Row-major index of a tile in native map coordinates.
pub type TileIndex = usize;

/// Game turn counter.
pub type Turn = i32;

/// Maximum number of player slots a save can describe.
pub const MAX_PLAYER_SLOTS: usize = 128;

/// A small set of domain indices (bases, roads, specials, player slots...).
///
/// Every domain persisted through nybble packing must fit in
/// [`FlagSet::CAPACITY`] members; the ruleset checks this on load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlagSet(u128);

impl FlagSet {
    pub const CAPACITY: usize = 128;

    pub fn new() -> Self {
        Self(0)
    }

    pub fn contains(&self, index: usize) -> bool {
        index < Self::CAPACITY && self.0 & (1u128 << index) != 0
    }

    /// Set `index`. Indices beyond capacity are ignored and reported false.
    pub fn insert(&mut self, index: usize) -> bool {
        if index >= Self::CAPACITY {
            return false;
        }
        self.0 |= 1u128 << index;
        true
    }

    pub fn remove(&mut self, index: usize) {
        if index < Self::CAPACITY {
            self.0 &= !(1u128 << index);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..Self::CAPACITY).filter(move |i| self.contains(*i))
    }

    /// The 32 bits of bank `bank` (members `32*bank .. 32*bank+31`).
    pub fn bank(&self, bank: usize) -> u32 {
        if bank >= Self::CAPACITY / 32 {
            return 0;
        }
        (self.0 >> (bank * 32)) as u32
    }
}

impl FromIterator<usize> for FlagSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = FlagSet::new();
        for i in iter {
            set.insert(i);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flagset_bank_splits_players_by_32() {
        let set: FlagSet = [0, 31, 32, 70].into_iter().collect();
        assert_eq!(set.bank(0), 0x8000_0001);
        assert_eq!(set.bank(1), 0x0000_0001);
        assert_eq!(set.bank(2), 1 << 6);
        assert_eq!(set.bank(3), 0);
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn flagset_ignores_out_of_range() {
        let mut set = FlagSet::new();
        assert!(!set.insert(FlagSet::CAPACITY));
        assert!(set.is_empty());
        assert!(!set.contains(500));
    }
}
