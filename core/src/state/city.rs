use crate::types::{CityId, FlagSet, PlayerId, Turn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// What a city builds. Saved as a (kind, name) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Production {
    Building(usize),
    Unit(usize),
}

impl Production {
    pub const KIND_BUILDING: &'static str = "Building";
    pub const KIND_UNIT: &'static str = "UnitType";

    pub fn kind_name(&self) -> &'static str {
        match self {
            Production::Building(_) => Self::KIND_BUILDING,
            Production::Unit(_) => Self::KIND_UNIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub id: CityId,
    pub name: String,
    pub x: usize,
    pub y: usize,
    /// Player that founded the city.
    pub original: PlayerId,
    pub size: i64,
    /// One count per ruleset specialist.
    pub specialists: Vec<i64>,
    pub trade_routes: Vec<i64>,
    pub food_stock: i64,
    pub shield_stock: i64,
    pub airlift: i64,
    pub was_happy: bool,
    pub turn_plague: i64,
    pub anarchy: i64,
    pub rapture: i64,
    pub steal: i64,
    pub turn_founded: Turn,
    pub did_buy: bool,
    pub did_sell: bool,
    pub turn_last_built: Turn,
    pub production: Production,
    pub changed_from: Production,
    pub before_change_shields: i64,
    pub caravan_shields: i64,
    pub disbanded_shields: i64,
    pub last_turns_shield_surplus: i64,
    pub radius_sq: i64,
    /// Built improvements (ruleset indices).
    pub improvements: BTreeSet<usize>,
    pub worklist: Vec<Production>,
    pub options: FlagSet,
    /// Citizens per nationality, only kept with citizen nationality on.
    pub citizens: BTreeMap<PlayerId, i64>,
}

impl City {
    pub fn new(
        id: CityId,
        name: impl Into<String>,
        x: usize,
        y: usize,
        original: PlayerId,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            x,
            y,
            original,
            size: 1,
            specialists: Vec::new(),
            trade_routes: Vec::new(),
            food_stock: 0,
            shield_stock: 0,
            airlift: 0,
            was_happy: false,
            turn_plague: 0,
            anarchy: 0,
            rapture: 0,
            steal: 0,
            turn_founded: 0,
            did_buy: false,
            did_sell: false,
            turn_last_built: 0,
            production: Production::Unit(0),
            changed_from: Production::Unit(0),
            before_change_shields: 0,
            caravan_shields: 0,
            disbanded_shields: 0,
            last_turns_shield_surplus: 0,
            radius_sq: 5,
            improvements: BTreeSet::new(),
            worklist: Vec::new(),
            options: FlagSet::new(),
            citizens: BTreeMap::new(),
        }
    }
}
