//! The live game state the save engine reads from and rebuilds.
//!
//! The simulation owns the rules; these structs only carry the data that
//! goes into a savefile. Every index (improvement, technology, base, road,
//! special, terrain, resource, unit type...) refers to the running
//! [`Ruleset`], never to a savefile ordering.

pub mod city;
pub mod map;
pub mod player;
pub mod ruleset;
pub mod unit;

pub use city::{City, Production};
pub use map::{Map, StartPos, Tile};
pub use player::{DiplState, Player, Research, Rgb, Spaceship, SpaceshipState, TechRef};
pub use ruleset::{Genus, Improvement, Ruleset, Trait};
pub use unit::{ActivityTarget, Order, Unit, UnitOrders};

use crate::rng::RandomState;
use crate::types::{PlayerId, Turn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerState {
    Initial,
    Running,
    Over,
}

impl ServerState {
    pub fn name(self) -> &'static str {
        match self {
            ServerState::Initial => "S_S_INITIAL",
            ServerState::Running => "S_S_RUNNING",
            ServerState::Over => "S_S_OVER",
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        [ServerState::Initial, ServerState::Running, ServerState::Over]
            .into_iter()
            .find(|s| s.name() == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioInfo {
    pub name: String,
    pub description: String,
    /// Whether the scenario carries player data.
    pub players: bool,
    pub startpos_nations: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingValue {
    Int(i64),
    Bool(bool),
    Str(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    pub name: String,
    pub value: SettingValue,
}

/// Global game information, the `[game]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameInfo {
    /// Program version as `major*10000 + minor*100 + patch`.
    pub version: i64,
    pub server_state: ServerState,
    pub meta_patches: String,
    pub meta_server: String,
    pub id: String,
    pub serverid: String,
    pub skill_level: i64,
    pub phase_mode: i64,
    pub phase: i64,
    pub turn: Turn,
    pub year: i64,
    pub year_0_hack: bool,
    pub globalwarming: i64,
    pub heating: i64,
    pub warminglevel: i64,
    pub nuclearwinter: i64,
    pub cooling: i64,
    pub coolinglevel: i64,
    /// Technologies known to at least one player.
    pub global_advances: BTreeSet<usize>,
    pub citizen_nationality: bool,
    /// Great wonders that have been destroyed.
    pub destroyed_wonders: BTreeSet<usize>,
    pub identity_number_used: i64,
}

impl GameInfo {
    pub fn has_started(&self) -> bool {
        self.server_state != ServerState::Initial
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub ruleset: Ruleset,
    pub info: GameInfo,
    pub scenario: Option<ScenarioInfo>,
    pub settings: Vec<Setting>,
    pub script_vars: String,
    /// Generator state; `None` when the generator was never initialised.
    pub random: Option<RandomState>,
    /// Caller opt-in for persisting the generator state.
    pub save_random: bool,
    pub map: Map,
    pub players: Vec<Player>,
    /// Turn order of player slots.
    pub shuffled_players: Vec<PlayerId>,
    pub mapimg_defs: Vec<String>,
}

impl GameState {
    /// A fresh, not yet started game on an empty `xsize` by `ysize` map.
    pub fn new(ruleset: Ruleset, xsize: usize, ysize: usize) -> Self {
        Self {
            ruleset,
            info: GameInfo {
                version: crate::PROGRAM_VERSION,
                server_state: ServerState::Initial,
                meta_patches: String::new(),
                meta_server: String::new(),
                id: uuid::Uuid::new_v4().simple().to_string(),
                serverid: String::new(),
                skill_level: 3,
                phase_mode: 0,
                phase: 0,
                turn: 0,
                year: -4000,
                year_0_hack: false,
                globalwarming: 0,
                heating: 0,
                warminglevel: 8,
                nuclearwinter: 0,
                cooling: 0,
                coolinglevel: 8,
                global_advances: BTreeSet::new(),
                citizen_nationality: false,
                destroyed_wonders: BTreeSet::new(),
                identity_number_used: 0,
            },
            scenario: None,
            settings: Vec::new(),
            script_vars: String::new(),
            random: None,
            save_random: false,
            map: Map::new(xsize, ysize),
            players: Vec::new(),
            shuffled_players: Vec::new(),
            mapimg_defs: Vec::new(),
        }
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.number == id)
    }

    pub fn is_scenario(&self) -> bool {
        self.scenario.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_game_gets_unique_identifier() {
        let a = GameState::new(Ruleset::classic(), 4, 3);
        let b = GameState::new(Ruleset::classic(), 4, 3);
        assert_eq!(a.info.id.len(), 32);
        assert_ne!(a.info.id, b.info.id);
        assert_eq!(a.map.tiles.len(), 12);
        assert!(!a.info.has_started());
    }

    #[test]
    fn server_state_names_round_trip() {
        for s in [ServerState::Initial, ServerState::Running, ServerState::Over] {
            assert_eq!(ServerState::by_name(s.name()), Some(s));
        }
        assert_eq!(ServerState::by_name("S_S_BOGUS"), None);
    }
}
