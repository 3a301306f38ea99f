use super::city::City;
use super::ruleset::Trait;
use super::unit::Unit;
use crate::types::{FlagSet, PlayerId, Turn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Research target as stored in `research.*_name` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TechRef {
    /// Nothing saved; written as an empty name.
    Unknown,
    None,
    Unset,
    Future,
    Advance(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Research {
    pub goal: TechRef,
    pub researching: TechRef,
    pub researching_saved: TechRef,
    pub bulbs_researched: i64,
    pub bulbs_researching_saved: i64,
    pub bulbs_last_turn: i64,
    pub techs_researched: i64,
    pub future_tech: i64,
    pub got_tech: bool,
    /// Known technologies (ruleset indices).
    pub known: BTreeSet<usize>,
}

impl Default for Research {
    fn default() -> Self {
        Self {
            goal: TechRef::Unset,
            researching: TechRef::Unset,
            researching_saved: TechRef::Unknown,
            bulbs_researched: 0,
            bulbs_researching_saved: 0,
            bulbs_last_turn: 0,
            techs_researched: 0,
            future_tech: 0,
            got_tech: false,
            known: BTreeSet::from([0]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiplState {
    pub kind: i64,
    pub max_state: i64,
    pub first_contact_turn: Turn,
    pub turns_left: i64,
    pub has_reason_to_cancel: i64,
    pub contact_turns_left: i64,
    pub embassy: bool,
    pub gives_shared_vision: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SpaceshipState {
    None,
    Started,
    Launched,
    Arrived,
}

impl SpaceshipState {
    pub fn to_int(self) -> i64 {
        match self {
            SpaceshipState::None => 0,
            SpaceshipState::Started => 1,
            SpaceshipState::Launched => 2,
            SpaceshipState::Arrived => 3,
        }
    }

    pub fn from_int(v: i64) -> Option<Self> {
        match v {
            0 => Some(SpaceshipState::None),
            1 => Some(SpaceshipState::Started),
            2 => Some(SpaceshipState::Launched),
            3 => Some(SpaceshipState::Arrived),
            _ => None,
        }
    }
}

pub const NUM_SS_STRUCTURALS: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spaceship {
    pub state: SpaceshipState,
    pub structurals: i64,
    pub components: i64,
    pub modules: i64,
    pub fuel: i64,
    pub propulsion: i64,
    pub habitation: i64,
    pub life_support: i64,
    pub solar_panels: i64,
    pub structure: FlagSet,
    pub launch_year: i64,
}

impl Default for Spaceship {
    fn default() -> Self {
        Self {
            state: SpaceshipState::None,
            structurals: 0,
            components: 0,
            modules: 0,
            fuel: 0,
            propulsion: 0,
            habitation: 0,
            life_support: 0,
            solar_panels: 0,
            structure: FlagSet::new(),
            launch_year: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub number: PlayerId,
    pub name: String,
    pub username: String,
    pub ranked_username: String,
    pub delegation_username: Option<String>,
    pub ai_type: String,
    pub color: Option<Rgb>,
    pub nation: usize,
    pub team: Option<usize>,
    pub government: usize,
    pub target_government: Option<usize>,
    pub city_style: usize,
    pub is_male: bool,
    pub is_alive: bool,
    pub ai_controlled: bool,
    pub ai_skill_level: i64,
    pub barbarian_type: i64,
    /// Diplomatic state towards every other player slot.
    pub diplstates: BTreeMap<PlayerId, DiplState>,
    pub love: BTreeMap<PlayerId, i64>,
    pub gold: i64,
    pub tax: i64,
    pub science: i64,
    pub luxury: i64,
    pub research: Research,
    /// One modifier per [`Trait`], in running order.
    pub traits: [i64; Trait::COUNT],
    pub got_first_city: bool,
    pub revolution_finishes: i64,
    pub units_built: i64,
    pub units_killed: i64,
    pub units_lost: i64,
    pub spaceship: Spaceship,
    pub lost_wonders: BTreeSet<usize>,
    pub cities: Vec<City>,
    pub units: Vec<Unit>,
    /// Opaque client data.
    pub attribute_block: Option<Vec<u8>>,
}

impl Player {
    pub fn new(number: PlayerId, name: impl Into<String>) -> Self {
        Self {
            number,
            name: name.into(),
            username: String::new(),
            ranked_username: String::new(),
            delegation_username: None,
            ai_type: "classic".into(),
            color: None,
            nation: 0,
            team: None,
            government: 0,
            target_government: None,
            city_style: 0,
            is_male: true,
            is_alive: true,
            ai_controlled: false,
            ai_skill_level: 0,
            barbarian_type: 0,
            diplstates: BTreeMap::new(),
            love: BTreeMap::new(),
            gold: 50,
            tax: 30,
            science: 60,
            luxury: 10,
            research: Research::default(),
            traits: [0; Trait::COUNT],
            got_first_city: false,
            revolution_finishes: -1,
            units_built: 0,
            units_killed: 0,
            units_lost: 0,
            spaceship: Spaceship::default(),
            lost_wonders: BTreeSet::new(),
            cities: Vec::new(),
            units: Vec::new(),
            attribute_block: None,
        }
    }
}
