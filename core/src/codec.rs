//! Character codecs for the map grid and unit order tables.
//!
//! RULE: every code is a single printable ASCII character.
//! Each domain is a closed enum with an exhaustive `to_char` and a
//! `from_char` that rejects anything else. `ALL` lists every variant so the
//! tests can prove the tables are bijective.

use crate::error::SaveError;
use crate::types::FlagSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("unknown {domain} code '{code}'")]
    UnknownCode { domain: &'static str, code: char },

    #[error("{domain} '{name}' has no character code")]
    Unmapped { domain: &'static str, name: String },

    #[error("malformed quoted block: {0}")]
    BadBlock(String),
}

impl From<CodecError> for SaveError {
    fn from(e: CodecError) -> Self {
        let layer = match &e {
            CodecError::UnknownCode { domain, .. } | CodecError::Unmapped { domain, .. } => {
                (*domain).to_string()
            }
            CodecError::BadBlock(_) => "attribute block".to_string(),
        };
        SaveError::encoding(layer, e.to_string())
    }
}

pub type CodecResult<T> = Result<T, CodecError>;

// ── Direction ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// Numeric keypad digit pointing the same way.
    pub fn to_char(self) -> char {
        match self {
            Direction::North => '8',
            Direction::South => '2',
            Direction::East => '6',
            Direction::West => '4',
            Direction::NorthEast => '9',
            Direction::NorthWest => '7',
            Direction::SouthEast => '3',
            Direction::SouthWest => '1',
        }
    }

    pub fn from_char(c: char) -> CodecResult<Self> {
        Ok(match c {
            '8' => Direction::North,
            '2' => Direction::South,
            '6' => Direction::East,
            '4' => Direction::West,
            '9' => Direction::NorthEast,
            '7' => Direction::NorthWest,
            '3' => Direction::SouthEast,
            '1' => Direction::SouthWest,
            code => return Err(CodecError::UnknownCode { domain: "direction", code }),
        })
    }
}

// ── Unit orders ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderKind {
    Move,
    FullMp,
    Activity,
    BuildCity,
    Disband,
    BuildWonder,
    TradeRoute,
    Homecity,
}

impl OrderKind {
    pub const ALL: [OrderKind; 8] = [
        OrderKind::Move,
        OrderKind::FullMp,
        OrderKind::Activity,
        OrderKind::BuildCity,
        OrderKind::Disband,
        OrderKind::BuildWonder,
        OrderKind::TradeRoute,
        OrderKind::Homecity,
    ];

    pub fn to_char(self) -> char {
        match self {
            OrderKind::Move => 'm',
            OrderKind::FullMp => 'w',
            OrderKind::Activity => 'a',
            OrderKind::BuildCity => 'b',
            OrderKind::Disband => 'd',
            OrderKind::BuildWonder => 'u',
            OrderKind::TradeRoute => 't',
            OrderKind::Homecity => 'h',
        }
    }

    pub fn from_char(c: char) -> CodecResult<Self> {
        Ok(match c {
            'm' => OrderKind::Move,
            'w' => OrderKind::FullMp,
            'a' => OrderKind::Activity,
            'b' => OrderKind::BuildCity,
            'd' => OrderKind::Disband,
            'u' => OrderKind::BuildWonder,
            't' => OrderKind::TradeRoute,
            'h' => OrderKind::Homecity,
            code => return Err(CodecError::UnknownCode { domain: "order", code }),
        })
    }
}

// ── Activities ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Activity {
    Idle,
    Pollution,
    OldRoad,
    Mine,
    Irrigate,
    Fortified,
    Fortress,
    Sentry,
    OldRailroad,
    Pillage,
    Goto,
    Explore,
    Transform,
    Unknown,
    Airbase,
    Fortifying,
    Fallout,
    Base,
    GenRoad,
    Convert,
}

impl Activity {
    /// Running program order. Saved as `savefile.activities_vector`.
    pub const ALL: [Activity; 20] = [
        Activity::Idle,
        Activity::Pollution,
        Activity::OldRoad,
        Activity::Mine,
        Activity::Irrigate,
        Activity::Fortified,
        Activity::Fortress,
        Activity::Sentry,
        Activity::OldRailroad,
        Activity::Pillage,
        Activity::Goto,
        Activity::Explore,
        Activity::Transform,
        Activity::Unknown,
        Activity::Airbase,
        Activity::Fortifying,
        Activity::Fallout,
        Activity::Base,
        Activity::GenRoad,
        Activity::Convert,
    ];

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|a| *a == self).unwrap_or(0)
    }

    pub fn name(self) -> &'static str {
        match self {
            Activity::Idle => "Idle",
            Activity::Pollution => "Pollution",
            Activity::OldRoad => "Old Road",
            Activity::Mine => "Mine",
            Activity::Irrigate => "Irrigate",
            Activity::Fortified => "Fortified",
            Activity::Fortress => "Fortress",
            Activity::Sentry => "Sentry",
            Activity::OldRailroad => "Old Railroad",
            Activity::Pillage => "Pillage",
            Activity::Goto => "Goto",
            Activity::Explore => "Explore",
            Activity::Transform => "Transform",
            Activity::Unknown => "Unknown",
            Activity::Airbase => "Airbase",
            Activity::Fortifying => "Fortifying",
            Activity::Fallout => "Fallout",
            Activity::Base => "Base",
            Activity::GenRoad => "Road",
            Activity::Convert => "Convert",
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| a.name() == name)
    }

    pub fn to_char(self) -> char {
        match self {
            Activity::Idle => 'w',
            Activity::Pollution => 'p',
            Activity::OldRoad => 'r',
            Activity::Mine => 'm',
            Activity::Irrigate => 'i',
            Activity::Fortified => 'f',
            Activity::Fortress => 't',
            Activity::Sentry => 's',
            Activity::OldRailroad => 'l',
            Activity::Pillage => 'e',
            Activity::Goto => 'g',
            Activity::Explore => 'x',
            Activity::Transform => 'o',
            Activity::Unknown => '?',
            Activity::Airbase => 'a',
            Activity::Fortifying => 'y',
            Activity::Fallout => 'u',
            Activity::Base => 'b',
            Activity::GenRoad => 'R',
            Activity::Convert => 'c',
        }
    }

    pub fn from_char(c: char) -> CodecResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|a| a.to_char() == c)
            .ok_or(CodecError::UnknownCode { domain: "activity", code: c })
    }
}

// ── Terrain ───────────────────────────────────────────────────

/// Code written for a tile whose terrain is not known.
pub const TERRAIN_UNKNOWN_CHAR: char = 'u';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Terrain {
    Inaccessible,
    Lake,
    Ocean,
    DeepOcean,
    Glacier,
    Desert,
    Forest,
    Grassland,
    Hills,
    Jungle,
    Mountains,
    Plains,
    Swamp,
    Tundra,
}

impl Terrain {
    pub const ALL: [Terrain; 14] = [
        Terrain::Inaccessible,
        Terrain::Lake,
        Terrain::Ocean,
        Terrain::DeepOcean,
        Terrain::Glacier,
        Terrain::Desert,
        Terrain::Forest,
        Terrain::Grassland,
        Terrain::Hills,
        Terrain::Jungle,
        Terrain::Mountains,
        Terrain::Plains,
        Terrain::Swamp,
        Terrain::Tundra,
    ];

    pub fn rule_name(self) -> &'static str {
        match self {
            Terrain::Inaccessible => "Inaccessible",
            Terrain::Lake => "Lake",
            Terrain::Ocean => "Ocean",
            Terrain::DeepOcean => "Deep Ocean",
            Terrain::Glacier => "Glacier",
            Terrain::Desert => "Desert",
            Terrain::Forest => "Forest",
            Terrain::Grassland => "Grassland",
            Terrain::Hills => "Hills",
            Terrain::Jungle => "Jungle",
            Terrain::Mountains => "Mountains",
            Terrain::Plains => "Plains",
            Terrain::Swamp => "Swamp",
            Terrain::Tundra => "Tundra",
        }
    }

    pub fn from_rule_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.rule_name() == name)
    }

    pub fn to_char(self) -> char {
        match self {
            Terrain::Inaccessible => 'i',
            Terrain::Lake => '+',
            Terrain::Ocean => ' ',
            Terrain::DeepOcean => ':',
            Terrain::Glacier => 'a',
            Terrain::Desert => 'd',
            Terrain::Forest => 'f',
            Terrain::Grassland => 'g',
            Terrain::Hills => 'h',
            Terrain::Jungle => 'j',
            Terrain::Mountains => 'm',
            Terrain::Plains => 'p',
            Terrain::Swamp => 's',
            Terrain::Tundra => 't',
        }
    }

    pub fn from_char(c: char) -> CodecResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.to_char() == c)
            .ok_or(CodecError::UnknownCode { domain: "terrain", code: c })
    }
}

/// Encode a ruleset terrain by rule name. `None` is unknown terrain.
pub fn terrain_to_char(rule_name: Option<&str>) -> CodecResult<char> {
    match rule_name {
        None => Ok(TERRAIN_UNKNOWN_CHAR),
        Some(name) => Terrain::from_rule_name(name)
            .map(Terrain::to_char)
            .ok_or_else(|| CodecError::Unmapped { domain: "terrain", name: name.to_string() }),
    }
}

// ── Resources ─────────────────────────────────────────────────

/// Code written for a tile without a resource.
pub const RESOURCE_NONE_CHAR: char = ' ';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resource {
    Gold,
    Iron,
    Game,
    Furs,
    Coal,
    Fish,
    Fruit,
    Gems,
    Buffalo,
    Wheat,
    Oasis,
    Peat,
    Pheasant,
    Resources,
    Ivory,
    Silk,
    Spice,
    Whales,
    Wine,
    Oil,
}

impl Resource {
    pub const ALL: [Resource; 20] = [
        Resource::Gold,
        Resource::Iron,
        Resource::Game,
        Resource::Furs,
        Resource::Coal,
        Resource::Fish,
        Resource::Fruit,
        Resource::Gems,
        Resource::Buffalo,
        Resource::Wheat,
        Resource::Oasis,
        Resource::Peat,
        Resource::Pheasant,
        Resource::Resources,
        Resource::Ivory,
        Resource::Silk,
        Resource::Spice,
        Resource::Whales,
        Resource::Wine,
        Resource::Oil,
    ];

    pub fn rule_name(self) -> &'static str {
        match self {
            Resource::Gold => "Gold",
            Resource::Iron => "Iron",
            Resource::Game => "?animals:Game",
            Resource::Furs => "Furs",
            Resource::Coal => "Coal",
            Resource::Fish => "Fish",
            Resource::Fruit => "Fruit",
            Resource::Gems => "Gems",
            Resource::Buffalo => "Buffalo",
            Resource::Wheat => "Wheat",
            Resource::Oasis => "Oasis",
            Resource::Peat => "Peat",
            Resource::Pheasant => "Pheasant",
            Resource::Resources => "Resources",
            Resource::Ivory => "Ivory",
            Resource::Silk => "Silk",
            Resource::Spice => "Spice",
            Resource::Whales => "Whales",
            Resource::Wine => "Wine",
            Resource::Oil => "Oil",
        }
    }

    pub fn from_rule_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|r| r.rule_name() == name)
    }

    pub fn to_char(self) -> char {
        match self {
            Resource::Gold => '$',
            Resource::Iron => '/',
            Resource::Game => 'e',
            Resource::Furs => 'u',
            Resource::Coal => 'c',
            Resource::Fish => 'y',
            Resource::Fruit => 'f',
            Resource::Gems => 'g',
            Resource::Buffalo => 'b',
            Resource::Wheat => 'j',
            Resource::Oasis => 'o',
            Resource::Peat => 'a',
            Resource::Pheasant => 'p',
            Resource::Resources => 'r',
            Resource::Ivory => 'i',
            Resource::Silk => 's',
            Resource::Spice => 't',
            Resource::Whales => 'v',
            Resource::Wine => 'w',
            Resource::Oil => 'x',
        }
    }

    pub fn from_char(c: char) -> CodecResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|r| r.to_char() == c)
            .ok_or(CodecError::UnknownCode { domain: "resource", code: c })
    }
}

/// Encode a ruleset resource by rule name. `None` is no resource.
pub fn resource_to_char(rule_name: Option<&str>) -> CodecResult<char> {
    match rule_name {
        None => Ok(RESOURCE_NONE_CHAR),
        Some(name) => Resource::from_rule_name(name)
            .map(Resource::to_char)
            .ok_or_else(|| CodecError::Unmapped { domain: "resource", name: name.to_string() }),
    }
}

// ── Nybble packing ────────────────────────────────────────────

const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";
const NUM_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_-+";

/// Domain indices covered by one packed column; `None` marks a slot
/// past the end of the domain.
pub type ColumnSlots = [Option<usize>; 4];

/// Number of 4-wide columns needed for a domain of `size` members.
pub fn column_count(size: usize) -> usize {
    size.div_ceil(4)
}

/// Slots of column `column` for a domain of `size` members.
pub fn column_slots(column: usize, size: usize) -> ColumnSlots {
    let mut slots = [None; 4];
    for (l, slot) in slots.iter_mut().enumerate() {
        let idx = 4 * column + l;
        if idx < size {
            *slot = Some(idx);
        }
    }
    slots
}

/// Fold up to four flags into one hex digit. Bit `i` is slot `i`;
/// empty slots always leave their bit clear.
pub fn pack_flags(flags: &FlagSet, slots: &ColumnSlots) -> char {
    let mut bin = 0usize;
    for (i, slot) in slots.iter().enumerate() {
        let Some(idx) = slot else { continue };
        if flags.contains(*idx) {
            bin |= 1 << i;
        }
    }
    HEX_CHARS[bin] as char
}

/// Inverse of [`pack_flags`]. Empty slots are skipped; their bit is ignored.
pub fn unpack_flags(c: char, slots: &ColumnSlots, flags: &mut FlagSet) -> CodecResult<()> {
    let bin = hex_value(c).ok_or(CodecError::UnknownCode { domain: "flag nybble", code: c })?;
    for (i, slot) in slots.iter().enumerate() {
        let Some(idx) = slot else { continue };
        if bin & (1 << i) != 0 {
            flags.insert(*idx);
        }
    }
    Ok(())
}

/// Hex digit of half-byte `halfbyte` of `value`.
pub fn nybble_char(value: u32, halfbyte: usize) -> char {
    HEX_CHARS[((value >> (halfbyte * 4)) & 0xf) as usize] as char
}

pub fn hex_value(c: char) -> Option<u32> {
    c.to_digit(16).filter(|_| !c.is_ascii_uppercase())
}

/// Single-character small number; `'?'` once the table runs out.
pub fn num_to_char(num: usize) -> char {
    NUM_CHARS.get(num).map(|b| *b as char).unwrap_or('?')
}

pub fn char_to_num(c: char) -> Option<usize> {
    NUM_CHARS.iter().position(|b| *b as char == c)
}

/// Printable, non-control 7-bit ASCII.
pub fn is_printable(c: char) -> bool {
    c.is_ascii() && !c.is_ascii_control()
}

// ── Quoted blocks ─────────────────────────────────────────────

/// Quote raw bytes as `"<len>:"` followed by `"%02x "` per byte.
pub fn quote_block(data: &[u8]) -> String {
    let mut out = format!("{}:", data.len());
    for b in data {
        out.push_str(&format!("{b:02x} "));
    }
    out
}

pub fn unquote_block(quoted: &str) -> CodecResult<Vec<u8>> {
    let (len, body) = quoted
        .split_once(':')
        .ok_or_else(|| CodecError::BadBlock("missing length prefix".into()))?;
    let len: usize = len
        .trim()
        .parse()
        .map_err(|_| CodecError::BadBlock(format!("bad length '{len}'")))?;
    let bytes = body
        .split_whitespace()
        .map(|tok| {
            u8::from_str_radix(tok, 16)
                .map_err(|_| CodecError::BadBlock(format!("bad byte '{tok}'")))
        })
        .collect::<CodecResult<Vec<u8>>>()?;
    if bytes.len() != len {
        return Err(CodecError::BadBlock(format!(
            "declared {len} bytes, found {}",
            bytes.len()
        )));
    }
    Ok(bytes)
}
