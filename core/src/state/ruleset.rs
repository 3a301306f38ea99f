//! The running program's ruleset: names of every enumerated domain.
//!
//! Loading rulesets is not this crate's job; the ruleset arrives as plain
//! data (built in, or a JSON file). All indices stored in the game state
//! are indices into these lists.

use crate::codec::{Resource, Terrain};
use crate::types::FlagSet;
use serde::{Deserialize, Serialize};

/// Name of technology index 0.
pub const A_NONE: &str = "A_NONE";

/// Specials whose presence is carried by the rivers overlay.
pub const RIVER_SPECIAL: &str = "River";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Genus {
    GreatWonder,
    SmallWonder,
    Improvement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Improvement {
    pub name: String,
    pub genus: Genus,
}

impl Improvement {
    pub fn is_wonder(&self) -> bool {
        matches!(self.genus, Genus::GreatWonder | Genus::SmallWonder)
    }

    pub fn is_great_wonder(&self) -> bool {
        self.genus == Genus::GreatWonder
    }
}

/// Leader personality traits, in running program order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trait {
    Expansionist,
    Trader,
    Aggressive,
    Builder,
    Frugal,
    Isolationist,
}

impl Trait {
    pub const ALL: [Trait; 6] = [
        Trait::Expansionist,
        Trait::Trader,
        Trait::Aggressive,
        Trait::Builder,
        Trait::Frugal,
        Trait::Isolationist,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub fn name(self) -> &'static str {
        match self {
            Trait::Expansionist => "Expansionist",
            Trait::Trader => "Trader",
            Trait::Aggressive => "Aggressive",
            Trait::Builder => "Builder",
            Trait::Frugal => "Frugal",
            Trait::Isolationist => "Isolationist",
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ruleset {
    pub name: String,
    pub improvements: Vec<Improvement>,
    /// Index 0 is always [`A_NONE`].
    pub technologies: Vec<String>,
    pub terrains: Vec<String>,
    pub resources: Vec<String>,
    pub specials: Vec<String>,
    pub bases: Vec<String>,
    pub roads: Vec<String>,
    pub unit_types: Vec<String>,
    pub governments: Vec<String>,
    pub nations: Vec<String>,
    pub specialists: Vec<String>,
    pub city_styles: Vec<String>,
    /// Number of per-city option flags.
    pub city_options: usize,
    pub trade_routes: usize,
}

fn position(list: &[String], name: &str) -> Option<usize> {
    list.iter().position(|n| n == name)
}

impl Ruleset {
    /// Load a ruleset from a JSON file.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let ruleset: Ruleset = serde_json::from_str(&content)?;
        ruleset.validate()?;
        Ok(ruleset)
    }

    /// Domains packed into flag sets must fit one.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (domain, size) in [
            ("specials", self.specials.len()),
            ("bases", self.bases.len()),
            ("roads", self.roads.len()),
        ] {
            if size > FlagSet::CAPACITY {
                anyhow::bail!(
                    "ruleset '{}' has {size} {domain}, limit is {}",
                    self.name,
                    FlagSet::CAPACITY
                );
            }
        }
        if self.technologies.first().map(String::as_str) != Some(A_NONE) {
            anyhow::bail!("ruleset '{}' must list {A_NONE} as technology 0", self.name);
        }
        Ok(())
    }

    pub fn improvement_names(&self) -> Vec<&str> {
        self.improvements.iter().map(|i| i.name.as_str()).collect()
    }

    pub fn improvement_by_name(&self, name: &str) -> Option<usize> {
        self.improvements.iter().position(|i| i.name == name)
    }

    pub fn tech_by_name(&self, name: &str) -> Option<usize> {
        position(&self.technologies, name)
    }

    pub fn terrain_by_name(&self, name: &str) -> Option<usize> {
        position(&self.terrains, name)
    }

    pub fn resource_by_name(&self, name: &str) -> Option<usize> {
        position(&self.resources, name)
    }

    pub fn special_by_name(&self, name: &str) -> Option<usize> {
        position(&self.specials, name)
    }

    pub fn base_by_name(&self, name: &str) -> Option<usize> {
        position(&self.bases, name)
    }

    pub fn road_by_name(&self, name: &str) -> Option<usize> {
        position(&self.roads, name)
    }

    pub fn unit_type_by_name(&self, name: &str) -> Option<usize> {
        position(&self.unit_types, name)
    }

    pub fn government_by_name(&self, name: &str) -> Option<usize> {
        position(&self.governments, name)
    }

    pub fn nation_by_name(&self, name: &str) -> Option<usize> {
        position(&self.nations, name)
    }

    pub fn city_style_by_name(&self, name: &str) -> Option<usize> {
        position(&self.city_styles, name)
    }

    /// A small ruleset in the spirit of the classic game.
    pub fn classic() -> Self {
        fn names(list: &[&str]) -> Vec<String> {
            list.iter().map(|s| s.to_string()).collect()
        }
        let improvement = |name: &str, genus| Improvement { name: name.to_string(), genus };

        Ruleset {
            name: "classic".into(),
            improvements: vec![
                improvement("Barracks", Genus::Improvement),
                improvement("Granary", Genus::Improvement),
                improvement("City Walls", Genus::Improvement),
                improvement("Library", Genus::Improvement),
                improvement("Marketplace", Genus::Improvement),
                improvement("Temple", Genus::Improvement),
                improvement("Palace", Genus::SmallWonder),
                improvement("Colossus", Genus::GreatWonder),
                improvement("Great Library", Genus::GreatWonder),
                improvement("Pyramids", Genus::GreatWonder),
            ],
            technologies: names(&[
                A_NONE,
                "Alphabet",
                "Bronze Working",
                "Ceremonial Burial",
                "Code of Laws",
                "Horseback Riding",
                "Masonry",
                "Pottery",
                "Writing",
            ]),
            terrains: Terrain::ALL.iter().map(|t| t.rule_name().to_string()).collect(),
            resources: Resource::ALL.iter().map(|r| r.rule_name().to_string()).collect(),
            specials: names(&[
                "Irrigation",
                "Mine",
                "Pollution",
                "Hut",
                "Farmland",
                "Fallout",
                RIVER_SPECIAL,
            ]),
            bases: names(&["Fortress", "Airbase", "Buoy"]),
            roads: names(&["Road", "Railroad"]),
            unit_types: names(&[
                "Settlers", "Workers", "Warriors", "Phalanx", "Archers", "Trireme",
            ]),
            governments: names(&["Anarchy", "Despotism", "Monarchy", "Republic"]),
            nations: names(&["Babylonian", "Egyptian", "Greek", "Roman", "Barbarian"]),
            specialists: names(&["elvis", "scientist", "taxman"]),
            city_styles: names(&["European", "Classical", "Tropical"]),
            city_options: 3,
            trade_routes: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classic_ruleset_is_valid() {
        let rs = Ruleset::classic();
        rs.validate().expect("valid");
        assert_eq!(rs.tech_by_name("Writing"), Some(8));
        assert_eq!(rs.road_by_name("Railroad"), Some(1));
        assert!(rs.improvements[7].is_great_wonder());
        assert!(rs.improvements[6].is_wonder());
        assert!(!rs.improvements[6].is_great_wonder());
    }

    #[test]
    fn ruleset_json_round_trips() {
        let rs = Ruleset::classic();
        let json = serde_json::to_string(&rs).unwrap();
        let back: Ruleset = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rs);
    }

    #[test]
    fn trait_names_are_unique() {
        for t in Trait::ALL {
            assert_eq!(Trait::by_name(t.name()), Some(t));
            assert_eq!(Trait::ALL[t.index()], t);
        }
    }

    #[test]
    fn technology_zero_must_be_a_none() {
        let mut rs = Ruleset::classic();
        rs.technologies.remove(0);
        assert!(rs.validate().is_err());
    }
}
