//! Savefile compatibility chain.
//!
//! Every format version that changed the shape of the section tree has one
//! step here. Loading an old file applies, in order, every step whose
//! version is above the file's and at most [`CURRENT_VERSION`]. Each
//! transform checks for the new shape first and leaves it alone, so running
//! a step on an already-upgraded tree changes nothing.

use crate::codec::{self, Activity};
use crate::context::Diagnostics;
use crate::error::{SaveError, SaveResult};
use crate::load::map_dimensions;
use crate::section_file::SectionFile;
use crate::state::Trait;
use serde::Serialize;
use std::collections::BTreeSet;

pub const OLDEST_VERSION: i64 = 3;
pub const CURRENT_VERSION: i64 = 20;

pub type Transform = fn(&mut SectionFile, &mut Diagnostics) -> SaveResult<()>;

pub struct CompatStep {
    pub version: i64,
    pub description: &'static str,
    /// `None` for versions that only introduced the format.
    pub transform: Option<Transform>,
}

/// The chain, strictly increasing; the last entry is the current version.
pub static STEPS: &[CompatStep] = &[
    CompatStep {
        version: 3,
        description: "first section-file format",
        transform: None,
    },
    CompatStep {
        version: 10,
        description: "activity order, city style by name, vigilant orders",
        transform: Some(upgrade_to_10),
    },
    CompatStep {
        version: 20,
        description: "trait vector, known-tiles flag, roads split from specials",
        transform: Some(upgrade_to_20),
    },
];

/// Outcome of running the chain on one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub original_version: i64,
    pub final_version: i64,
    pub steps_applied: Vec<i64>,
    pub step_descriptions: Vec<&'static str>,
}

impl MigrationReport {
    pub fn new(version: i64) -> Self {
        Self {
            original_version: version,
            final_version: version,
            steps_applied: Vec::new(),
            step_descriptions: Vec::new(),
        }
    }

    pub fn was_upgraded(&self) -> bool {
        !self.steps_applied.is_empty()
    }
}

/// Check that versions are strictly increasing and end at the current one.
pub fn validate_chain(steps: &[CompatStep]) -> SaveResult<()> {
    for pair in steps.windows(2) {
        if pair[0].version >= pair[1].version {
            return Err(SaveError::structural(
                "compat",
                format!("step {} listed before step {}", pair[0].version, pair[1].version),
            ));
        }
    }
    match steps.last() {
        Some(last) if last.version == CURRENT_VERSION => Ok(()),
        _ => Err(SaveError::structural(
            "compat",
            format!("chain must end at version {CURRENT_VERSION}"),
        )),
    }
}

/// Read `savefile.version` and reject files outside the chain.
pub fn file_version(file: &SectionFile) -> SaveResult<i64> {
    let version = file.lookup_int("savefile.version").ok_or(SaveError::LegacyFormat)?;
    if !(OLDEST_VERSION..=CURRENT_VERSION).contains(&version) {
        return Err(SaveError::UnsupportedVersion {
            found: version,
            oldest: OLDEST_VERSION,
            current: CURRENT_VERSION,
        });
    }
    Ok(version)
}

/// Bring `file` up to [`CURRENT_VERSION`] in place.
pub fn upgrade(
    file: &mut SectionFile,
    diagnostics: &mut Diagnostics,
) -> SaveResult<MigrationReport> {
    validate_chain(STEPS)?;
    let version = file_version(file)?;
    let mut report = MigrationReport::new(version);

    for step in STEPS.iter().filter(|s| s.version > version && s.version <= CURRENT_VERSION) {
        log::debug!("compat: applying step {} ({})", step.version, step.description);
        if let Some(transform) = step.transform {
            transform(file, diagnostics)?;
        }
        report.steps_applied.push(step.version);
        report.step_descriptions.push(step.description);
    }

    file.insert_int("savefile.version", CURRENT_VERSION);
    report.final_version = CURRENT_VERSION;
    if report.was_upgraded() {
        log::info!("savefile upgraded from version {version} to {CURRENT_VERSION}");
    }
    Ok(report)
}

// ── Helpers ───────────────────────────────────────────────────

/// Player numbers that have at least one `playerN.*` entry.
fn player_numbers(file: &SectionFile) -> BTreeSet<usize> {
    file.entries()
        .filter_map(|(k, _)| {
            let section = k.split('.').next()?;
            section.strip_prefix("player")?.parse().ok()
        })
        .collect()
}

/// Keys ending in `.suffix` under any `playerN` section.
fn player_keys_with_suffix(file: &SectionFile, suffix: &str) -> Vec<String> {
    file.entries()
        .map(|(k, _)| k)
        .filter(|k| k.starts_with("player") && k.ends_with(suffix))
        .map(str::to_string)
        .collect()
}

// ── Version 10 ────────────────────────────────────────────────

/// Activities known before `Convert` was added.
const LEGACY_ACTIVITY_COUNT: usize = 19;

fn upgrade_to_10(file: &mut SectionFile, diagnostics: &mut Diagnostics) -> SaveResult<()> {
    if !file.contains("savefile.activities_vector") {
        let names: Vec<&str> =
            Activity::ALL[..LEGACY_ACTIVITY_COUNT].iter().map(|a| a.name()).collect();
        file.insert_int("savefile.activities_size", names.len() as i64);
        file.insert_str_vec("savefile.activities_vector", &names);
    }

    for old in player_keys_with_suffix(file, ".city_style_name") {
        let new = format!("{}_by_name", old.trim_end_matches("_name"));
        if !file.rename(&old, &new) {
            diagnostics.warn(
                "compat",
                format!("both '{old}' and '{new}' present; keeping '{new}'"),
            );
            file.remove(&old);
        }
    }

    for length_key in player_keys_with_suffix(file, ".orders_length") {
        let prefix = length_key.trim_end_matches(".orders_length");
        let vigilant = format!("{prefix}.orders_vigilant");
        if !file.contains(&vigilant) {
            file.insert_bool(vigilant, false);
        }
    }
    Ok(())
}

// ── Version 20 ────────────────────────────────────────────────

/// Specials that became road types, in road order.
const LEGACY_ROAD_SPECIALS: [&str; 2] = ["Road", "Railroad"];

fn upgrade_to_20(file: &mut SectionFile, _diagnostics: &mut Diagnostics) -> SaveResult<()> {
    upgrade_traits(file);

    if !file.contains("game.save_players") {
        let has_players = file.contains("players.nplayers");
        file.insert_bool("game.save_players", has_players);
    }
    if !file.contains("game.save_known") {
        let save_players = file.lookup_bool_or("game.save_players", false);
        file.insert_bool("game.save_known", save_players);
    }

    // A current file with no roads carries the size but no vector.
    if !file.contains("savefile.roads_size") {
        split_roads_from_specials(file)?;
    }
    Ok(())
}

fn upgrade_traits(file: &mut SectionFile) {
    let mut names = file.lookup_str_vec("savefile.trait_vector").unwrap_or_default();
    let before = names.len();
    for t in Trait::ALL {
        if !names.iter().any(|n| n == t.name()) {
            names.push(t.name().to_string());
        }
    }
    if names.len() != before || !file.contains("savefile.trait_size") {
        file.insert_int("savefile.trait_size", names.len() as i64);
        file.insert_str_vec("savefile.trait_vector", &names);
    }

    for p in player_numbers(file) {
        if !file.contains(&format!("player{p}.name")) {
            continue;
        }
        for j in 0..names.len() {
            let key = format!("player{p}.trait.mod{j}");
            if !file.contains(&key) {
                file.insert_int(key, 0);
            }
        }
    }
}

fn split_roads_from_specials(file: &mut SectionFile) -> SaveResult<()> {
    let specials = file.lookup_str_vec("savefile.specials_vector").unwrap_or_default();
    // (road index, special index)
    let sources: Vec<(usize, usize)> = LEGACY_ROAD_SPECIALS
        .iter()
        .filter_map(|name| specials.iter().position(|s| s == name))
        .enumerate()
        .collect();
    let road_names: Vec<&str> = LEGACY_ROAD_SPECIALS
        .iter()
        .copied()
        .filter(|name| specials.iter().any(|s| s == name))
        .collect();

    file.insert_int("savefile.roads_size", road_names.len() as i64);
    if road_names.is_empty() {
        return Ok(());
    }
    file.insert_str_vec("savefile.roads_vector", &road_names);

    let (xsize, ysize) = map_dimensions(file)?.unwrap_or((0, 0));
    let slots = codec::column_slots(0, road_names.len());
    for y in 0..ysize {
        let key = format!("map.r00_{y:04}");
        if file.contains(&key) {
            continue;
        }
        let mut line = String::with_capacity(xsize);
        for x in 0..xsize {
            let mut roads = crate::types::FlagSet::new();
            for &(road, special) in &sources {
                if special_bit(file, special, x, y) {
                    roads.insert(road);
                }
            }
            line.push(codec::pack_flags(&roads, &slots));
        }
        file.insert_str(key, line);
    }
    Ok(())
}

/// Whether special `special` is set at (x, y) in the specials bit-planes.
/// Missing rows and bad digits read as unset.
fn special_bit(file: &SectionFile, special: usize, x: usize, y: usize) -> bool {
    let key = format!("map.spe{:02}_{y:04}", special / 4);
    file.lookup_str(&key)
        .and_then(|row| row.chars().nth(x))
        .and_then(codec::hex_value)
        .is_some_and(|bits| bits & (1 << (special % 4)) != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v10_file() -> SectionFile {
        let mut f = SectionFile::new();
        f.insert_int("savefile.version", 10);
        f.insert_int("savefile.trait_size", 5);
        f.insert_str_vec(
            "savefile.trait_vector",
            &["Expansionist", "Trader", "Aggressive", "Builder", "Frugal"],
        );
        f.insert_str_vec("savefile.specials_vector", &["Irrigation", "Road", "Mine", "Railroad"]);
        f.insert_int("map.xsize", 3);
        f.insert_int("map.ysize", 1);
        // x0: Road, x1: Road+Railroad, x2: Irrigation
        f.insert_str("map.spe00_0000", "2a1");
        f.insert_str("player0.name", "Hammurabi");
        for j in 0..5 {
            f.insert_int(format!("player0.trait.mod{j}"), j as i64 + 1);
        }
        f
    }

    #[test]
    fn chain_is_strictly_increasing_and_ends_current() {
        assert!(validate_chain(STEPS).is_ok());
        let bad = [
            CompatStep { version: 10, description: "", transform: None },
            CompatStep { version: 3, description: "", transform: None },
        ];
        assert!(validate_chain(&bad).is_err());
    }

    #[test]
    fn version_outside_chain_is_rejected() {
        let mut f = SectionFile::new();
        f.insert_int("savefile.version", 2);
        assert!(matches!(file_version(&f), Err(SaveError::UnsupportedVersion { found: 2, .. })));
        f.insert_int("savefile.version", 21);
        assert!(matches!(file_version(&f), Err(SaveError::UnsupportedVersion { found: 21, .. })));
        assert!(matches!(file_version(&SectionFile::new()), Err(SaveError::LegacyFormat)));
    }

    #[test]
    fn trait_vector_grows_without_losing_entries() {
        let mut f = v10_file();
        let report = upgrade(&mut f, &mut Diagnostics::default()).unwrap();
        assert_eq!(report.steps_applied, vec![20]);
        assert_eq!(f.lookup_int("savefile.version"), Some(CURRENT_VERSION));
        let traits = f.lookup_str_vec("savefile.trait_vector").unwrap();
        assert_eq!(traits.len(), 6);
        assert_eq!(traits[5], "Isolationist");
        assert_eq!(f.lookup_int("player0.trait.mod4"), Some(5));
        assert_eq!(f.lookup_int("player0.trait.mod5"), Some(0));
    }

    #[test]
    fn roads_rebuilt_from_specials() {
        let mut f = v10_file();
        upgrade_to_20(&mut f, &mut Diagnostics::default()).unwrap();
        assert_eq!(
            f.lookup_str_vec("savefile.roads_vector").unwrap(),
            vec!["Road".to_string(), "Railroad".to_string()]
        );
        assert_eq!(f.lookup_str("map.r00_0000"), Some("130"));
    }

    #[test]
    fn file_without_roads_keeps_its_shape() {
        let mut f = v10_file();
        f.insert_int("savefile.roads_size", 0);
        let before = f.clone();
        upgrade_to_20(&mut f, &mut Diagnostics::default()).unwrap();
        assert!(!f.contains("savefile.roads_vector"));
        assert!(!f.contains("map.r00_0000"));
        assert_eq!(f.lookup_int("savefile.roads_size"), before.lookup_int("savefile.roads_size"));

        let mut again = f.clone();
        upgrade_to_20(&mut again, &mut Diagnostics::default()).unwrap();
        assert_eq!(f, again);
    }

    #[test]
    fn oversized_map_fails_road_split() {
        let mut f = v10_file();
        f.insert_int("map.xsize", 1 << 33);
        f.insert_int("map.ysize", 1 << 33);
        assert!(matches!(
            upgrade_to_20(&mut f, &mut Diagnostics::default()),
            Err(SaveError::Structural { .. })
        ));
    }

    #[test]
    fn every_step_is_idempotent() {
        for step in STEPS {
            let Some(transform) = step.transform else { continue };
            let mut once = v10_file();
            once.insert_str("player0.city_style_name", "European");
            once.insert_int("player0.u0.orders_length", 0);
            transform(&mut once, &mut Diagnostics::default()).unwrap();
            let mut twice = once.clone();
            transform(&mut twice, &mut Diagnostics::default()).unwrap();
            assert_eq!(once, twice, "step {} is not idempotent", step.version);
        }
    }

    #[test]
    fn step_10_renames_and_fills_defaults() {
        let mut f = SectionFile::new();
        f.insert_str("player1.city_style_name", "Classical");
        f.insert_int("player1.u0.orders_length", 2);
        upgrade_to_10(&mut f, &mut Diagnostics::default()).unwrap();
        assert_eq!(f.lookup_str("player1.city_style_by_name"), Some("Classical"));
        assert!(!f.contains("player1.city_style_name"));
        assert_eq!(f.lookup_bool("player1.u0.orders_vigilant"), Some(false));
        assert_eq!(f.lookup_int("savefile.activities_size"), Some(19));
    }

    #[test]
    fn current_version_applies_nothing() {
        let mut f = SectionFile::new();
        f.insert_int("savefile.version", CURRENT_VERSION);
        let report = upgrade(&mut f, &mut Diagnostics::default()).unwrap();
        assert!(!report.was_upgraded());
        assert_eq!(report.original_version, CURRENT_VERSION);
    }
}
