//! Loading files written by older program versions.

mod common;

use savegame_core::codec::Activity;
use savegame_core::compat::CURRENT_VERSION;
use savegame_core::state::ActivityTarget;
use savegame_core::{load_game, Ruleset, SaveError, SectionFile};

/// A version 3 file: five traits, roads still stored as specials, city
/// style under its old key, no activities vector.
const OLD_SAVE: &str = r#"
[scenario]
is_scenario=FALSE

[savefile]
options=" +version2 specials"
version=3
reason="autosave"
rulesetdir="classic"
improvement_size=0
technology_size=3
technology_vector="A_NONE","Alphabet","Writing"
trait_size=5
trait_vector="Expansionist","Trader","Aggressive","Builder","Frugal"
specials_size=4
specials_vector="Irrigation","Road","Mine","Railroad"
bases_size=1
bases_vector="Fortress",

[game]
version=20400
server_state="S_S_RUNNING"
turn=40
year=-2000
global_advances="101"
save_players=TRUE

[map]
xsize=3
ysize=1
t0000="gph"
spe00_0000="2a5"
res0000="   "
owner0000="0,0,-"
source0000="-,-,-"
worked0000="-,-,-"
k00_0000="111"
b00_0000="001"

[players]
nplayers=1

[player0]
name="Hammurabi"
nation="Babylonian"
government_name="Despotism"
city_style_name="Classical"
research.done="011"
trait.mod0=1
trait.mod1=2
trait.mod2=3
trait.mod3=4
trait.mod4=5
ncities=0
nunits=1
u0.id=7
u0.x=0
u0.y=0
u0.facing="8"
u0.type_by_name="Settlers"
u0.activity=4
u0.activity_target=4
u0.activity_base=-1
u0.orders_length=1
u0.orders_list="a"
u0.dir_list="?"
u0.activity_list="m"
u0.base_list="?"
u0.road_list="?"
"#;

fn old_save() -> SectionFile {
    SectionFile::parse(OLD_SAVE).expect("fixture parses")
}

#[test]
fn version_3_file_is_upgraded_and_loaded() {
    common::init_logging();
    let rules = Ruleset::classic();
    let loaded = load_game(old_save(), rules.clone()).expect("load");

    assert_eq!(loaded.migration.original_version, 3);
    assert_eq!(loaded.migration.final_version, CURRENT_VERSION);
    assert_eq!(loaded.migration.steps_applied, vec![10, 20]);

    let game = &loaded.game;
    let plr = &game.players[0];
    assert_eq!(plr.city_style, rules.city_style_by_name("Classical").unwrap());
    // The sixth trait did not exist yet.
    assert_eq!(plr.traits, [1, 2, 3, 4, 5, 0]);
    assert_eq!(
        plr.research.known,
        [0, rules.tech_by_name("Alphabet").unwrap(), rules.tech_by_name("Writing").unwrap()].into()
    );

    // 0x2 = Road, 0xa = Road + Railroad, 0x5 = Irrigation + Mine.
    let road = rules.road_by_name("Road").unwrap();
    let railroad = rules.road_by_name("Railroad").unwrap();
    let tiles = &game.map.tiles;
    assert!(tiles[0].roads.contains(road) && !tiles[0].roads.contains(railroad));
    assert!(tiles[1].roads.contains(road) && tiles[1].roads.contains(railroad));
    assert!(tiles[2].roads.is_empty());
    assert!(tiles[2].specials.contains(rules.special_by_name("Irrigation").unwrap()));
    assert!(tiles[2].specials.contains(rules.special_by_name("Mine").unwrap()));
    assert_eq!(tiles[2].specials.len(), 2);
    assert!(tiles[2].bases.contains(rules.base_by_name("Fortress").unwrap()));
    assert!(tiles.iter().all(|t| t.known.contains(0)));

    let unit = &plr.units[0];
    assert_eq!(unit.activity, Activity::Irrigate);
    assert_eq!(unit.activity_target, ActivityTarget::None);
    let orders = unit.orders.as_ref().unwrap();
    assert!(!orders.vigilant);
    assert_eq!(orders.list[0].activity, Some(Activity::Mine));
}

#[test]
fn legacy_road_specials_are_reported_as_unresolved() {
    let loaded = load_game(old_save(), Ruleset::classic()).expect("load");
    assert!(loaded
        .diagnostics
        .iter()
        .any(|d| d.message.contains("specials") && d.message.contains("Railroad")));
}

#[test]
fn file_from_the_future_is_rejected_before_any_stage() {
    let mut file = old_save();
    file.insert_int("savefile.version", CURRENT_VERSION + 1);
    let failure = load_game(file, Ruleset::classic()).unwrap_err();
    assert!(matches!(failure.error, SaveError::UnsupportedVersion { .. }));
}

#[test]
fn file_without_version_is_legacy_format() {
    let mut file = old_save();
    file.remove("savefile.version");
    let failure = load_game(file, Ruleset::classic()).unwrap_err();
    assert!(matches!(failure.error, SaveError::LegacyFormat));
}

#[test]
fn version_between_steps_is_accepted() {
    let mut file = old_save();
    file.insert_int("savefile.version", 15);
    let activities: Vec<&str> = Activity::ALL[..19].iter().map(|a| a.name()).collect();
    file.insert_int("savefile.activities_size", activities.len() as i64);
    file.insert_str_vec("savefile.activities_vector", &activities);
    let loaded = load_game(file, Ruleset::classic()).expect("load");
    assert_eq!(loaded.migration.steps_applied, vec![20]);
}
