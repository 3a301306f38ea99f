//! Map grid layers: terrain rows, bit-planes, known bits, option tokens.

mod common;

use common::started_game;
use savegame_core::state::Ruleset;
use savegame_core::{load_game, save_game, SaveError};

#[test]
fn short_terrain_rows_load_their_prefix_and_warn_once() {
    common::init_logging();
    let game = started_game();
    let mut file = save_game(&game, "test", false).expect("save").file;
    let row1 = file.lookup_str("map.t0001").unwrap().to_string();
    let row2 = file.lookup_str("map.t0002").unwrap().to_string();
    file.insert_str("map.t0001", &row1[..2]);
    file.insert_str("map.t0002", &row2[..1]);

    let loaded = load_game(file, Ruleset::classic()).expect("short rows are not fatal");
    let map = &loaded.game.map;
    assert_eq!(map.tile(1, 1).unwrap().terrain, game.map.tile(1, 1).unwrap().terrain);
    assert_eq!(map.tile(2, 1).unwrap().terrain, None);
    assert_eq!(map.tile(3, 1).unwrap().terrain, None);
    assert_eq!(map.tile(1, 2).unwrap().terrain, None);

    let warnings = loaded.diagnostics.iter().filter(|d| d.message.contains("map.t000")).count();
    assert_eq!(warnings, 1, "got {:?}", loaded.diagnostics);
}

#[test]
fn terrain_without_a_code_fails_the_save() {
    let mut game = started_game();
    game.ruleset.terrains.push("Volcano".into());
    let volcano = game.ruleset.terrains.len() - 1;
    game.map.tile_mut(2, 0).unwrap().terrain = Some(volcano);

    let failure = save_game(&game, "test", false).unwrap_err();
    match &failure.error {
        SaveError::Encoding { layer, message } => {
            assert_eq!(layer, "map.t0000");
            assert!(message.contains("Volcano"), "got: {message}");
            assert!(message.contains("(2, 0)"), "got: {message}");
        }
        other => panic!("expected an encoding error, got {other:?}"),
    }
    assert!(!failure.diagnostics.is_empty());
}

#[test]
fn known_columns_are_written_only_for_used_slots() {
    let game = started_game();
    let file = save_game(&game, "test", false).expect("save").file;

    // Slots 0 and 5 live in columns 0 and 1 of bank 0.
    assert!(file.contains("map.k00_0000"));
    assert!(file.contains("map.k01_0000"));
    for column in 2..8 {
        assert!(!file.contains(&format!("map.k{column:02}_0000")), "column {column} written");
    }
    assert_eq!(file.lookup_str("map.k00_0002"), Some("1111"));
    // Slot 5 is bit 1 of column 1; only tile (3, 2) knows it.
    assert_eq!(file.lookup_str("map.k01_0002"), Some("0002"));
}

#[test]
fn known_bits_of_a_second_bank_round_trip() {
    let mut game = started_game();
    let mut far = game.players[1].clone();
    far.number = 37;
    far.cities.clear();
    far.units.clear();
    for plr in &mut game.players {
        plr.diplstates.insert(37, Default::default());
        plr.love.insert(37, 0);
    }
    far.diplstates = game.players[0].diplstates.clone();
    far.love = game.players[0].love.clone();
    game.players.push(far);
    game.map.tile_mut(0, 2).unwrap().known.insert(37);

    let saved = save_game(&game, "test", false).expect("save");
    // Slot 37 is bank 1, half-byte 1.
    assert!(saved.file.contains("map.k09_0000"));
    assert!(!saved.file.contains("map.k08_0000"));

    let loaded = load_game(saved.file, Ruleset::classic()).expect("load");
    assert!(loaded.game.map.tile(0, 2).unwrap().known.contains(37));
    assert!(!loaded.game.map.tile(1, 2).unwrap().known.contains(37));
}

#[test]
fn rivers_overlay_saves_only_rivers() {
    let mut game = started_game();
    game.map.have_resources = false;
    game.map.have_rivers_overlay = true;
    for tile in &mut game.map.tiles {
        tile.resource = None;
    }

    let saved = save_game(&game, "test", false).expect("save");
    let options = saved.file.lookup_str("savefile.options").unwrap();
    assert!(options.contains("riversoverlay"), "got: {options}");
    assert!(!options.contains("specials"), "got: {options}");
    assert!(!saved.file.contains("map.res0000"));

    let loaded = load_game(saved.file, Ruleset::classic()).expect("load");
    let river = game.ruleset.special_by_name("River").unwrap();
    let specials = &loaded.game.map.tile(1, 0).unwrap().specials;
    assert!(specials.contains(river));
    assert_eq!(specials.len(), 1, "only the river survives");
}

#[test]
fn options_match_written_layers() {
    let game = started_game();
    let file = save_game(&game, "test", false).expect("save").file;
    assert_eq!(file.lookup_str("savefile.options"), Some(" +version2 specials"));
    assert!(file.contains("map.spe00_0000"));
    assert!(file.contains("map.res0000"));
}

#[test]
fn oversized_map_fails_the_load() {
    let game = started_game();
    let mut file = save_game(&game, "test", false).expect("save").file;
    file.insert_int("map.xsize", 1 << 33);
    file.insert_int("map.ysize", 1 << 33);

    let failure = load_game(file, Ruleset::classic()).unwrap_err();
    assert!(matches!(failure.error, SaveError::Structural { .. }), "got: {}", failure.error);
}
