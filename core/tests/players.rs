//! Player, city and unit records.

mod common;

use common::{city, started_game};
use savegame_core::codec::OrderKind;
use savegame_core::state::{Order, Production, Ruleset};
use savegame_core::{load_game, save_game, SaveError};

/// Every city of a player gets the same worklist columns; shorter lists
/// are padded with empty entries.
#[test]
fn worklists_are_padded_to_the_longest() {
    common::init_logging();
    let mut game = started_game();
    let lengths = [3usize, 7, 1];
    let spots = [(0, 0), (2, 0), (0, 2)];
    let plr = &mut game.players[0];
    plr.cities.clear();
    let cities: Vec<_> = lengths
        .iter()
        .zip(spots)
        .enumerate()
        .map(|(i, (&len, (x, y)))| {
            let worklist = (0..len).map(|j| Production::Unit(j % 6)).collect();
            city(&game, 110 + i as u32, &format!("City {i}"), x, y, 0, worklist)
        })
        .collect();
    game.players[0].cities = cities;
    for tile in &mut game.map.tiles {
        if tile.worked == Some(101) {
            tile.worked = None;
        }
    }
    for unit in &mut game.players[0].units {
        unit.homecity = None;
    }

    let saved = save_game(&game, "test", false).expect("save");
    let file = &saved.file;
    for (i, len) in lengths.iter().enumerate() {
        let c = format!("player0.c{i}");
        assert_eq!(file.lookup_int(&format!("{c}.wl_length")), Some(*len as i64));
        for j in 0..7 {
            assert!(file.contains(&format!("{c}.wl_kind{j}")), "{c} lacks wl_kind{j}");
            assert!(file.contains(&format!("{c}.wl_value{j}")), "{c} lacks wl_value{j}");
        }
        assert!(!file.contains(&format!("{c}.wl_kind7")));
    }
    assert_eq!(file.lookup_str("player0.c2.wl_kind1"), Some(""));

    let loaded = load_game(saved.file, Ruleset::classic()).expect("load");
    let lists: Vec<usize> =
        loaded.game.players[0].cities.iter().map(|c| c.worklist.len()).collect();
    assert_eq!(lists, lengths);
}

#[test]
fn unknown_worklist_entry_is_dropped_with_warning() {
    let game = started_game();
    let mut file = save_game(&game, "test", false).expect("save").file;
    file.insert_str("player0.c0.wl_value0", "Death Star");

    let loaded = load_game(file, Ruleset::classic()).expect("load");
    assert_eq!(loaded.game.players[0].cities[0].worklist, vec![Production::Building(5)]);
    assert!(loaded.diagnostics.iter().any(|d| d.message.contains("Death Star")));
}

#[test]
fn city_founded_this_turn_is_marked_as_bought() {
    let mut game = started_game();
    let turn = game.info.turn;
    let c = &mut game.players[0].cities[0];
    c.turn_founded = turn;
    c.did_buy = false;

    let saved = save_game(&game, "test", false).expect("save");
    assert_eq!(saved.file.lookup_int("player0.c0.did_buy"), Some(-1));
    let loaded = load_game(saved.file, Ruleset::classic()).expect("load");
    assert!(loaded.game.players[0].cities[0].did_buy);
}

#[test]
fn unknown_nation_fails_the_load() {
    let game = started_game();
    let mut file = save_game(&game, "test", false).expect("save").file;
    file.insert_str("player5.nation", "Atlantean");

    let failure = load_game(file, Ruleset::classic()).unwrap_err();
    assert!(failure.error.to_string().contains("player5.nation"), "got: {}", failure.error);
}

#[test]
fn player_count_must_match_player_sections() {
    let game = started_game();
    let mut file = save_game(&game, "test", false).expect("save").file;
    file.insert_int("players.nplayers", 3);
    assert!(load_game(file, Ruleset::classic()).is_err());
}

#[test]
fn attribute_block_survives_in_parts() {
    let game = started_game();
    let saved = save_game(&game, "test", false).expect("save");
    assert_eq!(saved.file.lookup_int("player0.attribute_v2_block_parts"), Some(4));
    assert!(!saved.file.contains("player5.attribute_v2_block_parts"));

    let loaded = load_game(saved.file, Ruleset::classic()).expect("load");
    assert_eq!(loaded.game.players[0].attribute_block, game.players[0].attribute_block);
}

#[test]
fn truncated_attribute_block_is_dropped() {
    let game = started_game();
    let mut file = save_game(&game, "test", false).expect("save").file;
    file.insert_str("player0.attribute_v2_block_data.part1", "00 ");

    let loaded = load_game(file, Ruleset::classic()).expect("load");
    assert_eq!(loaded.game.players[0].attribute_block, None);
    assert!(loaded.diagnostics.iter().any(|d| d.message.contains("attribute block")));
}

#[test]
fn transport_to_a_missing_unit_is_cleared() {
    let mut game = started_game();
    game.players[0].units.retain(|u| u.id != 203);
    let saved = save_game(&game, "test", false).expect("save");

    let loaded = load_game(saved.file, Ruleset::classic()).expect("load");
    let unit = loaded.game.players[0].units.iter().find(|u| u.id == 201).unwrap();
    assert_eq!(unit.transported_by, None);
    assert!(loaded.diagnostics.iter().any(|d| d.message.contains("unknown unit 203")));
}

#[test]
fn citizen_nationality_round_trips() {
    common::init_logging();
    let mut game = started_game();
    game.info.citizen_nationality = true;
    game.players[0].cities[0].citizens = [(0, 2), (5, 1)].into();
    game.players[1].cities[0].citizens = [(5, 3)].into();
    game.players[0].units[1].nationality = 5;

    let saved = save_game(&game, "test", false).expect("save");
    let file = &saved.file;
    assert_eq!(file.lookup_int("player0.c0.citizen0"), Some(2));
    assert_eq!(file.lookup_int("player0.c0.citizen5"), Some(1));
    assert_eq!(file.lookup_int("player0.u0.nationality"), Some(0));
    assert_eq!(file.lookup_int("player0.u1.nationality"), Some(5));

    let loaded = load_game(saved.file, Ruleset::classic()).expect("load");
    assert!(loaded.diagnostics.is_empty(), "unexpected diagnostics: {:?}", loaded.diagnostics);
    assert_eq!(loaded.game, game);
}

#[test]
fn move_order_without_direction_fails_the_save() {
    let mut game = started_game();
    let orders = game.players[0].units[1].orders.as_mut().unwrap();
    orders.list.push(Order::simple(OrderKind::Move));

    let failure = save_game(&game, "test", false).unwrap_err();
    assert!(matches!(failure.error, SaveError::Encoding { .. }), "got: {}", failure.error);
    assert!(failure.error.to_string().contains("no direction"));
}

#[test]
fn oversized_city_count_fails_the_load() {
    let game = started_game();
    let mut file = save_game(&game, "test", false).expect("save").file;
    file.insert_int("player0.ncities", i64::MAX);

    let failure = load_game(file, Ruleset::classic()).unwrap_err();
    assert!(matches!(failure.error, SaveError::Structural { .. }));
    assert!(failure.error.to_string().contains("player0.ncities"), "got: {}", failure.error);
}

#[test]
fn negative_unit_count_fails_the_load() {
    let game = started_game();
    let mut file = save_game(&game, "test", false).expect("save").file;
    file.insert_int("player5.nunits", -4);

    let failure = load_game(file, Ruleset::classic()).unwrap_err();
    assert!(failure.error.to_string().contains("player5.nunits"), "got: {}", failure.error);
}

#[test]
fn turn_wider_than_32_bits_fails_the_load() {
    let game = started_game();
    let mut file = save_game(&game, "test", false).expect("save").file;
    file.insert_int("player0.u0.born", i64::from(i32::MAX) + 1);

    let failure = load_game(file, Ruleset::classic()).unwrap_err();
    assert!(failure.error.to_string().contains("player0.u0.born"), "got: {}", failure.error);
}

#[test]
fn worklist_longer_than_its_entries_stops_at_the_gap() {
    let game = started_game();
    let mut file = save_game(&game, "test", false).expect("save").file;
    file.insert_int("player0.c0.wl_length", i64::MAX);

    let loaded = load_game(file, Ruleset::classic()).expect("load");
    assert_eq!(loaded.game.players[0].cities[0].worklist, game.players[0].cities[0].worklist);
    let warnings = loaded
        .diagnostics
        .iter()
        .filter(|d| d.message.contains("worklist declares"))
        .count();
    assert_eq!(warnings, 1);
}
