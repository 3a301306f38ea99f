//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use savegame_core::codec::{Activity, Direction, OrderKind};
use savegame_core::rng::RandomState;
use savegame_core::state::{
    ActivityTarget, City, DiplState, GameState, Order, Player, Production, Rgb, Ruleset,
    ServerState, Setting, SettingValue, SpaceshipState, StartPos, TechRef, Unit, UnitOrders,
};
use savegame_core::SectionFile;

pub const XSIZE: usize = 4;
pub const YSIZE: usize = 3;
/// Player slots used by [`started_game`]. Slot 5 sits in the second
/// known-bits column.
pub const SLOTS: [usize; 2] = [0, 5];

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A running game exercising every persisted layer.
pub fn started_game() -> GameState {
    let rules = Ruleset::classic();
    let mut game = GameState::new(rules, XSIZE, YSIZE);
    game.info.server_state = ServerState::Running;
    game.info.turn = 12;
    game.info.year = -3400;
    game.info.global_advances = [0, 1, 8].into();
    game.info.destroyed_wonders = [8].into();
    game.info.identity_number_used = 300;
    game.settings = vec![
        Setting { name: "aifill".into(), value: SettingValue::Int(5) },
        Setting { name: "autoattack".into(), value: SettingValue::Bool(true) },
        Setting { name: "demography".into(), value: SettingValue::Str("NASRLPEMOCqrb".into()) },
    ];
    game.script_vars = "return { turn = 12 }".into();
    game.mapimg_defs = vec!["zoom=2:map=tcu".into()];
    game.random = Some(RandomState::seeded(7));
    game.save_random = true;
    game.shuffled_players = vec![5, 0];

    fill_map(&mut game);
    let players: Vec<Player> = SLOTS.iter().map(|&n| player(&game, n)).collect();
    game.players = players;
    game
}

fn fill_map(game: &mut GameState) {
    let terrains = game.ruleset.terrains.len();
    let river = game.ruleset.special_by_name("River").unwrap();
    let map = &mut game.map;
    for (i, tile) in map.tiles.iter_mut().enumerate() {
        tile.terrain = Some(i % terrains);
        tile.known.insert(0);
        tile.owner = Some(if i % XSIZE < 2 { 0 } else { 5 });
    }
    map.tiles[0].resource = Some(0);
    map.tiles[1].specials.insert(0);
    map.tiles[1].specials.insert(river);
    map.tiles[1].roads.insert(0);
    map.tiles[1].roads.insert(1);
    map.tiles[2].bases.insert(0);
    map.tiles[3].spec_sprite = Some("ts.river_sprite".into());
    map.tiles[5].label = Some("Home".into());
    map.tiles[11].known.insert(5);

    let city0 = map.index(1, 1).unwrap();
    let city5 = map.index(3, 2).unwrap();
    map.tiles[city0].worked = Some(101);
    map.tiles[city0 + 1].worked = Some(101);
    map.tiles[city5].worked = Some(102);
    map.tiles[city0].claimer = Some(city0);
    map.tiles[city5].claimer = Some(city5);

    map.start_positions = vec![
        StartPos { x: 0, y: 0, exclude: false, nations: vec![0, 3] },
        StartPos { x: 3, y: 2, exclude: true, nations: vec![] },
    ];
}

fn player(game: &GameState, number: usize) -> Player {
    let mut p = Player::new(number, if number == 0 { "Hammurabi" } else { "Ramesses" });
    p.username = format!("user{number}");
    p.ranked_username = p.username.clone();
    p.color = Some(Rgb { r: 200, g: number as u8 * 10, b: 40 });
    p.nation = if number == 0 { 0 } else { 1 };
    p.government = 1;
    p.city_style = 1;
    for &other in &SLOTS {
        let ds = DiplState { kind: 2, max_state: 2, first_contact_turn: 3, ..Default::default() };
        p.diplstates.insert(other, ds);
        p.love.insert(other, if other == number { 0 } else { 12 });
    }
    p.research.goal = TechRef::Advance(8);
    p.research.researching = TechRef::Advance(3);
    p.research.known = [0, 1, 2].into();
    p.research.bulbs_researched = 17;
    p.traits = [1, 2, 3, 4, 5, 6];
    p.lost_wonders = [7].into();

    if number == 0 {
        p.target_government = Some(2);
        p.attribute_block = Some((0..=255u8).cycle().take(900).collect());
        let worklist = vec![Production::Unit(3), Production::Building(5)];
        p.cities.push(city(game, 101, "Babylon", 1, 1, number, worklist));
        p.units = vec![
            unit(number, 201, 2, (1, 1), Some(101), |u| {
                u.activity = Activity::Fortified;
                u.transported_by = Some(203);
            }),
            unit(number, 202, 0, (0, 0), Some(101), |u| {
                u.activity = Activity::Irrigate;
                u.activity_target = ActivityTarget::Special(0);
                u.changed_from_target = ActivityTarget::Road(1);
                u.goto_tile = Some((3, 0));
                u.orders = Some(UnitOrders {
                    index: 1,
                    repeat: true,
                    vigilant: false,
                    last_move_safe: true,
                    list: vec![
                        Order::move_to(Direction::East),
                        Order::activity(Activity::Mine),
                        Order { base: Some(0), ..Order::activity(Activity::Base) },
                        Order::simple(OrderKind::Disband),
                    ],
                });
            }),
            unit(number, 203, 5, (1, 1), None, |_| {}),
        ];
    } else {
        p.spaceship.state = SpaceshipState::Started;
        p.spaceship.structurals = 2;
        p.spaceship.structure.insert(0);
        p.spaceship.structure.insert(3);
        p.cities.push(city(game, 102, "Thebes", 3, 2, number, Vec::new()));
        p.units = vec![unit(number, 204, 3, (3, 2), Some(102), |_| {})];
    }
    p
}

pub fn city(
    game: &GameState,
    id: u32,
    name: &str,
    x: usize,
    y: usize,
    owner: usize,
    worklist: Vec<Production>,
) -> City {
    let mut c = City::new(id, name, x, y, owner);
    c.size = 3;
    c.specialists = vec![0; game.ruleset.specialists.len()];
    c.specialists[1] = 1;
    c.trade_routes = vec![0; game.ruleset.trade_routes];
    c.food_stock = 9;
    c.turn_founded = 3;
    c.did_buy = true;
    c.production = Production::Building(1);
    c.changed_from = Production::Unit(2);
    c.improvements = [0, 6].into();
    c.worklist = worklist;
    c.options.insert(1);
    c
}

fn unit(
    owner: usize,
    id: u32,
    unit_type: usize,
    (x, y): (usize, usize),
    home: Option<u32>,
    tweak: impl FnOnce(&mut Unit),
) -> Unit {
    let mut u = Unit::new(id, owner, unit_type, x, y);
    u.facing = Direction::NorthWest;
    u.homecity = home;
    u.birth_turn = 4;
    tweak(&mut u);
    u
}

/// Render to text and parse back, as a file on disk would be.
pub fn through_text(file: &SectionFile) -> SectionFile {
    SectionFile::parse(&file.to_text()).expect("saved text parses")
}
