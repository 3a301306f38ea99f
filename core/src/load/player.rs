use super::{set_bits, LoadJob};
use crate::codec::{self, Activity, Direction, OrderKind};
use crate::context::{Diagnostics, Ordering, Orderings};
use crate::error::{SaveError, SaveResult};
use crate::section_file::SectionFile;
use crate::state::player::NUM_SS_STRUCTURALS;
use crate::state::ruleset::A_NONE;
use crate::state::{
    ActivityTarget, City, DiplState, GameState, Order, Player, Production, Rgb, Ruleset,
    SpaceshipState, TechRef, Unit, UnitOrders,
};
use crate::types::{CityId, FlagSet, PlayerId, UnitId, MAX_PLAYER_SLOTS};

const STAGE: &str = "players";

pub(super) fn load_players(job: &mut LoadJob) -> SaveResult<()> {
    if !job.ctx.save_players {
        log::debug!("savefile carries no player data");
        return Ok(());
    }
    let LoadJob { file, game, ctx } = job;
    let (orderings, diagnostics) = ctx.orderings_and_diagnostics()?;

    let nplayers = file.require_int("players.nplayers")?;
    let numbers: Vec<PlayerId> =
        (0..MAX_PLAYER_SLOTS).filter(|n| file.contains(&format!("player{n}.name"))).collect();
    if numbers.len() as i64 != nplayers {
        return Err(SaveError::structural(
            "players.nplayers",
            format!("declares {nplayers} players but {} player sections exist", numbers.len()),
        ));
    }

    let wonders = file.lookup_str_or("players.destroyed_wonders", "");
    game.info.destroyed_wonders =
        orderings.improvements.remap(set_bits(wonders)).into_iter().collect();
    game.info.identity_number_used = file.lookup_int_or("players.identity_number_used", 0);
    game.shuffled_players.clear();
    for i in 0..numbers.len() {
        match file.lookup_int(&format!("players.shuffled_player_{i}")).map(usize::try_from) {
            Some(Ok(n)) if numbers.contains(&n) => game.shuffled_players.push(n),
            Some(_) => {
                diagnostics.warn(STAGE, format!("shuffled player {i} names no loaded player"))
            }
            None => {}
        }
    }

    let mut players = Vec::with_capacity(numbers.len());
    for &number in &numbers {
        let mut plr =
            load_player_main(file, &game.ruleset, orderings, diagnostics, number, &numbers)?;
        plr.cities = load_player_cities(file, game, orderings, diagnostics, &plr)?;
        plr.units = load_player_units(file, game, orderings, diagnostics, &plr)?;
        plr.attribute_block = load_player_attributes(file, diagnostics, number);
        log::debug!(
            "loaded player {number} '{}' ({} cities, {} units)",
            plr.name,
            plr.cities.len(),
            plr.units.len()
        );
        players.push(plr);
    }
    game.players = players;
    Ok(())
}

/// Nonzero city or unit id.
fn require_id(file: &SectionFile, path: &str) -> SaveResult<u32> {
    let id = file.require_int(path)?;
    u32::try_from(id)
        .ok()
        .filter(|id| *id != 0)
        .ok_or_else(|| SaveError::structural(path, format!("invalid id {id}")))
}

/// Map position at `<prefix>.x`, `<prefix>.y`.
fn require_position(file: &SectionFile, prefix: &str) -> SaveResult<(usize, usize)> {
    Ok((require_index(file, &format!("{prefix}.x"))?, require_index(file, &format!("{prefix}.y"))?))
}

/// Int field that must fit an unsigned index.
fn require_index(file: &SectionFile, path: &str) -> SaveResult<usize> {
    let v = file.require_int(path)?;
    usize::try_from(v).map_err(|_| SaveError::structural(path, format!("negative value {v}")))
}

/// Ruleset index for a name that has to resolve.
fn require_rule(
    file: &SectionFile,
    path: &str,
    lookup: impl Fn(&str) -> Option<usize>,
) -> SaveResult<usize> {
    let name = file.require_str(path)?;
    lookup(name)
        .ok_or_else(|| SaveError::structural(path, format!("'{name}' not in the current ruleset")))
}

fn technology_ref(
    rules: &Ruleset,
    diagnostics: &mut Diagnostics,
    path: &str,
    name: &str,
) -> TechRef {
    match name {
        "" => TechRef::Unknown,
        A_NONE => TechRef::None,
        "A_UNSET" => TechRef::Unset,
        "A_FUTURE" => TechRef::Future,
        name => match rules.tech_by_name(name) {
            Some(i) => TechRef::Advance(i),
            None => {
                diagnostics.warn(STAGE, format!("{path}: unknown technology '{name}'"));
                TechRef::Unknown
            }
        },
    }
}

fn load_player_main(
    file: &SectionFile,
    rules: &Ruleset,
    orderings: &Orderings,
    diagnostics: &mut Diagnostics,
    number: PlayerId,
    numbers: &[PlayerId],
) -> SaveResult<Player> {
    let p = format!("player{number}");
    let mut plr = Player::new(number, file.require_str(&format!("{p}.name"))?);

    plr.ai_type = file.lookup_str_or(&format!("{p}.ai_type"), &plr.ai_type).to_string();
    plr.username = file.lookup_str_or(&format!("{p}.username"), "").to_string();
    plr.ranked_username = file.lookup_str_or(&format!("{p}.ranked_username"), "").to_string();
    plr.delegation_username = file
        .lookup_str(&format!("{p}.delegation_username"))
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let channel = |c: &str| file.lookup_int(&format!("{p}.color.{c}")).map(u8::try_from);
    plr.color = match (channel("r"), channel("g"), channel("b")) {
        (Some(Ok(r)), Some(Ok(g)), Some(Ok(b))) => Some(Rgb { r, g, b }),
        (None, None, None) => None,
        _ => {
            diagnostics.warn(STAGE, format!("{p}: invalid color, left undefined"));
            None
        }
    };

    plr.nation = require_rule(file, &format!("{p}.nation"), |n| rules.nation_by_name(n))?;
    plr.team = usize::try_from(file.lookup_int_or(&format!("{p}.team_no"), -1)).ok();
    plr.government =
        require_rule(file, &format!("{p}.government_name"), |n| rules.government_by_name(n))?;
    let target = file.lookup_str(&format!("{p}.target_government_name"));
    plr.target_government = target.and_then(|name| {
        let gov = rules.government_by_name(name);
        if gov.is_none() {
            diagnostics.warn(STAGE, format!("{p}: unknown target government '{name}'"));
        }
        gov
    });
    let style = file.lookup_str_or(&format!("{p}.city_style_by_name"), "");
    plr.city_style = rules.city_style_by_name(style).unwrap_or_else(|| {
        diagnostics.warn(STAGE, format!("{p}: unknown city style '{style}', using the first one"));
        0
    });

    plr.is_male = file.lookup_bool_or(&format!("{p}.is_male"), true);
    plr.is_alive = file.lookup_bool_or(&format!("{p}.is_alive"), true);
    plr.ai_controlled = file.lookup_bool_or(&format!("{p}.ai.control"), false);

    for &other in numbers {
        let d = format!("{p}.diplstate{other}");
        if !file.contains(&format!("{d}.type")) {
            continue;
        }
        let ds = DiplState {
            kind: file.lookup_int_or(&format!("{d}.type"), 0),
            max_state: file.lookup_int_or(&format!("{d}.max_state"), 0),
            first_contact_turn: file.lookup_i32_or(&format!("{d}.first_contact_turn"), 0)?,
            turns_left: file.lookup_int_or(&format!("{d}.turns_left"), 0),
            has_reason_to_cancel: file.lookup_int_or(&format!("{d}.has_reason_to_cancel"), 0),
            contact_turns_left: file.lookup_int_or(&format!("{d}.contact_turns_left"), 0),
            embassy: file.lookup_bool_or(&format!("{d}.embassy"), false),
            gives_shared_vision: file.lookup_bool_or(&format!("{d}.gives_shared_vision"), false),
        };
        plr.diplstates.insert(other, ds);
        if let Some(love) = file.lookup_int(&format!("{p}.ai{other}.love")) {
            plr.love.insert(other, love);
        }
    }

    plr.ai_skill_level = file.lookup_int_or(&format!("{p}.ai.skill_level"), 0);
    plr.barbarian_type = file.lookup_int_or(&format!("{p}.ai.is_barbarian"), 0);
    plr.gold = file.lookup_int_or(&format!("{p}.gold"), plr.gold);
    plr.tax = file.lookup_int_or(&format!("{p}.rates.tax"), plr.tax);
    plr.science = file.lookup_int_or(&format!("{p}.rates.science"), plr.science);
    plr.luxury = file.lookup_int_or(&format!("{p}.rates.luxury"), plr.luxury);

    let r = &mut plr.research;
    let slots = [
        ("goal", &mut r.goal),
        ("saved", &mut r.researching_saved),
        ("now", &mut r.researching),
    ];
    for (key, slot) in slots {
        let path = format!("{p}.research.{key}_name");
        if let Some(name) = file.lookup_str(&path) {
            *slot = technology_ref(rules, diagnostics, &path, name);
        }
    }
    r.bulbs_last_turn = file.lookup_int_or(&format!("{p}.research.bulbs_last_turn"), 0);
    r.techs_researched = file.lookup_int_or(&format!("{p}.research.techs"), 0);
    r.future_tech = file.lookup_int_or(&format!("{p}.research.futuretech"), 0);
    r.bulbs_researching_saved = file.lookup_int_or(&format!("{p}.research.bulbs_before"), 0);
    r.bulbs_researched = file.lookup_int_or(&format!("{p}.research.bulbs"), 0);
    r.got_tech = file.lookup_bool_or(&format!("{p}.research.got_tech"), false);
    match file.lookup_str(&format!("{p}.research.done")) {
        Some(bits) => {
            r.known = orderings.technologies.remap(set_bits(bits)).into_iter().collect();
            r.known.insert(0);
        }
        None => diagnostics.warn(STAGE, format!("{p}: no known technologies saved")),
    }

    for j in 0..orderings.traits.len() {
        let Some(value) = file.lookup_int(&format!("{p}.trait.mod{j}")) else { continue };
        if let Some(running) = orderings.traits.running(j) {
            plr.traits[running] = value;
        }
    }

    plr.got_first_city = file.lookup_bool_or(&format!("{p}.capital"), false);
    plr.revolution_finishes = file.lookup_int_or(&format!("{p}.revolution_finishes"), -1);
    plr.units_built = file.lookup_int_or(&format!("{p}.units_built"), 0);
    plr.units_killed = file.lookup_int_or(&format!("{p}.units_killed"), 0);
    plr.units_lost = file.lookup_int_or(&format!("{p}.units_lost"), 0);

    load_spaceship(file, diagnostics, &mut plr)?;

    let lost = file.lookup_str_or(&format!("{p}.lost_wonders"), "");
    plr.lost_wonders = orderings.improvements.remap(set_bits(lost)).into_iter().collect();
    Ok(plr)
}

fn load_spaceship(
    file: &SectionFile,
    diagnostics: &mut Diagnostics,
    plr: &mut Player,
) -> SaveResult<()> {
    let s = format!("player{}.spaceship", plr.number);
    let raw = file.lookup_int_or(&format!("{s}.state"), 0);
    let ship = &mut plr.spaceship;
    ship.state = SpaceshipState::from_int(raw).unwrap_or_else(|| {
        diagnostics.warn(STAGE, format!("{s}: unknown state {raw}, treated as none"));
        SpaceshipState::None
    });
    if ship.state == SpaceshipState::None {
        return Ok(());
    }
    ship.structurals = file.lookup_int_or(&format!("{s}.structurals"), 0);
    ship.components = file.lookup_int_or(&format!("{s}.components"), 0);
    ship.modules = file.lookup_int_or(&format!("{s}.modules"), 0);
    ship.fuel = file.lookup_int_or(&format!("{s}.fuel"), 0);
    ship.propulsion = file.lookup_int_or(&format!("{s}.propulsion"), 0);
    ship.habitation = file.lookup_int_or(&format!("{s}.habitation"), 0);
    ship.life_support = file.lookup_int_or(&format!("{s}.life_support"), 0);
    ship.solar_panels = file.lookup_int_or(&format!("{s}.solar_panels"), 0);
    let path = format!("{s}.structure");
    let structure = file.require_str(&path)?;
    let found = structure.chars().count();
    if found != NUM_SS_STRUCTURALS {
        return Err(SaveError::structural(
            &path,
            format!("expected {NUM_SS_STRUCTURALS} characters, found {found}"),
        ));
    }
    ship.structure = set_bits(structure).collect::<FlagSet>();
    if ship.state >= SpaceshipState::Launched {
        ship.launch_year = file.lookup_int_or(&format!("{s}.launch_year"), 0);
    }
    Ok(())
}

fn production_ref(rules: &Ruleset, kind: &str, name: &str) -> Option<Production> {
    match kind {
        Production::KIND_BUILDING => rules.improvement_by_name(name).map(Production::Building),
        Production::KIND_UNIT => rules.unit_type_by_name(name).map(Production::Unit),
        _ => None,
    }
}

fn load_player_cities(
    file: &SectionFile,
    game: &GameState,
    orderings: &Orderings,
    diagnostics: &mut Diagnostics,
    plr: &Player,
) -> SaveResult<Vec<City>> {
    let rules = &game.ruleset;
    let p = format!("player{}", plr.number);
    let ncities = file.lookup_count(&format!("{p}.ncities"), file.section_len(&p))?;
    let mut cities = Vec::new();

    for i in 0..ncities {
        let c = format!("{p}.c{i}");
        let id: CityId = require_id(file, &format!("{c}.id"))?;
        let (x, y) = require_position(file, &c)?;
        if game.map.index(x, y).is_none() {
            return Err(SaveError::structural(&c, format!("city at ({x}, {y}) is off the map")));
        }
        let original = file.lookup_int_or(&format!("{c}.original"), plr.number as i64);
        let original = usize::try_from(original).unwrap_or(plr.number);
        let mut city = City::new(id, file.require_str(&format!("{c}.name"))?, x, y, original);

        city.size = file.lookup_int_or(&format!("{c}.size"), city.size);
        city.specialists = rules
            .specialists
            .iter()
            .map(|name| file.lookup_int_or(&format!("{c}.n{name}"), 0))
            .collect();
        city.trade_routes = (0..rules.trade_routes)
            .map(|j| file.lookup_int_or(&format!("{c}.traderoute{j}"), 0))
            .collect();
        city.food_stock = file.lookup_int_or(&format!("{c}.food_stock"), 0);
        city.shield_stock = file.lookup_int_or(&format!("{c}.shield_stock"), 0);
        city.airlift = file.lookup_int_or(&format!("{c}.airlift"), 0);
        city.was_happy = file.lookup_bool_or(&format!("{c}.was_happy"), false);
        city.turn_plague = file.lookup_int_or(&format!("{c}.turn_plague"), 0);
        city.anarchy = file.lookup_int_or(&format!("{c}.anarchy"), 0);
        city.rapture = file.lookup_int_or(&format!("{c}.rapture"), 0);
        city.steal = file.lookup_int_or(&format!("{c}.steal"), 0);
        city.turn_founded = file.lookup_i32_or(&format!("{c}.turn_founded"), 0)?;
        // -1 marks a city founded on the saved turn; it cannot buy again.
        city.did_buy = file.lookup_int_or(&format!("{c}.did_buy"), 0) != 0;
        city.did_sell = file.lookup_bool_or(&format!("{c}.did_sell"), false);
        city.turn_last_built = file.lookup_i32_or(&format!("{c}.turn_last_built"), 0)?;

        let kind = file.lookup_str_or(&format!("{c}.currently_building_kind"), "");
        let name = file.lookup_str_or(&format!("{c}.currently_building_name"), "");
        city.production = production_ref(rules, kind, name).unwrap_or_else(|| {
            diagnostics.warn(
                STAGE,
                format!("{c}: cannot build unknown {kind} '{name}', using the first unit type"),
            );
            Production::Unit(0)
        });
        let kind = file.lookup_str_or(&format!("{c}.changed_from_kind"), "");
        let name = file.lookup_str_or(&format!("{c}.changed_from_name"), "");
        city.changed_from = production_ref(rules, kind, name).unwrap_or(city.production);

        city.before_change_shields = file.lookup_int_or(&format!("{c}.before_change_shields"), 0);
        city.caravan_shields = file.lookup_int_or(&format!("{c}.caravan_shields"), 0);
        city.disbanded_shields = file.lookup_int_or(&format!("{c}.disbanded_shields"), 0);
        city.last_turns_shield_surplus =
            file.lookup_int_or(&format!("{c}.last_turns_shield_surplus"), 0);
        city.radius_sq = file.lookup_int_or(&format!("{c}.city_radius_sq"), city.radius_sq);
        let improvements = file.lookup_str_or(&format!("{c}.improvements"), "");
        city.improvements =
            orderings.improvements.remap(set_bits(improvements)).into_iter().collect();

        let wl_length = file.lookup_int_or(&format!("{c}.wl_length"), 0).max(0);
        for j in 0..wl_length {
            let Some(kind) = file.lookup_str(&format!("{c}.wl_kind{j}")) else {
                let message = format!("{c}: worklist declares {wl_length} entries, {j} saved");
                diagnostics.warn(STAGE, message);
                break;
            };
            let value = file.lookup_str_or(&format!("{c}.wl_value{j}"), "");
            match production_ref(rules, kind, value) {
                Some(entry) => city.worklist.push(entry),
                None => {
                    let message = format!("{c}: dropped unknown worklist entry {kind} '{value}'");
                    diagnostics.warn(STAGE, message);
                }
            }
        }

        for j in 0..rules.city_options {
            if file.lookup_bool_or(&format!("{c}.option{j}"), false) {
                city.options.insert(j);
            }
        }

        if game.info.citizen_nationality {
            for slot in 0..MAX_PLAYER_SLOTS {
                match file.lookup_int(&format!("{c}.citizen{slot}")) {
                    Some(count) if count > 0 => {
                        city.citizens.insert(slot, count);
                    }
                    _ => {}
                }
            }
        }
        cities.push(city);
    }
    Ok(cities)
}

/// A saved activity target. Only one of the three fields is set; the
/// others hold their sentinel.
fn activity_target(
    orderings: &Orderings,
    diagnostics: &mut Diagnostics,
    path: &str,
    (special, base, road): (i64, i64, i64),
) -> ActivityTarget {
    let resolve = |ordering: &Ordering, index: i64| {
        usize::try_from(index).ok().and_then(|i| ordering.running(i))
    };
    let target = if base >= 0 {
        resolve(&orderings.bases, base).map(ActivityTarget::Base)
    } else if road >= 0 {
        resolve(&orderings.roads, road).map(ActivityTarget::Road)
    } else if special >= 0 && special != orderings.specials.len() as i64 {
        resolve(&orderings.specials, special).map(ActivityTarget::Special)
    } else {
        Some(ActivityTarget::None)
    };
    target.unwrap_or_else(|| {
        diagnostics.warn(STAGE, format!("{path}: unknown activity target, cleared"));
        ActivityTarget::None
    })
}

fn activity(
    orderings: &Orderings,
    diagnostics: &mut Diagnostics,
    path: &str,
    index: i64,
) -> Activity {
    usize::try_from(index)
        .ok()
        .and_then(|i| orderings.activities.running(i))
        .and_then(|i| Activity::ALL.get(i).copied())
        .unwrap_or_else(|| {
            diagnostics.warn(STAGE, format!("{path}: unknown activity {index}, unit set idle"));
            Activity::Idle
        })
}

fn load_player_units(
    file: &SectionFile,
    game: &GameState,
    orderings: &Orderings,
    diagnostics: &mut Diagnostics,
    plr: &Player,
) -> SaveResult<Vec<Unit>> {
    let rules = &game.ruleset;
    let p = format!("player{}", plr.number);
    let nunits = file.lookup_count(&format!("{p}.nunits"), file.section_len(&p))?;
    let mut units = Vec::new();

    for i in 0..nunits {
        let u = format!("{p}.u{i}");
        let id: UnitId = require_id(file, &format!("{u}.id"))?;
        let (x, y) = require_position(file, &u)?;
        if game.map.index(x, y).is_none() {
            return Err(SaveError::structural(&u, format!("unit at ({x}, {y}) is off the map")));
        }
        let type_name = file.lookup_str_or(&format!("{u}.type_by_name"), "");
        let Some(unit_type) = rules.unit_type_by_name(type_name) else {
            diagnostics.warn(STAGE, format!("{u}: unknown unit type '{type_name}', unit dropped"));
            continue;
        };
        let mut unit = Unit::new(id, plr.number, unit_type, x, y);

        let facing = file.lookup_str_or(&format!("{u}.facing"), "");
        match facing.chars().next().map(Direction::from_char) {
            Some(Ok(dir)) => unit.facing = dir,
            _ => diagnostics.warn(STAGE, format!("{u}: invalid facing '{facing}'")),
        }
        if game.info.citizen_nationality {
            match file.lookup_int(&format!("{u}.nationality")).map(usize::try_from) {
                Some(Ok(n)) if n < MAX_PLAYER_SLOTS => unit.nationality = n,
                Some(_) => diagnostics.warn(STAGE, format!("{u}: invalid nationality, owner kept")),
                None => {}
            }
        }
        unit.veteran = file.lookup_int_or(&format!("{u}.veteran"), 0);
        unit.hp = file.lookup_int_or(&format!("{u}.hp"), unit.hp);
        unit.homecity = CityId::try_from(file.lookup_int_or(&format!("{u}.homecity"), 0))
            .ok()
            .filter(|id| *id != 0);

        let int = |key: &str, default: i64| file.lookup_int_or(&format!("{u}.{key}"), default);
        unit.activity = activity(orderings, diagnostics, &u, int("activity", 0));
        unit.activity_count = int("activity_count", 0);
        let fields = (
            int("activity_target", -1),
            int("activity_base", -1),
            int("activity_road", -1),
        );
        unit.activity_target = activity_target(orderings, diagnostics, &u, fields);
        unit.changed_from = activity(orderings, diagnostics, &u, int("changed_from", 0));
        unit.changed_from_count = int("changed_from_count", 0);
        let fields = (
            int("changed_from_target", -1),
            int("changed_from_base", -1),
            int("changed_from_road", -1),
        );
        unit.changed_from_target = activity_target(orderings, diagnostics, &u, fields);

        unit.done_moving = file.lookup_bool_or(&format!("{u}.done_moving"), false);
        unit.moves_left = int("moves", unit.moves_left);
        unit.fuel = int("fuel", 0);
        unit.birth_turn = file.lookup_i32_or(&format!("{u}.born"), 0)?;
        unit.battlegroup = int("battlegroup", -1);
        if file.lookup_bool_or(&format!("{u}.go"), false) {
            let coord = |key: &str| usize::try_from(int(key, -1)).ok();
            let goto = coord("goto_x").zip(coord("goto_y"));
            match goto.filter(|&(gx, gy)| game.map.index(gx, gy).is_some()) {
                Some(tile) => unit.goto_tile = Some(tile),
                None => diagnostics.warn(STAGE, format!("{u}: goto target off the map, dropped")),
            }
        }
        unit.ai_controlled = file.lookup_bool_or(&format!("{u}.ai"), false);
        unit.moved = file.lookup_bool_or(&format!("{u}.moved"), false);
        unit.paradropped = file.lookup_bool_or(&format!("{u}.paradropped"), false);
        unit.transported_by = UnitId::try_from(int("transported_by", -1)).ok();

        unit.orders = load_unit_orders(file, orderings, diagnostics, &u);
        units.push(unit);
    }
    Ok(units)
}

/// Orders are dropped, with a warning, when any list is too short or
/// holds an unknown code.
fn load_unit_orders(
    file: &SectionFile,
    orderings: &Orderings,
    diagnostics: &mut Diagnostics,
    u: &str,
) -> Option<UnitOrders> {
    let len = usize::try_from(file.lookup_int_or(&format!("{u}.orders_length"), 0)).unwrap_or(0);
    if len == 0 {
        return None;
    }
    let list = |key: &str| -> Vec<char> {
        file.lookup_str_or(&format!("{u}.{key}"), "").chars().collect()
    };
    let (kinds, dirs, acts, bases, roads) =
        (
            list("orders_list"),
            list("dir_list"),
            list("activity_list"),
            list("base_list"),
            list("road_list"),
        );
    if [&kinds, &dirs, &acts].iter().any(|l| l.len() < len) {
        diagnostics.warn(STAGE, format!("{u}: order lists shorter than {len}, orders dropped"));
        return None;
    }
    let extra = |chars: &[char], j: usize, ordering: &Ordering| {
        chars
            .get(j)
            .filter(|c| **c != '?')
            .and_then(|c| codec::char_to_num(*c))
            .and_then(|i| ordering.running(i))
    };

    let mut orders = Vec::with_capacity(len);
    for j in 0..len {
        let order = match OrderKind::from_char(kinds[j]) {
            Ok(OrderKind::Move) => Direction::from_char(dirs[j]).map(Order::move_to),
            Ok(OrderKind::Activity) => Activity::from_char(acts[j]).map(|a| Order {
                base: extra(&bases, j, &orderings.bases),
                road: extra(&roads, j, &orderings.roads),
                ..Order::activity(a)
            }),
            other => other.map(Order::simple),
        };
        match order {
            Ok(order) => orders.push(order),
            Err(e) => {
                diagnostics.warn(STAGE, format!("{u}: order {j}: {e}, orders dropped"));
                return None;
            }
        }
    }

    let index = usize::try_from(file.lookup_int_or(&format!("{u}.orders_index"), 0)).unwrap_or(0);
    Some(UnitOrders {
        index: index.min(len - 1),
        repeat: file.lookup_bool_or(&format!("{u}.orders_repeat"), false),
        vigilant: file.lookup_bool_or(&format!("{u}.orders_vigilant"), false),
        last_move_safe: file.lookup_bool_or(&format!("{u}.orders_last_move_safe"), false),
        list: orders,
    })
}

/// Join the attribute block parts and unquote them. A block whose
/// lengths do not match is dropped with a warning.
fn load_player_attributes(
    file: &SectionFile,
    diagnostics: &mut Diagnostics,
    number: PlayerId,
) -> Option<Vec<u8>> {
    let p = format!("player{number}");
    let parts = file.lookup_int(&format!("{p}.attribute_v2_block_parts"))?;
    let length = file.lookup_int_or(&format!("{p}.attribute_v2_block_length"), -1);
    let quoted_length = file.lookup_int_or(&format!("{p}.attribute_v2_block_length_quoted"), -1);

    let mut quoted = String::new();
    for part in 0..parts.max(0) {
        match file.lookup_str(&format!("{p}.attribute_v2_block_data.part{part}")) {
            Some(data) => quoted.push_str(data),
            None => {
                let message = format!("{p}: attribute block part {part} missing, block dropped");
                diagnostics.warn(STAGE, message);
                return None;
            }
        }
    }
    if quoted.len() as i64 != quoted_length {
        diagnostics.warn(
            STAGE,
            format!(
                "{p}: attribute block is {} characters, expected {quoted_length}; dropped",
                quoted.len()
            ),
        );
        return None;
    }
    match codec::unquote_block(&quoted) {
        Ok(data) if data.len() as i64 == length => Some(data),
        Ok(data) => {
            diagnostics.warn(
                STAGE,
                format!(
                    "{p}: attribute block holds {} bytes, expected {length}; dropped",
                    data.len()
                ),
            );
            None
        }
        Err(e) => {
            diagnostics.warn(STAGE, format!("{p}: attribute block: {e}; dropped"));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orderings(rules: &Ruleset) -> Orderings {
        let names = |list: &[String]| list.to_vec();
        let activities: Vec<&str> = Activity::ALL.iter().map(|a| a.name()).collect();
        Orderings {
            improvements: Ordering::resolve(
                rules.improvements.iter().map(|b| b.name.clone()).collect(),
                &rules.improvement_names(),
            ),
            technologies: Ordering::resolve(names(&rules.technologies), &rules.technologies),
            activities: Ordering::resolve(
                activities.iter().map(|s| s.to_string()).collect(),
                &activities,
            ),
            traits: Ordering::resolve(Vec::new(), &[] as &[&str]),
            specials: Ordering::resolve(names(&rules.specials), &rules.specials),
            bases: Ordering::resolve(names(&rules.bases), &rules.bases),
            roads: Ordering::resolve(names(&rules.roads), &rules.roads),
        }
    }

    #[test]
    fn special_sentinel_means_no_target() {
        let rules = Ruleset::classic();
        let ord = orderings(&rules);
        let mut diags = Diagnostics::default();
        let sentinel = rules.specials.len() as i64;
        let mut target = |fields| activity_target(&ord, &mut diags, "u", fields);
        assert_eq!(target((sentinel, -1, -1)), ActivityTarget::None);
        assert_eq!(target((sentinel, -1, 1)), ActivityTarget::Road(1));
        assert_eq!(target((1, -1, -1)), ActivityTarget::Special(1));
        assert_eq!(diags.warning_count(), 0);
    }

    #[test]
    fn unknown_research_name_warns() {
        let rules = Ruleset::classic();
        let mut diags = Diagnostics::default();
        assert_eq!(technology_ref(&rules, &mut diags, "p", "A_FUTURE"), TechRef::Future);
        assert_eq!(technology_ref(&rules, &mut diags, "p", "Writing"), TechRef::Advance(8));
        assert_eq!(technology_ref(&rules, &mut diags, "p", "Warp Drive"), TechRef::Unknown);
        assert_eq!(diags.warning_count(), 1);
    }

    #[test]
    fn short_order_lists_drop_the_orders() {
        let rules = Ruleset::classic();
        let ord = orderings(&rules);
        let mut file = SectionFile::new();
        file.insert_int("player0.u0.orders_length", 3);
        file.insert_str("player0.u0.orders_list", "mm");
        file.insert_str("player0.u0.dir_list", "86");
        file.insert_str("player0.u0.activity_list", "??");
        let mut diags = Diagnostics::default();
        assert_eq!(load_unit_orders(&file, &ord, &mut diags, "player0.u0"), None);
        assert_eq!(diags.warning_count(), 1);
    }
}
