use super::{bit_string, SaveJob};
use crate::codec::{self, OrderKind};
use crate::error::{SaveError, SaveResult};
use crate::section_file::SectionFile;
use crate::state::player::NUM_SS_STRUCTURALS;
use crate::state::ruleset::A_NONE;
use crate::state::{
    ActivityTarget, City, GameState, Player, Production, Ruleset, SpaceshipState, TechRef, Trait,
    Unit,
};
use crate::types::{PlayerId, TileIndex, UnitId};
use std::collections::{BTreeMap, BTreeSet};

/// Characters per attribute block part; a multiple of 3 so byte triples
/// stay aligned.
pub(crate) const PART_SIZE: usize = 3 * 256;
const PART_ADJUST: usize = 3;

pub(super) fn save_players(job: &mut SaveJob<'_>) -> SaveResult<()> {
    if !job.ctx.save_players {
        log::debug!("players not saved (scenario without players or game not started)");
        return Ok(());
    }
    let game = job.game;
    let rules = &game.ruleset;
    let file = &mut job.file;

    file.insert_int("players.nplayers", game.players.len() as i64);
    file.insert_str(
        "players.destroyed_wonders",
        bit_string(rules.improvements.len(), |i| {
            rules.improvements[i].is_great_wonder() && game.info.destroyed_wonders.contains(&i)
        }),
    );
    file.insert_int("players.identity_number_used", game.info.identity_number_used);
    for (i, number) in game.shuffled_players.iter().enumerate() {
        file.insert_int(format!("players.shuffled_player_{i}"), *number as i64);
    }

    let ordering = UnitOrdering::calc(game);
    for player in &game.players {
        save_player_main(file, game, player)?;
        save_player_cities(file, game, player)?;
        save_player_units(file, game, player, &ordering)?;
        save_player_attributes(file, player);
    }
    Ok(())
}

/// Look up a ruleset name or fail naming the path being written.
fn rule_name<'r>(
    list: &'r [String],
    index: usize,
    path: &str,
    domain: &str,
) -> SaveResult<&'r str> {
    list.get(index)
        .map(String::as_str)
        .ok_or_else(|| SaveError::encoding(path, format!("{domain} index {index} not in ruleset")))
}

fn technology_name<'r>(rules: &'r Ruleset, tech: TechRef, path: &str) -> SaveResult<&'r str> {
    Ok(match tech {
        TechRef::Unknown => "",
        TechRef::None => A_NONE,
        TechRef::Unset => "A_UNSET",
        TechRef::Future => "A_FUTURE",
        TechRef::Advance(i) => rule_name(&rules.technologies, i, path, "technology")?,
    })
}

fn production_name<'r>(
    rules: &'r Ruleset,
    production: Production,
    path: &str,
) -> SaveResult<&'r str> {
    match production {
        Production::Building(i) => rules
            .improvements
            .get(i)
            .map(|b| b.name.as_str())
            .ok_or_else(|| {
                SaveError::encoding(path, format!("improvement index {i} not in ruleset"))
            }),
        Production::Unit(i) => rule_name(&rules.unit_types, i, path, "unit type"),
    }
}

fn save_player_main(file: &mut SectionFile, game: &GameState, plr: &Player) -> SaveResult<()> {
    let rules = &game.ruleset;
    let p = format!("player{}", plr.number);

    file.insert_str(format!("{p}.ai_type"), plr.ai_type.as_str());
    file.insert_str(format!("{p}.name"), plr.name.as_str());
    file.insert_str(format!("{p}.username"), plr.username.as_str());
    match plr.color {
        Some(rgb) => {
            file.insert_int(format!("{p}.color.r"), i64::from(rgb.r));
            file.insert_int(format!("{p}.color.g"), i64::from(rgb.g));
            file.insert_int(format!("{p}.color.b"), i64::from(rgb.b));
        }
        None if game.info.has_started() => {
            log::warn!("game has started, yet player {} has no color defined", plr.number);
        }
        None => {}
    }
    file.insert_str(format!("{p}.ranked_username"), plr.ranked_username.as_str());
    file.insert_str(
        format!("{p}.delegation_username"),
        plr.delegation_username.as_deref().unwrap_or(""),
    );
    let path = format!("{p}.nation");
    file.insert_str(path.as_str(), rule_name(&rules.nations, plr.nation, &path, "nation")?);
    file.insert_int(format!("{p}.team_no"), plr.team.map_or(-1, |t| t as i64));

    let path = format!("{p}.government_name");
    let government = rule_name(&rules.governments, plr.government, &path, "government")?;
    file.insert_str(path.as_str(), government);
    if let Some(target) = plr.target_government {
        let path = format!("{p}.target_government_name");
        file.insert_str(path.as_str(), rule_name(&rules.governments, target, &path, "government")?);
    }
    let path = format!("{p}.city_style_by_name");
    let style = rule_name(&rules.city_styles, plr.city_style, &path, "city style")?;
    file.insert_str(path.as_str(), style);

    file.insert_bool(format!("{p}.is_male"), plr.is_male);
    file.insert_bool(format!("{p}.is_alive"), plr.is_alive);
    file.insert_bool(format!("{p}.ai.control"), plr.ai_controlled);

    for other in &game.players {
        let ds = plr.diplstates.get(&other.number).copied().unwrap_or_default();
        let d = format!("{p}.diplstate{}", other.number);
        file.insert_int(format!("{d}.type"), ds.kind);
        file.insert_int(format!("{d}.max_state"), ds.max_state);
        file.insert_int(format!("{d}.first_contact_turn"), i64::from(ds.first_contact_turn));
        file.insert_int(format!("{d}.turns_left"), ds.turns_left);
        file.insert_int(format!("{d}.has_reason_to_cancel"), ds.has_reason_to_cancel);
        file.insert_int(format!("{d}.contact_turns_left"), ds.contact_turns_left);
        file.insert_bool(format!("{d}.embassy"), ds.embassy);
        file.insert_bool(format!("{d}.gives_shared_vision"), ds.gives_shared_vision);
    }
    for other in &game.players {
        let love = plr.love.get(&other.number).copied().unwrap_or(0);
        file.insert_int(format!("{p}.ai{}.love", other.number), love);
    }

    file.insert_int(format!("{p}.ai.skill_level"), plr.ai_skill_level);
    file.insert_int(format!("{p}.ai.is_barbarian"), plr.barbarian_type);
    file.insert_int(format!("{p}.gold"), plr.gold);
    file.insert_int(format!("{p}.rates.tax"), plr.tax);
    file.insert_int(format!("{p}.rates.science"), plr.science);
    file.insert_int(format!("{p}.rates.luxury"), plr.luxury);

    let r = &plr.research;
    for (key, tech) in [("goal", r.goal), ("saved", r.researching_saved), ("now", r.researching)] {
        let path = format!("{p}.research.{key}_name");
        file.insert_str(path.as_str(), technology_name(rules, tech, &path)?);
    }
    file.insert_int(format!("{p}.research.bulbs_last_turn"), r.bulbs_last_turn);
    file.insert_int(format!("{p}.research.techs"), r.techs_researched);
    file.insert_int(format!("{p}.research.futuretech"), r.future_tech);
    file.insert_int(format!("{p}.research.bulbs_before"), r.bulbs_researching_saved);
    file.insert_int(format!("{p}.research.bulbs"), r.bulbs_researched);
    file.insert_bool(format!("{p}.research.got_tech"), r.got_tech);
    file.insert_str(
        format!("{p}.research.done"),
        bit_string(rules.technologies.len(), |i| r.known.contains(&i)),
    );

    for t in Trait::ALL {
        file.insert_int(format!("{p}.trait.mod{}", t.index()), plr.traits[t.index()]);
    }

    // Called 'capital' in the savefile for historical reasons.
    file.insert_bool(format!("{p}.capital"), plr.got_first_city);
    file.insert_int(format!("{p}.revolution_finishes"), plr.revolution_finishes);
    file.insert_int(format!("{p}.units_built"), plr.units_built);
    file.insert_int(format!("{p}.units_killed"), plr.units_killed);
    file.insert_int(format!("{p}.units_lost"), plr.units_lost);

    let ship = &plr.spaceship;
    file.insert_int(format!("{p}.spaceship.state"), ship.state.to_int());
    if ship.state != SpaceshipState::None {
        let s = format!("{p}.spaceship");
        file.insert_int(format!("{s}.structurals"), ship.structurals);
        file.insert_int(format!("{s}.components"), ship.components);
        file.insert_int(format!("{s}.modules"), ship.modules);
        file.insert_int(format!("{s}.fuel"), ship.fuel);
        file.insert_int(format!("{s}.propulsion"), ship.propulsion);
        file.insert_int(format!("{s}.habitation"), ship.habitation);
        file.insert_int(format!("{s}.life_support"), ship.life_support);
        file.insert_int(format!("{s}.solar_panels"), ship.solar_panels);
        file.insert_str(
            format!("{s}.structure"),
            bit_string(NUM_SS_STRUCTURALS, |i| ship.structure.contains(i)),
        );
        if ship.state >= SpaceshipState::Launched {
            file.insert_int(format!("{s}.launch_year"), ship.launch_year);
        }
    }

    file.insert_str(
        format!("{p}.lost_wonders"),
        bit_string(rules.improvements.len(), |i| {
            rules.improvements[i].is_wonder() && plr.lost_wonders.contains(&i)
        }),
    );
    Ok(())
}

fn save_player_cities(file: &mut SectionFile, game: &GameState, plr: &Player) -> SaveResult<()> {
    let p = format!("player{}", plr.number);
    file.insert_int(format!("{p}.ncities"), plr.cities.len() as i64);

    let wlist_max_length = plr.cities.iter().map(|c| c.worklist.len()).max().unwrap_or(0);
    let nations: BTreeSet<PlayerId> = if game.info.citizen_nationality {
        plr.cities
            .iter()
            .flat_map(|c| c.citizens.iter().filter(|(_, n)| **n != 0).map(|(slot, _)| *slot))
            .collect()
    } else {
        BTreeSet::new()
    };

    for (i, city) in plr.cities.iter().enumerate() {
        let c = format!("{p}.c{i}");
        save_city(file, game, city, &c, wlist_max_length)?;
        for slot in &nations {
            let count = city.citizens.get(slot).copied().unwrap_or(0);
            file.insert_int(format!("{c}.citizen{slot}"), count);
        }
    }
    Ok(())
}

fn save_city(
    file: &mut SectionFile,
    game: &GameState,
    city: &City,
    c: &str,
    wlist_max_length: usize,
) -> SaveResult<()> {
    let rules = &game.ruleset;
    file.insert_int(format!("{c}.y"), city.y as i64);
    file.insert_int(format!("{c}.x"), city.x as i64);
    file.insert_int(format!("{c}.id"), i64::from(city.id));
    file.insert_int(format!("{c}.original"), city.original as i64);
    file.insert_int(format!("{c}.size"), city.size);
    for (sp, name) in rules.specialists.iter().enumerate() {
        let count = city.specialists.get(sp).copied().unwrap_or(0);
        file.insert_int(format!("{c}.n{name}"), count);
    }
    for j in 0..rules.trade_routes {
        let route = city.trade_routes.get(j).copied().unwrap_or(0);
        file.insert_int(format!("{c}.traderoute{j}"), route);
    }
    file.insert_int(format!("{c}.food_stock"), city.food_stock);
    file.insert_int(format!("{c}.shield_stock"), city.shield_stock);
    file.insert_int(format!("{c}.airlift"), city.airlift);
    file.insert_bool(format!("{c}.was_happy"), city.was_happy);
    file.insert_int(format!("{c}.turn_plague"), city.turn_plague);
    file.insert_int(format!("{c}.anarchy"), city.anarchy);
    file.insert_int(format!("{c}.rapture"), city.rapture);
    file.insert_int(format!("{c}.steal"), city.steal);
    file.insert_int(format!("{c}.turn_founded"), i64::from(city.turn_founded));
    // A city founded this turn is stored as -1.
    let did_buy = if city.turn_founded == game.info.turn {
        -1
    } else {
        i64::from(city.did_buy)
    };
    file.insert_int(format!("{c}.did_buy"), did_buy);
    file.insert_bool(format!("{c}.did_sell"), city.did_sell);
    file.insert_int(format!("{c}.turn_last_built"), i64::from(city.turn_last_built));
    file.insert_str(format!("{c}.name"), city.name.as_str());

    let productions = [
        ("currently_building", city.production),
        ("changed_from", city.changed_from),
    ];
    for (key, production) in productions {
        let path = format!("{c}.{key}_name");
        file.insert_str(format!("{c}.{key}_kind"), production.kind_name());
        file.insert_str(path.as_str(), production_name(rules, production, &path)?);
    }

    file.insert_int(format!("{c}.before_change_shields"), city.before_change_shields);
    file.insert_int(format!("{c}.caravan_shields"), city.caravan_shields);
    file.insert_int(format!("{c}.disbanded_shields"), city.disbanded_shields);
    file.insert_int(format!("{c}.last_turns_shield_surplus"), city.last_turns_shield_surplus);
    file.insert_int(format!("{c}.city_radius_sq"), city.radius_sq);
    file.insert_str(
        format!("{c}.improvements"),
        bit_string(rules.improvements.len(), |i| city.improvements.contains(&i)),
    );

    save_worklist(file, rules, city, c, wlist_max_length)?;

    for j in 0..rules.city_options {
        file.insert_bool(format!("{c}.option{j}"), city.options.contains(j));
    }
    Ok(())
}

/// Worklist padded with empty entries to `max_length`, so every city of
/// the player has the same columns.
fn save_worklist(
    file: &mut SectionFile,
    rules: &Ruleset,
    city: &City,
    c: &str,
    max_length: usize,
) -> SaveResult<()> {
    file.insert_int(format!("{c}.wl_length"), city.worklist.len() as i64);
    for (i, entry) in city.worklist.iter().enumerate() {
        let path = format!("{c}.wl_value{i}");
        file.insert_str(format!("{c}.wl_kind{i}"), entry.kind_name());
        file.insert_str(path.as_str(), production_name(rules, *entry, &path)?);
    }
    for i in city.worklist.len()..max_length {
        file.insert_str(format!("{c}.wl_kind{i}"), "");
        file.insert_str(format!("{c}.wl_value{i}"), "");
    }
    Ok(())
}

/// Position of every unit in its tile's stack and in its home city's
/// supported list.
struct UnitOrdering {
    ord_map: BTreeMap<UnitId, i64>,
    ord_city: BTreeMap<UnitId, i64>,
}

impl UnitOrdering {
    fn calc(game: &GameState) -> Self {
        let mut ord_map = BTreeMap::new();
        let mut ord_city = BTreeMap::new();
        let mut per_tile: BTreeMap<TileIndex, i64> = BTreeMap::new();
        for plr in &game.players {
            for city in &plr.cities {
                let supported = plr.units.iter().filter(|u| u.homecity == Some(city.id));
                for (j, unit) in supported.enumerate() {
                    ord_city.insert(unit.id, j as i64);
                }
            }
            for unit in &plr.units {
                let tile = game.map.index(unit.x, unit.y).unwrap_or(usize::MAX);
                let slot = per_tile.entry(tile).or_insert(0);
                ord_map.insert(unit.id, *slot);
                *slot += 1;
            }
        }
        Self { ord_map, ord_city }
    }
}

fn target_fields(target: ActivityTarget, specials_count: usize) -> (i64, i64, i64) {
    let mut special = specials_count as i64;
    let mut base = -1;
    let mut road = -1;
    match target {
        ActivityTarget::None => {}
        ActivityTarget::Special(s) => special = s as i64,
        ActivityTarget::Base(b) => base = b as i64,
        ActivityTarget::Road(r) => road = r as i64,
    }
    (special, base, road)
}

fn save_player_units(
    file: &mut SectionFile,
    game: &GameState,
    plr: &Player,
    ordering: &UnitOrdering,
) -> SaveResult<()> {
    let rules = &game.ruleset;
    let p = format!("player{}", plr.number);
    file.insert_int(format!("{p}.nunits"), plr.units.len() as i64);

    for (i, unit) in plr.units.iter().enumerate() {
        let u = format!("{p}.u{i}");
        file.insert_int(format!("{u}.id"), i64::from(unit.id));
        file.insert_int(format!("{u}.x"), unit.x as i64);
        file.insert_int(format!("{u}.y"), unit.y as i64);
        file.insert_str(format!("{u}.facing"), unit.facing.to_char().to_string());
        if game.info.citizen_nationality {
            file.insert_int(format!("{u}.nationality"), unit.nationality as i64);
        }
        file.insert_int(format!("{u}.veteran"), unit.veteran);
        file.insert_int(format!("{u}.hp"), unit.hp);
        file.insert_int(format!("{u}.homecity"), unit.homecity.map_or(0, i64::from));
        let path = format!("{u}.type_by_name");
        let type_name = rule_name(&rules.unit_types, unit.unit_type, &path, "unit type")?;
        file.insert_str(path.as_str(), type_name);

        file.insert_int(format!("{u}.activity"), unit.activity.index() as i64);
        file.insert_int(format!("{u}.activity_count"), unit.activity_count);
        let (special, base, road) = target_fields(unit.activity_target, rules.specials.len());
        file.insert_int(format!("{u}.activity_target"), special);
        file.insert_int(format!("{u}.activity_base"), base);
        file.insert_int(format!("{u}.activity_road"), road);
        file.insert_int(format!("{u}.changed_from"), unit.changed_from.index() as i64);
        file.insert_int(format!("{u}.changed_from_count"), unit.changed_from_count);
        let (special, base, road) = target_fields(unit.changed_from_target, rules.specials.len());
        file.insert_int(format!("{u}.changed_from_target"), special);
        file.insert_int(format!("{u}.changed_from_base"), base);
        file.insert_int(format!("{u}.changed_from_road"), road);

        file.insert_bool(format!("{u}.done_moving"), unit.done_moving);
        file.insert_int(format!("{u}.moves"), unit.moves_left);
        file.insert_int(format!("{u}.fuel"), unit.fuel);
        file.insert_int(format!("{u}.born"), i64::from(unit.birth_turn));
        file.insert_int(format!("{u}.battlegroup"), unit.battlegroup);

        let (go, goto_x, goto_y) = match unit.goto_tile {
            Some((x, y)) => (true, x as i64, y as i64),
            None => (false, 0, 0),
        };
        file.insert_bool(format!("{u}.go"), go);
        file.insert_int(format!("{u}.goto_x"), goto_x);
        file.insert_int(format!("{u}.goto_y"), goto_y);
        file.insert_bool(format!("{u}.ai"), unit.ai_controlled);

        let ord_map = ordering.ord_map.get(&unit.id).copied().unwrap_or(0);
        let ord_city = ordering.ord_city.get(&unit.id).copied().unwrap_or(0);
        file.insert_int(format!("{u}.ord_map"), ord_map);
        file.insert_int(format!("{u}.ord_city"), ord_city);
        file.insert_bool(format!("{u}.moved"), unit.moved);
        file.insert_bool(format!("{u}.paradropped"), unit.paradropped);
        file.insert_int(format!("{u}.transported_by"), unit.transported_by.map_or(-1, i64::from));

        save_unit_orders(file, unit, &u)?;
    }
    Ok(())
}

/// An order missing the field its kind needs cannot be encoded.
fn save_unit_orders(file: &mut SectionFile, unit: &Unit, u: &str) -> SaveResult<()> {
    let Some(orders) = &unit.orders else {
        // Same fields as a unit with orders, so the unit table stays
        // rectangular.
        file.insert_int(format!("{u}.orders_length"), 0);
        file.insert_int(format!("{u}.orders_index"), 0);
        file.insert_bool(format!("{u}.orders_repeat"), false);
        file.insert_bool(format!("{u}.orders_vigilant"), false);
        file.insert_bool(format!("{u}.orders_last_move_safe"), false);
        for list in ["orders_list", "dir_list", "activity_list", "base_list", "road_list"] {
            file.insert_str(format!("{u}.{list}"), "-");
        }
        return Ok(());
    };

    file.insert_int(format!("{u}.orders_length"), orders.list.len() as i64);
    file.insert_int(format!("{u}.orders_index"), orders.index as i64);
    file.insert_bool(format!("{u}.orders_repeat"), orders.repeat);
    file.insert_bool(format!("{u}.orders_vigilant"), orders.vigilant);
    file.insert_bool(format!("{u}.orders_last_move_safe"), orders.last_move_safe);

    let mut order_buf = String::new();
    let mut dir_buf = String::new();
    let mut act_buf = String::new();
    let mut base_buf = String::new();
    let mut road_buf = String::new();
    for (j, order) in orders.list.iter().enumerate() {
        order_buf.push(order.kind.to_char());
        let mut dir = '?';
        let mut act = '?';
        let mut base = '?';
        let mut road = '?';
        match order.kind {
            OrderKind::Move => {
                let d = order.dir.ok_or_else(|| {
                    SaveError::encoding(
                        format!("{u}.dir_list"),
                        format!("move order {j} has no direction"),
                    )
                })?;
                dir = d.to_char();
            }
            OrderKind::Activity => {
                let a = order.activity.ok_or_else(|| {
                    SaveError::encoding(
                        format!("{u}.activity_list"),
                        format!("activity order {j} has no activity"),
                    )
                })?;
                act = a.to_char();
                if let Some(b) = order.base {
                    base = codec::num_to_char(b);
                }
                if let Some(r) = order.road {
                    road = codec::num_to_char(r);
                }
            }
            OrderKind::FullMp
            | OrderKind::BuildCity
            | OrderKind::Disband
            | OrderKind::BuildWonder
            | OrderKind::TradeRoute
            | OrderKind::Homecity => {}
        }
        dir_buf.push(dir);
        act_buf.push(act);
        base_buf.push(base);
        road_buf.push(road);
    }
    file.insert_str(format!("{u}.orders_list"), order_buf);
    file.insert_str(format!("{u}.dir_list"), dir_buf);
    file.insert_str(format!("{u}.activity_list"), act_buf);
    file.insert_str(format!("{u}.base_list"), base_buf);
    file.insert_str(format!("{u}.road_list"), road_buf);
    Ok(())
}

/// Client attribute data, quoted and split into parts of [`PART_SIZE`]
/// characters. The first part absorbs the length prefix's misalignment.
fn save_player_attributes(file: &mut SectionFile, plr: &Player) {
    let Some(data) = &plr.attribute_block else { return };
    let p = format!("player{}", plr.number);
    let quoted = codec::quote_block(data);
    let total = quoted.len();
    let bytes_at_colon = quoted.find(':').map_or(0, |i| i + 1);
    let adjust = bytes_at_colon % PART_ADJUST;

    file.insert_int(format!("{p}.attribute_v2_block_length"), data.len() as i64);
    file.insert_int(format!("{p}.attribute_v2_block_length_quoted"), total as i64);

    let parts = if total - adjust > PART_SIZE {
        1 + (total - adjust - 1) / PART_SIZE
    } else {
        1
    };
    file.insert_int(format!("{p}.attribute_v2_block_parts"), parts as i64);

    let mut rest = quoted.as_str();
    let mut part_nr = 0;
    if parts > 1 {
        let (first, tail) = rest.split_at(PART_SIZE + adjust);
        file.insert_str(format!("{p}.attribute_v2_block_data.part0"), first);
        rest = tail;
        part_nr = 1;
    }
    for nr in part_nr..parts {
        let (part, tail) = rest.split_at(rest.len().min(PART_SIZE));
        file.insert_str(format!("{p}.attribute_v2_block_data.part{nr}"), part);
        rest = tail;
    }
    debug_assert!(rest.is_empty());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Order, Player, UnitOrders};

    #[test]
    fn attribute_parts_keep_triples_aligned() {
        let mut plr = Player::new(0, "Caesar");
        plr.attribute_block = Some((0..=255u8).cycle().take(600).collect());
        let mut file = SectionFile::new();
        save_player_attributes(&mut file, &plr);

        let quoted_len =
            file.lookup_int("player0.attribute_v2_block_length_quoted").unwrap() as usize;
        // "600:" plus three characters per byte.
        assert_eq!(quoted_len, 4 + 3 * 600);
        let parts = file.lookup_int("player0.attribute_v2_block_parts").unwrap() as usize;
        assert_eq!(parts, 3);
        let first = file.lookup_str("player0.attribute_v2_block_data.part0").unwrap();
        assert_eq!(first.len(), PART_SIZE + 1);
        let joined: String = (0..parts)
            .map(|i| file.lookup_str(&format!("player0.attribute_v2_block_data.part{i}")).unwrap())
            .collect();
        assert_eq!(joined.len(), quoted_len);
    }

    #[test]
    fn order_without_its_field_fails_to_encode() {
        let mut unit = Unit::new(7, 0, 0, 0, 0);
        unit.orders = Some(UnitOrders {
            index: 0,
            repeat: false,
            vigilant: false,
            last_move_safe: false,
            list: vec![
                Order::activity(crate::codec::Activity::Mine),
                Order::simple(OrderKind::Move),
            ],
        });
        let mut file = SectionFile::new();
        let err = save_unit_orders(&mut file, &unit, "player0.u0").unwrap_err();
        assert!(
            matches!(&err, SaveError::Encoding { layer, .. } if layer == "player0.u0.dir_list")
        );
        assert!(err.to_string().contains("move order 1"));

        unit.orders.as_mut().unwrap().list[1] = Order::simple(OrderKind::Activity);
        assert!(save_unit_orders(&mut SectionFile::new(), &unit, "player0.u0").is_err());
    }

    #[test]
    fn activity_targets_use_sentinels() {
        assert_eq!(target_fields(ActivityTarget::None, 7), (7, -1, -1));
        assert_eq!(target_fields(ActivityTarget::Special(2), 7), (2, -1, -1));
        assert_eq!(target_fields(ActivityTarget::Road(1), 7), (7, -1, 1));
    }
}
