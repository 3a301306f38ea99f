use super::SaveJob;
use crate::codec::{self, ColumnSlots};
use crate::error::{SaveError, SaveResult};
use crate::section_file::SectionFile;
use crate::state::ruleset::RIVER_SPECIAL;
use crate::state::map::NATION_SEPARATOR;
use crate::state::{Map, Tile};
use crate::types::{FlagSet, MAX_PLAYER_SLOTS};

pub(super) fn save_map(job: &mut SaveJob<'_>) -> SaveResult<()> {
    let game = job.game;
    let map = &game.map;
    if map.is_empty() {
        log::debug!("no map to save");
        return Ok(());
    }
    let rules = &game.ruleset;

    let file = &mut job.file;
    file.insert_int("map.xsize", map.xsize as i64);
    file.insert_int("map.ysize", map.ysize as i64);
    file.insert_bool("map.have_huts", map.have_huts);
    file.insert_bool("map.have_resources", map.have_resources);
    file.insert_bool("map.have_rivers_overlay", map.have_rivers_overlay);

    save_map_chars(file, map, |y| format!("map.t{y:04}"), |_, tile| {
        let name = match tile.terrain {
            None => None,
            Some(i) => Some(
                rules
                    .terrains
                    .get(i)
                    .ok_or_else(|| format!("terrain index {i} not in ruleset"))?
                    .as_str(),
            ),
        };
        codec::terrain_to_char(name).map_err(|e| e.to_string())
    })?;
    save_overrides(file, map);
    save_start_positions(file, map, &rules.nations)?;

    for column in 0..codec::column_count(rules.bases.len()) {
        let slots = codec::column_slots(column, rules.bases.len());
        save_flag_plane(file, map, &slots, |y| format!("map.b{column:02}_{y:04}"), |t| &t.bases)?;
    }
    for column in 0..codec::column_count(rules.roads.len()) {
        let slots = codec::column_slots(column, rules.roads.len());
        save_flag_plane(file, map, &slots, |y| format!("map.r{column:02}_{y:04}"), |t| &t.roads)?;
    }

    let river = rules.special_by_name(RIVER_SPECIAL);
    if map.have_resources {
        job.add_option(" specials");
        save_specials(&mut job.file, map, rules.specials.len(), None)?;
        save_map_chars(&mut job.file, map, |y| format!("map.res{y:04}"), |_, tile| {
            let name = match tile.resource {
                None => None,
                Some(i) => Some(
                    rules
                        .resources
                        .get(i)
                        .ok_or_else(|| format!("resource index {i} not in ruleset"))?
                        .as_str(),
                ),
            };
            codec::resource_to_char(name).map_err(|e| e.to_string())
        })?;
    } else if let (true, Some(river)) = (map.have_rivers_overlay, river) {
        // Rivers only, so scenarios with a rivers overlay can be re-saved.
        job.add_option(" riversoverlay");
        save_specials(&mut job.file, map, rules.specials.len(), Some(river))?;
    }

    save_owner(job)?;
    save_worked(job)?;
    save_known(job)
}

/// One fixed-width line per map row, every character printable.
fn save_map_chars(
    file: &mut SectionFile,
    map: &Map,
    path: impl Fn(usize) -> String,
    mut encode: impl FnMut((usize, usize), &Tile) -> Result<char, String>,
) -> SaveResult<()> {
    for y in 0..map.ysize {
        let key = path(y);
        let mut line = String::with_capacity(map.xsize);
        for (x, tile) in map.row(y).iter().enumerate() {
            let c = encode((x, y), tile)
                .map_err(|msg| SaveError::encoding(key.as_str(), format!("at ({x}, {y}): {msg}")))?;
            if !codec::is_printable(c) {
                return Err(SaveError::encoding(
                    key.as_str(),
                    format!("invalid map data at ({x}, {y}): {c:?}"),
                ));
            }
            line.push(c);
        }
        file.insert_str(key, line);
    }
    Ok(())
}

fn save_flag_plane(
    file: &mut SectionFile,
    map: &Map,
    slots: &ColumnSlots,
    path: impl Fn(usize) -> String,
    flags: impl Fn(&Tile) -> &FlagSet,
) -> SaveResult<()> {
    save_map_chars(file, map, path, |_, tile| Ok(codec::pack_flags(flags(tile), slots)))
}

/// Specials bit-planes. With `only` set, every other slot is left empty.
fn save_specials(
    file: &mut SectionFile,
    map: &Map,
    count: usize,
    only: Option<usize>,
) -> SaveResult<()> {
    for column in 0..codec::column_count(count) {
        let mut slots = codec::column_slots(column, count);
        if let Some(keep) = only {
            for slot in slots.iter_mut() {
                if *slot != Some(keep) {
                    *slot = None;
                }
            }
        }
        let key = |y: usize| format!("map.spe{column:02}_{y:04}");
        save_flag_plane(file, map, &slots, key, |t| &t.specials)?;
    }
    Ok(())
}

fn save_overrides(file: &mut SectionFile, map: &Map) {
    for (index, tile) in map.tiles.iter().enumerate() {
        let (x, y) = map.coords(index);
        if let Some(sprite) = &tile.spec_sprite {
            file.insert_str(format!("map.spec_sprite_{x}_{y}"), sprite.as_str());
        }
        if let Some(label) = &tile.label {
            file.insert_str(format!("map.label_{x}_{y}"), label.as_str());
        }
    }
}

fn save_start_positions(file: &mut SectionFile, map: &Map, nations: &[String]) -> SaveResult<()> {
    file.insert_int("map.startpos_count", map.start_positions.len() as i64);
    for (i, sp) in map.start_positions.iter().enumerate() {
        file.insert_int(format!("map.startpos{i}.x"), sp.x as i64);
        file.insert_int(format!("map.startpos{i}.y"), sp.y as i64);
        file.insert_bool(format!("map.startpos{i}.exclude"), sp.exclude);
        let names = sp
            .nations
            .iter()
            .map(|&n| {
                nations.get(n).map(String::as_str).ok_or_else(|| {
                    SaveError::encoding(
                        format!("map.startpos{i}.nations"),
                        format!("nation index {n} not in ruleset"),
                    )
                })
            })
            .collect::<SaveResult<Vec<_>>>()?;
        file.insert_str(format!("map.startpos{i}.nations"), names.join(NATION_SEPARATOR));
    }
    Ok(())
}

/// Comma-separated token line, `-` for none.
fn token_line<T: ToString>(tiles: &[Tile], token: impl Fn(&Tile) -> Option<T>) -> String {
    tiles
        .iter()
        .map(|t| token(t).map_or_else(|| "-".to_string(), |v| v.to_string()))
        .collect::<Vec<_>>()
        .join(",")
}

fn save_owner(job: &mut SaveJob<'_>) -> SaveResult<()> {
    if job.ctx.scenario && !job.ctx.save_players {
        return Ok(());
    }
    let map = &job.game.map;
    let save_players = job.ctx.save_players;
    for y in 0..map.ysize {
        let line = token_line(map.row(y), |t| t.owner.filter(|_| save_players));
        job.file.insert_str(format!("map.owner{y:04}"), line);
    }
    for y in 0..map.ysize {
        let line = token_line(map.row(y), |t| t.claimer);
        job.file.insert_str(format!("map.source{y:04}"), line);
    }
    Ok(())
}

fn save_worked(job: &mut SaveJob<'_>) -> SaveResult<()> {
    if job.ctx.scenario && !job.ctx.save_players {
        return Ok(());
    }
    let map = &job.game.map;
    for y in 0..map.ysize {
        let line = token_line(map.row(y), |t| t.worked);
        job.file.insert_str(format!("map.worked{y:04}"), line);
    }
    Ok(())
}

/// Known bits, 32 player slots per bank, one nybble column per 4 slots.
/// A column is written only when one of its slots is in use.
fn save_known(job: &mut SaveJob<'_>) -> SaveResult<()> {
    if !job.ctx.save_players {
        job.file.insert_bool("game.save_known", false);
        return Ok(());
    }
    job.file.insert_bool("game.save_known", true);

    let game = job.game;
    let used: FlagSet = game.players.iter().map(|p| p.number).collect();
    let max_used = game.players.iter().map(|p| p.number).max().unwrap_or(0);
    if max_used >= MAX_PLAYER_SLOTS {
        return Err(SaveError::encoding(
            "map.k",
            format!("player slot {max_used} exceeds {MAX_PLAYER_SLOTS} slots"),
        ));
    }
    let banks = max_used / 32 + 1;
    for bank in 0..banks {
        for halfbyte in 0..8 {
            let first = bank * 32 + halfbyte * 4;
            if !(first..first + 4).any(|slot| used.contains(slot)) {
                continue;
            }
            let column = bank * 8 + halfbyte;
            let key = |y: usize| format!("map.k{column:02}_{y:04}");
            save_map_chars(&mut job.file, &game.map, key, |_, tile| {
                Ok(codec::nybble_char(tile.known.bank(bank), halfbyte))
            })?;
        }
    }
    Ok(())
}
