use super::LoadJob;
use crate::codec::{self, Resource, Terrain, RESOURCE_NONE_CHAR, TERRAIN_UNKNOWN_CHAR};
use crate::context::{Diagnostics, LoadContext, Ordering};
use crate::error::{SaveError, SaveResult};
use crate::section_file::SectionFile;
use crate::state::map::{MAX_LINEAR_SIZE, MAX_TILES, NATION_SEPARATOR};
use crate::state::{Map, Ruleset, StartPos, Tile};
use crate::types::{FlagSet, MAX_PLAYER_SLOTS};

const STAGE: &str = "map";

pub(super) fn load_map(job: &mut LoadJob) -> SaveResult<()> {
    let LoadJob { file, game, ctx } = job;
    let Some((xsize, ysize)) = map_dimensions(file)? else {
        log::debug!("savefile has no map");
        return Ok(());
    };
    let rules = &game.ruleset;
    let mut map = Map::new(xsize, ysize);
    map.have_huts = file.lookup_bool_or("map.have_huts", false);
    map.have_resources = file.lookup_bool_or("map.have_resources", ctx.has_option("specials"));
    map.have_rivers_overlay =
        file.lookup_bool_or("map.have_rivers_overlay", ctx.has_option("riversoverlay"));
    let has_specials = ctx.has_option("specials") || ctx.has_option("riversoverlay");
    let has_resources = ctx.has_option("specials");
    let save_known = ctx.save_known;

    {
        let (orderings, diagnostics) = ctx.orderings_and_diagnostics()?;

        load_map_chars(file, &mut map, diagnostics, |y| format!("map.t{y:04}"), |tile, c| {
            tile.terrain = decode_terrain(rules, c)?;
            Ok(())
        });
        load_overrides(file, &mut map);
        load_start_positions(file, &mut map, rules, diagnostics);

        load_flag_planes(file, &mut map, diagnostics, &orderings.bases, "b", |t| &mut t.bases);
        load_flag_planes(file, &mut map, diagnostics, &orderings.roads, "r", |t| &mut t.roads);
        if has_specials {
            let specials = &orderings.specials;
            load_flag_planes(file, &mut map, diagnostics, specials, "spe", |t| &mut t.specials);
        }
        if has_resources {
            load_map_chars(file, &mut map, diagnostics, |y| format!("map.res{y:04}"), |tile, c| {
                tile.resource = decode_resource(rules, c)?;
                Ok(())
            });
        }

        load_owner(file, &mut map, diagnostics);
        if save_known {
            load_known(file, &mut map, diagnostics);
        }
    }

    load_worked(file, &map, ctx);
    game.map = map;
    Ok(())
}

/// `map.xsize`/`map.ysize`, or the terrain rows when those are missing.
/// `None` when the file has no map; a map too large to hold is structural.
pub(crate) fn map_dimensions(file: &SectionFile) -> SaveResult<Option<(usize, usize)>> {
    let (xsize, ysize) = match (file.lookup_int("map.xsize"), file.lookup_int("map.ysize")) {
        (Some(x), Some(y)) => {
            let side = |v: i64, path: &str| {
                usize::try_from(v)
                    .ok()
                    .filter(|v| *v <= MAX_LINEAR_SIZE)
                    .ok_or_else(|| {
                        SaveError::structural(path, format!("{v} outside 0..={MAX_LINEAR_SIZE}"))
                    })
            };
            (side(x, "map.xsize")?, side(y, "map.ysize")?)
        }
        _ => {
            let mut ysize = 0;
            let mut xsize = 0;
            while let Some(row) = file.lookup_str(&format!("map.t{ysize:04}")) {
                xsize = xsize.max(row.chars().count());
                ysize += 1;
            }
            (xsize, ysize)
        }
    };
    if xsize == 0 || ysize == 0 {
        return Ok(None);
    }
    match xsize.checked_mul(ysize) {
        Some(tiles) if tiles <= MAX_TILES => Ok(Some((xsize, ysize))),
        _ => Err(SaveError::structural(
            "map",
            format!("{xsize}x{ysize} map exceeds {MAX_TILES} tiles"),
        )),
    }
}

/// Read one character per tile from one line per row.
///
/// A missing or short row leaves the remaining tiles at their default and
/// warns once for the whole layer. A character `set` rejects is skipped
/// the same way.
fn load_map_chars(
    file: &SectionFile,
    map: &mut Map,
    diagnostics: &mut Diagnostics,
    path: impl Fn(usize) -> String,
    mut set: impl FnMut(&mut Tile, char) -> Result<(), String>,
) {
    let layer = path(0);
    let xsize = map.xsize;
    for y in 0..map.ysize {
        let key = path(y);
        let Some(line) = file.lookup_str(&key) else {
            let message = format!("line '{key}' not found; map data incomplete");
            diagnostics.warn_once(STAGE, &layer, message);
            continue;
        };
        let len = line.chars().count();
        if len != xsize {
            diagnostics.warn_once(
                STAGE,
                &layer,
                format!("line '{key}' has {len} characters, expected {xsize}; map data incomplete"),
            );
        }
        for (x, c) in line.chars().take(xsize).enumerate() {
            let Some(index) = map.index(x, y) else { continue };
            if let Err(msg) = set(&mut map.tiles[index], c) {
                let message = format!("{key} at ({x}, {y}): {msg}");
                diagnostics.warn_once(STAGE, &format!("{layer}:{msg}"), message);
            }
        }
    }
}

fn decode_terrain(rules: &Ruleset, c: char) -> Result<Option<usize>, String> {
    if c == TERRAIN_UNKNOWN_CHAR {
        return Ok(None);
    }
    let terrain = Terrain::from_char(c).map_err(|e| e.to_string())?;
    rules
        .terrain_by_name(terrain.rule_name())
        .map(Some)
        .ok_or_else(|| format!("terrain '{}' not in ruleset", terrain.rule_name()))
}

fn decode_resource(rules: &Ruleset, c: char) -> Result<Option<usize>, String> {
    if c == RESOURCE_NONE_CHAR {
        return Ok(None);
    }
    let resource = Resource::from_char(c).map_err(|e| e.to_string())?;
    rules
        .resource_by_name(resource.rule_name())
        .map(Some)
        .ok_or_else(|| format!("resource '{}' not in ruleset", resource.rule_name()))
}

/// Bit-planes `map.<prefix>NN_YYYY` of one domain, translated through the
/// file's ordering for that domain.
fn load_flag_planes(
    file: &SectionFile,
    map: &mut Map,
    diagnostics: &mut Diagnostics,
    ordering: &Ordering,
    prefix: &str,
    flags: impl Fn(&mut Tile) -> &mut FlagSet,
) {
    for column in 0..codec::column_count(ordering.len()) {
        let slots = codec::column_slots(column, ordering.len());
        let path = |y: usize| format!("map.{prefix}{column:02}_{y:04}");
        load_map_chars(file, map, diagnostics, path, |tile, c| {
            let mut in_file = FlagSet::new();
            codec::unpack_flags(c, &slots, &mut in_file).map_err(|e| e.to_string())?;
            let target = flags(tile);
            for running in ordering.remap(in_file.iter()) {
                target.insert(running);
            }
            Ok(())
        });
    }
}

fn load_overrides(file: &SectionFile, map: &mut Map) {
    for index in 0..map.tiles.len() {
        let (x, y) = map.coords(index);
        let tile = &mut map.tiles[index];
        tile.spec_sprite = file.lookup_str(&format!("map.spec_sprite_{x}_{y}")).map(str::to_string);
        tile.label = file.lookup_str(&format!("map.label_{x}_{y}")).map(str::to_string);
    }
}

fn load_start_positions(
    file: &SectionFile,
    map: &mut Map,
    rules: &Ruleset,
    diagnostics: &mut Diagnostics,
) {
    let limit = file.section_len("map");
    let count = file.lookup_count("map.startpos_count", limit).unwrap_or_else(|e| {
        diagnostics.warn(STAGE, format!("{e}; start positions dropped"));
        0
    });
    for i in 0..count {
        let sp = format!("map.startpos{i}");
        let coords = (file.lookup_int(&format!("{sp}.x")), file.lookup_int(&format!("{sp}.y")));
        let (Some(x), Some(y)) = coords else {
            diagnostics.warn(STAGE, format!("start position {i} has no coordinates"));
            continue;
        };
        let on_map = usize::try_from(x)
            .ok()
            .zip(usize::try_from(y).ok())
            .filter(|&(x, y)| map.index(x, y).is_some());
        let Some((x, y)) = on_map else {
            diagnostics.warn(STAGE, format!("start position {i} ({x}, {y}) is off the map"));
            continue;
        };
        let mut nations = Vec::new();
        for name in file
            .lookup_str_or(&format!("{sp}.nations"), "")
            .split(NATION_SEPARATOR)
            .filter(|n| !n.is_empty())
        {
            match rules.nation_by_name(name) {
                Some(n) => nations.push(n),
                None => {
                    diagnostics.warn(STAGE, format!("start position {i}: unknown nation '{name}'"))
                }
            }
        }
        map.start_positions.push(StartPos {
            x,
            y,
            exclude: file.lookup_bool_or(&format!("{sp}.exclude"), false),
            nations,
        });
    }
}

/// Tokens of one comma-separated row, `None` for `-`. Rows with the wrong
/// token count or unreadable tokens warn once per layer.
fn load_token_rows(
    file: &SectionFile,
    map: &Map,
    diagnostics: &mut Diagnostics,
    layer: &str,
    mut each: impl FnMut(usize, Option<u64>),
) {
    for y in 0..map.ysize {
        let key = format!("{layer}{y:04}");
        let Some(line) = file.lookup_str(&key) else {
            diagnostics.warn_once(STAGE, layer, format!("line '{key}' not found"));
            continue;
        };
        let tokens: Vec<&str> = line.split(',').map(str::trim).filter(|t| !t.is_empty()).collect();
        if tokens.len() != map.xsize {
            diagnostics.warn_once(
                STAGE,
                layer,
                format!("line '{key}' has {} tokens, expected {}", tokens.len(), map.xsize),
            );
        }
        for (x, token) in tokens.into_iter().take(map.xsize).enumerate() {
            let Some(index) = map.index(x, y) else { continue };
            if token == "-" {
                each(index, None);
            } else {
                match token.parse::<u64>() {
                    Ok(v) => each(index, Some(v)),
                    Err(_) => {
                        let message = format!("bad token '{token}' in '{key}'");
                        diagnostics.warn_once(STAGE, layer, message);
                    }
                }
            }
        }
    }
}

fn load_owner(file: &SectionFile, map: &mut Map, diagnostics: &mut Diagnostics) {
    if !file.contains("map.owner0000") {
        return;
    }
    let mut owners = vec![None; map.tiles.len()];
    load_token_rows(file, map, diagnostics, "map.owner", |index, v| {
        owners[index] = v.and_then(|v| usize::try_from(v).ok()).filter(|&p| p < MAX_PLAYER_SLOTS);
    });
    let mut claimers = vec![None; map.tiles.len()];
    let tile_count = map.tiles.len();
    load_token_rows(file, map, diagnostics, "map.source", |index, v| {
        claimers[index] = v.and_then(|v| usize::try_from(v).ok()).filter(|&t| t < tile_count);
    });
    for ((tile, owner), claimer) in map.tiles.iter_mut().zip(owners).zip(claimers) {
        tile.owner = owner;
        tile.claimer = claimer;
    }
}

/// Worked tiles go to the scratch map; cities are not loaded yet.
fn load_worked(file: &SectionFile, map: &Map, ctx: &mut LoadContext) {
    if !file.contains("map.worked0000") {
        return;
    }
    let mut worked = Vec::new();
    load_token_rows(file, map, &mut ctx.diagnostics, "map.worked", |index, v| {
        if let Some(id) = v.and_then(|v| u32::try_from(v).ok()) {
            worked.push((index, id));
        }
    });
    ctx.worked_tiles.extend(worked);
}

/// Known bits: column `N` of `map.kNN_YYYY` holds player slots
/// `(N / 8) * 32 + (N % 8) * 4 ..+4`. Columns for unused slots are absent.
fn load_known(file: &SectionFile, map: &mut Map, diagnostics: &mut Diagnostics) {
    for column in 0..MAX_PLAYER_SLOTS / 4 {
        if !file.contains(&format!("map.k{column:02}_0000")) {
            continue;
        }
        let (bank, halfbyte) = (column / 8, column % 8);
        let first = bank * 32 + halfbyte * 4;
        let slots = [Some(first), Some(first + 1), Some(first + 2), Some(first + 3)];
        load_map_chars(file, map, diagnostics, |y| format!("map.k{column:02}_{y:04}"), |tile, c| {
            codec::unpack_flags(c, &slots, &mut tile.known).map_err(|e| e.to_string())
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_row_defaults_missing_cells() {
        let rules = Ruleset::classic();
        let mut file = SectionFile::new();
        file.insert_str("map.t0000", "gggggggggg");
        file.insert_str("map.t0001", "pppppppp");
        let mut map = Map::new(10, 2);
        let mut diagnostics = Diagnostics::default();

        load_map_chars(&file, &mut map, &mut diagnostics, |y| format!("map.t{y:04}"), |tile, c| {
            tile.terrain = decode_terrain(&rules, c)?;
            Ok(())
        });

        let plains = rules.terrain_by_name("Plains");
        assert_eq!(map.tile(7, 1).unwrap().terrain, plains);
        assert_eq!(map.tile(8, 1).unwrap().terrain, None);
        assert_eq!(map.tile(9, 1).unwrap().terrain, None);
        assert_eq!(diagnostics.warning_count(), 1);
    }

    #[test]
    fn dimensions_fall_back_to_terrain_rows() {
        let mut file = SectionFile::new();
        file.insert_str("map.t0000", "ggg");
        file.insert_str("map.t0001", "gg");
        assert_eq!(map_dimensions(&file).ok(), Some(Some((3, 2))));
        assert_eq!(map_dimensions(&SectionFile::new()).ok(), Some(None));
    }

    #[test]
    fn oversized_dimensions_are_structural() {
        let mut file = SectionFile::new();
        file.insert_int("map.xsize", 1 << 33);
        file.insert_int("map.ysize", 1 << 33);
        assert!(matches!(map_dimensions(&file), Err(SaveError::Structural { .. })));

        file.insert_int("map.xsize", MAX_LINEAR_SIZE as i64);
        file.insert_int("map.ysize", MAX_LINEAR_SIZE as i64);
        assert!(matches!(map_dimensions(&file), Err(SaveError::Structural { .. })));

        file.insert_int("map.ysize", -1);
        assert!(map_dimensions(&file).is_err());
    }

    #[test]
    fn known_columns_map_to_player_slots() {
        let mut file = SectionFile::new();
        // Column 9: bank 1, half-byte 1, slots 36..39.
        file.insert_str("map.k09_0000", "2");
        let mut map = Map::new(1, 1);
        load_known(&file, &mut map, &mut Diagnostics::default());
        assert_eq!(map.tiles[0].known.iter().collect::<Vec<_>>(), vec![37]);
    }
}
