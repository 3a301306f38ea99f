//! Snapshot reader: [`SectionFile`] to live [`GameState`].
//!
//! Before any stage runs the compatibility chain brings the file up to the
//! current version. Stages then run in the writer's order, with the
//! `[savefile]` orderings first since every later index goes through them.
//!
//! Missing or short optional data is a warning: the field keeps its
//! default and loading continues. A missing mandatory field fails the load.

mod map;
mod player;

pub(crate) use map::map_dimensions;

use crate::codec::Activity;
use crate::compat::{self, MigrationReport};
use crate::context::{option_tokens, Diagnostic, Diagnostics, LoadContext, Ordering, Orderings};
use crate::error::{Failure, SaveError, SaveResult};
use crate::rng::{RandomState, STATE_LEN, TABLE_LINES, WORDS_PER_LINE};
use crate::section_file::{SectionFile, Value};
use crate::state::{GameState, Ruleset, ScenarioInfo, ServerState, Setting, SettingValue, Trait};
use crate::subsystem::{run_stages, Job, Stage, Tag};
use std::collections::BTreeSet;

pub struct LoadJob {
    pub file: SectionFile,
    pub game: GameState,
    pub ctx: LoadContext,
}

impl Job for LoadJob {
    fn diagnostics(&mut self) -> &mut Diagnostics {
        &mut self.ctx.diagnostics
    }
}

/// A finished load.
#[derive(Debug)]
pub struct Loaded {
    pub game: GameState,
    pub migration: MigrationReport,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn stages() -> Vec<Stage<LoadJob>> {
    vec![
        Stage { name: "savefile", provides: &[Tag::Orderings], requires: &[], run: load_savefile },
        Stage { name: "scenario", provides: &[], requires: &[], run: load_scenario },
        Stage {
            name: "game",
            provides: &[Tag::GameFlags],
            requires: &[Tag::Orderings],
            run: load_game_info,
        },
        Stage { name: "random", provides: &[Tag::RandomState], requires: &[], run: load_random },
        Stage { name: "script", provides: &[], requires: &[], run: load_script },
        Stage { name: "settings", provides: &[], requires: &[], run: load_settings },
        Stage {
            name: "map",
            provides: &[Tag::MapDimensions, Tag::WorkedTiles],
            requires: &[Tag::Orderings, Tag::GameFlags],
            run: map::load_map,
        },
        Stage {
            name: "players",
            provides: &[Tag::Players],
            requires: &[Tag::Orderings, Tag::GameFlags, Tag::MapDimensions, Tag::WorkedTiles],
            run: player::load_players,
        },
        Stage { name: "mapimg", provides: &[], requires: &[], run: load_mapimg },
        Stage {
            name: "sanity",
            provides: &[],
            requires: &[Tag::Players, Tag::RandomState, Tag::WorkedTiles],
            run: load_sanity,
        },
    ]
}

/// Rebuild a game from `file`, upgrading it first if it is older than the
/// current format. `ruleset` is the running program's ruleset.
pub fn load_game(mut file: SectionFile, ruleset: Ruleset) -> Result<Loaded, Failure> {
    let mut diagnostics = Diagnostics::default();
    let migration = match compat::upgrade(&mut file, &mut diagnostics) {
        Ok(report) => report,
        Err(error) => {
            diagnostics.error("compat", &error);
            return Err(Failure { error, diagnostics: diagnostics.into_vec() });
        }
    };

    let mut ctx = LoadContext::new(migration.original_version, migration.clone());
    ctx.diagnostics = diagnostics;
    let mut job = LoadJob { file, game: GameState::new(ruleset, 0, 0), ctx };

    match run_stages(&stages(), &mut job) {
        Ok(()) => {
            log::info!(
                "loaded game '{}' (file version {}, {} warnings)",
                job.game.info.id,
                migration.original_version,
                job.ctx.diagnostics.warning_count()
            );
            Ok(Loaded { game: job.game, migration, diagnostics: job.ctx.diagnostics.into_vec() })
        }
        Err(error) => Err(Failure { error, diagnostics: job.ctx.diagnostics.into_vec() }),
    }
}

// ── Stages ────────────────────────────────────────────────────

fn load_savefile(job: &mut LoadJob) -> SaveResult<()> {
    let LoadJob { file, game, ctx } = job;
    ctx.options = option_tokens(file.lookup_str_or("savefile.options", ""));
    if !ctx.has_option("+version2") {
        ctx.diagnostics.warn("savefile", "options do not declare '+version2'");
    }

    let rules = &game.ruleset;
    let improvements = rules.improvement_names();
    let activities: Vec<&str> = Activity::ALL.iter().map(|a| a.name()).collect();
    let traits: Vec<&str> = Trait::ALL.iter().map(|t| t.name()).collect();
    let orderings = Orderings {
        improvements: read_ordering(file, ctx, "improvement", &improvements)?,
        technologies: read_ordering(file, ctx, "technology", &rules.technologies)?,
        activities: read_ordering(file, ctx, "activities", &activities)?,
        traits: read_ordering(file, ctx, "trait", &traits)?,
        specials: read_ordering(file, ctx, "specials", &rules.specials)?,
        bases: read_ordering(file, ctx, "bases", &rules.bases)?,
        roads: read_ordering(file, ctx, "roads", &rules.roads)?,
    };
    ctx.set_orderings(orderings)
}

/// `savefile.<domain>_size` and `_vector`. A vector is mandatory when the
/// declared size is not zero and must have exactly that many entries.
fn read_ordering<S: AsRef<str>>(
    file: &SectionFile,
    ctx: &mut LoadContext,
    domain: &str,
    current: &[S],
) -> SaveResult<Ordering> {
    let size_path = format!("savefile.{domain}_size");
    let vector_path = format!("savefile.{domain}_vector");
    let size = file.require_int(&size_path)?;
    let names = if size > 0 {
        file.lookup_str_vec(&vector_path)
            .ok_or_else(|| SaveError::structural(&vector_path, "missing while size is not zero"))?
    } else {
        Vec::new()
    };
    if names.len() as i64 != size {
        return Err(SaveError::structural(
            &vector_path,
            format!("declares {size} entries but has {}", names.len()),
        ));
    }
    let ordering = Ordering::resolve(names, current);
    let unknown: Vec<&str> = ordering.unresolved().collect();
    if !unknown.is_empty() {
        ctx.diagnostics.warn(
            "savefile",
            format!("{domain} not in the current ruleset, ignored: {}", unknown.join(", ")),
        );
    }
    Ok(ordering)
}

fn load_scenario(job: &mut LoadJob) -> SaveResult<()> {
    let file = &job.file;
    if !file.lookup_bool_or("scenario.is_scenario", false) {
        job.game.scenario = None;
        return Ok(());
    }
    job.game.scenario = Some(ScenarioInfo {
        name: file.require_str("scenario.name")?.to_string(),
        description: file.lookup_str_or("scenario.description", "").to_string(),
        players: file.lookup_bool_or("scenario.players", true),
        startpos_nations: file.lookup_bool_or("scenario.startpos_nations", false),
    });
    Ok(())
}

fn load_game_info(job: &mut LoadJob) -> SaveResult<()> {
    let LoadJob { file, game, ctx } = job;
    let info = &mut game.info;

    info.version = file.lookup_int_or("game.version", 0);
    let state_name = file.require_str("game.server_state")?;
    info.server_state = ServerState::by_name(state_name).ok_or_else(|| {
        SaveError::structural("game.server_state", format!("unknown state '{state_name}'"))
    })?;
    info.meta_patches = file.lookup_str_or("game.meta_patches", "").to_string();
    info.meta_server = file.lookup_str_or("game.meta_server", "").to_string();
    info.id = file.lookup_str_or("game.id", "").to_string();
    info.serverid = file.lookup_str_or("game.serverid", "").to_string();
    info.skill_level = file.lookup_int_or("game.skill_level", info.skill_level);
    info.phase_mode = file.lookup_int_or("game.phase_mode", 0);
    info.phase = file.lookup_int_or("game.phase", 0);
    info.turn = file.require_i32("game.turn")?;
    info.year = file.lookup_int_or("game.year", info.year);
    info.year_0_hack = file.lookup_bool_or("game.year_0_hack", false);
    info.globalwarming = file.lookup_int_or("game.globalwarming", 0);
    info.heating = file.lookup_int_or("game.heating", 0);
    info.warminglevel = file.lookup_int_or("game.warminglevel", info.warminglevel);
    info.nuclearwinter = file.lookup_int_or("game.nuclearwinter", 0);
    info.cooling = file.lookup_int_or("game.cooling", 0);
    info.coolinglevel = file.lookup_int_or("game.coolinglevel", info.coolinglevel);
    info.citizen_nationality = file.lookup_bool_or("game.citizen_nationality", false);

    let techs = &ctx.orderings()?.technologies;
    info.global_advances = match file.lookup_str("game.global_advances") {
        Some(bits) => techs.remap(set_bits(bits)).into_iter().collect(),
        None => {
            ctx.diagnostics.warn("game", "no global advances saved");
            Default::default()
        }
    };

    ctx.save_players = file.lookup_bool_or("game.save_players", false);
    ctx.save_known = file.lookup_bool_or("game.save_known", ctx.save_players);
    Ok(())
}

/// Indices of `'1'` characters in a bit string.
pub(crate) fn set_bits(bits: &str) -> impl Iterator<Item = usize> + '_ {
    bits.chars().enumerate().filter(|(_, c)| *c == '1').map(|(i, _)| i)
}

fn load_random(job: &mut LoadJob) -> SaveResult<()> {
    let file = &job.file;
    if !file.lookup_bool_or("random.save", false) {
        job.game.save_random = false;
        return Ok(());
    }
    let index = |key: &str| -> SaveResult<usize> {
        let path = format!("random.index_{key}");
        let v = file.require_int(&path)?;
        usize::try_from(v)
            .ok()
            .filter(|v| *v < STATE_LEN)
            .ok_or_else(|| SaveError::structural(&path, format!("index {v} out of range")))
    };
    let (j, k, x) = (index("J")?, index("K")?, index("X")?);

    let mut v = Vec::with_capacity(STATE_LEN);
    for i in 0..TABLE_LINES {
        let path = format!("random.table{i}");
        let line = file.require_str(&path)?;
        let words = line
            .split_whitespace()
            .map(|w| u32::from_str_radix(w, 16))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SaveError::structural(&path, e.to_string()))?;
        if words.len() != WORDS_PER_LINE {
            return Err(SaveError::structural(
                &path,
                format!("expected {WORDS_PER_LINE} words, found {}", words.len()),
            ));
        }
        v.extend(words);
    }
    job.ctx.random_state = Some(RandomState { j, k, x, v });
    job.game.save_random = true;
    Ok(())
}

fn load_script(job: &mut LoadJob) -> SaveResult<()> {
    job.game.script_vars = job.file.lookup_str_or("script.vars", "").to_string();
    Ok(())
}

fn load_settings(job: &mut LoadJob) -> SaveResult<()> {
    let LoadJob { file, game, ctx } = job;
    let count = bounded_count(file, &mut ctx.diagnostics, "settings", "settings.set_count");
    game.settings.clear();
    for i in 0..count {
        let Some(name) = file.lookup_str(&format!("settings.set{i}.name")) else {
            ctx.diagnostics.warn("settings", format!("setting {i} has no name"));
            continue;
        };
        let value = match file.get(&format!("settings.set{i}.value")) {
            Some(Value::Int(v)) => SettingValue::Int(*v),
            Some(Value::Bool(v)) => SettingValue::Bool(*v),
            Some(Value::Str(v)) => SettingValue::Str(v.clone()),
            _ => {
                ctx.diagnostics.warn("settings", format!("setting '{name}' has no usable value"));
                continue;
            }
        };
        game.settings.push(Setting { name: name.to_string(), value });
    }
    Ok(())
}

/// An optional table's count, clamped to what its section can hold.
fn bounded_count(
    file: &SectionFile,
    diagnostics: &mut Diagnostics,
    section: &'static str,
    path: &str,
) -> usize {
    let limit = file.section_len(section);
    file.lookup_count(path, limit).unwrap_or_else(|e| {
        diagnostics.warn(section, format!("{e}; reading at most {limit} entries"));
        limit
    })
}

fn load_mapimg(job: &mut LoadJob) -> SaveResult<()> {
    let LoadJob { file, game, ctx } = job;
    let count = bounded_count(file, &mut ctx.diagnostics, "mapimg", "mapimg.count");
    game.mapimg_defs.clear();
    for i in 0..count {
        match file.lookup_str(&format!("mapimg.mapdef{i}")) {
            Some(def) => game.mapimg_defs.push(def.to_string()),
            None => ctx.diagnostics.warn("mapimg", format!("map image definition {i} missing")),
        }
    }
    Ok(())
}

/// Apply the generator state, attach worked tiles to their cities and
/// drop references to units that were never loaded.
fn load_sanity(job: &mut LoadJob) -> SaveResult<()> {
    let LoadJob { game, ctx, .. } = job;
    if let Some(state) = ctx.random_state.take() {
        if !state.is_valid() {
            return Err(SaveError::structural("random", "generator state is corrupt"));
        }
        game.random = Some(state);
    }

    let city_ids: BTreeSet<_> =
        game.players.iter().flat_map(|p| p.cities.iter().map(|c| c.id)).collect();
    for (index, city) in std::mem::take(&mut ctx.worked_tiles) {
        if !city_ids.contains(&city) {
            ctx.diagnostics.warn("sanity", format!("tile {index} worked by unknown city {city}"));
            continue;
        }
        if let Some(tile) = game.map.tiles.get_mut(index) {
            tile.worked = Some(city);
        }
    }

    let unit_ids: BTreeSet<_> =
        game.players.iter().flat_map(|p| p.units.iter().map(|u| u.id)).collect();
    for plr in &mut game.players {
        for unit in &mut plr.units {
            if let Some(transporter) = unit.transported_by {
                if !unit_ids.contains(&transporter) {
                    ctx.diagnostics.warn(
                        "sanity",
                        format!("unit {} transported by unknown unit {transporter}", unit.id),
                    );
                    unit.transported_by = None;
                }
            }
        }
    }
    Ok(())
}
