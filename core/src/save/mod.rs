//! Snapshot writer: live [`GameState`] to [`SectionFile`].
//!
//! EXECUTION ORDER (fixed; `check_order` verifies the tags):
//!   1. scenario   metadata first so scenario lists can stop early
//!   2. savefile   header, options, declared orderings
//!   3. game       globals; decides `save_players`
//!   4. random     generator state, only when initialised and opted in
//!   5. script
//!   6. settings
//!   7. map        terrain and bit-planes, ownership, worked, known
//!   8. players    players, cities, units, attribute blocks
//!   9. mapimg
//!  10. sanity     option tokens against the written body

mod map;
mod player;

use crate::codec::Activity;
use crate::compat::CURRENT_VERSION;
use crate::context::{Diagnostic, Diagnostics, SaveContext};
use crate::error::{Failure, SaveError, SaveResult};
use crate::rng::{TABLE_LINES, WORDS_PER_LINE};
use crate::section_file::SectionFile;
use crate::state::{GameState, ServerState, SettingValue, Trait};
use crate::subsystem::{run_stages, Job, Stage, Tag};

pub struct SaveJob<'a> {
    pub game: &'a GameState,
    pub file: SectionFile,
    pub ctx: SaveContext,
}

impl Job for SaveJob<'_> {
    fn diagnostics(&mut self) -> &mut Diagnostics {
        &mut self.ctx.diagnostics
    }
}

impl SaveJob<'_> {
    /// Append an option token and rewrite `savefile.options`.
    fn add_option(&mut self, option: &str) {
        self.ctx.add_option(option);
        self.file.replace_str("savefile.options", self.ctx.options());
    }
}

/// A finished save.
#[derive(Debug)]
pub struct Saved {
    pub file: SectionFile,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn stages<'a>() -> Vec<Stage<SaveJob<'a>>> {
    vec![
        Stage { name: "scenario", provides: &[], requires: &[], run: save_scenario },
        Stage { name: "savefile", provides: &[Tag::Orderings], requires: &[], run: save_savefile },
        Stage {
            name: "game",
            provides: &[Tag::GameFlags],
            requires: &[Tag::Orderings],
            run: save_game_info,
        },
        Stage { name: "random", provides: &[Tag::RandomState], requires: &[], run: save_random },
        Stage { name: "script", provides: &[], requires: &[], run: save_script },
        Stage { name: "settings", provides: &[], requires: &[], run: save_settings },
        Stage {
            name: "map",
            provides: &[Tag::MapDimensions, Tag::WorkedTiles],
            requires: &[Tag::Orderings, Tag::GameFlags],
            run: map::save_map,
        },
        Stage {
            name: "players",
            provides: &[Tag::Players],
            requires: &[Tag::Orderings, Tag::GameFlags, Tag::MapDimensions],
            run: player::save_players,
        },
        Stage { name: "mapimg", provides: &[], requires: &[], run: save_mapimg },
        Stage {
            name: "sanity",
            provides: &[],
            requires: &[Tag::MapDimensions, Tag::Players],
            run: save_sanity,
        },
    ]
}

/// Serialize `game`. `scenario` asks for a scenario save; it only takes
/// effect when the game carries scenario metadata.
pub fn save_game(game: &GameState, reason: &str, scenario: bool) -> Result<Saved, Failure> {
    let mut job = SaveJob {
        game,
        file: SectionFile::new(),
        ctx: SaveContext::new(reason, scenario && game.is_scenario()),
    };
    log::info!("saving game '{}' ({reason})", game.info.id);
    match run_stages(&stages(), &mut job) {
        Ok(()) => Ok(Saved { file: job.file, diagnostics: job.ctx.diagnostics.into_vec() }),
        Err(error) => {
            log::error!("failure saving savegame: {error}");
            Err(Failure { error, diagnostics: job.ctx.diagnostics.into_vec() })
        }
    }
}

// ── Stages ────────────────────────────────────────────────────

fn save_scenario(job: &mut SaveJob<'_>) -> SaveResult<()> {
    let scenario = match (&job.game.scenario, job.ctx.scenario) {
        (Some(s), true) => s,
        _ => {
            job.file.insert_bool("scenario.is_scenario", false);
            return Ok(());
        }
    };
    job.file.insert_bool("scenario.is_scenario", true);
    job.file.insert_str("scenario.name", scenario.name.as_str());
    if !scenario.description.is_empty() {
        job.file.insert_str("scenario.description", scenario.description.as_str());
    }
    job.file.insert_bool("scenario.players", scenario.players);
    job.file.insert_bool("scenario.startpos_nations", scenario.startpos_nations);
    Ok(())
}

fn save_savefile(job: &mut SaveJob<'_>) -> SaveResult<()> {
    let rules = &job.game.ruleset;
    let file = &mut job.file;

    file.insert_str("savefile.options", job.ctx.options());
    file.insert_int("savefile.version", CURRENT_VERSION);
    file.insert_str("savefile.reason", job.ctx.reason.as_str());
    file.insert_str("savefile.rulesetdir", rules.name.as_str());

    let improvements = rules.improvement_names();
    insert_ordering(file, "improvement", &improvements);
    insert_ordering(file, "technology", &rules.technologies);
    let activities: Vec<&str> = Activity::ALL.iter().map(|a| a.name()).collect();
    insert_ordering(file, "activities", &activities);
    let traits: Vec<&str> = Trait::ALL.iter().map(|t| t.name()).collect();
    insert_ordering(file, "trait", &traits);
    insert_ordering(file, "specials", &rules.specials);
    insert_ordering(file, "bases", &rules.bases);
    insert_ordering(file, "roads", &rules.roads);
    Ok(())
}

/// `savefile.<domain>_size`, plus `_vector` when the domain is not empty.
fn insert_ordering<S: AsRef<str>>(file: &mut SectionFile, domain: &str, names: &[S]) {
    file.insert_int(format!("savefile.{domain}_size"), names.len() as i64);
    if !names.is_empty() {
        file.insert_str_vec(format!("savefile.{domain}_vector"), names);
    }
}

fn save_game_info(job: &mut SaveJob<'_>) -> SaveResult<()> {
    let game = job.game;
    let info = &game.info;
    let scenario_without_players =
        job.ctx.scenario && game.scenario.as_ref().is_some_and(|s| !s.players);

    let file = &mut job.file;
    file.insert_int("game.version", info.version);
    let server_state = if scenario_without_players {
        ServerState::Initial
    } else {
        info.server_state
    };
    file.insert_str("game.server_state", server_state.name());
    file.insert_str("game.meta_patches", info.meta_patches.as_str());
    file.insert_bool("game.meta_usermessage", false);
    file.insert_str("game.meta_server", info.meta_server.as_str());
    file.insert_str("game.id", info.id.as_str());
    file.insert_str("game.serverid", info.serverid.as_str());
    file.insert_int("game.skill_level", info.skill_level);
    file.insert_int("game.phase_mode", info.phase_mode);
    file.insert_int("game.phase", info.phase);
    file.insert_int("game.turn", i64::from(info.turn));
    file.insert_int("game.year", info.year);
    file.insert_bool("game.year_0_hack", info.year_0_hack);
    file.insert_int("game.globalwarming", info.globalwarming);
    file.insert_int("game.heating", info.heating);
    file.insert_int("game.warminglevel", info.warminglevel);
    file.insert_int("game.nuclearwinter", info.nuclearwinter);
    file.insert_int("game.cooling", info.cooling);
    file.insert_int("game.coolinglevel", info.coolinglevel);
    file.insert_str(
        "game.global_advances",
        bit_string(game.ruleset.technologies.len(), |i| info.global_advances.contains(&i)),
    );
    file.insert_bool("game.citizen_nationality", info.citizen_nationality);

    job.ctx.save_players = if !info.has_started() {
        false
    } else if job.ctx.scenario {
        game.scenario.as_ref().map_or(true, |s| s.players)
    } else {
        true
    };
    job.file.insert_bool("game.save_players", job.ctx.save_players);
    Ok(())
}

/// `'1'`/`'0'` per index in `0..len`.
pub(crate) fn bit_string(len: usize, is_set: impl Fn(usize) -> bool) -> String {
    (0..len).map(|i| if is_set(i) { '1' } else { '0' }).collect()
}

fn save_random(job: &mut SaveJob<'_>) -> SaveResult<()> {
    let state = match (&job.game.random, job.game.save_random) {
        (Some(state), true) => state,
        _ => {
            job.file.insert_bool("random.save", false);
            return Ok(());
        }
    };
    if !state.is_valid() {
        return Err(SaveError::encoding("random", "generator state is corrupt"));
    }
    job.file.insert_bool("random.save", true);
    job.file.insert_int("random.index_J", state.j as i64);
    job.file.insert_int("random.index_K", state.k as i64);
    job.file.insert_int("random.index_X", state.x as i64);
    for i in 0..TABLE_LINES {
        let line = state.v[WORDS_PER_LINE * i..WORDS_PER_LINE * (i + 1)]
            .iter()
            .map(|w| format!("{w:8x}"))
            .collect::<Vec<_>>()
            .join(" ");
        job.file.insert_str(format!("random.table{i}"), line);
    }
    Ok(())
}

fn save_script(job: &mut SaveJob<'_>) -> SaveResult<()> {
    job.file.insert_str("script.vars", job.game.script_vars.as_str());
    Ok(())
}

fn save_settings(job: &mut SaveJob<'_>) -> SaveResult<()> {
    let settings = &job.game.settings;
    job.file.insert_int("settings.set_count", settings.len() as i64);
    for (i, setting) in settings.iter().enumerate() {
        job.file.insert_str(format!("settings.set{i}.name"), setting.name.as_str());
        let path = format!("settings.set{i}.value");
        match &setting.value {
            SettingValue::Int(v) => job.file.insert_int(path, *v),
            SettingValue::Bool(v) => job.file.insert_bool(path, *v),
            SettingValue::Str(v) => job.file.insert_str(path, v.as_str()),
        }
    }
    Ok(())
}

fn save_mapimg(job: &mut SaveJob<'_>) -> SaveResult<()> {
    let defs = &job.game.mapimg_defs;
    job.file.insert_int("mapimg.count", defs.len() as i64);
    for (i, def) in defs.iter().enumerate() {
        job.file.insert_str(format!("mapimg.mapdef{i}"), def.as_str());
    }
    Ok(())
}

/// Every declared option token must match a written layer, and the other
/// way round.
fn save_sanity(job: &mut SaveJob<'_>) -> SaveResult<()> {
    let options = job.file.lookup_str("savefile.options").unwrap_or_default();
    if options != job.ctx.options() {
        return Err(SaveError::encoding(
            "savefile.options",
            format!("header says '{options}', body was written with '{}'", job.ctx.options()),
        ));
    }
    let tokens = crate::context::option_tokens(options);
    let declared = |t: &str| tokens.iter().any(|o| o == t);
    if job.game.map.is_empty() {
        return Ok(());
    }

    let specials_written = job.file.contains("map.spe00_0000");
    let resources_written = job.file.contains("map.res0000");
    let checks = [
        ("specials", declared("specials"), resources_written),
        ("riversoverlay", declared("riversoverlay"), specials_written && !resources_written),
    ];
    for (token, is_declared, is_written) in checks {
        if is_declared != is_written {
            return Err(SaveError::encoding(
                "savefile.options",
                format!("option '{token}' declared={is_declared} but layer written={is_written}"),
            ));
        }
    }
    Ok(())
}
