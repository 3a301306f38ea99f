//! save-tool: inspect, upgrade and dump savegame files.
//!
//! Usage:
//!   save-tool inspect <file>
//!   save-tool upgrade <in> <out>
//!   save-tool dump <file>
//!
//! `--ruleset <path>` loads a JSON ruleset instead of the built-in classic one.

use anyhow::{bail, Context, Result};
use savegame_core::{load_game, save_game, Failure, Loaded, Ruleset, SectionFile};
use std::env;

#[derive(serde::Serialize)]
struct Summary<'a> {
    id: &'a str,
    server_state: &'a str,
    turn: i32,
    year: i64,
    map: (usize, usize),
    players: Vec<&'a str>,
    original_version: i64,
    steps_applied: &'a [i64],
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let ruleset = match args.windows(2).find(|w| w[0] == "--ruleset") {
        Some(w) => Ruleset::load(&w[1])?,
        None => Ruleset::classic(),
    };
    let positional: Vec<&str> = positional_args(&args);

    match positional.as_slice() {
        ["inspect", path] => inspect(path, ruleset),
        ["upgrade", input, output] => upgrade(input, output, ruleset),
        ["dump", path] => dump(path, ruleset),
        _ => {
            eprintln!(
                "usage: save-tool [--ruleset <path>] \
                 (inspect <file> | upgrade <in> <out> | dump <file>)"
            );
            bail!("invalid arguments: {}", args.join(" "))
        }
    }
}

/// Arguments with `--flag value` pairs removed.
fn positional_args(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg.starts_with("--") {
            iter.next();
        } else {
            out.push(arg.as_str());
        }
    }
    out
}

fn load(path: &str, ruleset: Ruleset) -> Result<Loaded> {
    let file = SectionFile::read(path).with_context(|| format!("reading {path}"))?;
    load_game(file, ruleset).map_err(|failure| report_failure(path, failure))
}

fn report_failure(path: &str, failure: Failure) -> anyhow::Error {
    for d in &failure.diagnostics {
        eprintln!("  {d}");
    }
    anyhow::Error::new(failure).context(format!("loading {path}"))
}

fn inspect(path: &str, ruleset: Ruleset) -> Result<()> {
    let loaded = load(path, ruleset)?;
    let game = &loaded.game;
    let summary = Summary {
        id: &game.info.id,
        server_state: game.info.server_state.name(),
        turn: game.info.turn,
        year: game.info.year,
        map: (game.map.xsize, game.map.ysize),
        players: game.players.iter().map(|p| p.name.as_str()).collect(),
        original_version: loaded.migration.original_version,
        steps_applied: &loaded.migration.steps_applied,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    for description in &loaded.migration.step_descriptions {
        println!("  upgraded: {description}");
    }
    if loaded.diagnostics.is_empty() {
        println!("no diagnostics");
    }
    for d in &loaded.diagnostics {
        println!("  {d}");
    }
    Ok(())
}

fn upgrade(input: &str, output: &str, ruleset: Ruleset) -> Result<()> {
    let loaded = load(input, ruleset)?;
    let scenario = loaded.game.is_scenario();
    let saved = save_game(&loaded.game, "upgrade", scenario).map_err(|failure| {
        for d in &failure.diagnostics {
            eprintln!("  {d}");
        }
        anyhow::Error::new(failure).context(format!("saving {output}"))
    })?;
    saved.file.write(output).with_context(|| format!("writing {output}"))?;
    log::info!(
        "{input}: version {} -> {output}: version {}",
        loaded.migration.original_version,
        loaded.migration.final_version
    );
    println!(
        "upgraded {input} (version {}) to {output} ({} warnings)",
        loaded.migration.original_version,
        loaded.diagnostics.len() + saved.diagnostics.len()
    );
    Ok(())
}

fn dump(path: &str, ruleset: Ruleset) -> Result<()> {
    let loaded = load(path, ruleset)?;
    println!("{}", serde_json::to_string_pretty(&loaded.game)?);
    Ok(())
}
