//! Per-call state threaded through the save and load pipelines.
//!
//! A `SaveContext` or `LoadContext` lives for exactly one `save_game` or
//! `load_game` call. It carries the data one stage produces for a later
//! stage (orderings, the worked-tile scratch map, the option string) and
//! collects diagnostics. Nothing in here outlives the call.

use crate::compat::MigrationReport;
use crate::error::{SaveError, SaveResult};
use crate::rng::RandomState;
use crate::types::{CityId, TileIndex};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Warning,
    Error,
}

/// One human-readable message recorded during a save or load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub stage: &'static str,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "[{tag}] {}: {}", self.stage, self.message)
    }
}

/// Diagnostic sink shared by both contexts. Everything recorded is also
/// logged.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    warned_layers: BTreeSet<String>,
}

impl Diagnostics {
    pub fn warn(&mut self, stage: &'static str, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{stage}: {message}");
        self.entries.push(Diagnostic { severity: Severity::Warning, stage, message });
    }

    /// Warn at most once for `layer` during this call.
    pub fn warn_once(&mut self, stage: &'static str, layer: &str, message: impl Into<String>) {
        if self.warned_layers.insert(layer.to_string()) {
            self.warn(stage, message);
        }
    }

    pub fn error(&mut self, stage: &'static str, err: &SaveError) {
        log::error!("{stage}: {err}");
        self.entries.push(Diagnostic {
            severity: Severity::Error,
            stage,
            message: err.to_string(),
        });
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn warning_count(&self) -> usize {
        self.entries.iter().filter(|d| d.severity == Severity::Warning).count()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

// ── Orderings ─────────────────────────────────────────────────

/// The file's enumeration order for one domain, with each entry
/// resolved against the running program's order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ordering {
    names: Vec<String>,
    running: Vec<Option<usize>>,
}

impl Ordering {
    /// Resolve `names` (file order) against `current` (running order).
    /// Names the running program does not know resolve to `None`.
    pub fn resolve<S: AsRef<str>>(names: Vec<String>, current: &[S]) -> Self {
        let running = names
            .iter()
            .map(|n| current.iter().position(|c| c.as_ref() == n))
            .collect();
        Self { names, running }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, file_index: usize) -> Option<&str> {
        self.names.get(file_index).map(String::as_str)
    }

    /// Running index for a file index.
    pub fn running(&self, file_index: usize) -> Option<usize> {
        self.running.get(file_index).copied().flatten()
    }

    /// File names with no running counterpart.
    pub fn unresolved(&self) -> impl Iterator<Item = &str> {
        self.names
            .iter()
            .zip(&self.running)
            .filter(|(_, r)| r.is_none())
            .map(|(n, _)| n.as_str())
    }

    /// Map a set of file indices into running indices, dropping unknowns.
    pub fn remap<I: IntoIterator<Item = usize>>(&self, file_indices: I) -> Vec<usize> {
        file_indices.into_iter().filter_map(|i| self.running(i)).collect()
    }
}

/// Every ordering declared in the `[savefile]` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Orderings {
    pub improvements: Ordering,
    pub technologies: Ordering,
    pub activities: Ordering,
    pub traits: Ordering,
    pub specials: Ordering,
    pub bases: Ordering,
    pub roads: Ordering,
}

// ── Load ──────────────────────────────────────────────────────

#[derive(Debug)]
pub struct LoadContext {
    /// Declared format version before migration.
    pub version: i64,
    /// Option tokens from `savefile.options`.
    pub options: Vec<String>,
    pub migration: MigrationReport,
    orderings: Option<Orderings>,
    pub save_players: bool,
    pub save_known: bool,
    /// Loaded generator state, applied in the sanity pass.
    pub random_state: Option<RandomState>,
    /// Tile to city id, filled by the map stage and consumed once
    /// cities are loaded.
    pub worked_tiles: BTreeMap<TileIndex, CityId>,
    pub diagnostics: Diagnostics,
}

impl LoadContext {
    pub fn new(version: i64, migration: MigrationReport) -> Self {
        Self {
            version,
            options: Vec::new(),
            migration,
            orderings: None,
            save_players: false,
            save_known: false,
            random_state: None,
            worked_tiles: BTreeMap::new(),
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn has_option(&self, token: &str) -> bool {
        self.options.iter().any(|o| o == token)
    }

    /// Install the header orderings. They can only be set once.
    pub fn set_orderings(&mut self, orderings: Orderings) -> SaveResult<()> {
        if self.orderings.is_some() {
            return Err(SaveError::structural("savefile", "orderings loaded twice"));
        }
        self.orderings = Some(orderings);
        Ok(())
    }

    pub fn orderings(&self) -> SaveResult<&Orderings> {
        self.orderings
            .as_ref()
            .ok_or_else(|| SaveError::structural("savefile", "orderings not loaded yet"))
    }

    /// Orderings and the diagnostic sink at once, for stages that
    /// translate indices while recording warnings.
    pub fn orderings_and_diagnostics(&mut self) -> SaveResult<(&Orderings, &mut Diagnostics)> {
        let orderings = self
            .orderings
            .as_ref()
            .ok_or_else(|| SaveError::structural("savefile", "orderings not loaded yet"))?;
        Ok((orderings, &mut self.diagnostics))
    }
}

// ── Save ──────────────────────────────────────────────────────

pub const BASE_OPTIONS: &str = " +version2";

#[derive(Debug)]
pub struct SaveContext {
    pub reason: String,
    pub scenario: bool,
    /// Decided by the game stage; gates every per-player section.
    pub save_players: bool,
    options: String,
    pub diagnostics: Diagnostics,
}

impl SaveContext {
    pub fn new(reason: impl Into<String>, scenario: bool) -> Self {
        Self {
            reason: reason.into(),
            scenario,
            save_players: false,
            options: BASE_OPTIONS.to_string(),
            diagnostics: Diagnostics::default(),
        }
    }

    /// Append an option token such as `" specials"`.
    pub fn add_option(&mut self, option: &str) {
        self.options.push_str(option);
    }

    pub fn options(&self) -> &str {
        &self.options
    }
}

/// Split an option string into tokens, `" +version2 specials"` becoming
/// `["+version2", "specials"]`.
pub fn option_tokens(options: &str) -> Vec<String> {
    options.split_whitespace().map(str::to_string).collect()
}
