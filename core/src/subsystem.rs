//! Stage descriptors and the pipeline runner.
//!
//! RULE: Save and load are each a fixed list of stages. A stage declares
//! what it provides to later stages and what it requires from earlier
//! ones. `check_order` verifies the list before anything runs, so a
//! misordered pipeline fails up front instead of reading half-built data.

use crate::context::Diagnostics;
use crate::error::{SaveError, SaveResult};
use std::collections::BTreeSet;

/// Data one stage hands to a later one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tag {
    /// Declared enum orderings of the `[savefile]` header.
    Orderings,
    /// `save_players` / `save_known` and the game turn.
    GameFlags,
    MapDimensions,
    WorkedTiles,
    Players,
    RandomState,
}

/// Anything a pipeline runs over.
pub trait Job {
    fn diagnostics(&mut self) -> &mut Diagnostics;
}

pub struct Stage<J> {
    /// Unique stable name, used in diagnostics.
    pub name: &'static str,
    pub provides: &'static [Tag],
    pub requires: &'static [Tag],
    pub run: fn(&mut J) -> SaveResult<()>,
}

/// Reject a pipeline whose stage requires a tag no earlier stage provides.
pub fn check_order<J>(stages: &[Stage<J>]) -> SaveResult<()> {
    let mut provided = BTreeSet::new();
    let mut names = BTreeSet::new();
    for stage in stages {
        if !names.insert(stage.name) {
            return Err(SaveError::structural(
                stage.name,
                "stage registered twice in pipeline",
            ));
        }
        if let Some(missing) = stage.requires.iter().find(|t| !provided.contains(*t)) {
            return Err(SaveError::structural(
                stage.name,
                format!("requires {missing:?}, which no earlier stage provides"),
            ));
        }
        provided.extend(stage.provides.iter().copied());
    }
    Ok(())
}

/// Run every stage in order, stopping at the first hard error. The error
/// is recorded in the job's diagnostics before it is returned.
pub fn run_stages<J: Job>(stages: &[Stage<J>], job: &mut J) -> SaveResult<()> {
    check_order(stages)?;
    for stage in stages {
        log::debug!("stage '{}' starting", stage.name);
        if let Err(err) = (stage.run)(job) {
            job.diagnostics().error(stage.name, &err);
            return Err(err);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Trace {
        ran: Vec<&'static str>,
        diagnostics: Diagnostics,
    }

    impl Job for Trace {
        fn diagnostics(&mut self) -> &mut Diagnostics {
            &mut self.diagnostics
        }
    }

    fn map(job: &mut Trace) -> SaveResult<()> {
        job.ran.push("map");
        Ok(())
    }

    fn players(job: &mut Trace) -> SaveResult<()> {
        job.ran.push("players");
        Ok(())
    }

    fn broken(_: &mut Trace) -> SaveResult<()> {
        Err(SaveError::structural("player0.ncities", "missing"))
    }

    const MAP: Stage<Trace> = Stage {
        name: "map",
        provides: &[Tag::WorkedTiles],
        requires: &[],
        run: map,
    };
    const PLAYERS: Stage<Trace> = Stage {
        name: "players",
        provides: &[Tag::Players],
        requires: &[Tag::WorkedTiles],
        run: players,
    };

    #[test]
    fn provider_before_consumer_passes() {
        assert!(check_order(&[MAP, PLAYERS]).is_ok());
    }

    #[test]
    fn consumer_before_provider_fails() {
        let err = check_order(&[PLAYERS, MAP]).unwrap_err();
        assert!(err.to_string().contains("WorkedTiles"), "got: {err}");
    }

    #[test]
    fn duplicate_stage_fails() {
        assert!(check_order(&[MAP, MAP]).is_err());
    }

    #[test]
    fn runner_stops_at_first_error() {
        let failing = Stage { name: "broken", provides: &[], requires: &[], run: broken };
        let mut job = Trace::default();
        let result = run_stages(&[MAP, failing, PLAYERS], &mut job);
        assert!(result.is_err());
        assert_eq!(job.ran, vec!["map"]);
        assert_eq!(job.diagnostics.entries().len(), 1);
    }
}
