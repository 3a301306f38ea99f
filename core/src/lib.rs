//! Versioned persistence for turn-based strategy game state.
//!
//! [`save_game`] walks a [`GameState`] through a fixed pipeline of
//! subsystem stages into a [`SectionFile`]; [`load_game`] brings a file up
//! to the current format through the compatibility chain and rebuilds the
//! state, remapping every saved index through the orderings the file
//! declares.

pub mod codec;
pub mod compat;
pub mod context;
pub mod error;
pub mod load;
pub mod rng;
pub mod save;
pub mod section_file;
pub mod state;
pub mod subsystem;
pub mod types;

/// Version of the running program, `major*10000 + minor*100 + patch`.
pub const PROGRAM_VERSION: i64 = 20500;

pub use error::{Failure, SaveError, SaveResult};
pub use load::{load_game, Loaded};
pub use save::{save_game, Saved};
pub use section_file::{SectionFile, Value};
pub use state::{GameState, Ruleset};
