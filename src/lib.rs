//! heavybag - Heavy bag boxing workout timer
//!
//! Round timer with bell cues and spoken combinations, a workout
//! generator, and SQLite storage for favorite rounds and saved workouts.

pub mod api;
pub mod audio;
pub mod db;
pub mod generator;
pub mod library;
pub mod moves;
pub mod session;
pub mod timer;
pub mod tui;
pub mod workout;

pub use db::Database;
