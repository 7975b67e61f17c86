// Deterministic ice hockey league season and elimination playoff
// simulation engine.

pub mod error;
pub mod game;
pub mod league;
pub mod playoffs;
pub mod schedule;
pub mod season;
pub mod standings;
pub mod team;
pub mod types;
