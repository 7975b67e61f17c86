// Custom types that are widely used are defined here.

// Arena and group index types.
pub type TeamId = usize;
pub type ConferenceId = usize;
pub type DivisionId = usize;

// 1-based rank position within a group.
pub type Seed = usize;
