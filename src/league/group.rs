// The capability shared by divisions, conferences and the league itself.

use crate::error::{Result, SimError};
use crate::types::{Seed, TeamId};

// Every group keeps its members ordered by current standing, best first.
// Seedings are 1-based.
pub trait Group {
    fn name(&self) -> &str;

    fn team_ids(&self) -> &[TeamId];

    fn size(&self) -> usize {
        self.team_ids().len()
    }

    fn leader(&self) -> Option<TeamId> {
        self.team_ids().first().copied()
    }

    fn last(&self) -> Option<TeamId> {
        self.team_ids().last().copied()
    }

    // The seeding of a team in this group, or TeamNotFound.
    fn seeding_of_team(&self, team: TeamId) -> Result<Seed> {
        match self.team_ids().iter().position(|&t| t == team) {
            Some(index) => Ok(index + 1),
            _ => Err(SimError::TeamNotFound {
                team,
                group: self.name().to_string(),
            }),
        }
    }

    // The team at a seeding, or SeedOutOfRange for anything outside [1, size].
    fn team_at_seed(&self, seed: Seed) -> Result<TeamId> {
        if seed < 1 || seed > self.size() {
            return Err(SimError::SeedOutOfRange {
                seed,
                group: self.name().to_string(),
            });
        }
        Ok(self.team_ids()[seed - 1])
    }
}
