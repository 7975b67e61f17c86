// Divisions: the innermost group of teams.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    season::RegularSeason,
    standings::{sort_standings, TieBreakContext},
    team::Team,
    types::{DivisionId, TeamId},
};

use super::group::Group;

#[derive(Debug, Serialize, Deserialize)]
#[derive(Clone)]
pub struct Division {
    id: DivisionId,
    name: String,
    order: Vec<TeamId>,
}

impl Division {
    pub(crate) fn build(id: DivisionId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            order: Vec::new(),
        }
    }

    pub fn id(&self) -> DivisionId {
        self.id
    }

    pub(crate) fn add_team(&mut self, team: TeamId) {
        self.order.push(team);
    }

    // Re-rank the division. The pre-sort ordering doubles as the divisional
    // seeding the fairness fallback reads.
    pub(crate) fn update_standings(
        &mut self,
        teams: &[Team],
        season: Option<&RegularSeason>,
        rng: &mut impl Rng,
    ) {
        let mut ctx = TieBreakContext::new(teams, season);
        ctx.add_division(self.id, &self.order);
        sort_standings(&mut self.order, &ctx, rng);
    }
}

impl Group for Division {
    fn name(&self) -> &str {
        &self.name
    }

    fn team_ids(&self) -> &[TeamId] {
        &self.order
    }
}
