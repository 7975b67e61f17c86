// Conferences: a set of divisions plus the policy that shapes the
// conference standings into a playoff picture.

use std::cmp::Ordering;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, SimError},
    season::RegularSeason,
    standings::{merge::merge_ordered, sort_standings, TieBreakContext},
    team::Team,
    types::{ConferenceId, DivisionId, TeamId},
};

use super::{division::Division, group::Group};

// How the conference standings are structured.
#[derive(Debug, Serialize, Deserialize)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum StandingsStructure {
    // One leader per division always occupies the top slots.
    LeaderPriority,
    // Seeding is built rank by rank out of the division standings.
    DivisionRankDependent,
    // Division leaders are only guaranteed playoffs, nothing more.
    GuaranteedPlayoffsOnly,
    // Pure point totals regardless of division rank.
    PointsOnly,
}

#[derive(Debug, Serialize, Deserialize)]
#[derive(Clone)]
pub struct Conference {
    id: ConferenceId,
    name: String,
    divisions: Vec<Division>,
    order: Vec<TeamId>,
    playoff_teams: usize,
    slots_per_division: usize,
    structure: StandingsStructure,
}

// Basics.
impl Conference {
    pub(crate) fn build(
        id: ConferenceId,
        name: &str,
        playoff_teams: usize,
        slots_per_division: usize,
        structure: StandingsStructure,
    ) -> Result<Self> {
        if playoff_teams < slots_per_division {
            return Err(SimError::InvalidConfiguration(String::from(
                "there must be more playoff spots than divisional playoff spots",
            )));
        }

        // With guaranteed leader slots only the leader itself is reserved.
        let slots_per_division = match structure {
            StandingsStructure::LeaderPriority => 1,
            _ => slots_per_division,
        };

        Ok(Self {
            id,
            name: name.to_string(),
            divisions: Vec::new(),
            order: Vec::new(),
            playoff_teams,
            slots_per_division,
            structure,
        })
    }

    pub fn id(&self) -> ConferenceId {
        self.id
    }

    pub fn structure(&self) -> StandingsStructure {
        self.structure
    }

    pub fn divisions(&self) -> &[Division] {
        &self.divisions
    }

    pub fn division(&self, id: DivisionId) -> Option<&Division> {
        self.divisions.iter().find(|d| d.id() == id)
    }

    pub(crate) fn division_mut(&mut self, id: DivisionId) -> Option<&mut Division> {
        self.divisions.iter_mut().find(|d| d.id() == id)
    }

    pub(crate) fn add_division(&mut self, division: Division) {
        self.divisions.push(division);
    }

    pub(crate) fn register_team(&mut self, team: TeamId) {
        self.order.push(team);
    }

    // Teams that make the playoffs here, capped by the conference size.
    pub fn amount_of_playoff_teams(&self) -> usize {
        self.playoff_teams.min(self.order.len())
    }

    // Teams per division that are guaranteed a playoff spot, given enough
    // playoff spots exist.
    pub fn slots_per_division(&self) -> usize {
        self.slots_per_division
    }

    // Playoff spots not reserved for division leaders.
    pub fn wildcard_count(&self) -> usize {
        let reserved: usize = self
            .divisions
            .iter()
            .map(|d| d.size().min(self.slots_per_division))
            .sum();
        if reserved > self.playoff_teams {
            return 0;
        }
        self.playoff_teams - reserved
    }
}

// Standings.
impl Conference {
    // Rebuild the conference ordering from fully re-ranked divisions, the
    // way the configured structure wants it.
    pub(crate) fn update_standings(
        &mut self,
        teams: &[Team],
        season: Option<&RegularSeason>,
        rng: &mut impl Rng,
    ) {
        for division in self.divisions.iter_mut() {
            division.update_standings(teams, season, rng);
        }

        let mut ctx = TieBreakContext::new(teams, season);
        for division in self.divisions.iter() {
            ctx.add_division(division.id(), division.team_ids());
        }

        self.order = match self.structure {
            StandingsStructure::LeaderPriority => self.leader_priority_order(&ctx, rng),
            StandingsStructure::DivisionRankDependent => self.division_rank_order(&ctx, rng),
            StandingsStructure::GuaranteedPlayoffsOnly => {
                self.guaranteed_playoffs_order(teams, &ctx, rng)
            }
            StandingsStructure::PointsOnly => self.points_only_order(&ctx, rng),
        };
    }

    fn leader_priority_order(&self, ctx: &TieBreakContext, rng: &mut impl Rng) -> Vec<TeamId> {
        let mut leaders = Vec::new();
        let mut others = Vec::new();
        for division in &self.divisions {
            if let Some((&leader, rest)) = division.team_ids().split_first() {
                leaders.push(leader);
                others.extend_from_slice(rest);
            }
        }

        sort_standings(&mut leaders, ctx, rng);
        sort_standings(&mut others, ctx, rng);
        leaders.extend(others);
        leaders
    }

    fn division_rank_order(&self, ctx: &TieBreakContext, rng: &mut impl Rng) -> Vec<TeamId> {
        let mut order = Vec::with_capacity(self.order.len());

        // Rank by rank: every division's rank-r team competes for the next
        // block of seeds.
        for rank in 0..self.slots_per_division {
            let mut pool: Vec<TeamId> = self
                .divisions
                .iter()
                .filter_map(|d| d.team_ids().get(rank).copied())
                .collect();
            sort_standings(&mut pool, ctx, rng);
            order.extend(pool);
        }

        // Non-playoff ranks are ordered on overall record alone.
        let mut remaining: Vec<TeamId> = self
            .divisions
            .iter()
            .flat_map(|d| d.team_ids().iter().skip(self.slots_per_division).copied())
            .collect();
        sort_standings(&mut remaining, ctx, rng);
        order.extend(remaining);
        order
    }

    fn guaranteed_playoffs_order(
        &self,
        teams: &[Team],
        ctx: &TieBreakContext,
        rng: &mut impl Rng,
    ) -> Vec<TeamId> {
        let mut leaders = Vec::new();
        let mut field = Vec::new();
        for division in &self.divisions {
            let ids = division.team_ids();
            let guaranteed = self.slots_per_division.min(ids.len());
            leaders.extend_from_slice(&ids[..guaranteed]);
            field.extend_from_slice(&ids[guaranteed..]);
        }

        sort_standings(&mut leaders, ctx, rng);
        sort_standings(&mut field, ctx, rng);

        let playoff_slots = self.amount_of_playoff_teams();
        let mut order = Vec::with_capacity(self.order.len());
        let mut li = 0;
        let mut fi = 0;
        while li < leaders.len() && fi < field.len() && order.len() < playoff_slots {
            let seats_left = playoff_slots - order.len();
            let take_leader = if leaders.len() - li >= seats_left {
                // Every remaining leader needs one of the seats left.
                true
            }
            else {
                match ctx.key(leaders[li]).cmp(&ctx.key(field[fi])) {
                    Ordering::Greater => true,
                    Ordering::Less => false,
                    Ordering::Equal => {
                        let division = teams[field[fi]].division();
                        if leaders[li..].iter().any(|&l| teams[l].division() == division) {
                            true
                        }
                        else {
                            rng.random_bool(0.5)
                        }
                    }
                }
            };

            if take_leader {
                order.push(leaders[li]);
                li += 1;
            }
            else {
                order.push(field[fi]);
                fi += 1;
            }
        }

        // Whoever is left fills the rest in rank order.
        let mut rest: Vec<TeamId> = leaders[li..].iter().chain(&field[fi..]).copied().collect();
        sort_standings(&mut rest, ctx, rng);
        order.extend(rest);
        order
    }

    fn points_only_order(&self, ctx: &TieBreakContext, rng: &mut impl Rng) -> Vec<TeamId> {
        let children: Vec<&[TeamId]> = self.divisions.iter().map(|d| d.team_ids()).collect();
        let mut order = merge_ordered(&children, |t| ctx.key(t));
        sort_standings(&mut order, ctx, rng);
        order
    }
}

impl Group for Conference {
    fn name(&self) -> &str {
        &self.name
    }

    fn team_ids(&self) -> &[TeamId] {
        &self.order
    }
}
