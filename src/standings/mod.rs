// Ranking and tie-breaking shared by division, conference and league
// standings. Orderings are always best first.

pub mod merge;

use std::cmp::Ordering;
use std::collections::HashMap;
use std::ops::Range;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::{
    season::RegularSeason,
    team::Team,
    types::{DivisionId, TeamId},
};

// Comparator key for the standings: points, exact points percentage,
// regulation wins, overtime wins. Two teams are tied iff every component
// compares equal.
#[derive(Debug, Clone, Copy)]
pub struct StandingKey {
    points: u32,
    pct_num: u32,
    pct_den: u32,
    regulation_wins: u32,
    overtime_wins: u32,
}

impl StandingKey {
    pub fn of(team: &Team) -> Self {
        let (pct_num, pct_den) = team.points_fraction();
        Self {
            points: team.points(),
            pct_num,
            pct_den,
            regulation_wins: team.regulation_wins(),
            overtime_wins: team.overtime_wins(),
        }
    }

    // Percentages compare as exact fractions, never as rounded floats.
    fn cmp_percentage(&self, other: &Self) -> Ordering {
        let lhs = u64::from(self.pct_num) * u64::from(other.pct_den);
        let rhs = u64::from(other.pct_num) * u64::from(self.pct_den);
        lhs.cmp(&rhs)
    }
}

impl PartialEq for StandingKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for StandingKey {}

impl PartialOrd for StandingKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StandingKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.points
            .cmp(&other.points)
            .then_with(|| self.cmp_percentage(other))
            .then_with(|| self.regulation_wins.cmp(&other.regulation_wins))
            .then_with(|| self.overtime_wins.cmp(&other.overtime_wins))
    }
}

// Where a team currently sits inside its division. Feeds the fairness
// correction of the random tie-break fallback.
#[derive(Debug, Clone, Copy)]
pub struct DivisionSlot {
    pub division: DivisionId,
    pub seeding: usize,
}

// Everything the cascade needs to know about the scope it is sorting.
pub struct TieBreakContext<'a> {
    teams: &'a [Team],
    season: Option<&'a RegularSeason>,
    slots: HashMap<TeamId, DivisionSlot>,
}

impl<'a> TieBreakContext<'a> {
    pub fn new(teams: &'a [Team], season: Option<&'a RegularSeason>) -> Self {
        Self {
            teams,
            season,
            slots: HashMap::new(),
        }
    }

    // Register a division's current ordering. Call before sorting a scope
    // that contains the division's teams.
    pub fn add_division(&mut self, division: DivisionId, order: &[TeamId]) {
        for (seeding, &team) in order.iter().enumerate() {
            self.slots.insert(team, DivisionSlot { division, seeding });
        }
    }

    pub fn key(&self, team: TeamId) -> StandingKey {
        StandingKey::of(&self.teams[team])
    }

    fn slot(&self, team: TeamId) -> Option<DivisionSlot> {
        self.slots.get(&team).copied()
    }
}

// Maximal runs of comparator-tied teams in an already sorted ordering.
// Only runs of two or more are reported.
pub fn tied_ranges<F>(order: &[TeamId], key_of: F) -> Vec<Range<usize>>
where
    F: Fn(TeamId) -> StandingKey,
{
    let mut ranges = Vec::new();
    let mut start = 0;
    while start < order.len() {
        let key = key_of(order[start]);
        let mut end = start + 1;
        while end < order.len() && key_of(order[end]) == key {
            end += 1;
        }
        if end - start > 1 {
            ranges.push(start..end);
        }
        start = end;
    }
    ranges
}

// Sort an ordering by the comparator and resolve every tied run, first
// through head-to-head records, then through the divisionally fair shuffle.
pub fn sort_standings(order: &mut [TeamId], ctx: &TieBreakContext, rng: &mut impl Rng) {
    order.sort_by(|&a, &b| ctx.key(b).cmp(&ctx.key(a)));
    for range in tied_ranges(order, |t| ctx.key(t)) {
        resolve_tied_run(&mut order[range], ctx, rng);
    }
}

fn resolve_tied_run(run: &mut [TeamId], ctx: &TieBreakContext, rng: &mut impl Rng) {
    let Some(season) = ctx.season else {
        // No season yet, so no head-to-head data either.
        divisional_fair_shuffle(run, ctx, rng);
        return;
    };

    // Re-rank the run by record inside the tied group alone.
    let records = season.head_to_head(run);
    run.sort_by(|a, b| {
        let (ra, rb) = (&records[a], &records[b]);
        rb.cmp_primary(ra).then_with(|| rb.cmp_secondary(ra))
    });

    // Whatever head-to-head could not separate goes to chance.
    let mut start = 0;
    while start < run.len() {
        let mut end = start + 1;
        while end < run.len() && records[&run[end]].same_record(&records[&run[start]]) {
            end += 1;
        }
        if end - start > 1 {
            divisional_fair_shuffle(&mut run[start..end], ctx, rng);
        }
        start = end;
    }
}

// Random base order with the divisional fairness correction: each slot takes
// the still-pooled candidate from the slot owner's division, worst current
// divisional seeding first, so a division's best-ranked team lands in the
// latest of its division's slots.
fn divisional_fair_shuffle(run: &mut [TeamId], ctx: &TieBreakContext, rng: &mut impl Rng) {
    run.shuffle(rng);

    let mut pools: HashMap<DivisionId, Vec<TeamId>> = HashMap::new();
    for &team in run.iter() {
        if let Some(slot) = ctx.slot(team) {
            pools.entry(slot.division).or_default().push(team);
        }
    }
    for pool in pools.values_mut() {
        pool.sort_by_key(|&t| ctx.slot(t).map(|s| s.seeding).unwrap_or(usize::MAX));
    }

    for i in 0..run.len() {
        let Some(slot) = ctx.slot(run[i]) else {
            continue;
        };
        if let Some(team) = pools.get_mut(&slot.division).and_then(Vec::pop) {
            run[i] = team;
        }
    }
}
