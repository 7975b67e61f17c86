// The regular season: the full schedule in play order and a durable cursor
// so simulation can stop after any game and resume later.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{game::Game, types::TeamId};

#[derive(Debug, Serialize, Deserialize)]
#[derive(Clone)]
pub struct RegularSeason {
    year: u32,
    pub(crate) games: Vec<Game>,
    pub(crate) games_played: usize,
    pub(crate) season_over: bool,
}

// Basics.
impl RegularSeason {
    pub(crate) fn build(mut games: Vec<Game>, year: u32) -> Self {
        for (i, game) in games.iter_mut().enumerate() {
            game.set_number(i as u32 + 1);
        }

        Self {
            year,
            games,
            games_played: 0,
            season_over: false,
        }
    }

    pub fn year(&self) -> u32 {
        self.year
    }

    pub fn games(&self) -> &[Game] {
        &self.games
    }

    // Look a game up by its 1-based game number.
    pub fn game(&self, number: usize) -> Option<&Game> {
        if number < 1 || number > self.games.len() {
            return None;
        }
        Some(&self.games[number - 1])
    }

    pub fn total_games(&self) -> usize {
        self.games.len()
    }

    pub fn games_played(&self) -> usize {
        self.games_played
    }

    pub fn season_started(&self) -> bool {
        self.games_played != 0
    }

    pub fn season_over(&self) -> bool {
        self.season_over
    }
}

// Per-team views.
impl RegularSeason {
    pub fn games_for_team(&self, team: TeamId) -> Vec<&Game> {
        self.games.iter().filter(|g| g.involves(team)).collect()
    }

    pub fn total_games_for_team(&self, team: TeamId) -> usize {
        self.games.iter().filter(|g| g.involves(team)).count()
    }

    // All meetings between two teams this season.
    pub fn matchups(&self, t1: TeamId, t2: TeamId) -> Vec<&Game> {
        self.games
            .iter()
            .filter(|g| g.involves(t1) && g.involves(t2))
            .collect()
    }

    // Head-to-head record of every team in the group, restricted to played
    // games against the other members of the group.
    pub fn head_to_head(&self, group: &[TeamId]) -> HashMap<TeamId, HeadToHead> {
        let mut map = HashMap::new();
        for &team in group {
            let mut record = HeadToHead::default();
            for game in self.games.iter().filter(|g| g.played() && g.involves(team)) {
                let opponent = if game.home() == team { game.away() } else { game.home() };
                if opponent == team || !group.contains(&opponent) {
                    continue;
                }

                if let (Some(points), Some(code)) =
                    (game.points_earned(team), game.result_code(team))
                {
                    record.points += u32::from(points);
                    record.result_sum += u32::from(code);
                    record.games += 1;
                }
            }
            map.insert(team, record);
        }
        map
    }
}

// Aggregate head-to-head record of one team against a tied group.
#[derive(Debug, Serialize, Deserialize)]
#[derive(Default, Clone, Copy, PartialEq, Eq)]
pub struct HeadToHead {
    points: u32,
    result_sum: u32,
    games: u32,
}

impl HeadToHead {
    // Points per possible points against the group. No games means 0.
    pub fn point_percentage(&self) -> f64 {
        if self.games == 0 {
            return 0.0;
        }
        f64::from(self.points) / f64::from(self.games)
    }

    // Mean result code against the group.
    pub fn secondary_percentage(&self) -> f64 {
        if self.games == 0 {
            return 0.0;
        }
        f64::from(self.result_sum) / f64::from(self.games)
    }

    // Exact fraction comparisons so equal records always compare equal.
    pub(crate) fn cmp_primary(&self, other: &Self) -> Ordering {
        let lhs = u64::from(self.points) * u64::from(other.games.max(1));
        let rhs = u64::from(other.points) * u64::from(self.games.max(1));
        lhs.cmp(&rhs)
    }

    pub(crate) fn cmp_secondary(&self, other: &Self) -> Ordering {
        let lhs = u64::from(self.result_sum) * u64::from(other.games.max(1));
        let rhs = u64::from(other.result_sum) * u64::from(self.games.max(1));
        lhs.cmp(&rhs)
    }

    pub(crate) fn same_record(&self, other: &Self) -> bool {
        self.cmp_primary(other) == Ordering::Equal
            && self.cmp_secondary(other) == Ordering::Equal
    }
}
