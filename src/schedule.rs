// Schedule generators for the regular season.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::{
    game::{Game, GameKind},
    league::{group::Group, League},
};

// Every pair of teams meets twice, once in each building.
pub fn double_round_robin(league: &League, rng: &mut impl Rng) -> Vec<Game> {
    let mut games = Vec::new();
    for home in league.teams() {
        for away in league.teams() {
            if home.id() != away.id() {
                games.push(Game::build(home.id(), away.id(), GameKind::RegularSeason));
            }
        }
    }

    games.shuffle(rng);
    games
}

// A division-only schedule: intra-division opponents meet `meetings` times
// with the venue alternating between them.
pub fn divisional_schedule(league: &League, meetings: u32, rng: &mut impl Rng) -> Vec<Game> {
    let mut games = Vec::new();
    for division in league.divisions() {
        let ids = division.team_ids();
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                for meeting in 0..meetings {
                    let (home, away) = if meeting % 2 == 0 {
                        (ids[i], ids[j])
                    }
                    else {
                        (ids[j], ids[i])
                    };
                    games.push(Game::build(home, away, GameKind::RegularSeason));
                }
            }
        }
    }

    games.shuffle(rng);
    games
}
