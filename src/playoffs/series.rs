// Best-of-N playoff series between two seeded teams.

use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    game::{Game, GameKind, OutcomeModel},
    team::Team,
    types::TeamId,
};

// Who hosts each game: positive entries put the higher seed at home,
// negative entries the lower seed, zero is neutral ice.
pub const HOME_ICE_PATTERN: [i8; 7] = [1, 1, -1, -1, 1, -1, 1];

#[derive(Debug, Serialize, Deserialize)]
#[derive(Clone)]
pub struct Series {
    lower_seed: TeamId,
    higher_seed: TeamId,
    games: Vec<Game>,
    // wins[0] belongs to the lower seed, wins[1] to the higher seed.
    wins: [u32; 2],
    games_played: usize,
    winner: Option<TeamId>,
}

// Basics.
impl Series {
    // Lay the whole series out up front from the home-ice pattern. An even
    // pattern gets one neutral-ice decider appended so someone always wins.
    pub fn build(lower_seed: TeamId, higher_seed: TeamId, pattern: &[i8]) -> Self {
        let mut games = Vec::with_capacity(pattern.len() + 1);
        for &slot in pattern {
            let game = if slot > 0 {
                Game::build(higher_seed, lower_seed, GameKind::Playoff)
            }
            else if slot < 0 {
                Game::build(lower_seed, higher_seed, GameKind::Playoff)
            }
            else {
                let mut neutral = Game::build(higher_seed, lower_seed, GameKind::Playoff);
                neutral.set_neutral(true);
                neutral
            };
            games.push(game);
        }
        if pattern.len() % 2 == 0 {
            let mut decider = Game::build(higher_seed, lower_seed, GameKind::Playoff);
            decider.set_neutral(true);
            games.push(decider);
        }

        for (i, game) in games.iter_mut().enumerate() {
            game.set_number(i as u32 + 1);
        }

        Self {
            lower_seed,
            higher_seed,
            games,
            wins: [0, 0],
            games_played: 0,
            winner: None,
        }
    }

    pub fn lower_seed(&self) -> TeamId {
        self.lower_seed
    }

    pub fn higher_seed(&self) -> TeamId {
        self.higher_seed
    }

    pub fn games(&self) -> &[Game] {
        &self.games
    }

    pub fn games_played(&self) -> usize {
        self.games_played
    }

    // Wins needed to take the series.
    pub fn games_to_win(&self) -> u32 {
        self.games.len() as u32 / 2 + 1
    }

    // Series wins so far for one of the participants.
    pub fn wins_for(&self, team: TeamId) -> Option<u32> {
        if team == self.lower_seed {
            return Some(self.wins[0]);
        }
        if team == self.higher_seed {
            return Some(self.wins[1]);
        }
        None
    }

    // None until one side clinches.
    pub fn winner(&self) -> Option<TeamId> {
        self.winner
    }

    pub fn loser(&self) -> Option<TeamId> {
        match self.winner {
            Some(w) if w == self.lower_seed => Some(self.higher_seed),
            Some(_) => Some(self.lower_seed),
            _ => None,
        }
    }

    pub fn in_progress(&self) -> bool {
        self.winner.is_none()
    }

    // Whether the game is already known to be needed. Games past the point
    // where one side may have clinched are "not yet necessary".
    pub fn necessary_game(&self, game_number: usize) -> bool {
        let best = u32::max(self.wins[0], self.wins[1]) as usize;
        self.games_played + self.games_to_win() as usize - best >= game_number
    }
}

// Simulation. The cursor is durable: a series can be driven game by game
// and picked up again later.
impl Series {
    // Play in order until the given game number, stopping the moment either
    // side reaches the clinch threshold.
    pub fn sim_to_game<M: OutcomeModel + ?Sized>(
        &mut self,
        game_number: usize,
        teams: &mut [Team],
        model: &mut M,
        rng: &mut impl Rng,
    ) {
        let target = game_number.min(self.games.len());
        let needed = self.games_to_win();

        while self.games_played < target && self.wins[0] < needed && self.wins[1] < needed {
            let game = &mut self.games[self.games_played];
            game.simulate(teams, model, rng);
            if game.winner() == Some(self.lower_seed) {
                self.wins[0] += 1;
            }
            else {
                self.wins[1] += 1;
            }
            self.games_played += 1;
        }

        if self.wins[0] == needed {
            self.winner = Some(self.lower_seed);
        }
        else if self.wins[1] == needed {
            self.winner = Some(self.higher_seed);
        }
        if let Some(winner) = self.winner {
            debug!(
                "series decided: #{winner} takes it {}-{}",
                self.wins.iter().max().unwrap_or(&0),
                self.wins.iter().min().unwrap_or(&0)
            );
        }
    }

    pub fn sim_series<M: OutcomeModel + ?Sized>(
        &mut self,
        teams: &mut [Team],
        model: &mut M,
        rng: &mut impl Rng,
    ) {
        self.sim_to_game(self.games.len(), teams, model, rng);
    }

    pub fn sim_next_game<M: OutcomeModel + ?Sized>(
        &mut self,
        teams: &mut [Team],
        model: &mut M,
        rng: &mut impl Rng,
    ) {
        self.sim_to_game(self.games_played + 1, teams, model, rng);
    }

    pub fn sim_next_games<M: OutcomeModel + ?Sized>(
        &mut self,
        amount: usize,
        teams: &mut [Team],
        model: &mut M,
        rng: &mut impl Rng,
    ) {
        self.sim_to_game(self.games_played + amount, teams, model, rng);
    }
}
