// Individual games and the outcome model that decides them.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::{team::Team, types::TeamId};

// Multiplier the home team's effective skill gets on non-neutral ice.
pub const HOME_ADVANTAGE: f64 = 1.15;

// Exponent flattening the skill-share curve into a win probability.
const PROB_CURVE_ROOT: f64 = 0.6;

// Exhibitions affect nothing, regular season games move the standings and
// the skill walks, playoff games move only the skill walks.
#[derive(Debug, Serialize, Deserialize)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum GameKind {
    Exhibition,
    RegularSeason,
    Playoff,
}

// What the outcome model decided for a single game.
#[derive(Debug, Clone, Copy)]
pub struct Outcome {
    pub home_won: bool,
    pub overtimes: u32,
}

// The seam between the league machinery and whatever decides who wins.
// Tests stub this; production uses SkillModel.
pub trait OutcomeModel {
    fn simulate(
        &mut self,
        home: &Team,
        away: &Team,
        kind: GameKind,
        neutral: bool,
        rng: &mut dyn RngCore,
    ) -> Outcome;
}

#[derive(Debug, Serialize, Deserialize)]
#[derive(Clone)]
pub struct Game {
    number: u32,
    home: TeamId,
    away: TeamId,
    kind: GameKind,
    neutral: bool,
    winner: Option<TeamId>,
    overtimes: u32,
    played: bool,
}

// Basics.
impl Game {
    pub fn build(home: TeamId, away: TeamId, kind: GameKind) -> Self {
        Self {
            number: 0,
            home,
            away,
            kind,
            neutral: false,
            winner: None,
            overtimes: 0,
            played: false,
        }
    }

    pub fn home(&self) -> TeamId {
        self.home
    }

    pub fn away(&self) -> TeamId {
        self.away
    }

    pub fn kind(&self) -> GameKind {
        self.kind
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub(crate) fn set_number(&mut self, number: u32) {
        self.number = number;
    }

    pub fn neutral(&self) -> bool {
        self.neutral
    }

    pub(crate) fn set_neutral(&mut self, neutral: bool) {
        self.neutral = neutral;
    }

    pub fn played(&self) -> bool {
        self.played
    }

    pub fn went_to_overtime(&self) -> bool {
        self.overtimes > 0
    }

    pub fn overtimes(&self) -> u32 {
        self.overtimes
    }

    // None until the game has been played.
    pub fn winner(&self) -> Option<TeamId> {
        self.winner
    }

    pub fn loser(&self) -> Option<TeamId> {
        match self.winner {
            Some(w) if w == self.home => Some(self.away),
            Some(_) => Some(self.home),
            _ => None,
        }
    }

    pub fn involves(&self, team: TeamId) -> bool {
        self.home == team || self.away == team
    }
}

// Results.
impl Game {
    // Result code for one of the participants: 3 regulation win, 2 overtime
    // win, 1 overtime loss, 0 regulation loss. None until played.
    pub fn result_code(&self, team: TeamId) -> Option<u8> {
        if !self.involves(team) {
            return None;
        }
        let winner = self.winner?;
        if winner == team {
            if self.overtimes == 0 {
                return Some(3);
            }
            return Some(2);
        }
        if self.overtimes == 0 {
            return Some(0);
        }
        Some(1)
    }

    // Standings points the team took out of this game: 0, 1 or 2.
    pub fn points_earned(&self, team: TeamId) -> Option<u8> {
        match self.result_code(team)? {
            3 => Some(2),
            code => Some(code),
        }
    }

    // Simulate the game once. Games already played stay as they are.
    pub fn simulate<M: OutcomeModel + ?Sized>(
        &mut self,
        teams: &mut [Team],
        model: &mut M,
        rng: &mut impl Rng,
    ) {
        if self.played {
            return;
        }

        let outcome = model.simulate(
            &teams[self.home],
            &teams[self.away],
            self.kind,
            self.neutral,
            rng,
        );
        self.winner = Some(if outcome.home_won { self.home } else { self.away });
        self.overtimes = outcome.overtimes;
        self.played = true;

        let (home, away) = pair_mut(teams, self.home, self.away);
        match self.kind {
            GameKind::RegularSeason => {
                let home_code = match (outcome.home_won, outcome.overtimes > 0) {
                    (true, false) => 3,
                    (true, true) => 2,
                    (false, true) => 1,
                    (false, false) => 0,
                };
                home.apply_game_result(home_code);
                away.apply_game_result(3 - home_code);
                home.change_skill(true, rng);
                away.change_skill(true, rng);
            }
            GameKind::Playoff => {
                home.change_skill(true, rng);
                away.change_skill(true, rng);
            }
            GameKind::Exhibition => {}
        }
    }
}

// Two distinct mutable borrows out of the team arena.
fn pair_mut(teams: &mut [Team], a: TeamId, b: TeamId) -> (&mut Team, &mut Team) {
    debug_assert_ne!(a, b);
    if a < b {
        let (left, right) = teams.split_at_mut(b);
        (&mut left[a], &mut right[0])
    }
    else {
        let (left, right) = teams.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

// The default outcome model: win and overtime probabilities derived from the
// two teams' health-adjusted skill levels.
#[derive(Debug, Default, Clone, Copy)]
pub struct SkillModel;

impl OutcomeModel for SkillModel {
    fn simulate(
        &mut self,
        home: &Team,
        away: &Team,
        kind: GameKind,
        neutral: bool,
        rng: &mut dyn RngCore,
    ) -> Outcome {
        // On neutral ice the multiplier cancels out of the home skill.
        let no_advantage = if neutral { HOME_ADVANTAGE } else { 1.0 };
        let home_skill = home.effective_skill() * HOME_ADVANTAGE / no_advantage;
        let away_skill = away.effective_skill();

        let home_is_better = home_skill > away_skill;
        let (better, worse) = if home_is_better {
            (home_skill, away_skill)
        }
        else {
            (away_skill, home_skill)
        };
        let share = better / (better + worse);
        let win_prob = (share - 0.5).powf(PROB_CURVE_ROOT) + 0.5;

        let (better_won, overtimes) = match kind {
            GameKind::Playoff => playoff_outcome(share, win_prob, rng),
            _ => regulation_outcome(share, win_prob, rng),
        };

        Outcome {
            home_won: better_won == home_is_better,
            overtimes,
        }
    }
}

// Regular season and exhibition games: at most a single overtime.
fn regulation_outcome(share: f64, win_prob: f64, rng: &mut dyn RngCore) -> (bool, u32) {
    let ot_prob = 0.28 - 0.4 * (share - 0.5).abs().powf(PROB_CURVE_ROOT);
    let p = rng.random::<f64>();

    if p < ot_prob {
        // Overtime flattens the favourite's edge.
        (p < ot_prob * ((win_prob - 0.5) / 4.0 + 0.5), 1)
    }
    else {
        (p < ot_prob + win_prob * (1.0 - ot_prob), 0)
    }
}

// Playoff games play sudden-death periods until someone scores, so the
// overtime count follows a geometric cascade.
fn playoff_outcome(share: f64, win_prob: f64, rng: &mut dyn RngCore) -> (bool, u32) {
    let ot_prob = 0.27 - 0.4 * (share - 0.5).abs().powf(PROB_CURVE_ROOT);
    let p = rng.random::<f64>();

    let mut overtimes: u32 = 0;
    while p < (ot_prob * 0.9).powi(overtimes as i32 + 1) {
        overtimes += 1;
    }

    if overtimes == 0 {
        return (p < ot_prob + win_prob * (1.0 - ot_prob), 0);
    }

    let win_prob = (win_prob - 0.5) / 2.0 + 0.5;
    let n = overtimes as i32;
    let better_won = p < ot_prob.powi(n + 1) + win_prob * (ot_prob.powi(n) - ot_prob.powi(n + 1));
    (better_won, overtimes)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use crate::team::SKILL_MEAN;

    use super::*;

    fn teams() -> Vec<Team> {
        vec![
            Team::build(0, "Boston", "Bruins", "BOS", 0, 0, SKILL_MEAN + 2000.0),
            Team::build(1, "Buffalo", "Sabres", "BUF", 0, 0, SKILL_MEAN - 2000.0),
        ]
    }

    #[test]
    fn unplayed_game_answers_nothing() {
        let game = Game::build(0, 1, GameKind::RegularSeason);
        assert_eq!(game.winner(), None);
        assert_eq!(game.loser(), None);
        assert_eq!(game.result_code(0), None);
        assert!(!game.played());
    }

    #[test]
    fn result_codes_and_points_match() {
        let mut teams = teams();
        let mut game = Game::build(0, 1, GameKind::RegularSeason);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        game.simulate(&mut teams, &mut SkillModel, &mut rng);

        let winner = game.winner().unwrap();
        let loser = game.loser().unwrap();
        if game.went_to_overtime() {
            assert_eq!(game.result_code(winner), Some(2));
            assert_eq!(game.result_code(loser), Some(1));
            assert_eq!(game.points_earned(loser), Some(1));
        }
        else {
            assert_eq!(game.result_code(winner), Some(3));
            assert_eq!(game.result_code(loser), Some(0));
            assert_eq!(game.points_earned(loser), Some(0));
        }
        assert_eq!(game.points_earned(winner), Some(2));
        assert_eq!(game.result_code(99), None);

        // Regular season games feed the standings counters.
        assert_eq!(teams[winner].games_played(), 1);
        assert_eq!(teams[winner].points(), 2);
    }

    #[test]
    fn games_are_simulated_at_most_once() {
        let mut teams = teams();
        let mut game = Game::build(0, 1, GameKind::RegularSeason);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        game.simulate(&mut teams, &mut SkillModel, &mut rng);
        let first_winner = game.winner();
        game.simulate(&mut teams, &mut SkillModel, &mut rng);

        assert_eq!(game.winner(), first_winner);
        assert_eq!(teams[0].games_played() + teams[1].games_played(), 2);
    }

    #[test]
    fn the_much_better_team_usually_wins() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut wins = 0;
        for _ in 0..200 {
            let mut teams = teams();
            let mut game = Game::build(0, 1, GameKind::RegularSeason);
            game.simulate(&mut teams, &mut SkillModel, &mut rng);
            if game.winner() == Some(0) {
                wins += 1;
            }
        }
        assert!(wins > 140, "expected a heavy favourite, got {wins}/200");
    }

    #[test]
    fn home_ice_matters_unless_the_site_is_neutral() {
        // Two equal teams: the host should win noticeably more than half the
        // time, but on neutral ice the edge has to vanish.
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut home_wins = 0;
        let mut neutral_wins = 0;
        for _ in 0..300 {
            let mut teams = vec![
                Team::build(0, "Boston", "Bruins", "BOS", 0, 0, SKILL_MEAN),
                Team::build(1, "Buffalo", "Sabres", "BUF", 0, 0, SKILL_MEAN),
            ];
            let mut game = Game::build(0, 1, GameKind::Exhibition);
            game.simulate(&mut teams, &mut SkillModel, &mut rng);
            if game.winner() == Some(0) {
                home_wins += 1;
            }

            let mut neutral = Game::build(0, 1, GameKind::Exhibition);
            neutral.set_neutral(true);
            neutral.simulate(&mut teams, &mut SkillModel, &mut rng);
            if neutral.winner() == Some(0) {
                neutral_wins += 1;
            }
        }

        assert!(home_wins > 160, "home ice should help, got {home_wins}/300");
        assert!(
            (120..=180).contains(&neutral_wins),
            "neutral ice should be even, got {neutral_wins}/300"
        );
    }

    #[test]
    fn exhibitions_touch_nothing() {
        let mut teams = teams();
        let skills = (teams[0].true_skill(), teams[1].true_skill());
        let mut game = Game::build(0, 1, GameKind::Exhibition);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        game.simulate(&mut teams, &mut SkillModel, &mut rng);

        assert!(game.played());
        assert_eq!(teams[0].games_played(), 0);
        assert_eq!(teams[1].games_played(), 0);
        assert_eq!(skills, (teams[0].true_skill(), teams[1].true_skill()));
    }
}
