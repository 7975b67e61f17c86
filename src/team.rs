// Teams and their per-season state.

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use statrs::distribution::{Continuous, ContinuousCDF, Normal};

use crate::types::{ConferenceId, DivisionId, TeamId};

// Prior distribution of team skill levels. 5000 is about average once health
// is factored in, 4500 is really bad and 5500 is really good.
pub const SKILL_MEAN: f64 = 6250.0;
pub const SKILL_STD: f64 = 750.0;

#[derive(Debug, Serialize, Deserialize)]
#[derive(Clone)]
pub struct Team {
    id: TeamId,
    city: String,
    name: String,
    abbreviation: String,
    division: DivisionId,
    conference: ConferenceId,

    // Season counters. Points are always 2 * (wins + ot_wins) + ot_losses.
    regular_wins: u32,
    ot_wins: u32,
    ot_losses: u32,
    regular_losses: u32,
    made_playoffs: bool,

    // How far the team got this season. -1 means missed the playoffs, 0 is
    // undecided, n means the team reached round n, and one past the last
    // round means champions.
    result: i32,

    // Skill model state.
    skill: f64,
    pre_season_skill: f64,
    health: f64,
}

// Basics.
impl Team {
    pub(crate) fn build(
        id: TeamId,
        city: &str,
        name: &str,
        abbreviation: &str,
        division: DivisionId,
        conference: ConferenceId,
        skill: f64,
    ) -> Self {
        Self {
            id,
            city: city.to_string(),
            name: name.to_string(),
            abbreviation: abbreviation.to_string(),
            division,
            conference,
            regular_wins: 0,
            ot_wins: 0,
            ot_losses: 0,
            regular_losses: 0,
            made_playoffs: false,
            result: 0,
            skill,
            pre_season_skill: skill,
            health: 1.0,
        }
    }

    pub fn id(&self) -> TeamId {
        self.id
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn abbreviation(&self) -> &str {
        &self.abbreviation
    }

    pub fn division(&self) -> DivisionId {
        self.division
    }

    pub fn conference(&self) -> ConferenceId {
        self.conference
    }
}

// Season counters.
impl Team {
    // Total wins as shown in the standings, overtime wins included.
    pub fn wins(&self) -> u32 {
        self.regular_wins + self.ot_wins
    }

    pub fn regulation_wins(&self) -> u32 {
        self.regular_wins
    }

    pub fn overtime_wins(&self) -> u32 {
        self.ot_wins
    }

    // Losses as shown in the standings, overtime losses not included.
    pub fn losses(&self) -> u32 {
        self.regular_losses
    }

    pub fn overtime_losses(&self) -> u32 {
        self.ot_losses
    }

    pub fn total_losses(&self) -> u32 {
        self.regular_losses + self.ot_losses
    }

    // 2 points for each win, 1 point for an overtime loss.
    pub fn points(&self) -> u32 {
        2 * self.wins() + self.ot_losses
    }

    pub fn games_played(&self) -> u32 {
        self.regular_wins + self.ot_wins + self.ot_losses + self.regular_losses
    }

    // Proportion of points achieved to points possible. A team with no games
    // played sits at a neutral 0.5.
    pub fn points_percentage(&self) -> f64 {
        let (num, den) = self.points_fraction();
        f64::from(num) / f64::from(den)
    }

    // The exact fraction behind points_percentage, for comparisons that must
    // not round.
    pub(crate) fn points_fraction(&self) -> (u32, u32) {
        if self.games_played() == 0 {
            return (1, 2);
        }
        (self.points(), 2 * self.games_played())
    }

    // Apply a game result code: 3 regulation win, 2 overtime win,
    // 1 overtime loss, 0 regulation loss.
    pub(crate) fn apply_game_result(&mut self, code: u8) {
        match code {
            3 => self.regular_wins += 1,
            2 => self.ot_wins += 1,
            1 => self.ot_losses += 1,
            _ => self.regular_losses += 1,
        }
    }

    pub fn made_playoffs(&self) -> bool {
        self.made_playoffs
    }

    pub(crate) fn set_made_playoffs(&mut self) {
        self.made_playoffs = true;
    }

    pub fn season_result(&self) -> i32 {
        self.result
    }

    pub(crate) fn set_season_result(&mut self, result: i32) {
        self.result = result;
    }

    // The result only ever advances while the team survives playoff rounds.
    pub(crate) fn increment_result(&mut self) {
        self.result += 1;
    }

    // Reset all stats for a new season.
    pub(crate) fn new_season(&mut self) {
        self.regular_wins = 0;
        self.ot_wins = 0;
        self.ot_losses = 0;
        self.regular_losses = 0;
        self.made_playoffs = false;
        self.result = 0;
    }
}

// Skill model. A random walk with Metropolis-style acceptance against a
// Gaussian prior, plus a health walk against a polynomial prior.
impl Team {
    // Skill level with health and injury issues factored in.
    pub fn effective_skill(&self) -> f64 {
        let standard = standard_normal();
        let percentile = standard.cdf((self.skill - SKILL_MEAN) / SKILL_STD) * self.health;
        SKILL_MEAN + SKILL_STD * standard.inverse_cdf(percentile).clamp(-8.0, 8.0)
    }

    // Skill level ignoring health.
    pub fn true_skill(&self) -> f64 {
        self.skill
    }

    pub fn pre_season_skill(&self) -> f64 {
        self.pre_season_skill
    }

    pub fn health_rating(&self) -> f64 {
        self.health
    }

    pub fn set_skill(&mut self, skill: f64) {
        self.skill = skill;
    }

    // Throw the current skill level away and draw a fresh one from the prior.
    pub fn reset_skill(&mut self, rng: &mut impl Rng) {
        let gauss: f64 = rng.sample(StandardNormal);
        self.skill = SKILL_MEAN + SKILL_STD * gauss;
    }

    pub(crate) fn snapshot_pre_season_skill(&mut self) {
        self.pre_season_skill = self.skill;
    }

    // Per-game skill update. The proposal magnitude is drawn from weighted
    // tiers so most updates are small and a few are large.
    pub(crate) fn change_skill(&mut self, in_season: bool, rng: &mut impl Rng) {
        let tier = random_with_weights(&[3, 6, 18, 54, 79], rng);
        self.propose_skill_change([16.0, 8.0, 4.0, 2.0, 1.0][tier], rng);
        self.propose_health_change(!in_season, rng);
    }

    // Off-season update. Smaller top tier than the in-season walk.
    pub(crate) fn off_season_change_skill(&mut self, rng: &mut impl Rng) {
        let tier = random_with_weights(&[9, 18, 54, 119], rng);
        self.propose_skill_change([8.0, 4.0, 2.0, 1.0][tier], rng);
        self.propose_health_change(false, rng);
    }

    fn propose_skill_change(&mut self, val: f64, rng: &mut impl Rng) {
        let par = val * rng.random::<f64>();
        let mut change = SKILL_STD.sqrt() * exponential(par, rng);
        if rng.random_bool(0.5) {
            change = -change;
        }

        let proposed = self.skill + change;
        let prior = Normal::new(SKILL_MEAN, SKILL_STD).unwrap();
        if rng.random::<f64>() < acceptance(prior.pdf(proposed), prior.pdf(self.skill)) {
            self.skill = proposed;
        }
    }

    fn propose_health_change(&mut self, off_season_steps: bool, rng: &mut impl Rng) {
        let step = if off_season_steps {
            if rng.random_range(0..3) == 0 {
                -0.25 + 2.0 * rng.random::<f64>()
            }
            else {
                -0.0025 + 0.02 * rng.random::<f64>()
            }
        }
        else if rng.random_range(0..3) == 0 {
            -1.0 + 2.0 * rng.random::<f64>()
        }
        else {
            -0.01 + 0.02 * rng.random::<f64>()
        };

        let proposed = self.health + step;
        if rng.random::<f64>() < acceptance(health_pdf(proposed), health_pdf(self.health)) {
            self.health = proposed;
        }
    }
}

// Acceptance probability of a proposed move given the prior likelihoods.
fn acceptance(proposed: f64, current: f64) -> f64 {
    if current == 0.0 {
        if proposed > 0.0 {
            return 1.0;
        }
        return 0.0;
    }
    (proposed / current).min(1.0)
}

// Density the health rating walks against. Zero outside (0, 1), so health
// can never leave that interval once inside it.
fn health_pdf(val: f64) -> f64 {
    if val > 0.0 && val < 1.0 {
        return 4.0 * val.powi(5);
    }
    0.0
}

// G(u) = -lambda * ln(1 - u) for uniform u.
fn exponential(lambda: f64, rng: &mut impl Rng) -> f64 {
    -lambda * (1.0 - rng.random::<f64>()).ln()
}

// Weighted randomness. Return the winning index.
fn random_with_weights(weights: &[u32], rng: &mut impl Rng) -> usize {
    let total: u32 = weights.iter().sum();
    let random = rng.random_range(0..total);

    let mut counter = 0;
    for (i, weight) in weights.iter().enumerate() {
        counter += weight;
        if random < counter {
            return i;
        }
    }

    panic!("total weight was {total}, random was {random}");
}

fn standard_normal() -> Normal {
    Normal::new(0.0, 1.0).unwrap()
}
