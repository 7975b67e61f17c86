// Single-elimination brackets over a seeded field of teams.

use std::collections::HashMap;

use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    game::OutcomeModel,
    team::Team,
    types::{Seed, TeamId},
};

use super::series::{Series, HOME_ICE_PATTERN};

// How the field is re-paired between rounds.
#[derive(Debug, Serialize, Deserialize)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Discipline {
    // Losers drop to the back and the survivors re-pair by current order.
    Reseeding,
    // Winners take over the higher slot; the bracket shape stays fixed.
    FixedBracket,
}

#[derive(Debug, Serialize, Deserialize)]
#[derive(Clone)]
pub struct Bracket {
    discipline: Discipline,
    field: Vec<TeamId>,
    // Conference seeding snapshot, used to keep fixed brackets symmetric.
    external_seeds: HashMap<TeamId, Seed>,
    rounds: Vec<Vec<Series>>,
    round_number: usize,
    teams_remaining: usize,
}

// Basics.
impl Bracket {
    // Build a bracket over a field ordered best seed first. The first round
    // is paired immediately.
    pub fn build(field: Vec<TeamId>, discipline: Discipline, teams: &mut [Team]) -> Self {
        let seeds = field.iter().enumerate().map(|(i, &t)| (t, i + 1)).collect();
        Self::build_with_seeds(field, discipline, seeds, teams)
    }

    // The orchestrator seeds brackets whose field order differs from the
    // conference standings (divisional sub-brackets and the finals).
    pub(crate) fn build_with_seeds(
        field: Vec<TeamId>,
        discipline: Discipline,
        external_seeds: HashMap<TeamId, Seed>,
        teams: &mut [Team],
    ) -> Self {
        let teams_remaining = field.len();
        let mut bracket = Self {
            discipline,
            field,
            external_seeds,
            rounds: Vec::new(),
            round_number: 0,
            teams_remaining,
        };
        bracket.next_round(teams);
        bracket
    }

    pub fn number_of_teams(&self) -> usize {
        self.field.len()
    }

    pub fn teams_remaining(&self) -> usize {
        self.teams_remaining
    }

    pub fn rounds(&self) -> &[Vec<Series>] {
        &self.rounds
    }

    pub fn is_over(&self) -> bool {
        self.teams_remaining <= 1
    }

    // The sole survivor, once there is one.
    pub fn winner(&self) -> Option<TeamId> {
        if self.is_over() {
            return self.field.first().copied();
        }
        None
    }
}

// Round machinery.
impl Bracket {
    // Pair the next round: with P the smallest power of two holding the
    // field, seed i meets seed P + 1 - i. Top seeds sit out when the field
    // is short of P.
    fn next_round(&mut self, teams: &mut [Team]) {
        if self.rounds.len() != self.round_number || self.teams_remaining < 2 {
            return;
        }

        let pairing_size = smallest_power_of_two(self.teams_remaining);
        let mut round = Vec::new();
        let mut i = self.teams_remaining;
        while i > pairing_size / 2 {
            let lower = self.field[i - 1];
            let higher = self.field[pairing_size - i];
            // Reaching the round counts for both sides, eventual loser too.
            teams[lower].increment_result();
            teams[higher].increment_result();
            round.push(Series::build(lower, higher, &HOME_ICE_PATTERN));
            i -= 1;
        }

        debug!(
            "round {}: {} series, {} teams left",
            self.round_number + 1,
            round.len(),
            self.teams_remaining
        );
        self.rounds.push(round);
    }

    // Run every series of the current round, then pair the next one.
    pub fn simulate_round<M: OutcomeModel + ?Sized>(
        &mut self,
        teams: &mut [Team],
        model: &mut M,
        rng: &mut impl Rng,
    ) {
        match self.discipline {
            Discipline::Reseeding => self.sim_round_reseeding(teams, model, rng),
            Discipline::FixedBracket => self.sim_round_fixed(teams, model, rng),
        }

        if !self.is_over() {
            self.round_number += 1;
            self.next_round(teams);
        }
    }

    fn sim_round_reseeding<M: OutcomeModel + ?Sized>(
        &mut self,
        teams: &mut [Team],
        model: &mut M,
        rng: &mut impl Rng,
    ) {
        let Self {
            field,
            rounds,
            round_number,
            teams_remaining,
            ..
        } = self;

        for series in rounds[*round_number].iter_mut() {
            series.sim_series(teams, model, rng);
            if let Some(loser) = series.loser() {
                if let Some(position) = field.iter().position(|&t| t == loser) {
                    field.remove(position);
                    field.push(loser);
                }
                *teams_remaining -= 1;
            }
        }
    }

    fn sim_round_fixed<M: OutcomeModel + ?Sized>(
        &mut self,
        teams: &mut [Team],
        model: &mut M,
        rng: &mut impl Rng,
    ) {
        let Self {
            field,
            rounds,
            round_number,
            teams_remaining,
            external_seeds,
            ..
        } = self;

        for series in rounds[*round_number].iter_mut() {
            series.sim_series(teams, model, rng);
            if series.winner() == Some(series.lower_seed()) {
                // The winner always occupies the higher-ranked slot.
                let higher = field.iter().position(|&t| t == series.higher_seed());
                let lower = field.iter().position(|&t| t == series.lower_seed());
                if let (Some(higher), Some(lower)) = (higher, lower) {
                    field.swap(higher, lower);
                }
            }
            *teams_remaining -= 1;
        }

        // Symmetrize the surviving half on conference seeding so the next
        // pairing pass keeps the bracket halves apart.
        for i in 0..*teams_remaining / 2 {
            let opposite = *teams_remaining - 1 - i;
            if external_seeds[&field[i]] > external_seeds[&field[opposite]] {
                field.swap(i, opposite);
            }
        }
    }
}

// Smallest power of two that fits the field.
fn smallest_power_of_two(n: usize) -> usize {
    let mut power = 2;
    while power < n {
        power *= 2;
    }
    power
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use crate::game::{GameKind, Outcome, SkillModel};
    use crate::team::SKILL_MEAN;

    use super::*;

    // Stub handing every game to a favoured set of teams.
    struct Favours(Vec<TeamId>);

    impl OutcomeModel for Favours {
        fn simulate(
            &mut self,
            home: &Team,
            away: &Team,
            _kind: GameKind,
            _neutral: bool,
            _rng: &mut dyn rand::RngCore,
        ) -> Outcome {
            let home_won = if self.0.contains(&home.id()) {
                true
            }
            else if self.0.contains(&away.id()) {
                false
            }
            else {
                home.id() < away.id()
            };
            Outcome {
                home_won,
                overtimes: 0,
            }
        }
    }

    fn arena(n: usize) -> Vec<Team> {
        (0..n)
            .map(|i| Team::build(i, "City", &format!("Team {i}"), &format!("T{i}"), 0, 0, SKILL_MEAN))
            .collect()
    }

    #[test]
    fn first_round_pairs_by_optimal_seed_sums() {
        let mut teams = arena(4);
        let bracket = Bracket::build(vec![0, 1, 2, 3], Discipline::Reseeding, &mut teams);

        let round = &bracket.rounds()[0];
        assert_eq!(round.len(), 2);
        assert_eq!((round[0].lower_seed(), round[0].higher_seed()), (3, 0));
        assert_eq!((round[1].lower_seed(), round[1].higher_seed()), (2, 1));

        // Everyone in the round got credited with reaching it.
        assert!(teams.iter().all(|t| t.season_result() == 1));
    }

    #[test]
    fn short_fields_give_top_seeds_byes() {
        let mut teams = arena(5);
        let bracket = Bracket::build(vec![0, 1, 2, 3, 4], Discipline::Reseeding, &mut teams);

        // P = 8: only 5 v 4 plays, seeds 1-3 sit out.
        let round = &bracket.rounds()[0];
        assert_eq!(round.len(), 1);
        assert_eq!((round[0].lower_seed(), round[0].higher_seed()), (4, 3));
        assert_eq!(teams[0].season_result(), 0);
    }

    #[test]
    fn reseeding_re_pairs_upset_winners() {
        // Both favourites fall in round one; the two winners must meet in
        // round two and the bracket closes in exactly two rounds.
        let mut teams = arena(4);
        let mut bracket = Bracket::build(vec![0, 1, 2, 3], Discipline::Reseeding, &mut teams);
        let mut model = Favours(vec![2, 3]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        bracket.simulate_round(&mut teams, &mut model, &mut rng);
        assert_eq!(bracket.teams_remaining(), 2);

        let second = &bracket.rounds()[1];
        assert_eq!(second.len(), 1);
        assert_eq!((second[0].lower_seed(), second[0].higher_seed()), (3, 2));

        bracket.simulate_round(&mut teams, &mut model, &mut rng);
        assert!(bracket.is_over());
        assert_eq!(bracket.rounds().len(), 2);
        assert_eq!(bracket.winner(), Some(2));
    }

    #[test]
    fn fixed_brackets_swap_winners_into_higher_slots() {
        let mut teams = arena(4);
        let mut bracket = Bracket::build(vec![0, 1, 2, 3], Discipline::FixedBracket, &mut teams);
        // Seed 4 upsets seed 1; seed 2 holds.
        let mut model = Favours(vec![3, 1]);
        let mut rng = ChaCha8Rng::seed_from_u64(2);

        bracket.simulate_round(&mut teams, &mut model, &mut rng);
        assert_eq!(bracket.teams_remaining(), 2);

        // The symmetrization puts the better conference seed back on top.
        let second = &bracket.rounds()[1];
        assert_eq!((second[0].lower_seed(), second[0].higher_seed()), (3, 1));

        bracket.simulate_round(&mut teams, &mut model, &mut rng);
        assert!(bracket.is_over());
        assert_eq!(bracket.winner(), Some(1));
    }

    #[test]
    fn rounds_match_the_field_size() {
        for n in 2..=8 {
            let mut teams = arena(n);
            let field: Vec<TeamId> = (0..n).collect();
            let mut bracket = Bracket::build(field, Discipline::Reseeding, &mut teams);
            let mut rng = ChaCha8Rng::seed_from_u64(n as u64);

            let mut previous = bracket.teams_remaining();
            while !bracket.is_over() {
                bracket.simulate_round(&mut teams, &mut SkillModel, &mut rng);
                assert!(bracket.teams_remaining() < previous);
                previous = bracket.teams_remaining();
            }

            let expected = (n as f64).log2().ceil() as usize;
            assert_eq!(bracket.rounds().len(), expected, "field of {n}");
            assert!(bracket.winner().is_some());
        }
    }
}
