// The playoff orchestrator: builds the bracket tree for either format,
// runs it to a champion and aggregates the rounds for reporting.

pub mod bracket;
pub mod series;

use std::collections::HashMap;

use log::info;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, SimError},
    game::OutcomeModel,
    league::{group::Group, League},
    types::{Seed, TeamId},
};

use self::{
    bracket::{Bracket, Discipline},
    series::Series,
};

#[derive(Debug, Serialize, Deserialize)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum PlayoffFormat {
    // One bracket per conference; the conference winners meet in the finals.
    ConferenceBracket(Discipline),
    // Fixed division sub-brackets feed a reseeding bracket per conference.
    Divisional,
}

#[derive(Debug, Serialize, Deserialize)]
#[derive(Clone)]
pub struct Playoffs {
    format: PlayoffFormat,
    division_brackets: Vec<Bracket>,
    conference_brackets: Vec<Bracket>,
    finals: Option<Bracket>,
    winner: Option<TeamId>,
}

// Basics.
impl Playoffs {
    pub fn build(format: PlayoffFormat) -> Self {
        Self {
            format,
            division_brackets: Vec::new(),
            conference_brackets: Vec::new(),
            finals: None,
            winner: None,
        }
    }

    pub fn format(&self) -> PlayoffFormat {
        self.format
    }

    pub fn winner(&self) -> Option<TeamId> {
        self.winner
    }

    pub fn is_over(&self) -> bool {
        self.winner.is_some()
    }

    pub fn division_brackets(&self) -> &[Bracket] {
        &self.division_brackets
    }

    pub fn conference_brackets(&self) -> &[Bracket] {
        &self.conference_brackets
    }

    pub fn finals(&self) -> Option<&Bracket> {
        self.finals.as_ref()
    }

    // Rounds required for the whole tournament given the league's setup.
    pub fn amount_of_rounds(&self, league: &League) -> usize {
        let sub_rounds = league
            .conferences()
            .iter()
            .map(|c| rounds_needed(c.amount_of_playoff_teams()))
            .max()
            .unwrap_or(0);
        sub_rounds + rounds_needed(league.conferences().len())
    }

    // Every series of the tournament grouped by overall round: division
    // rounds first (divisional format only), then conference rounds, then
    // the finals.
    pub fn rounds(&self) -> Vec<Vec<&Series>> {
        let mut out: Vec<Vec<&Series>> = Vec::new();

        for r in 0..bracket_depth(&self.division_brackets) {
            out.push(collect_round(&self.division_brackets, r));
        }
        for r in 0..bracket_depth(&self.conference_brackets) {
            out.push(collect_round(&self.conference_brackets, r));
        }
        if let Some(finals) = &self.finals {
            for round in finals.rounds() {
                out.push(round.iter().collect());
            }
        }
        out
    }
}

// Running the tournament.
impl Playoffs {
    pub fn run<M: OutcomeModel + ?Sized>(
        &mut self,
        league: &mut League,
        model: &mut M,
        rng: &mut impl Rng,
    ) -> Result<()> {
        match self.format {
            PlayoffFormat::ConferenceBracket(discipline) => {
                self.run_conference_format(discipline, league, model, rng)
            }
            PlayoffFormat::Divisional => self.run_divisional_format(league, model, rng),
        }
    }

    fn run_conference_format<M: OutcomeModel + ?Sized>(
        &mut self,
        discipline: Discipline,
        league: &mut League,
        model: &mut M,
        rng: &mut impl Rng,
    ) -> Result<()> {
        let mut conference_winners = Vec::new();
        for index in 0..league.conferences().len() {
            let (field, seeds) = {
                let conference = &league.conferences()[index];
                let spots = conference.amount_of_playoff_teams();
                (
                    conference.team_ids()[..spots].to_vec(),
                    conference_seeds(conference),
                )
            };

            let mut bracket = Bracket::build_with_seeds(field, discipline, seeds, league.teams_mut());
            while !bracket.is_over() {
                bracket.simulate_round(league.teams_mut(), model, rng);
            }
            if let Some(winner) = bracket.winner() {
                conference_winners.push(winner);
            }
            self.conference_brackets.push(bracket);
        }

        self.run_finals(conference_winners, discipline, league, model, rng);
        Ok(())
    }

    fn run_divisional_format<M: OutcomeModel + ?Sized>(
        &mut self,
        league: &mut League,
        model: &mut M,
        rng: &mut impl Rng,
    ) -> Result<()> {
        // The format only works out when every division sends its leaders
        // plus exactly one wildcard. Checked for every conference before a
        // single bracket exists.
        for conference in league.conferences() {
            let reserved = (conference.slots_per_division() * conference.divisions().len()) as i64;
            let wildcards = conference.amount_of_playoff_teams() as i64 - reserved;
            if wildcards != conference.divisions().len() as i64 {
                return Err(SimError::InvalidConfiguration(String::from(
                    "the divisional playoff format needs exactly one wildcard per division",
                )));
            }
        }

        let mut conference_winners = Vec::new();
        for index in 0..league.conferences().len() {
            let (leaders, wildcards, slots, seeds) = {
                let conference = &league.conferences()[index];
                let slots = conference.slots_per_division();

                // Division leaders, worst league seeding first, so the best
                // leader ends up with the worse wildcard.
                let mut leaders: Vec<TeamId> =
                    conference.divisions().iter().filter_map(Group::leader).collect();
                leaders.sort_by_key(|&t| std::cmp::Reverse(league_seeding(league, t)));

                let mut wildcards = Vec::new();
                for &team in conference.team_ids() {
                    let division_seed = league
                        .division_of_team(team)
                        .and_then(|d| d.seeding_of_team(team).ok());
                    if division_seed.is_some_and(|seed| seed > slots) {
                        wildcards.push(team);
                        if wildcards.len() == conference.divisions().len() {
                            break;
                        }
                    }
                }

                (leaders, wildcards, slots, conference_seeds(conference))
            };

            let mut division_winners = Vec::new();
            for (i, &leader) in leaders.iter().enumerate() {
                let field = {
                    let Some(division) = league.division_of_team(leader) else {
                        continue;
                    };
                    let Some(&wildcard) = wildcards.get(i) else {
                        continue;
                    };
                    let guaranteed = slots.min(division.size());
                    let mut field = division.team_ids()[..guaranteed].to_vec();
                    field.push(wildcard);
                    field
                };

                let mut bracket = Bracket::build_with_seeds(
                    field,
                    Discipline::FixedBracket,
                    seeds.clone(),
                    league.teams_mut(),
                );
                while !bracket.is_over() {
                    bracket.simulate_round(league.teams_mut(), model, rng);
                }
                if let Some(winner) = bracket.winner() {
                    division_winners.push(winner);
                }
                self.division_brackets.push(bracket);
            }

            division_winners.sort_by_key(|&t| league_seeding(league, t));
            let mut bracket = Bracket::build_with_seeds(
                division_winners,
                Discipline::Reseeding,
                seeds,
                league.teams_mut(),
            );
            while !bracket.is_over() {
                bracket.simulate_round(league.teams_mut(), model, rng);
            }
            if let Some(winner) = bracket.winner() {
                conference_winners.push(winner);
            }
            self.conference_brackets.push(bracket);
        }

        self.run_finals(conference_winners, Discipline::Reseeding, league, model, rng);
        Ok(())
    }

    fn run_finals<M: OutcomeModel + ?Sized>(
        &mut self,
        mut field: Vec<TeamId>,
        discipline: Discipline,
        league: &mut League,
        model: &mut M,
        rng: &mut impl Rng,
    ) {
        field.sort_by_key(|&t| league_seeding(league, t));
        let seeds: HashMap<TeamId, Seed> = field
            .iter()
            .map(|&team| {
                let seed = league
                    .conference_of_team(team)
                    .and_then(|c| c.seeding_of_team(team).ok())
                    .unwrap_or(Seed::MAX);
                (team, seed)
            })
            .collect();

        let mut finals = Bracket::build_with_seeds(field, discipline, seeds, league.teams_mut());
        while !finals.is_over() {
            finals.simulate_round(league.teams_mut(), model, rng);
        }

        self.winner = finals.winner();
        if let Some(champion) = self.winner {
            // One last bump to mark the title.
            league.teams_mut()[champion].increment_result();
            info!(
                "the {} {} win the championship",
                league.teams()[champion].city(),
                league.teams()[champion].name()
            );
        }
        self.finals = Some(finals);
    }
}

fn conference_seeds(conference: &impl Group) -> HashMap<TeamId, Seed> {
    conference
        .team_ids()
        .iter()
        .enumerate()
        .map(|(i, &t)| (t, i + 1))
        .collect()
}

fn league_seeding(league: &League, team: TeamId) -> Seed {
    league.seeding_of_team(team).unwrap_or(Seed::MAX)
}

fn bracket_depth(brackets: &[Bracket]) -> usize {
    brackets.iter().map(|b| b.rounds().len()).max().unwrap_or(0)
}

fn collect_round(brackets: &[Bracket], round: usize) -> Vec<&Series> {
    brackets
        .iter()
        .filter_map(|b| b.rounds().get(round))
        .flatten()
        .collect()
}

// Rounds a single-elimination field needs: ceil(log2(n)).
fn rounds_needed(n: usize) -> usize {
    if n <= 1 {
        return 0;
    }
    (n - 1).ilog2() as usize + 1
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use crate::game::SkillModel;
    use crate::league::conference::StandingsStructure;
    use crate::schedule;

    use super::*;

    // A 16-team league shaped like the divisional playoff era: two
    // conferences of two four-team divisions, three guaranteed spots per
    // division plus one wildcard each.
    fn divisional_league() -> League {
        let mut league = League::build("NHL");
        let mut rng = ChaCha8Rng::seed_from_u64(50);
        for conf in 0..2 {
            let conf_name = if conf == 0 { "East" } else { "West" };
            let c = league
                .add_conference(conf_name, 8, 3, StandingsStructure::DivisionRankDependent)
                .unwrap();
            for div in 0..2 {
                let d = league.add_division(c, &format!("{conf_name} {div}")).unwrap();
                for slot in 0..4 {
                    let n = conf * 8 + div * 4 + slot;
                    league
                        .add_team(d, "City", &format!("Team {n}"), &format!("T{n}"), &mut rng)
                        .unwrap();
                }
            }
        }
        league
    }

    fn played_league(league: &mut League, seed: u64) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let games = schedule::double_round_robin(league, &mut rng);
        league.start_season(games, 2024, &mut rng);
        league.sim_season(&mut SkillModel, &mut rng).unwrap();
    }

    #[test]
    fn conference_format_crowns_a_champion() {
        let mut league = divisional_league();
        played_league(&mut league, 1);

        let mut playoffs = Playoffs::build(PlayoffFormat::ConferenceBracket(Discipline::Reseeding));
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        playoffs.run(&mut league, &mut SkillModel, &mut rng).unwrap();

        assert!(playoffs.is_over());
        let champion = playoffs.winner().unwrap();
        assert!(league.teams()[champion].made_playoffs());

        // 8 playoff teams per conference: 3 conference rounds plus finals.
        assert_eq!(playoffs.amount_of_rounds(&league), 4);
        let rounds = playoffs.rounds();
        assert_eq!(rounds.len(), 4);
        assert_eq!(rounds[0].len(), 8);
        assert_eq!(rounds[1].len(), 4);
        assert_eq!(rounds[2].len(), 2);
        assert_eq!(rounds[3].len(), 1);

        // The champion survived every round and got the title bump.
        assert_eq!(league.teams()[champion].season_result(), 5);
        for team in league.teams() {
            if team.made_playoffs() {
                assert!(team.season_result() >= 1);
            }
            else {
                assert_eq!(team.season_result(), -1);
            }
        }
    }

    #[test]
    fn divisional_format_builds_the_full_tree() {
        let mut league = divisional_league();
        played_league(&mut league, 3);

        let mut playoffs = Playoffs::build(PlayoffFormat::Divisional);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        playoffs.run(&mut league, &mut SkillModel, &mut rng).unwrap();

        assert!(playoffs.is_over());
        assert_eq!(playoffs.division_brackets().len(), 4);
        assert_eq!(playoffs.conference_brackets().len(), 2);

        // Division rounds 0-1, conference round 2, finals round 3.
        let rounds = playoffs.rounds();
        assert_eq!(rounds.len(), 4);
        assert_eq!(rounds[0].len(), 8);
        assert_eq!(rounds[1].len(), 4);
        assert_eq!(rounds[2].len(), 2);
        assert_eq!(rounds[3].len(), 1);

        // Each division bracket held its top three plus a wildcard.
        for bracket in playoffs.division_brackets() {
            assert_eq!(bracket.number_of_teams(), 4);
        }
    }

    #[test]
    fn divisional_format_rejects_a_wildcard_mismatch() {
        let mut league = League::build("NHL");
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for conf in 0..2 {
            let name = if conf == 0 { "East" } else { "West" };
            // 7 playoff spots with 3 per division leaves one wildcard for
            // two divisions: invalid.
            let c = league
                .add_conference(name, 7, 3, StandingsStructure::DivisionRankDependent)
                .unwrap();
            for div in 0..2 {
                let d = league.add_division(c, &format!("{name} {div}")).unwrap();
                for slot in 0..4 {
                    let n = conf * 8 + div * 4 + slot;
                    league
                        .add_team(d, "City", &format!("Team {n}"), &format!("T{n}"), &mut rng)
                        .unwrap();
                }
            }
        }
        played_league(&mut league, 6);

        let results: Vec<i32> = league.teams().iter().map(|t| t.season_result()).collect();
        let mut playoffs = Playoffs::build(PlayoffFormat::Divisional);
        let err = playoffs
            .run(&mut league, &mut SkillModel, &mut ChaCha8Rng::seed_from_u64(7))
            .unwrap_err();

        assert!(matches!(err, SimError::InvalidConfiguration(_)));
        // Nothing was built and nobody got credited with a round.
        assert!(playoffs.division_brackets().is_empty());
        assert!(playoffs.conference_brackets().is_empty());
        assert!(playoffs.finals().is_none());
        assert!(!playoffs.is_over());
        let after: Vec<i32> = league.teams().iter().map(|t| t.season_result()).collect();
        assert_eq!(results, after);
    }

    #[test]
    fn finals_field_is_ordered_by_league_seeding() {
        let mut league = divisional_league();
        played_league(&mut league, 8);

        let mut playoffs = Playoffs::build(PlayoffFormat::ConferenceBracket(Discipline::FixedBracket));
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        playoffs.run(&mut league, &mut SkillModel, &mut rng).unwrap();

        let finals = playoffs.finals().unwrap();
        let series = &finals.rounds()[0][0];
        let lower = league_seeding(&league, series.lower_seed());
        let higher = league_seeding(&league, series.higher_seed());
        assert!(higher < lower);
    }
}
