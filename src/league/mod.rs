// The league: the team arena, the conference tree, the current season and
// the league-wide standings.

pub mod conference;
pub mod division;
pub mod group;

use log::info;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, SimError},
    game::{Game, OutcomeModel},
    season::RegularSeason,
    standings::{merge::merge_ordered, sort_standings, StandingKey, TieBreakContext},
    team::{Team, SKILL_MEAN, SKILL_STD},
    types::{ConferenceId, DivisionId, TeamId},
};

use self::{
    conference::{Conference, StandingsStructure},
    division::Division,
    group::Group,
};

#[derive(Debug, Serialize, Deserialize)]
#[derive(Clone)]
pub struct League {
    name: String,
    teams: Vec<Team>,
    conferences: Vec<Conference>,
    order: Vec<TeamId>,
    season: Option<RegularSeason>,
    season_in_session: bool,
}

// Setup. Conferences, divisions and teams are created once and keep their
// ids for the life of the league.
impl League {
    pub fn build(name: &str) -> Self {
        Self {
            name: name.to_string(),
            teams: Vec::new(),
            conferences: Vec::new(),
            order: Vec::new(),
            season: None,
            season_in_session: false,
        }
    }

    pub fn add_conference(
        &mut self,
        name: &str,
        playoff_teams: usize,
        slots_per_division: usize,
        structure: StandingsStructure,
    ) -> Result<ConferenceId> {
        self.check_not_in_session()?;

        let id = self.conferences.len();
        let conference = Conference::build(id, name, playoff_teams, slots_per_division, structure)?;
        self.conferences.push(conference);
        Ok(id)
    }

    pub fn add_division(&mut self, conference: ConferenceId, name: &str) -> Result<DivisionId> {
        self.check_not_in_session()?;
        if conference >= self.conferences.len() {
            return Err(SimError::InvalidConfiguration(format!(
                "no conference #{conference} in the league"
            )));
        }

        let id = self.conferences.iter().map(|c| c.divisions().len()).sum();
        self.conferences[conference].add_division(Division::build(id, name));
        Ok(id)
    }

    // Add a team with a skill level drawn fresh from the prior, so it has
    // just as much of a chance of being good or bad.
    pub fn add_team(
        &mut self,
        division: DivisionId,
        city: &str,
        name: &str,
        abbreviation: &str,
        rng: &mut impl Rng,
    ) -> Result<TeamId> {
        let gauss: f64 = rng.sample(StandardNormal);
        self.add_team_with_skill(division, city, name, abbreviation, SKILL_MEAN + SKILL_STD * gauss)
    }

    pub fn add_team_with_skill(
        &mut self,
        division: DivisionId,
        city: &str,
        name: &str,
        abbreviation: &str,
        skill: f64,
    ) -> Result<TeamId> {
        self.check_not_in_session()?;

        for team in &self.teams {
            if team.name() == name && team.abbreviation() == abbreviation {
                return Err(SimError::InvalidConfiguration(format!(
                    "a team with the name \"{name}\" and abbreviation \"{abbreviation}\" already exists"
                )));
            }
            if team.abbreviation() == abbreviation {
                return Err(SimError::InvalidConfiguration(format!(
                    "a team with the abbreviation \"{abbreviation}\" already exists"
                )));
            }
            if team.name() == name {
                return Err(SimError::InvalidConfiguration(format!(
                    "a team with the name \"{name}\" already exists"
                )));
            }
        }

        let conference = self
            .conferences
            .iter()
            .find(|c| c.division(division).is_some())
            .map(Conference::id)
            .ok_or_else(|| {
                SimError::InvalidConfiguration(format!("no division #{division} in the league"))
            })?;

        let id = self.teams.len();
        self.teams
            .push(Team::build(id, city, name, abbreviation, division, conference, skill));

        let conf = &mut self.conferences[conference];
        conf.register_team(id);
        if let Some(div) = conf.division_mut(division) {
            div.add_team(id);
        }
        self.order.push(id);
        Ok(id)
    }

    fn check_not_in_session(&self) -> Result<()> {
        if self.season_in_session {
            return Err(SimError::InvalidConfiguration(String::from(
                "the league cannot be changed while a season is in session",
            )));
        }
        Ok(())
    }
}

// Lookups.
impl League {
    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn team(&self, id: TeamId) -> Option<&Team> {
        self.teams.get(id)
    }

    pub(crate) fn teams_mut(&mut self) -> &mut [Team] {
        &mut self.teams
    }

    pub fn conferences(&self) -> &[Conference] {
        &self.conferences
    }

    pub fn conference(&self, id: ConferenceId) -> Option<&Conference> {
        self.conferences.get(id)
    }

    pub fn divisions(&self) -> impl Iterator<Item = &Division> {
        self.conferences.iter().flat_map(|c| c.divisions().iter())
    }

    pub fn division(&self, id: DivisionId) -> Option<&Division> {
        self.divisions().find(|d| d.id() == id)
    }

    pub fn conference_of_team(&self, team: TeamId) -> Option<&Conference> {
        self.conference(self.team(team)?.conference())
    }

    pub fn division_of_team(&self, team: TeamId) -> Option<&Division> {
        self.division(self.team(team)?.division())
    }

    pub fn season(&self) -> Option<&RegularSeason> {
        self.season.as_ref()
    }

    pub fn season_in_session(&self) -> bool {
        self.season_in_session
    }

    // Playoff spots across the whole league.
    pub fn amount_of_playoff_teams(&self) -> usize {
        self.conferences.iter().map(Conference::amount_of_playoff_teams).sum()
    }
}

// Standings.
impl League {
    // Re-rank every division and conference, then merge the conference
    // orderings into the league table.
    pub fn update_standings(&mut self, rng: &mut impl Rng) {
        let Self {
            teams,
            conferences,
            order,
            season,
            ..
        } = self;
        let season = season.as_ref();

        for conference in conferences.iter_mut() {
            conference.update_standings(teams, season, rng);
        }

        let children: Vec<&[TeamId]> = conferences.iter().map(|c| c.team_ids()).collect();
        let mut merged = merge_ordered(&children, |t| StandingKey::of(&teams[t]));

        let mut ctx = TieBreakContext::new(teams, season);
        for division in conferences.iter().flat_map(|c| c.divisions()) {
            ctx.add_division(division.id(), division.team_ids());
        }
        sort_standings(&mut merged, &ctx, rng);
        *order = merged;
    }
}

// Season lifecycle and simulation. All entry points move the durable game
// cursor forward and may be called again later to resume.
impl League {
    // Reset every team and start a fresh regular season over the schedule.
    pub fn start_season(&mut self, games: Vec<Game>, year: u32, rng: &mut impl Rng) {
        for team in self.teams.iter_mut() {
            team.new_season();
        }

        // A pre-season's worth of movement before puck drop.
        for team in self.teams.iter_mut() {
            for _ in 0..26 {
                team.change_skill(false, rng);
            }
        }
        for team in self.teams.iter_mut() {
            team.snapshot_pre_season_skill();
        }

        info!("{} season {year} started, {} games on the schedule", self.name, games.len());
        self.season = Some(RegularSeason::build(games, year));
        self.season_in_session = true;
    }

    // Simulate forward until the given game number has been played.
    pub fn sim_to_game<M: OutcomeModel + ?Sized>(
        &mut self,
        game_number: usize,
        model: &mut M,
        rng: &mut impl Rng,
    ) -> Result<()> {
        {
            let Self { teams, season, .. } = self;
            let season = season.as_mut().ok_or_else(no_season)?;

            let target = game_number.min(season.games.len());
            while season.games_played < target {
                let next = season.games_played;
                season.games[next].simulate(teams, model, rng);
                season.games_played += 1;
            }
        }

        self.update_standings(rng);
        self.check_season_over(rng);
        Ok(())
    }

    pub fn sim_next_game<M: OutcomeModel + ?Sized>(
        &mut self,
        model: &mut M,
        rng: &mut impl Rng,
    ) -> Result<()> {
        let season = self.season.as_ref().ok_or_else(no_season)?;
        if season.season_over() {
            return Ok(());
        }
        self.sim_to_game(season.games_played() + 1, model, rng)
    }

    pub fn sim_next_games<M: OutcomeModel + ?Sized>(
        &mut self,
        amount: usize,
        model: &mut M,
        rng: &mut impl Rng,
    ) -> Result<()> {
        let played = self.season.as_ref().ok_or_else(no_season)?.games_played();
        self.sim_to_game(played + amount, model, rng)
    }

    pub fn sim_season<M: OutcomeModel + ?Sized>(
        &mut self,
        model: &mut M,
        rng: &mut impl Rng,
    ) -> Result<()> {
        let total = self.season.as_ref().ok_or_else(no_season)?.total_games();
        self.sim_to_game(total, model, rng)
    }

    // Mark the season over once every game is played: playoff spots are
    // handed out and everyone else begins their off-season slide.
    fn check_season_over(&mut self, rng: &mut impl Rng) {
        let finished = match &self.season {
            Some(season) => !season.season_over() && season.games_played() == season.total_games(),
            _ => false,
        };
        if !finished {
            return;
        }
        if let Some(season) = self.season.as_mut() {
            season.season_over = true;
        }
        info!("{} regular season over", self.name);

        let mut qualified = Vec::new();
        for conference in &self.conferences {
            let spots = conference.amount_of_playoff_teams();
            qualified.extend_from_slice(&conference.team_ids()[..spots]);
        }
        for &team in &qualified {
            self.teams[team].set_made_playoffs();
        }

        // The further down the league a non-playoff team finished, the more
        // its roster churns before next season.
        let league_order = self.order.clone();
        let half = (league_order.len() / 2) as i64;
        for (index, &team) in league_order.iter().enumerate() {
            if self.teams[team].made_playoffs() {
                continue;
            }
            self.teams[team].set_season_result(-1);
            let beyond = index as i64 - half;
            let changes = if beyond < 0 { 0 } else { beyond * beyond };
            for _ in 0..changes {
                self.teams[team].off_season_change_skill(rng);
            }
        }
    }

    // Allow setup changes again once the playoffs have wrapped up.
    pub fn end_season(&mut self) {
        self.season_in_session = false;
    }

    pub fn games_remaining(&self, team: TeamId) -> u32 {
        match &self.season {
            Some(season) => {
                let total = season.total_games_for_team(team) as u32;
                total.saturating_sub(self.teams[team].games_played())
            }
            _ => 0,
        }
    }
}

// Playoff race queries. Read-only; they never touch the orderings.
impl League {
    // True once the team cannot reach a playoff spot any more.
    pub fn out_of_playoffs(&self, team: TeamId) -> bool {
        let Some(season) = &self.season else {
            return false;
        };
        let Some(conference) = self.conference_of_team(team) else {
            return false;
        };
        let playoff_line = conference.amount_of_playoff_teams();
        let Ok(seeding) = conference.seeding_of_team(team) else {
            return false;
        };
        if playoff_line >= seeding {
            return false;
        }
        if season.season_over() {
            return seeding > playoff_line;
        }

        let most_possible = self.teams[team].points() + 2 * self.games_remaining(team);
        let mut ahead = 0;
        for &other in conference.team_ids() {
            let leader = self.division_of_team(other).and_then(Group::leader);
            if self.teams[other].points() > most_possible && leader != Some(other) {
                ahead += 1;
            }
        }

        // The team needs to fall short of both a divisional spot and a
        // wild card spot.
        let Some(leader) = self.division_of_team(team).and_then(Group::leader) else {
            return false;
        };
        most_possible < self.teams[leader].points()
            && ahead >= playoff_line.saturating_sub(conference.divisions().len())
    }

    // True once a playoff spot cannot slip away any more.
    pub fn clinched_playoffs(&self, team: TeamId) -> bool {
        let Some(conference) = self.conference_of_team(team) else {
            return false;
        };
        let playoff_line = conference.amount_of_playoff_teams();
        if playoff_line >= conference.size() {
            return true;
        }
        let Some(season) = &self.season else {
            return false;
        };
        let Ok(seeding) = conference.seeding_of_team(team) else {
            return false;
        };
        if playoff_line < seeding {
            return false;
        }
        if season.season_over() {
            return seeding <= playoff_line;
        }

        let my_points = self.teams[team].points();
        let mut behind = 0;
        for &other in conference.team_ids() {
            let leader = self.division_of_team(other).and_then(Group::leader);
            let most_possible = self.teams[other].points() + 2 * self.games_remaining(other);
            if most_possible < my_points && leader != Some(other) {
                behind += 1;
            }
        }
        behind >= conference.size() - playoff_line
    }

    pub fn clinched_division(&self, team: TeamId) -> bool {
        match self.division_of_team(team) {
            Some(division) => self.clinched_group(team, division),
            _ => false,
        }
    }

    pub fn clinched_conference(&self, team: TeamId) -> bool {
        match self.conference_of_team(team) {
            Some(conference) => self.clinched_group(team, conference),
            _ => false,
        }
    }

    // Best regular season record in the whole league, guaranteed.
    pub fn clinched_presidents_trophy(&self, team: TeamId) -> bool {
        self.clinched_group(team, self)
    }

    fn clinched_group(&self, team: TeamId, group: &dyn Group) -> bool {
        if group.leader() != Some(team) {
            return false;
        }
        if group.size() < 2 {
            return true;
        }
        let Some(season) = &self.season else {
            return false;
        };
        if season.season_over() {
            return true;
        }

        let my_points = self.teams[team].points();
        group.team_ids().iter().all(|&other| {
            other == team
                || self.teams[other].points() + 2 * self.games_remaining(other) <= my_points
        })
    }

    // Every team ordered by true skill, strongest first.
    pub fn power_rankings(&self) -> Vec<TeamId> {
        let mut ranking: Vec<TeamId> = (0..self.teams.len()).collect();
        ranking.sort_by(|&a, &b| {
            self.teams[b]
                .true_skill()
                .total_cmp(&self.teams[a].true_skill())
        });
        ranking
    }
}

impl Group for League {
    fn name(&self) -> &str {
        &self.name
    }

    fn team_ids(&self) -> &[TeamId] {
        &self.order
    }
}

fn no_season() -> SimError {
    SimError::InvalidConfiguration(String::from("no regular season in progress"))
}
