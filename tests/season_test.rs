// A whole season end to end: schedule, regular season, standings, playoffs.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use hockey_league_sim::game::SkillModel;
use hockey_league_sim::league::conference::StandingsStructure;
use hockey_league_sim::league::group::Group;
use hockey_league_sim::league::League;
use hockey_league_sim::playoffs::bracket::Discipline;
use hockey_league_sim::playoffs::{PlayoffFormat, Playoffs};
use hockey_league_sim::schedule;

// Two conferences, two divisions of four, NHL-style divisional playoffs.
fn nhl_style_league(structure: StandingsStructure) -> League {
    let mut league = League::build("NHL");
    let mut rng = ChaCha8Rng::seed_from_u64(1000);

    let east = [
        ("Boston", "Bruins", "BOS"),
        ("Buffalo", "Sabres", "BUF"),
        ("Toronto", "Maple Leafs", "TOR"),
        ("Ottawa", "Senators", "OTT"),
        ("New York", "Rangers", "NYR"),
        ("Philadelphia", "Flyers", "PHI"),
        ("Pittsburgh", "Penguins", "PIT"),
        ("Washington", "Capitals", "WSH"),
    ];
    let west = [
        ("Chicago", "Blackhawks", "CHI"),
        ("Colorado", "Avalanche", "COL"),
        ("Dallas", "Stars", "DAL"),
        ("St. Louis", "Blues", "STL"),
        ("Anaheim", "Ducks", "ANA"),
        ("Calgary", "Flames", "CGY"),
        ("Edmonton", "Oilers", "EDM"),
        ("Vancouver", "Canucks", "VAN"),
    ];

    for (conf_name, div_names, teams) in [
        ("East", ["Atlantic", "Metropolitan"], east),
        ("West", ["Central", "Pacific"], west),
    ] {
        let c = league.add_conference(conf_name, 8, 3, structure).unwrap();
        for (d, div_name) in div_names.into_iter().enumerate() {
            let division = league.add_division(c, div_name).unwrap();
            for (city, name, abr) in &teams[d * 4..d * 4 + 4] {
                league.add_team(division, city, name, abr, &mut rng).unwrap();
            }
        }
    }
    league
}

fn run_full_season(seed: u64, format: PlayoffFormat) -> (League, Playoffs) {
    let mut league = nhl_style_league(StandingsStructure::DivisionRankDependent);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let games = schedule::double_round_robin(&league, &mut rng);
    league.start_season(games, 2024, &mut rng);
    league.sim_season(&mut SkillModel, &mut rng).unwrap();

    let mut playoffs = Playoffs::build(format);
    playoffs.run(&mut league, &mut SkillModel, &mut rng).unwrap();
    (league, playoffs)
}

#[test]
fn a_full_season_produces_consistent_books() {
    let (league, playoffs) = run_full_season(7, PlayoffFormat::Divisional);
    let season = league.season().unwrap();

    assert!(season.season_over());
    assert_eq!(season.games_played(), season.total_games());

    // Every game result landed in exactly two ledgers.
    let team_games: u32 = league.teams().iter().map(|t| t.games_played()).sum();
    assert_eq!(team_games as usize, 2 * season.total_games());

    // The points invariant holds for every team.
    for team in league.teams() {
        assert_eq!(
            team.points(),
            2 * (team.regulation_wins() + team.overtime_wins()) + team.overtime_losses()
        );
    }

    // The league table is a strict ranking of all sixteen teams.
    let mut seen = league.team_ids().to_vec();
    seen.sort_unstable();
    assert_eq!(seen, (0..16).collect::<Vec<_>>());

    // A champion exists and carries the deepest season result.
    let champion = playoffs.winner().unwrap();
    assert!(playoffs.is_over());
    let best = league.teams().iter().map(|t| t.season_result()).max().unwrap();
    assert_eq!(league.teams()[champion].season_result(), best);
}

#[test]
fn fixed_seeds_reproduce_the_same_season() {
    let (league_a, playoffs_a) = run_full_season(21, PlayoffFormat::Divisional);
    let (league_b, playoffs_b) = run_full_season(21, PlayoffFormat::Divisional);

    assert_eq!(league_a.team_ids(), league_b.team_ids());
    assert_eq!(playoffs_a.winner(), playoffs_b.winner());
    for (a, b) in league_a.teams().iter().zip(league_b.teams()) {
        assert_eq!(a.points(), b.points());
        assert_eq!(a.season_result(), b.season_result());
    }

    let (league_c, _) = run_full_season(22, PlayoffFormat::Divisional);
    // A different seed almost surely moves someone in a 16-team table.
    assert_ne!(league_a.team_ids(), league_c.team_ids());
}

#[test]
fn reseeding_conference_playoffs_work_on_the_same_league() {
    let (league, playoffs) =
        run_full_season(5, PlayoffFormat::ConferenceBracket(Discipline::Reseeding));

    assert!(playoffs.is_over());
    // 8 qualifiers per conference: three conference rounds and the finals.
    assert_eq!(playoffs.rounds().len(), 4);
    assert_eq!(playoffs.amount_of_rounds(&league), 4);
    assert!(playoffs.division_brackets().is_empty());
}

#[test]
fn a_checkpoint_resumes_into_the_identical_season() {
    let mut league = nhl_style_league(StandingsStructure::DivisionRankDependent);
    let mut rng = ChaCha8Rng::seed_from_u64(77);
    let games = schedule::double_round_robin(&league, &mut rng);
    league.start_season(games, 2024, &mut rng);

    // Stop mid-season and snapshot the whole league state.
    league.sim_to_game(100, &mut SkillModel, &mut rng).unwrap();
    let snapshot = serde_json::to_string(&league).unwrap();
    let mut restored: League = serde_json::from_str(&snapshot).unwrap();

    assert_eq!(restored.season().unwrap().games_played(), 100);
    assert_eq!(restored.team_ids(), league.team_ids());

    // Resuming both copies under the same generator stream must agree
    // game for game.
    let mut rng_a = ChaCha8Rng::seed_from_u64(123);
    let mut rng_b = ChaCha8Rng::seed_from_u64(123);
    league.sim_season(&mut SkillModel, &mut rng_a).unwrap();
    restored.sim_season(&mut SkillModel, &mut rng_b).unwrap();

    assert_eq!(league.team_ids(), restored.team_ids());
    for (a, b) in league.teams().iter().zip(restored.teams()) {
        assert_eq!(a.points(), b.points());
        assert_eq!(a.games_played(), b.games_played());
    }
}

#[test]
fn group_queries_cover_every_scope() {
    let (league, _) = run_full_season(9, PlayoffFormat::Divisional);

    for conference in league.conferences() {
        assert_eq!(conference.size(), 8);
        let leader = conference.leader().unwrap();
        assert_eq!(conference.seeding_of_team(leader).unwrap(), 1);
        assert_eq!(conference.team_at_seed(8).unwrap(), conference.last().unwrap());

        for division in conference.divisions() {
            assert_eq!(division.size(), 4);
            for seed in 1..=4 {
                let team = division.team_at_seed(seed).unwrap();
                assert_eq!(division.seeding_of_team(team).unwrap(), seed);
            }
        }
    }

    let leader = league.leader().unwrap();
    assert_eq!(league.seeding_of_team(leader).unwrap(), 1);
    assert!(league.clinched_presidents_trophy(leader));
}
