use std::collections::HashSet;

use bpm_terminal::state::{MatchupSelection, PlayerRow, SortColumn};
use bpm_terminal::stats_fetch::{impact_metric, round3};
use bpm_terminal::view::{
    MatchupCall, compute_view, filter_by_games, top_performers,
};

fn row(player: &str, team: &str, games: u32, mpg: f64, bpm: f64) -> PlayerRow {
    PlayerRow {
        player: player.to_string(),
        team: team.to_string(),
        games,
        minutes_total: mpg * games as f64,
        bpm,
        mpg,
        impact: round3(impact_metric(bpm, mpg)),
    }
}

fn fixed_impact(player: &str, team: &str, games: u32, impact: f64) -> PlayerRow {
    PlayerRow {
        player: player.to_string(),
        team: team.to_string(),
        games,
        minutes_total: games as f64 * 30.0,
        bpm: 0.0,
        mpg: 30.0,
        impact,
    }
}

fn selection(team1: &str, team2: &str) -> MatchupSelection {
    MatchupSelection {
        injured: HashSet::new(),
        min_games: 20,
        team1: team1.to_string(),
        team2: team2.to_string(),
        sort_by: SortColumn::Team,
        descending: true,
    }
}

fn league() -> Vec<PlayerRow> {
    vec![
        row("Luka Doncic", "LAL", 70, 35.0, 5.0),
        row("LeBron James", "LAL", 60, 35.0, 4.0),
        row("Austin Reaves", "LAL", 82, 32.0, 1.5),
        row("Jayson Tatum", "BOS", 74, 36.0, 6.0),
        row("Derrick White", "BOS", 78, 33.0, 2.5),
        row("Payton Pritchard", "BOS", 15, 28.0, 1.0),
        row("Nikola Jokic", "DEN", 75, 34.0, 11.0),
    ]
}

#[test]
fn injury_zeroes_impact_and_leaves_base_alone() {
    let base = league();
    let before = base.clone();

    let mut sel = selection("LAL", "BOS");
    sel.injured.insert("Luka Doncic".to_string());
    let view = compute_view(&base, &sel);

    let luka = view
        .combined
        .iter()
        .find(|r| r.player == "Luka Doncic")
        .expect("row should still be present");
    assert_eq!(luka.impact, 0.0);
    // Only impact changes.
    assert_eq!(luka.games, 70);
    assert_eq!(luka.bpm, 5.0);
    assert_eq!(luka.mpg, 35.0);

    // The base table is untouched; a view without the injury sees the
    // original value again.
    assert_eq!(base, before);
    let clean = compute_view(&base, &selection("LAL", "BOS"));
    let luka_clean = clean
        .combined
        .iter()
        .find(|r| r.player == "Luka Doncic")
        .unwrap();
    assert_eq!(luka_clean.impact, 3.645);
}

#[test]
fn injury_hits_a_traded_player_on_both_teams() {
    let mut base = league();
    base.push(row("Trade Piece", "LAL", 40, 20.0, 2.0));
    base.push(row("Trade Piece", "BOS", 30, 18.0, 2.0));

    let mut sel = selection("LAL", "BOS");
    sel.injured.insert("Trade Piece".to_string());
    let view = compute_view(&base, &sel);

    let zeroed: Vec<&PlayerRow> = view
        .combined
        .iter()
        .filter(|r| r.player == "Trade Piece")
        .collect();
    assert_eq!(zeroed.len(), 2);
    assert!(zeroed.iter().all(|r| r.impact == 0.0));
}

#[test]
fn raising_min_games_never_grows_the_filtered_set() {
    let base = league();
    let mut last = usize::MAX;
    for min_games in 1..=82 {
        let count = filter_by_games(&base, min_games).len();
        assert!(count <= last, "min_games={min_games} grew the set");
        last = count;
    }
    assert_eq!(filter_by_games(&base, 1).len(), base.len());
}

#[test]
fn aggregation_matches_a_manual_sum() {
    let base = league();
    let sel = selection("LAL", "BOS");
    let view = compute_view(&base, &sel);

    let expected_lal: f64 = base
        .iter()
        .filter(|r| r.team == "LAL" && r.games >= sel.min_games)
        .map(|r| r.impact)
        .sum();
    assert_eq!(view.team1_impact, expected_lal);

    // Pritchard sits under the default threshold and must not count.
    let expected_bos: f64 = base
        .iter()
        .filter(|r| r.team == "BOS" && r.games >= sel.min_games)
        .map(|r| r.impact)
        .sum();
    assert_eq!(view.team2_impact, expected_bos);
    assert_eq!(view.advantage, expected_lal - expected_bos);
}

#[test]
fn unknown_team_aggregates_to_zero() {
    let base = league();
    let view = compute_view(&base, &selection("LAL", "SEA"));
    assert_eq!(view.team2_impact, 0.0);
    assert!(view.team2_rows.is_empty());
    assert!(view.top_team2.is_empty());
    assert_eq!(view.call, MatchupCall::TeamOneFavored(view.advantage));
}

#[test]
fn favored_calls_follow_the_fixed_thresholds() {
    let t1 = vec![fixed_impact("A", "AAA", 50, 2.5)];
    let t2 = vec![fixed_impact("B", "BBB", 50, 1.0)];
    let mut base = t1.clone();
    base.extend(t2);

    let view = compute_view(&base, &selection("AAA", "BBB"));
    assert_eq!(view.call, MatchupCall::TeamOneFavored(1.5));

    let view = compute_view(&base, &selection("BBB", "AAA"));
    assert_eq!(view.call, MatchupCall::TeamTwoFavored(1.5));

    let even = vec![
        fixed_impact("A", "AAA", 50, 1.0),
        fixed_impact("B", "BBB", 50, 0.5),
    ];
    let view = compute_view(&even, &selection("AAA", "BBB"));
    assert_eq!(view.call, MatchupCall::Close);
}

#[test]
fn sorting_with_duplicate_keys_is_stable() {
    // Same games count everywhere: order must stay team1 rows then team2
    // rows, each in base order.
    let base = vec![
        fixed_impact("First", "AAA", 50, 3.0),
        fixed_impact("Second", "AAA", 50, 1.0),
        fixed_impact("Third", "BBB", 50, 2.0),
    ];
    let mut sel = selection("AAA", "BBB");
    sel.sort_by = SortColumn::Games;
    let view = compute_view(&base, &sel);
    let order: Vec<&str> = view.combined.iter().map(|r| r.player.as_str()).collect();
    assert_eq!(order, vec!["First", "Second", "Third"]);

    sel.descending = false;
    let view = compute_view(&base, &sel);
    let order: Vec<&str> = view.combined.iter().map(|r| r.player.as_str()).collect();
    assert_eq!(order, vec!["First", "Second", "Third"]);
}

#[test]
fn combined_table_sorts_by_selected_column() {
    let base = league();
    let mut sel = selection("LAL", "BOS");
    sel.sort_by = SortColumn::Impact;
    let view = compute_view(&base, &sel);
    let impacts: Vec<f64> = view.combined.iter().map(|r| r.impact).collect();
    let mut expected = impacts.clone();
    expected.sort_by(|a, b| b.total_cmp(a));
    assert_eq!(impacts, expected);
}

#[test]
fn top_five_takes_the_highest_impacts_in_order() {
    let rows: Vec<PlayerRow> = (1..=7)
        .map(|i| fixed_impact(&format!("P{i}"), "AAA", 50, i as f64))
        .collect();
    let top = top_performers(&rows, 5);
    let names: Vec<&str> = top.iter().map(|p| p.player.as_str()).collect();
    assert_eq!(names, vec!["P7", "P6", "P5", "P4", "P3"]);
    assert_eq!(top[0].impact, 7.0);

    let short = top_performers(&rows[..3], 5);
    assert_eq!(short.len(), 3);
}
