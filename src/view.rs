use std::collections::HashSet;

use crate::state::{MatchupSelection, PlayerRow, SortColumn};

/// Fixed classification threshold: matchups within one impact point in
/// either direction are called close. Boundaries are exclusive.
const FAVORED_THRESHOLD: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub enum MatchupCall {
    TeamOneFavored(f64),
    TeamTwoFavored(f64),
    Close,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopPerformer {
    pub player: String,
    pub impact: f64,
}

#[derive(Debug, Clone)]
pub struct MatchupView {
    pub team1_rows: Vec<PlayerRow>,
    pub team2_rows: Vec<PlayerRow>,
    pub team1_impact: f64,
    pub team2_impact: f64,
    pub advantage: f64,
    pub call: MatchupCall,
    pub combined: Vec<PlayerRow>,
    pub top_team1: Vec<TopPerformer>,
    pub top_team2: Vec<TopPerformer>,
}

/// Pure function of (base table, selection). The base table is never
/// mutated; injuries and filters apply to a working copy.
pub fn compute_view(base: &[PlayerRow], sel: &MatchupSelection) -> MatchupView {
    let working = apply_injuries(base, &sel.injured);
    let filtered = filter_by_games(&working, sel.min_games);

    let team1_rows: Vec<PlayerRow> = filtered
        .iter()
        .filter(|row| row.team == sel.team1)
        .cloned()
        .collect();
    let team2_rows: Vec<PlayerRow> = filtered
        .iter()
        .filter(|row| row.team == sel.team2)
        .cloned()
        .collect();

    let team1_impact: f64 = team1_rows.iter().map(|row| row.impact).sum();
    let team2_impact: f64 = team2_rows.iter().map(|row| row.impact).sum();
    let advantage = team1_impact - team2_impact;

    let mut combined: Vec<PlayerRow> = team1_rows.clone();
    combined.extend(team2_rows.iter().cloned());
    sort_rows(&mut combined, sel.sort_by, sel.descending);

    MatchupView {
        top_team1: top_performers(&team1_rows, 5),
        top_team2: top_performers(&team2_rows, 5),
        team1_rows,
        team2_rows,
        team1_impact,
        team2_impact,
        advantage,
        call: classify_advantage(advantage),
        combined,
    }
}

/// Zero out impact for injured players; all other fields untouched.
pub fn apply_injuries(rows: &[PlayerRow], injured: &HashSet<String>) -> Vec<PlayerRow> {
    rows.iter()
        .map(|row| {
            let mut row = row.clone();
            if injured.contains(&row.player) {
                row.impact = 0.0;
            }
            row
        })
        .collect()
}

pub fn filter_by_games(rows: &[PlayerRow], min_games: u32) -> Vec<PlayerRow> {
    rows.iter()
        .filter(|row| row.games >= min_games)
        .cloned()
        .collect()
}

pub fn classify_advantage(advantage: f64) -> MatchupCall {
    if advantage > FAVORED_THRESHOLD {
        MatchupCall::TeamOneFavored(advantage)
    } else if advantage < -FAVORED_THRESHOLD {
        MatchupCall::TeamTwoFavored(-advantage)
    } else {
        MatchupCall::Close
    }
}

/// Stable sort; rows with equal keys keep their pre-sort order.
pub fn sort_rows(rows: &mut [PlayerRow], by: SortColumn, descending: bool) {
    rows.sort_by(|a, b| {
        let ord = match by {
            SortColumn::Team => a.team.cmp(&b.team),
            SortColumn::Player => a.player.cmp(&b.player),
            SortColumn::Impact => a.impact.total_cmp(&b.impact),
            SortColumn::Bpm => a.bpm.total_cmp(&b.bpm),
            SortColumn::Mpg => a.mpg.total_cmp(&b.mpg),
            SortColumn::Games => a.games.cmp(&b.games),
        };
        if descending { ord.reverse() } else { ord }
    });
}

/// The `count` highest-impact rows, descending; ties resolve to the earlier
/// input row (stable sort, take first).
pub fn top_performers(rows: &[PlayerRow], count: usize) -> Vec<TopPerformer> {
    let mut ranked: Vec<&PlayerRow> = rows.iter().collect();
    ranked.sort_by(|a, b| b.impact.total_cmp(&a.impact));
    ranked
        .into_iter()
        .take(count)
        .map(|row| TopPerformer {
            player: row.player.clone(),
            impact: row.impact,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_boundaries_are_exclusive() {
        assert_eq!(
            classify_advantage(1.5),
            MatchupCall::TeamOneFavored(1.5)
        );
        assert_eq!(classify_advantage(-0.5), MatchupCall::Close);
        assert_eq!(
            classify_advantage(-3.2),
            MatchupCall::TeamTwoFavored(3.2)
        );
        assert_eq!(classify_advantage(1.0), MatchupCall::Close);
        assert_eq!(classify_advantage(-1.0), MatchupCall::Close);
    }

    #[test]
    fn descending_reverse_keeps_ties_stable() {
        let rows = vec![
            PlayerRow {
                player: "First".into(),
                team: "AAA".into(),
                games: 50,
                minutes_total: 1500.0,
                bpm: 2.0,
                mpg: 30.0,
                impact: 1.25,
            },
            PlayerRow {
                player: "Second".into(),
                team: "AAA".into(),
                games: 50,
                minutes_total: 1400.0,
                bpm: 1.0,
                mpg: 28.0,
                impact: 0.583,
            },
        ];
        let mut sorted = rows.clone();
        sort_rows(&mut sorted, SortColumn::Games, true);
        assert_eq!(sorted[0].player, "First");
        assert_eq!(sorted[1].player, "Second");
        sort_rows(&mut sorted, SortColumn::Games, false);
        assert_eq!(sorted[0].player, "First");
    }
}
