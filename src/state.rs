use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::view::{self, MatchupView};

pub const MIN_GAMES_FLOOR: u32 = 1;
pub const MIN_GAMES_CEIL: u32 = 82;
pub const DEFAULT_MIN_GAMES: u32 = 20;

const DEFAULT_TEAM1: &str = "LAL";
const DEFAULT_TEAM2: &str = "BOS";

/// One cleaned player-season row. Traded players appear once per team and
/// are deliberately not deduplicated; each row counts toward its own team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRow {
    pub player: String,
    pub team: String,
    pub games: u32,
    pub minutes_total: f64,
    pub bpm: f64,
    /// Minutes per game, rounded to 1 decimal for display.
    pub mpg: f64,
    /// (BPM / 100) * MPG * 2.083, rounded to 3 decimals. Team totals sum
    /// this rounded value, matching the source dashboard.
    pub impact: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Team,
    Player,
    Impact,
    Bpm,
    Mpg,
    Games,
}

impl SortColumn {
    pub fn label(self) -> &'static str {
        match self {
            SortColumn::Team => "Team",
            SortColumn::Player => "Player",
            SortColumn::Impact => "Impact",
            SortColumn::Bpm => "BPM",
            SortColumn::Mpg => "MPG",
            SortColumn::Games => "G",
        }
    }

    pub fn next(self) -> Self {
        match self {
            SortColumn::Team => SortColumn::Player,
            SortColumn::Player => SortColumn::Impact,
            SortColumn::Impact => SortColumn::Bpm,
            SortColumn::Bpm => SortColumn::Mpg,
            SortColumn::Mpg => SortColumn::Games,
            SortColumn::Games => SortColumn::Team,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            SortColumn::Team => SortColumn::Games,
            SortColumn::Player => SortColumn::Team,
            SortColumn::Impact => SortColumn::Player,
            SortColumn::Bpm => SortColumn::Impact,
            SortColumn::Mpg => SortColumn::Bpm,
            SortColumn::Games => SortColumn::Mpg,
        }
    }
}

/// Everything the matchup view depends on. Rebuilt from widget state on
/// every recomputation; never persisted.
#[derive(Debug, Clone)]
pub struct MatchupSelection {
    pub injured: HashSet<String>,
    pub min_games: u32,
    pub team1: String,
    pub team2: String,
    pub sort_by: SortColumn,
    pub descending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    InjuredList,
    MinGames,
    TeamOne,
    TeamTwo,
    SortColumn,
    SortOrder,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Focus::InjuredList => Focus::MinGames,
            Focus::MinGames => Focus::TeamOne,
            Focus::TeamOne => Focus::TeamTwo,
            Focus::TeamTwo => Focus::SortColumn,
            Focus::SortColumn => Focus::SortOrder,
            Focus::SortOrder => Focus::InjuredList,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Focus::InjuredList => Focus::SortOrder,
            Focus::MinGames => Focus::InjuredList,
            Focus::TeamOne => Focus::MinGames,
            Focus::TeamTwo => Focus::TeamOne,
            Focus::SortColumn => Focus::TeamTwo,
            Focus::SortOrder => Focus::SortColumn,
        }
    }
}

pub struct AppState {
    /// Base table. Immutable between refreshes; the view works on copies.
    players: Vec<PlayerRow>,
    pub injured: HashSet<String>,
    pub min_games: u32,
    pub team1_idx: usize,
    pub team2_idx: usize,
    pub sort_by: SortColumn,
    pub descending: bool,
    pub focus: Focus,
    pub player_cursor: usize,
    pub combined_scroll: usize,
    pub help_overlay: bool,
    pub load_error: Option<String>,
    pub fetched_at: Option<u64>,
    pub logs: VecDeque<String>,
}

impl AppState {
    pub fn new(players: Vec<PlayerRow>) -> Self {
        let mut state = Self {
            players,
            injured: HashSet::new(),
            min_games: DEFAULT_MIN_GAMES,
            team1_idx: 0,
            team2_idx: 0,
            sort_by: SortColumn::Team,
            descending: true,
            focus: Focus::InjuredList,
            player_cursor: 0,
            combined_scroll: 0,
            help_overlay: false,
            load_error: None,
            fetched_at: None,
            logs: VecDeque::new(),
        };
        state.reset_team_defaults();
        state
    }

    pub fn players(&self) -> &[PlayerRow] {
        &self.players
    }

    /// Replace the base table wholesale (cache refresh). Selections survive;
    /// indices are re-anchored to the new team list.
    pub fn set_players(&mut self, players: Vec<PlayerRow>, fetched_at: u64) {
        let team1 = self.team_at(self.team1_idx);
        let team2 = self.team_at(self.team2_idx);
        self.players = players;
        self.fetched_at = Some(fetched_at);
        self.load_error = None;
        let options = self.team_options();
        self.team1_idx = team1
            .and_then(|t| options.iter().position(|o| *o == t))
            .unwrap_or(0);
        self.team2_idx = team2
            .and_then(|t| options.iter().position(|o| *o == t))
            .unwrap_or_else(|| if options.len() > 1 { 1 } else { 0 });
        self.clamp_cursors();
    }

    /// Distinct team codes with at least one row passing the games filter,
    /// sorted. The dropdown domain tracks the filter, like the source.
    pub fn team_options(&self) -> Vec<String> {
        let mut teams: Vec<String> = self
            .players
            .iter()
            .filter(|row| row.games >= self.min_games)
            .map(|row| row.team.clone())
            .collect();
        teams.sort();
        teams.dedup();
        teams
    }

    pub fn selection(&self) -> MatchupSelection {
        let options = self.team_options();
        let team1 = options
            .get(self.team1_idx.min(options.len().saturating_sub(1)))
            .cloned()
            .unwrap_or_default();
        let team2 = options
            .get(self.team2_idx.min(options.len().saturating_sub(1)))
            .cloned()
            .unwrap_or_default();
        MatchupSelection {
            injured: self.injured.clone(),
            min_games: self.min_games,
            team1,
            team2,
            sort_by: self.sort_by,
            descending: self.descending,
        }
    }

    pub fn view(&self) -> MatchupView {
        view::compute_view(&self.players, &self.selection())
    }

    pub fn cycle_focus(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn cycle_focus_back(&mut self) {
        self.focus = self.focus.prev();
    }

    /// j / Down for the focused control.
    pub fn bump_down(&mut self) {
        match self.focus {
            Focus::InjuredList => {
                let total = self.players.len();
                if total > 0 {
                    self.player_cursor = (self.player_cursor + 1) % total;
                }
            }
            Focus::MinGames => self.dec_min_games(),
            Focus::TeamOne => self.cycle_team1(1),
            Focus::TeamTwo => self.cycle_team2(1),
            Focus::SortColumn => self.sort_by = self.sort_by.next(),
            Focus::SortOrder => self.descending = !self.descending,
        }
    }

    /// k / Up for the focused control.
    pub fn bump_up(&mut self) {
        match self.focus {
            Focus::InjuredList => {
                let total = self.players.len();
                if total > 0 {
                    self.player_cursor = if self.player_cursor == 0 {
                        total - 1
                    } else {
                        self.player_cursor - 1
                    };
                }
            }
            Focus::MinGames => self.inc_min_games(),
            Focus::TeamOne => self.cycle_team1(-1),
            Focus::TeamTwo => self.cycle_team2(-1),
            Focus::SortColumn => self.sort_by = self.sort_by.prev(),
            Focus::SortOrder => self.descending = !self.descending,
        }
    }

    pub fn inc_min_games(&mut self) {
        if self.min_games < MIN_GAMES_CEIL {
            self.min_games += 1;
            self.clamp_cursors();
        }
    }

    pub fn dec_min_games(&mut self) {
        if self.min_games > MIN_GAMES_FLOOR {
            self.min_games -= 1;
            self.clamp_cursors();
        }
    }

    pub fn toggle_injured_at_cursor(&mut self) {
        let Some(row) = self.players.get(self.player_cursor) else {
            return;
        };
        let name = row.player.clone();
        if !self.injured.remove(&name) {
            self.injured.insert(name.clone());
            self.push_log(format!("[INFO] Marked injured: {name}"));
        } else {
            self.push_log(format!("[INFO] Cleared injury: {name}"));
        }
    }

    pub fn clear_injured(&mut self) {
        if !self.injured.is_empty() {
            let count = self.injured.len();
            self.injured.clear();
            self.push_log(format!("[INFO] Cleared {count} injury selection(s)"));
        }
    }

    pub fn cycle_sort(&mut self) {
        self.sort_by = self.sort_by.next();
    }

    pub fn toggle_order(&mut self) {
        self.descending = !self.descending;
    }

    pub fn scroll_combined_down(&mut self, total: usize) {
        // Rendering clamps further to the visible window height.
        self.combined_scroll = (self.combined_scroll + 1).min(total.saturating_sub(1));
    }

    pub fn scroll_combined_up(&mut self) {
        self.combined_scroll = self.combined_scroll.saturating_sub(1);
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 50;
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    fn team_at(&self, idx: usize) -> Option<String> {
        self.team_options().get(idx).cloned()
    }

    fn reset_team_defaults(&mut self) {
        let options = self.team_options();
        self.team1_idx = options
            .iter()
            .position(|t| t == DEFAULT_TEAM1)
            .unwrap_or(0);
        self.team2_idx = options
            .iter()
            .position(|t| t == DEFAULT_TEAM2)
            .unwrap_or_else(|| if options.len() > 1 { 1 } else { 0 });
    }

    fn cycle_team1(&mut self, step: isize) {
        self.team1_idx = cycle_index(self.team1_idx, step, self.team_options().len());
    }

    fn cycle_team2(&mut self, step: isize) {
        self.team2_idx = cycle_index(self.team2_idx, step, self.team_options().len());
    }

    fn clamp_cursors(&mut self) {
        let teams = self.team_options().len();
        if teams == 0 {
            self.team1_idx = 0;
            self.team2_idx = 0;
        } else {
            self.team1_idx = self.team1_idx.min(teams - 1);
            self.team2_idx = self.team2_idx.min(teams - 1);
        }
        if self.players.is_empty() {
            self.player_cursor = 0;
        } else {
            self.player_cursor = self.player_cursor.min(self.players.len() - 1);
        }
    }
}

fn cycle_index(current: usize, step: isize, total: usize) -> usize {
    if total == 0 {
        return 0;
    }
    let total = total as isize;
    let next = (current as isize + step).rem_euclid(total);
    next as usize
}
