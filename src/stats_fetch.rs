use std::env;

use reqwest::header::USER_AGENT;
use thiserror::Error;

use crate::http_client::http_client;
use crate::state::PlayerRow;
use crate::table_parse::{RawTable, find_column_containing, first_table};

pub const DEFAULT_STATS_URL: &str =
    "https://www.basketball-reference.com/leagues/NBA_2026_advanced.html";

/// Scaling constant folding a per-100-possessions rating down to a
/// per-game contribution at the observed minutes load.
const IMPACT_SCALE: f64 = 2.083;

const RANK_HEADER: &str = "Rk";

#[derive(Debug, Error)]
pub enum LoadError {
    /// Network, transport or remote-format failure. Fatal to the load.
    #[error("fetch failed: {0}")]
    FetchFailed(String),
    /// A required column is absent after cleanup. Fatal to the load; an
    /// incomplete table invalidates the whole dataset.
    #[error("missing expected column: {0}")]
    MissingColumn(String),
}

pub fn stats_url() -> String {
    env::var("NBA_STATS_URL")
        .ok()
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_STATS_URL.to_string())
}

/// Fetch and clean the advanced-stats table. One synchronous GET; the
/// caller blocks until the rows are ready or the load fails.
pub fn load_players() -> Result<Vec<PlayerRow>, LoadError> {
    let client = http_client().map_err(|err| LoadError::FetchFailed(err.to_string()))?;
    let url = stats_url();
    let resp = client
        .get(&url)
        .header(USER_AGENT, "Mozilla/5.0")
        .send()
        .map_err(|err| LoadError::FetchFailed(format!("{url}: {err}")))?;
    let status = resp.status();
    let body = resp
        .text()
        .map_err(|err| LoadError::FetchFailed(format!("failed reading body: {err}")))?;
    if !status.is_success() {
        return Err(LoadError::FetchFailed(format!("http {status} from {url}")));
    }
    parse_advanced_stats(&body)
}

/// Parse a full HTML document into cleaned player rows. Split from the
/// fetch so tests and benches can feed fixture documents.
pub fn parse_advanced_stats(html: &str) -> Result<Vec<PlayerRow>, LoadError> {
    let table =
        first_table(html).ok_or_else(|| LoadError::FetchFailed("no table in document".into()))?;
    build_player_rows(&table)
}

pub fn build_player_rows(table: &RawTable) -> Result<Vec<PlayerRow>, LoadError> {
    let headers: Vec<String> = table
        .headers
        .iter()
        .map(|name| name.trim().to_string())
        .collect();

    let bpm_idx = find_column_containing(&headers, "BPM")
        .ok_or_else(|| LoadError::MissingColumn("BPM".into()))?;
    let player_idx = exact_column(&headers, "Player")?;
    let team_idx = exact_column(&headers, "Team")?;
    let games_idx = exact_column(&headers, "G")?;
    let minutes_idx = exact_column(&headers, "MP")?;
    let rank_idx = headers.iter().position(|name| name == RANK_HEADER);

    let mut rows = Vec::with_capacity(table.rows.len());
    for cells in &table.rows {
        // The source repeats its header mid-table; those rows carry the
        // literal header label in the rank cell.
        if let Some(idx) = rank_idx
            && cells.get(idx).is_some_and(|cell| cell == RANK_HEADER)
        {
            continue;
        }

        let Some(player) = cells.get(player_idx).map(|s| s.trim()) else {
            continue;
        };
        let Some(team) = cells.get(team_idx).map(|s| s.trim()) else {
            continue;
        };
        if player.is_empty() || team.is_empty() {
            continue;
        }

        // Per-cell coercion failures drop the row, they never fail the load.
        let Some(games) = cells.get(games_idx).and_then(|s| s.parse::<u32>().ok()) else {
            continue;
        };
        let Some(minutes_total) = cells.get(minutes_idx).and_then(|s| s.parse::<f64>().ok())
        else {
            continue;
        };
        let Some(bpm) = cells.get(bpm_idx).and_then(|s| s.parse::<f64>().ok()) else {
            continue;
        };
        if games == 0 {
            continue;
        }

        let mpg_raw = minutes_per_game(minutes_total, games);
        rows.push(PlayerRow {
            player: player.to_string(),
            team: team.to_string(),
            games,
            minutes_total,
            bpm,
            mpg: round1(mpg_raw),
            impact: round3(impact_metric(bpm, mpg_raw)),
        });
    }
    Ok(rows)
}

pub fn minutes_per_game(minutes_total: f64, games: u32) -> f64 {
    minutes_total / games as f64
}

/// Impact derives from the unrounded minutes-per-game; only the stored
/// value is rounded. See DESIGN.md on rounding before aggregation.
pub fn impact_metric(bpm: f64, mpg: f64) -> f64 {
    (bpm / 100.0) * mpg * IMPACT_SCALE
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn exact_column(headers: &[String], name: &str) -> Result<usize, LoadError> {
    headers
        .iter()
        .position(|header| header == name)
        .ok_or_else(|| LoadError::MissingColumn(name.to_string()))
}
