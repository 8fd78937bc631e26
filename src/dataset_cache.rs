use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::state::PlayerRow;
use crate::stats_fetch::LoadError;

const CACHE_VERSION: u32 = 1;
const CACHE_DIR: &str = "bpm_terminal";
const CACHE_FILE: &str = "stats_cache.json";

pub const DEFAULT_TTL_SECS: u64 = 86_400;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StatsCacheFile {
    version: u32,
    fetched_at: u64,
    rows: Vec<PlayerRow>,
}

/// Time-boxed cache for the loaded table: one global slot, no key. Reads
/// take the current time in unix seconds so tests can drive the clock.
pub struct DatasetCache {
    ttl_secs: u64,
    slot: Mutex<Option<StatsCacheFile>>,
}

impl DatasetCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            ttl_secs,
            slot: Mutex::new(None),
        }
    }

    pub fn from_env() -> Self {
        let ttl = env::var("STATS_CACHE_TTL_SECS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TTL_SECS);
        Self::new(ttl)
    }

    /// Return the cached rows while fresh, else run the loader and replace
    /// the slot wholesale. A loader error propagates and leaves the slot
    /// untouched; expired contents are never served as a fallback.
    pub fn get_or_load<F>(&self, now_secs: u64, load: F) -> Result<(Vec<PlayerRow>, u64), LoadError>
    where
        F: FnOnce() -> Result<Vec<PlayerRow>, LoadError>,
    {
        {
            let guard = self.slot.lock().expect("stats cache lock poisoned");
            if let Some(entry) = guard.as_ref()
                && now_secs.saturating_sub(entry.fetched_at) < self.ttl_secs
            {
                return Ok((entry.rows.clone(), entry.fetched_at));
            }
        }
        self.reload(now_secs, load)
    }

    /// Re-run the loader regardless of freshness.
    pub fn force_refresh<F>(
        &self,
        now_secs: u64,
        load: F,
    ) -> Result<(Vec<PlayerRow>, u64), LoadError>
    where
        F: FnOnce() -> Result<Vec<PlayerRow>, LoadError>,
    {
        self.reload(now_secs, load)
    }

    /// Seed the slot from the on-disk cache file. Best-effort; a missing,
    /// stale-versioned or unreadable file leaves the slot empty.
    pub fn warm_from_disk(&self) {
        let Some(entry) = load_cache_file() else {
            return;
        };
        let mut guard = self.slot.lock().expect("stats cache lock poisoned");
        if guard.is_none() {
            *guard = Some(entry);
        }
    }

    /// Write the current slot to the cache file. Best-effort.
    pub fn persist(&self) -> Result<()> {
        let entry = {
            let guard = self.slot.lock().expect("stats cache lock poisoned");
            guard.clone()
        };
        let Some(entry) = entry else {
            return Ok(());
        };
        save_cache_file(&entry)
    }

    fn reload<F>(&self, now_secs: u64, load: F) -> Result<(Vec<PlayerRow>, u64), LoadError>
    where
        F: FnOnce() -> Result<Vec<PlayerRow>, LoadError>,
    {
        let rows = load()?;
        let mut guard = self.slot.lock().expect("stats cache lock poisoned");
        *guard = Some(StatsCacheFile {
            version: CACHE_VERSION,
            fetched_at: now_secs,
            rows: rows.clone(),
        });
        Ok((rows, now_secs))
    }
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

fn load_cache_file() -> Option<StatsCacheFile> {
    let path = cache_path()?;
    let raw = fs::read_to_string(path).ok()?;
    let entry = serde_json::from_str::<StatsCacheFile>(&raw).ok()?;
    if entry.version != CACHE_VERSION {
        return None;
    }
    Some(entry)
}

fn save_cache_file(entry: &StatsCacheFile) -> Result<()> {
    let Some(path) = cache_path() else {
        return Ok(());
    };
    let Some(dir) = path.parent() else {
        return Ok(());
    };
    fs::create_dir_all(dir).ok();
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(entry).context("serialize stats cache")?;
    fs::write(&tmp, json).context("write stats cache")?;
    fs::rename(&tmp, &path).context("swap stats cache")?;
    Ok(())
}

fn cache_path() -> Option<PathBuf> {
    if let Ok(base) = env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR).join(CACHE_FILE));
    }
    let home = env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".cache")
            .join(CACHE_DIR)
            .join(CACHE_FILE),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn row(player: &str) -> PlayerRow {
        PlayerRow {
            player: player.to_string(),
            team: "LAL".to_string(),
            games: 70,
            minutes_total: 2450.0,
            bpm: 5.0,
            mpg: 35.0,
            impact: 3.645,
        }
    }

    #[test]
    fn fresh_reads_skip_the_loader() {
        let cache = DatasetCache::new(DEFAULT_TTL_SECS);
        let calls = Cell::new(0u32);
        let load = || {
            calls.set(calls.get() + 1);
            Ok(vec![row("A")])
        };

        let (rows, at) = cache.get_or_load(1_000, load).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(at, 1_000);
        assert_eq!(calls.get(), 1);

        let (_, at) = cache
            .get_or_load(1_000 + DEFAULT_TTL_SECS - 1, || {
                panic!("loader must not run while fresh")
            })
            .unwrap();
        assert_eq!(at, 1_000);
    }

    #[test]
    fn expiry_triggers_a_reload() {
        let cache = DatasetCache::new(100);
        cache.get_or_load(0, || Ok(vec![row("A")])).unwrap();
        let (rows, at) = cache.get_or_load(100, || Ok(vec![row("B")])).unwrap();
        assert_eq!(at, 100);
        assert_eq!(rows[0].player, "B");
    }

    #[test]
    fn loader_error_propagates_and_keeps_slot() {
        let cache = DatasetCache::new(100);
        cache.get_or_load(0, || Ok(vec![row("A")])).unwrap();
        let err = cache
            .get_or_load(500, || Err(LoadError::FetchFailed("boom".into())))
            .unwrap_err();
        assert!(matches!(err, LoadError::FetchFailed(_)));

        // Next successful load replaces the expired slot.
        let (rows, at) = cache.get_or_load(600, || Ok(vec![row("C")])).unwrap();
        assert_eq!(at, 600);
        assert_eq!(rows[0].player, "C");
    }

    #[test]
    fn force_refresh_ignores_freshness() {
        let cache = DatasetCache::new(DEFAULT_TTL_SECS);
        cache.get_or_load(0, || Ok(vec![row("A")])).unwrap();
        let (rows, at) = cache.force_refresh(10, || Ok(vec![row("B")])).unwrap();
        assert_eq!(at, 10);
        assert_eq!(rows[0].player, "B");
    }
}
