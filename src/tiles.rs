//! Offline tile plumbing: URL computation, decoded-pixel cache and layer
//! epochs.
//!
//! The online layer is delegated to the shell's map widget entirely; this
//! module only backs the offline layer, where every tile is fetched through
//! the host bridge and decoded here. The cache is keyed by URL and lives for
//! one layer epoch; a pan/zoom refresh or a mode switch bumps the epoch and
//! clears it wholesale.

use std::collections::HashSet;
use std::fmt;

use lru::LruCache;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{TILE_CACHE_CAPACITY, TILE_SUBDOMAINS};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TileError {
    #[error("tile payload is empty")]
    Empty,
    #[error("tile decode failed: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileMode {
    Online,
    Offline,
}

/// Slippy-map tile address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileKey {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileKey {
    /// CartoDB Voyager URL for this tile, spreading load across the four
    /// subdomains the same way the online layer does.
    #[must_use]
    pub fn url(&self) -> String {
        let index = (self.x.wrapping_add(self.y) % 4) as usize;
        let subdomain = &TILE_SUBDOMAINS[index..=index];
        format!(
            "https://{subdomain}.basemaps.cartocdn.com/rastertiles/voyager/{z}/{x}/{y}.png",
            z = self.z,
            x = self.x,
            y = self.y,
        )
    }
}

/// Decoded RGBA tile pixels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilePixels {
    pub width: u32,
    pub height: u32,
    #[serde(with = "serde_bytes")]
    pub rgba: Vec<u8>,
}

/// What the shell should draw for a tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileImage {
    Decoded(TilePixels),
    /// The shell renders its native grey "Офлайн" tile.
    OfflinePlaceholder,
}

pub fn decode_tile(bytes: &[u8]) -> Result<TilePixels, TileError> {
    if bytes.is_empty() {
        return Err(TileError::Empty);
    }
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| TileError::Decode(e.to_string()))?
        .to_rgba8();
    Ok(TilePixels {
        width: decoded.width(),
        height: decoded.height(),
        rgba: decoded.into_raw(),
    })
}

/// Tile layer mode, epoch, cache and in-flight fetch dedup.
pub struct TileState {
    mode: Option<TileMode>,
    epoch: u64,
    cache: LruCache<String, TilePixels>,
    in_flight: HashSet<String>,
}

impl Default for TileState {
    fn default() -> Self {
        Self {
            mode: None,
            epoch: 0,
            cache: LruCache::new(TILE_CACHE_CAPACITY),
            in_flight: HashSet::new(),
        }
    }
}

impl fmt::Debug for TileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileState")
            .field("mode", &self.mode)
            .field("epoch", &self.epoch)
            .field("cached", &self.cache.len())
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}

impl TileState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn mode(&self) -> Option<TileMode> {
        self.mode
    }

    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Switches the layer mode, starting a fresh epoch. Returns the new
    /// epoch, or None when the mode is already in force (no layer recreate).
    pub fn activate(&mut self, mode: TileMode) -> Option<u64> {
        if self.mode == Some(mode) {
            return None;
        }
        self.mode = Some(mode);
        Some(self.next_epoch())
    }

    /// Pan/zoom refresh: new epoch, cold cache.
    pub fn refresh(&mut self) -> u64 {
        self.next_epoch()
    }

    fn next_epoch(&mut self) -> u64 {
        self.epoch = self.epoch.wrapping_add(1);
        self.cache.clear();
        self.in_flight.clear();
        self.epoch
    }

    pub fn cached(&mut self, url: &str) -> Option<TilePixels> {
        self.cache.get(url).cloned()
    }

    /// Records a fetch as in flight; false means one is already running for
    /// this URL and the caller must not start another.
    pub fn begin_fetch(&mut self, url: &str) -> bool {
        self.in_flight.insert(url.to_owned())
    }

    pub fn finish_fetch(&mut self, url: &str) {
        self.in_flight.remove(url);
    }

    /// Caches decoded pixels. Results from a superseded epoch are not kept.
    pub fn store(&mut self, url: String, epoch: u64, pixels: TilePixels) -> bool {
        if epoch != self.epoch {
            return false;
        }
        self.cache.put(url, pixels);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixels() -> TilePixels {
        TilePixels {
            width: 1,
            height: 1,
            rgba: vec![0, 0, 0, 255],
        }
    }

    #[test]
    fn url_spreads_subdomains_deterministically() {
        let key = TileKey { z: 12, x: 2, y: 3 };
        assert_eq!(
            key.url(),
            "https://b.basemaps.cartocdn.com/rastertiles/voyager/12/2/3.png"
        );
        // Same key, same URL.
        assert_eq!(key.url(), key.url());
        let other = TileKey { z: 12, x: 0, y: 0 };
        assert!(other.url().starts_with("https://a."));
    }

    #[test]
    fn activate_same_mode_is_a_no_op() {
        let mut state = TileState::new();
        assert_eq!(state.activate(TileMode::Offline), Some(1));
        assert_eq!(state.activate(TileMode::Offline), None);
        assert_eq!(state.activate(TileMode::Online), Some(2));
    }

    #[test]
    fn refresh_clears_cache_and_in_flight() {
        let mut state = TileState::new();
        state.activate(TileMode::Offline);
        let epoch = state.epoch();
        state.store("u1".into(), epoch, pixels());
        assert!(state.begin_fetch("u2"));

        state.refresh();
        assert_eq!(state.cached("u1"), None);
        // The old fetch is forgotten, a new one may start.
        assert!(state.begin_fetch("u2"));
    }

    #[test]
    fn stale_epoch_results_are_not_cached() {
        let mut state = TileState::new();
        state.activate(TileMode::Offline);
        let old_epoch = state.epoch();
        state.refresh();
        assert!(!state.store("u1".into(), old_epoch, pixels()));
        assert_eq!(state.cached("u1"), None);
    }

    #[test]
    fn begin_fetch_dedups_per_url() {
        let mut state = TileState::new();
        assert!(state.begin_fetch("u1"));
        assert!(!state.begin_fetch("u1"));
        state.finish_fetch("u1");
        assert!(state.begin_fetch("u1"));
    }

    #[test]
    fn decode_rejects_empty_and_garbage() {
        assert_eq!(decode_tile(&[]), Err(TileError::Empty));
        assert!(matches!(
            decode_tile(&[0xde, 0xad, 0xbe, 0xef]),
            Err(TileError::Decode(_))
        ));
    }
}
