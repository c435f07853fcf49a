//! Connectivity state machine.
//!
//! Starts offline. A platform down-signal concludes offline immediately and
//! invalidates any probe still in flight; otherwise reachability is decided
//! by probing the tile server. Probe results carry the generation they were
//! started with, so stale results are dropped at dispatch.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfflineReason {
    /// No probe has concluded yet.
    Checking,
    /// The probe says the server is reachable but offline mode is in force.
    Forced,
    NoConnection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityState {
    /// Last platform up/down signal; assumed up until told otherwise.
    pub platform_online: bool,
    /// Latest probe conclusion.
    pub is_online: bool,
    pub last_checked_ms: Option<u64>,
    probe_generation: u64,
}

impl Default for ConnectivityState {
    fn default() -> Self {
        Self {
            platform_online: true,
            is_online: false,
            last_checked_ms: None,
            probe_generation: 0,
        }
    }
}

impl ConnectivityState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new probe attempt, superseding any in-flight one.
    pub fn begin_probe(&mut self) -> u64 {
        self.probe_generation = self.probe_generation.wrapping_add(1);
        self.probe_generation
    }

    /// Drops any in-flight probe without recording a conclusion.
    pub fn invalidate_probes(&mut self) {
        self.probe_generation = self.probe_generation.wrapping_add(1);
    }

    #[must_use]
    pub fn is_current_probe(&self, generation: u64) -> bool {
        self.probe_generation == generation
    }

    pub fn conclude(&mut self, online: bool, now_ms: u64) {
        self.is_online = online;
        self.last_checked_ms = Some(now_ms);
    }

    /// Why the map is offline, given the tile layer mode in force.
    #[must_use]
    pub fn offline_reason(&self) -> OfflineReason {
        if self.last_checked_ms.is_none() {
            OfflineReason::Checking
        } else if self.is_online {
            OfflineReason::Forced
        } else {
            OfflineReason::NoConnection
        }
    }
}
