//! Debounced color-batch sync towards the host.
//!
//! Color picks pile up in the queue; a generation counter guards the quiet
//! timer so only the most recent arming flushes. The flush collapses the
//! queue last-writer-wins and ships a full snapshot of every marker.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::marker::{ColorToken, MarkerId, MarkerRecord, MarkerRegistry};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingColorChange {
    pub color: ColorToken,
    pub marker_ids: Vec<MarkerId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSyncQueue {
    pending: Vec<PendingColorChange>,
    generation: u64,
}

impl BatchSyncQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True only for the generation handed out by the latest `enqueue`;
    /// earlier timers are superseded and must not flush.
    #[must_use]
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Appends a change and arms a fresh timer generation.
    pub fn enqueue(&mut self, color: ColorToken, marker_ids: Vec<MarkerId>) -> u64 {
        self.pending.push(PendingColorChange { color, marker_ids });
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }

    /// Collapses queued changes to the final color per marker, in enqueue
    /// order so later picks win.
    #[must_use]
    pub fn collapse(&self) -> HashMap<MarkerId, ColorToken> {
        let mut final_colors = HashMap::new();
        for change in &self.pending {
            for id in &change.marker_ids {
                final_colors.insert(id.clone(), change.color.clone());
            }
        }
        final_colors
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// One marker in the outbound `changeColor` snapshot. The legacy singular
/// `fileName` is re-emitted for host compatibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncMarker {
    pub id: MarkerId,
    pub lat: f64,
    pub lng: f64,
    pub name: String,
    pub deep: Value,
    pub filters: Value,
    pub debit: Value,
    pub comments: Value,
    pub color: ColorToken,
    pub file_name: String,
    pub file_names: Vec<String>,
}

impl SyncMarker {
    #[must_use]
    pub fn from_record(record: &MarkerRecord) -> Self {
        Self {
            id: record.id.clone(),
            lat: record.lat,
            lng: record.lng,
            name: record.name.clone(),
            deep: record.deep.clone(),
            filters: record.filters.clone(),
            debit: record.debit.clone(),
            comments: record.comments.clone(),
            color: record.color.clone(),
            file_name: record.file_names.first().cloned().unwrap_or_default(),
            file_names: record.file_names.clone(),
        }
    }
}

/// Full snapshot of the registry, in host insertion order.
#[must_use]
pub fn snapshot(registry: &MarkerRegistry) -> Vec<SyncMarker> {
    registry.iter().map(SyncMarker::from_record).collect()
}
