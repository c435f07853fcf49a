//! Engine events.
//!
//! Every event carries the data it needs by value (ids, keys, generations);
//! handlers look state up at dispatch time rather than capturing it when the
//! event was created.

use serde::{Deserialize, Serialize};

use crate::capabilities::bridge::BridgeResult;
use crate::capabilities::probe::ProbeOutcome;
use crate::marker::{MarkerId, MarkerPayload};
use crate::render::ViewSlot;
use crate::tiles::TileKey;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // Lifecycle
    Started { now_ms: u64 },
    BridgeConnected { initial_markers: Vec<MarkerPayload>, now_ms: u64 },

    // Host-driven registry mutations
    PointAdded(Box<MarkerPayload>),
    PointUpdated(Box<MarkerPayload>),
    PointRemoved { id: MarkerId },

    // Map and list interactions
    MapClicked { lat: f64, lng: f64 },
    MarkerClicked { id: MarkerId },
    TreeEntryClicked { id: MarkerId },
    SearchResultChosen { id: MarkerId },

    // Selection
    SelectAll,
    ClearSelection,
    RemoveSelectedRequested,
    RemoveMarkerRequested { id: MarkerId },

    // Visibility
    VisibilityToggled { id: MarkerId },
    HideAll,
    ShowAll,
    HideSelected,
    ShowSelected,
    GroupVisibilityToggled { color: String },
    GroupCollapseToggled { color: String },

    // Color sync
    ColorPicked { color: String },
    FlushTimerElapsed { generation: u64 },

    // Search
    SearchSubmitted { query: String },

    // Attachments
    OpenFileRequested { file_name: String },
    RevealFileRequested { file_name: String },

    // Connectivity
    NetworkSignal { up: bool, now_ms: u64 },
    PollElapsed { now_ms: u64 },
    ProbeCompleted { generation: u64, outcome: ProbeOutcome, now_ms: u64 },

    // Tiles
    TileRequested { key: TileKey },
    TileFetched { key: TileKey, epoch: u64, result: BridgeResult },
    LayerRefreshed,

    // Frames and notices
    FrameTick { slot: ViewSlot },
    NoticeDismissed,
}
