//! Engine state. Everything lives here; handlers receive it by reference.

use crate::connectivity::ConnectivityState;
use crate::marker::MarkerRegistry;
use crate::render::ViewState;
use crate::selection::SelectionState;
use crate::sync::BatchSyncQueue;
use crate::tiles::TileState;

#[derive(Debug, Default)]
pub struct Model {
    pub initialized: bool,
    /// Set once the host announces the bridge channel. Every bridge call is
    /// gated on this; without it the call degrades to a user-visible notice.
    pub bridge_ready: bool,
    pub registry: MarkerRegistry,
    pub selection: SelectionState,
    pub sync_queue: BatchSyncQueue,
    pub connectivity: ConnectivityState,
    pub tiles: TileState,
    pub views: ViewState,
    pub notice: Option<String>,
}
