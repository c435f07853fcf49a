//! Host bridge capability.
//!
//! One operation enum covers the full host surface. `GetTile` is the only
//! round trip; everything else is fire-and-forget. The shell resolves every
//! round trip with an explicit `BridgeResult` so the caller always sees
//! either a payload or a failure, never a silent drop.

use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::marker::MarkerId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BridgeOperation {
    GetTile { url: String },
    AddPoint { lat: f64, lng: f64 },
    RemovePoint { id: MarkerId },
    /// Serialized array of every marker, already JSON-encoded.
    ChangeColor { markers_json: String },
    SwitchToOnlineMode,
    SwitchToOfflineMode,
    OpenFileInWord { file_name: String },
    OpenFileLocation { file_name: String },
}

// Coordinates are finite by construction (they come from map clicks).
impl Eq for BridgeOperation {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BridgeOutput {
    Tile(#[serde(with = "serde_bytes")] Vec<u8>),
    Ack,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum BridgeError {
    #[error("bridge channel is not available")]
    ChannelUnavailable,
    #[error("host error: {message}")]
    Host { message: String },
}

pub type BridgeResult = Result<BridgeOutput, BridgeError>;

impl Operation for BridgeOperation {
    type Output = BridgeResult;
}

pub struct Bridge<Ev> {
    context: CapabilityContext<BridgeOperation, Ev>,
}

impl<Ev> Bridge<Ev>
where
    Ev: 'static,
{
    #[must_use]
    pub fn new(context: CapabilityContext<BridgeOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn get_tile<F>(&self, url: String, make_event: F)
    where
        F: FnOnce(BridgeResult) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let result = ctx.request_from_shell(BridgeOperation::GetTile { url }).await;
            ctx.update_app(make_event(result));
        });
    }

    pub fn add_point(&self, lat: f64, lng: f64) {
        self.notify(BridgeOperation::AddPoint { lat, lng });
    }

    pub fn remove_point(&self, id: MarkerId) {
        self.notify(BridgeOperation::RemovePoint { id });
    }

    pub fn change_color(&self, markers_json: String) {
        self.notify(BridgeOperation::ChangeColor { markers_json });
    }

    pub fn switch_to_online_mode(&self) {
        self.notify(BridgeOperation::SwitchToOnlineMode);
    }

    pub fn switch_to_offline_mode(&self) {
        self.notify(BridgeOperation::SwitchToOfflineMode);
    }

    pub fn open_file_in_word(&self, file_name: String) {
        self.notify(BridgeOperation::OpenFileInWord { file_name });
    }

    pub fn open_file_location(&self, file_name: String) {
        self.notify(BridgeOperation::OpenFileLocation { file_name });
    }

    fn notify(&self, operation: BridgeOperation) {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            ctx.notify_shell(operation).await;
        });
    }
}

impl<Ev> Capability<Ev> for Bridge<Ev> {
    type Operation = BridgeOperation;
    type MappedSelf<MappedEv> = Bridge<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static,
    {
        Bridge::new(self.context.map_event(f))
    }
}
