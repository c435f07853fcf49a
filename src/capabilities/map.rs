//! Map-widget command capability. Fire-and-forget instructions to the
//! shell's map: draw a tile, swap the tile layer, focus a marker.

use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

use crate::marker::MarkerId;
use crate::tiles::{TileImage, TileKey, TileMode};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MapOperation {
    /// Remove the current tile layer and attach a fresh one.
    SwitchLayer { mode: TileMode, epoch: u64 },
    DrawTile { key: TileKey, epoch: u64, image: TileImage },
    /// Pan to the marker and open its popup.
    FocusMarker { id: MarkerId, lat: f64, lng: f64 },
}

// Coordinates are finite by construction.
impl Eq for MapOperation {}

impl Operation for MapOperation {
    type Output = ();
}

pub struct MapLayer<Ev> {
    context: CapabilityContext<MapOperation, Ev>,
}

impl<Ev> MapLayer<Ev>
where
    Ev: 'static,
{
    #[must_use]
    pub fn new(context: CapabilityContext<MapOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn switch_layer(&self, mode: TileMode, epoch: u64) {
        self.notify(MapOperation::SwitchLayer { mode, epoch });
    }

    pub fn draw_tile(&self, key: TileKey, epoch: u64, image: TileImage) {
        self.notify(MapOperation::DrawTile { key, epoch, image });
    }

    pub fn focus_marker(&self, id: MarkerId, lat: f64, lng: f64) {
        self.notify(MapOperation::FocusMarker { id, lat, lng });
    }

    fn notify(&self, operation: MapOperation) {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            ctx.notify_shell(operation).await;
        });
    }
}

impl<Ev> Capability<Ev> for MapLayer<Ev> {
    type Operation = MapOperation;
    type MappedSelf<MappedEv> = MapLayer<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static,
    {
        MapLayer::new(self.context.map_event(f))
    }
}
