pub mod bridge;
pub mod frame;
pub mod map;
pub mod probe;
pub mod timer;

pub use self::bridge::{Bridge, BridgeError, BridgeOperation, BridgeOutput, BridgeResult};
pub use self::frame::{Frame, FramePresented, FrameRequest};
pub use self::map::{MapLayer, MapOperation};
pub use self::probe::{Probe, ProbeOperation, ProbeOutcome, ProbeOutput};
pub use self::timer::{Timer, TimerFired, TimerOperation};

// We use Crux's built-in Render capability directly because it provides
// all necessary functionality for triggering view updates.
pub use crux_core::render::Render;

use self::map::MapLayer as Map;
use crate::event::Event;

pub type AppRender = Render<Event>;
pub type AppBridge = Bridge<Event>;
pub type AppTimer = Timer<Event>;
pub type AppFrame = Frame<Event>;
pub type AppProbe = Probe<Event>;
pub type AppMap = MapLayer<Event>;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub render: Render<Event>,
    pub bridge: Bridge<Event>,
    pub timer: Timer<Event>,
    pub frame: Frame<Event>,
    pub probe: Probe<Event>,
    pub map: Map<Event>,
}
