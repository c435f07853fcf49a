//! Animation-frame capability. The shell resolves the request on its next
//! frame; rebuild coalescing lives in the app, keyed on dirty flags.

use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FramePresented;

impl Operation for FrameRequest {
    type Output = FramePresented;
}

pub struct Frame<Ev> {
    context: CapabilityContext<FrameRequest, Ev>,
}

impl<Ev> Frame<Ev>
where
    Ev: 'static,
{
    #[must_use]
    pub fn new(context: CapabilityContext<FrameRequest, Ev>) -> Self {
        Self { context }
    }

    pub fn request<F>(&self, make_event: F)
    where
        F: FnOnce(FramePresented) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let presented = ctx.request_from_shell(FrameRequest).await;
            ctx.update_app(make_event(presented));
        });
    }
}

impl<Ev> Capability<Ev> for Frame<Ev> {
    type Operation = FrameRequest;
    type MappedSelf<MappedEv> = Frame<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static,
    {
        Frame::new(self.context.map_event(f))
    }
}
