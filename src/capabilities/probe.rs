//! Reachability probe capability. The shell issues a HEAD request against
//! the given URL and aborts it after `timeout_ms`; the abort is the shell's
//! job so a hung request can never wedge the core.

use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeOperation {
    pub url: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeOutcome {
    Reachable,
    Unreachable,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeOutput {
    pub outcome: ProbeOutcome,
    pub checked_at_ms: u64,
}

impl Operation for ProbeOperation {
    type Output = ProbeOutput;
}

pub struct Probe<Ev> {
    context: CapabilityContext<ProbeOperation, Ev>,
}

impl<Ev> Probe<Ev>
where
    Ev: 'static,
{
    #[must_use]
    pub fn new(context: CapabilityContext<ProbeOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn check<F>(&self, url: String, timeout_ms: u64, make_event: F)
    where
        F: FnOnce(ProbeOutput) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let output = ctx
                .request_from_shell(ProbeOperation { url, timeout_ms })
                .await;
            ctx.update_app(make_event(output));
        });
    }
}

impl<Ev> Capability<Ev> for Probe<Ev> {
    type Operation = ProbeOperation;
    type MappedSelf<MappedEv> = Probe<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static,
    {
        Probe::new(self.context.map_event(f))
    }
}
