//! Capability interface between an interception hook and the stub engine.

use crate::error::NoStubMatched;
use crate::registry::ActiveSet;
use crate::request::RawRequest;
use crate::response::ResponseSink;

/// What an interception layer needs from the engine.
pub trait Interceptor: Send + Sync {
    /// Whether a registered stub accepts the request.
    fn can_handle(&self, request: &RawRequest) -> bool;

    /// Run the matching stub's handler, which drives `sink` until its
    /// terminal event. Returns [`NoStubMatched`] when nothing accepts the
    /// request; the sink is dropped without any event in that case.
    fn start(&self, request: RawRequest, sink: Box<dyn ResponseSink>) -> Result<(), NoStubMatched>;
}

/// [`Interceptor`] backed by an [`ActiveSet`].
#[derive(Debug, Clone)]
pub struct StubProtocol {
    active: ActiveSet,
}

impl StubProtocol {
    /// Serve the process-wide active set.
    pub fn new() -> Self {
        Self::with_active_set(ActiveSet::global().clone())
    }

    pub fn with_active_set(active: ActiveSet) -> Self {
        Self { active }
    }

    pub fn active_set(&self) -> &ActiveSet {
        &self.active
    }
}

impl Default for StubProtocol {
    fn default() -> Self {
        Self::new()
    }
}

impl Interceptor for StubProtocol {
    fn can_handle(&self, request: &RawRequest) -> bool {
        self.active.find(request).is_ok()
    }

    fn start(&self, request: RawRequest, sink: Box<dyn ResponseSink>) -> Result<(), NoStubMatched> {
        let stub = self.active.find(&request)?;
        stub.respond(request, sink);
        Ok(())
    }
}
