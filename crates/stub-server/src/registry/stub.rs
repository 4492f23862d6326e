//! Stub definition and request predicate.

use crate::config::ServerOptions;
use crate::request::{RawRequest, RequestContext};
use crate::response::{ResponseEmitter, ResponseSink};
use std::fmt;
use std::sync::Arc;

/// Handler invoked with the parsed request and a fresh emitter.
///
/// The handler owns the emitter and must eventually call `end` or `error`
/// on it, possibly from another thread.
pub type Handler = Arc<dyn Fn(RequestContext, ResponseEmitter) + Send + Sync>;

/// Extra condition evaluated after method, host, port and path.
pub type Predicate = Arc<dyn Fn(&RawRequest) -> bool + Send + Sync>;

/// A registered (predicate, handler) pair. Immutable once built.
pub struct Stub {
    method: String,
    host: Option<String>,
    port: Option<u16>,
    path: Option<String>,
    predicate: Option<Predicate>,
    handler: Handler,
}

impl Stub {
    /// `method` is case-insensitive; an empty method matches any request
    /// method. `scope` carries the host/port filters of the owning server.
    pub fn new(
        method: &str,
        path: Option<&str>,
        scope: &ServerOptions,
        predicate: Option<Predicate>,
        handler: Handler,
    ) -> Self {
        Self {
            method: method.to_lowercase(),
            host: scope.host.clone(),
            port: scope.port,
            path: path.map(str::to_string),
            predicate,
            handler,
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Evaluate the predicate chain: method, host, port, path, then the
    /// custom predicate. All must hold.
    pub fn matches(&self, request: &RawRequest) -> bool {
        if !self.method.is_empty() && !request.method.as_str().eq_ignore_ascii_case(&self.method)
        {
            return false;
        }

        // Filters only reject when the request carries the component.
        if let (Some(host), Some(request_host)) = (&self.host, request.host()) {
            if !request_host.eq_ignore_ascii_case(host) {
                return false;
            }
        }

        if let (Some(port), Some(request_port)) = (self.port, request.port()) {
            if request_port != port {
                return false;
            }
        }

        if let Some(path) = &self.path {
            if request.path() != path {
                return false;
            }
        }

        self.predicate
            .as_ref()
            .map_or(true, |predicate| predicate(request))
    }

    /// Parse the request and hand it to the handler with a new emitter.
    pub fn respond(&self, request: RawRequest, sink: Box<dyn ResponseSink>) {
        let context = RequestContext::from_raw(request);
        let emitter = ResponseEmitter::new(sink);
        (self.handler)(context, emitter);
    }
}

impl fmt::Debug for Stub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stub")
            .field("method", &self.method)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("path", &self.path)
            .field("predicate", &self.predicate.is_some())
            .finish_non_exhaustive()
    }
}
