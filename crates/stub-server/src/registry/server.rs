//! Registration surface used by test setup code.

use super::active::ActiveSet;
use super::gate::ActivationGate;
use super::stub::{Handler, Predicate, Stub};
use crate::config::ServerOptions;
use crate::request::{RawRequest, RequestContext};
use crate::response::ResponseEmitter;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Flipped by the first activation of any server in the process.
static PROTOCOL_INSTALLED: ActivationGate = ActivationGate::new();

/// A group of stubs sharing optional host/port filters.
///
/// Stubs are collected in registration order and published to an
/// [`ActiveSet`] by [`activate`](Self::activate), at most once per instance.
#[derive(Debug, Default)]
pub struct StubServer {
    options: ServerOptions,
    stubs: Vec<Arc<Stub>>,
    activation: ActivationGate,
}

impl StubServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only match requests sent to `host`.
    pub fn with_host(host: impl Into<String>) -> Self {
        Self::with_options(ServerOptions {
            host: Some(host.into()),
            port: None,
        })
    }

    /// Only match requests sent to `host:port`.
    pub fn with_host_and_port(host: impl Into<String>, port: u16) -> Self {
        Self::with_options(ServerOptions {
            host: Some(host.into()),
            port: Some(port),
        })
    }

    pub fn with_options(options: ServerOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    pub fn stubs(&self) -> &[Arc<Stub>] {
        &self.stubs
    }

    pub fn is_active(&self) -> bool {
        self.activation.is_active()
    }

    /// Stub for any method.
    pub fn all<'a, F>(&mut self, path: impl Into<Option<&'a str>>, handler: F) -> &mut Self
    where
        F: Fn(RequestContext, ResponseEmitter) + Send + Sync + 'static,
    {
        self.register("", path.into(), None, Arc::new(handler))
    }

    pub fn get<'a, F>(&mut self, path: impl Into<Option<&'a str>>, handler: F) -> &mut Self
    where
        F: Fn(RequestContext, ResponseEmitter) + Send + Sync + 'static,
    {
        self.register("get", path.into(), None, Arc::new(handler))
    }

    pub fn post<'a, F>(&mut self, path: impl Into<Option<&'a str>>, handler: F) -> &mut Self
    where
        F: Fn(RequestContext, ResponseEmitter) + Send + Sync + 'static,
    {
        self.register("post", path.into(), None, Arc::new(handler))
    }

    pub fn put<'a, F>(&mut self, path: impl Into<Option<&'a str>>, handler: F) -> &mut Self
    where
        F: Fn(RequestContext, ResponseEmitter) + Send + Sync + 'static,
    {
        self.register("put", path.into(), None, Arc::new(handler))
    }

    pub fn delete<'a, F>(&mut self, path: impl Into<Option<&'a str>>, handler: F) -> &mut Self
    where
        F: Fn(RequestContext, ResponseEmitter) + Send + Sync + 'static,
    {
        self.register("delete", path.into(), None, Arc::new(handler))
    }

    /// Stub guarded by an extra predicate on top of method and path.
    pub fn when<'a, P, F>(
        &mut self,
        method: &str,
        path: impl Into<Option<&'a str>>,
        predicate: P,
        handler: F,
    ) -> &mut Self
    where
        P: Fn(&RawRequest) -> bool + Send + Sync + 'static,
        F: Fn(RequestContext, ResponseEmitter) + Send + Sync + 'static,
    {
        let predicate: Predicate = Arc::new(predicate);
        self.register(method, path.into(), Some(predicate), Arc::new(handler))
    }

    /// Append a stub. An empty `method` matches any method.
    pub fn register(
        &mut self,
        method: &str,
        path: Option<&str>,
        predicate: Option<Predicate>,
        handler: Handler,
    ) -> &mut Self {
        if self.activation.is_active() {
            warn!(
                "Stub {} {:?} registered after activate(); it will not be served",
                method, path
            );
        }
        let stub = Stub::new(method, path, &self.options, predicate, handler);
        debug!("Registered {:?}", stub);
        self.stubs.push(Arc::new(stub));
        self
    }

    /// Publish this server's stubs to the process-wide active set.
    pub fn activate(&self) {
        self.activate_into(ActiveSet::global());
    }

    /// Publish this server's stubs into `active`. Only the first call on an
    /// instance has any effect.
    pub fn activate_into(&self, active: &ActiveSet) {
        if PROTOCOL_INSTALLED.open() {
            info!("Stub protocol installed");
        }

        if !self.activation.open() {
            debug!("StubServer already active, ignoring activate()");
            return;
        }

        active.publish(&self.stubs);
        info!(
            "Activated {} stub(s) (host={:?}, port={:?})",
            self.stubs.len(),
            self.options.host,
            self.options.port
        );
    }
}
