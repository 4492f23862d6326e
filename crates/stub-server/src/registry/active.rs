//! The set of stubs currently serving requests.

use super::stub::Stub;
use crate::error::NoStubMatched;
use crate::request::RawRequest;
use arc_swap::ArcSwap;
use once_cell::sync::Lazy;
use std::sync::Arc;
use tracing::debug;

static GLOBAL_ACTIVE_SET: Lazy<ActiveSet> = Lazy::new(ActiveSet::new);

/// Ordered, append-only table of published stubs.
///
/// Reads go through an `ArcSwap` snapshot and never lock. Publishing
/// replaces the whole table with an extended copy. Clones share the same
/// table.
#[derive(Clone)]
pub struct ActiveSet {
    stubs: Arc<ArcSwap<Vec<Arc<Stub>>>>,
}

impl ActiveSet {
    /// An isolated set, independent of the process-wide one.
    pub fn new() -> Self {
        Self {
            stubs: Arc::new(ArcSwap::from_pointee(Vec::new())),
        }
    }

    /// The process-wide set that `StubServer::activate` publishes into.
    pub fn global() -> &'static ActiveSet {
        &GLOBAL_ACTIVE_SET
    }

    /// Append stubs after every stub already published, keeping their order.
    pub fn publish(&self, stubs: &[Arc<Stub>]) {
        self.stubs.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + stubs.len());
            next.extend(current.iter().cloned());
            next.extend(stubs.iter().cloned());
            next
        });
    }

    /// First published stub accepting the request.
    pub fn find(&self, request: &RawRequest) -> Result<Arc<Stub>, NoStubMatched> {
        let stubs = self.stubs.load();
        match stubs.iter().position(|stub| stub.matches(request)) {
            Some(index) => {
                debug!(
                    "Stub #{} matched {} {}",
                    index, request.method, request.uri
                );
                Ok(Arc::clone(&stubs[index]))
            }
            None => {
                debug!(
                    "No stub matched {} {} ({} active)",
                    request.method,
                    request.uri,
                    stubs.len()
                );
                Err(NoStubMatched)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.stubs.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ActiveSet {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ActiveSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveSet")
            .field("stubs", &self.len())
            .finish()
    }
}
