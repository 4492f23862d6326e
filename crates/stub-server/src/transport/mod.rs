//! hyper-based host transport for the stub protocol.
//!
//! `StubListener` accepts HTTP/1.1 connections and serves each request
//! through `StubProtocol`. Requests no stub accepts fall through to a 404
//! carrying the `x-stub-server-unmatched` header.

mod channel;
mod listener;
mod service;

pub use listener::{StubListener, StubListenerHandle};
pub use service::{handle_stub_request, ResponseBody, UNMATCHED_HEADER};
