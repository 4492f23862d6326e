//! In-process HTTP stub engine.
//!
//! Register handlers on a [`StubServer`], activate it, and every request an
//! interception layer hands to [`StubProtocol`] is matched against the active
//! stubs in registration order. The first match drives a [`ResponseEmitter`]
//! whose headers, chunks and completion flow to a [`ResponseSink`].

pub mod config;
pub mod content_type;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod request;
pub mod response;
pub mod transport;

pub use config::{ListenConfig, ServerOptions, StaticStub, StubFile};
pub use content_type::ContentKind;
pub use error::{ConfigError, NoStubMatched, StubError};
pub use protocol::{Interceptor, StubProtocol};
pub use registry::{ActivationGate, ActiveSet, Stub, StubServer};
pub use request::{Body, RawRequest, RequestBody, RequestContext};
pub use response::{RecordingSink, ResponseEmitter, ResponseEvent, ResponseSink};
pub use transport::{StubListener, StubListenerHandle};
