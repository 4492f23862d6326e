//! Response emission.
//!
//! - `emitter`: the per-request builder/state machine driven by handlers
//! - `sink`: the host callback trait the emitter feeds

mod emitter;
mod sink;

pub use emitter::{EmitterPhase, ResponseEmitter, DEFAULT_CHARSET, DEFAULT_STATUS};
pub use sink::{RecordingSink, ResponseEvent, ResponseSink};
