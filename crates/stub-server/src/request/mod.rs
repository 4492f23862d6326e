//! Request model: raw intercepted requests, query parsing and body decoding.
//!
//! - `context`: `RawRequest` (what the interception layer hands over) and
//!   `RequestContext` (the read-only snapshot given to handlers)
//! - `query`: query string parsing
//! - `body`: content-type driven body decoding

mod body;
mod context;
mod query;

pub use body::Body;
pub use context::{RawRequest, RequestBody, RequestContext};
pub use query::parse_query;
