//! Stub registration, activation and matching.
//!
//! - `stub`: a single (predicate, handler) pair
//! - `server`: `StubServer`, the registration surface with host/port scoping
//! - `gate`: the one-shot `ActivationGate`
//! - `active`: the process-wide, lock-free `ActiveSet` consulted at serving time

mod active;
mod gate;
mod server;
mod stub;

pub use active::ActiveSet;
pub use gate::ActivationGate;
pub use server::StubServer;
pub use stub::{Handler, Predicate, Stub};
