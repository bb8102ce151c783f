//! Structured audit logging for authentication and authorization events.
//!
//! Two halves:
//!
//! - [`SecurityEvent`] and the [`security_event!`](crate::security_event)
//!   macro — the event catalog flows emit.
//! - [`ObservabilityConfig`] and [`init`] — one-shot `tracing` subscriber
//!   setup for binaries embedding this crate.
//!
//! The core only ever *emits* events; whether they land on stdout, in JSON
//! for a shipper, or nowhere at all is the embedding application's choice.

mod config;
mod events;

pub use config::{init, LogFormat, ObservabilityConfig};
pub use events::{security_event, SecurityEvent, Severity};
