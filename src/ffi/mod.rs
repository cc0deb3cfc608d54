//! Embedding surface for host applications.
//!
//! The model is host-driven: the embedding application owns the real
//! platform radio, seeds its state into an in-memory bridge at init and
//! mirrors changes into it afterwards, and drains recorded discoverability
//! requests to raise the real system prompt. Payloads crossing the boundary
//! are JSON.

#[cfg(feature = "android")]
pub mod android;
pub mod types;

pub use types::*;
