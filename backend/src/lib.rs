//! Outage schedule mirror and subscriber notification backend.
//!
//! The published schedule table is extracted into per-queue entries,
//! reconciled into a store, and every change is pushed to subscribers whose
//! watermark has not yet seen it.

pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;

pub use domain::TraceId;
pub use middleware::Trace;
