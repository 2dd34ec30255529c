//! Application layer - orchestration of the counter.
//!
//! This layer owns the runtime behavior:
//! - Timestamp queue (the shared, lock-guarded state)
//! - Counter service (read-then-record request counting)
//! - Eviction scheduler (periodic background trimming)
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement: the clock, the snapshot store, and the request
//! counter consumed by transports.

pub mod counter;
pub mod metrics;
pub mod ports;
pub mod queue;
pub mod scheduler;
