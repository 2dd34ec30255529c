//! Domain layer - pure types and rules with no I/O of their own.
//!
//! - Sliding window arithmetic (timestamps, cutoffs)
//! - Snapshot line format and the malformed line policy

pub mod snapshot;
pub mod window;
