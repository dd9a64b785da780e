//! Queue processor: the single long-running consumer of the durable queue.
//!
//! On start it prefetches tracker metadata (viewer, team, labels, states),
//! drains the queue once, then watches the queue file and drains on change.
//! Records are processed strictly sequentially; the per-record boundary is
//! the unit of atomic failure.

pub mod labels;
pub mod pr;
pub mod processor;
pub mod session;
pub mod summary;

pub use processor::{Caches, Processor};
