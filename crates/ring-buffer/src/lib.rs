//! Lock-Free Ring Buffer
//!
//! Bounded single-producer/single-consumer queue used for every hand-off in
//! the pipeline: raw samples into the inference core, results back out of it,
//! and parsed commands out of the serial interrupt context.
//!
//! The queue is created once with a fixed capacity and split into a
//! [`Producer`] and a [`Consumer`]. Neither handle is `Clone`, and both take
//! `&mut self` for queue operations, so the single-producer/single-consumer
//! discipline is enforced by ownership.

mod buffer;

pub use buffer::{channel, Consumer, Producer};

use thiserror::Error;

/// Errors when constructing a ring buffer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// A queue must hold at least one element
    #[error("Ring buffer capacity must be at least 1")]
    ZeroCapacity,
}
