//! Acquisition loop

use crate::source::SampleSource;
use ring_buffer::Producer;
use tracing::{debug, info};

/// Effect of one acquisition tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchOutcome {
    /// Samples accepted by the sample queue
    pub pushed: usize,
    /// Samples discarded because the queue was full
    pub dropped: usize,
}

/// Offers one batch per tick to the sample queue.
///
/// Never blocks: the first rejected push discards the rest of the batch,
/// and those samples are never retried.
pub struct AcquisitionLoop<S> {
    source: S,
    samples: Producer<f32>,
    batch: Vec<f32>,
    batches: u64,
    pushed: u64,
    dropped: u64,
}

impl<S: SampleSource> AcquisitionLoop<S> {
    /// Create a loop taking `batch_size` samples per tick
    pub fn new(source: S, samples: Producer<f32>, batch_size: usize) -> Self {
        info!(
            "Creating acquisition loop: batch={}, queue capacity={}",
            batch_size,
            samples.capacity()
        );
        Self {
            source,
            samples,
            batch: vec![0.0; batch_size],
            batches: 0,
            pushed: 0,
            dropped: 0,
        }
    }

    /// Acquire one batch and enqueue as much of it as fits
    pub fn step(&mut self) -> BatchOutcome {
        self.source.get_batch(&mut self.batch);
        self.batches += 1;

        let mut outcome = BatchOutcome::default();
        for (i, sample) in self.batch.iter().enumerate() {
            if self.samples.try_push(*sample).is_err() {
                outcome.dropped = self.batch.len() - i;
                break;
            }
            outcome.pushed += 1;
        }

        self.pushed += outcome.pushed as u64;
        self.dropped += outcome.dropped as u64;
        if outcome.dropped > 0 {
            debug!(dropped = outcome.dropped, "Sample queue full, batch remainder dropped");
        }
        outcome
    }

    /// Samples per tick
    pub fn batch_size(&self) -> usize {
        self.batch.len()
    }

    /// Ticks run so far
    pub fn batches(&self) -> u64 {
        self.batches
    }

    /// Total samples enqueued
    pub fn pushed(&self) -> u64 {
        self.pushed
    }

    /// Total samples lost to backpressure
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Sample queue fill ratio (0.0 to 1.0)
    pub fn queue_fill(&self) -> f64 {
        self.samples.fill_ratio()
    }

    /// The underlying source
    pub fn source(&self) -> &S {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ReplaySource;

    #[test]
    fn test_batch_enqueued_in_order() {
        let (tx, mut rx) = ring_buffer::channel(16).unwrap();
        let source = ReplaySource::new((0..8).map(|i| i as f32).collect()).unwrap();
        let mut acquisition = AcquisitionLoop::new(source, tx, 4);

        assert_eq!(
            acquisition.step(),
            BatchOutcome {
                pushed: 4,
                dropped: 0
            }
        );
        let popped: Vec<f32> = std::iter::from_fn(|| rx.try_pop()).collect();
        assert_eq!(popped, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_full_queue_drops_remainder_without_retry() {
        let (tx, mut rx) = ring_buffer::channel(6).unwrap();
        let source = ReplaySource::new((0..100).map(|i| i as f32).collect()).unwrap();
        let mut acquisition = AcquisitionLoop::new(source, tx, 4);

        acquisition.step();
        assert_eq!(
            acquisition.step(),
            BatchOutcome {
                pushed: 2,
                dropped: 2
            }
        );
        assert_eq!(
            acquisition.step(),
            BatchOutcome {
                pushed: 0,
                dropped: 4
            }
        );

        // Drain two slots; the next batch starts with fresh samples, not the dropped ones
        rx.try_pop();
        rx.try_pop();
        assert_eq!(acquisition.step().pushed, 2);

        let queued: Vec<f32> = std::iter::from_fn(|| rx.try_pop()).collect();
        assert_eq!(queued, vec![2.0, 3.0, 4.0, 5.0, 12.0, 13.0]);
        assert_eq!(acquisition.pushed(), 8);
        assert_eq!(acquisition.dropped(), 8);
    }

    #[test]
    fn test_replay_offset_wraps_after_ceil_len_over_batch() {
        let (tx, mut rx) = ring_buffer::channel(64).unwrap();
        let source = ReplaySource::new((0..10).map(|i| i as f32).collect()).unwrap();
        let mut acquisition = AcquisitionLoop::new(source, tx, 4);

        for _ in 0..3 {
            acquisition.step();
            while rx.try_pop().is_some() {}
        }
        assert_eq!(acquisition.source().offset(), 0);
        assert_eq!(acquisition.batches(), 3);
    }
}
