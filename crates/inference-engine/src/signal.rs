//! Pull-based sample sources handed to the classifier

use crate::InferenceError;
use ring_buffer::Consumer;

/// Data source the classifier pulls its window from.
///
/// `get_data` fills `out` with the samples at `offset..offset + out.len()`.
pub trait Signal {
    /// Number of samples the signal covers
    fn total_length(&self) -> usize;

    /// Copy samples starting at `offset` into `out`
    fn get_data(&mut self, offset: usize, out: &mut [f32]) -> Result<(), InferenceError>;
}

fn check_range(offset: usize, length: usize, window: usize) -> Result<(), InferenceError> {
    match offset.checked_add(length) {
        Some(end) if end <= window => Ok(()),
        _ => Err(InferenceError::InvalidRead {
            offset,
            length,
            window,
        }),
    }
}

/// Element-at-a-time source that can wait for the next sample
pub trait BlockingSource {
    /// Take the next sample, waiting until one is available
    fn pop_blocking(&mut self) -> f32;
}

impl BlockingSource for Consumer<f32> {
    #[inline]
    fn pop_blocking(&mut self) -> f32 {
        Consumer::pop_blocking(self)
    }
}

/// Presents a sample queue as one window of a [`Signal`].
///
/// Every requested element is a fresh sample popped from the queue, so one
/// window consumes exactly `window` samples and windows never overlap. Nothing
/// is buffered across windows, so reads must be sequential: each `offset` has
/// to start where the previous read ended.
pub struct FeedAdapter<'a, S: BlockingSource + ?Sized> {
    source: &'a mut S,
    window: usize,
    consumed: usize,
}

impl<'a, S: BlockingSource + ?Sized> FeedAdapter<'a, S> {
    /// Adapter for one window of `window` samples
    pub fn new(source: &'a mut S, window: usize) -> Self {
        Self {
            source,
            window,
            consumed: 0,
        }
    }

    /// Samples taken from the queue so far in this window
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Discard whatever the classifier did not pull, keeping the next window
    /// aligned on a fresh sample. Returns the number of samples discarded.
    pub fn finish(self) -> usize {
        let remaining = self.window - self.consumed;
        for _ in 0..remaining {
            self.source.pop_blocking();
        }
        remaining
    }
}

impl<S: BlockingSource + ?Sized> Signal for FeedAdapter<'_, S> {
    fn total_length(&self) -> usize {
        self.window
    }

    fn get_data(&mut self, offset: usize, out: &mut [f32]) -> Result<(), InferenceError> {
        check_range(offset, out.len(), self.window)?;
        if offset != self.consumed || self.consumed + out.len() > self.window {
            return Err(InferenceError::InvalidRead {
                offset,
                length: out.len(),
                window: self.window,
            });
        }

        for slot in out.iter_mut() {
            *slot = self.source.pop_blocking();
        }
        self.consumed += out.len();
        Ok(())
    }
}

/// Fixed window held in memory, read positionally.
///
/// Used for standalone runs over a captured feature window.
pub struct StaticSignal<'a> {
    samples: &'a [f32],
}

impl<'a> StaticSignal<'a> {
    /// Wrap a captured window
    pub fn new(samples: &'a [f32]) -> Self {
        Self { samples }
    }
}

impl Signal for StaticSignal<'_> {
    fn total_length(&self) -> usize {
        self.samples.len()
    }

    fn get_data(&mut self, offset: usize, out: &mut [f32]) -> Result<(), InferenceError> {
        check_range(offset, out.len(), self.samples.len())?;
        out.copy_from_slice(&self.samples[offset..offset + out.len()]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Counts pops and yields an increasing sequence
    struct CountingSource {
        pops: usize,
    }

    impl BlockingSource for CountingSource {
        fn pop_blocking(&mut self) -> f32 {
            self.pops += 1;
            self.pops as f32
        }
    }

    #[test]
    fn test_reads_fill_positionally() {
        let mut source = CountingSource { pops: 0 };
        let mut adapter = FeedAdapter::new(&mut source, 6);

        let mut first = [0.0; 4];
        let mut second = [0.0; 2];
        adapter.get_data(0, &mut first).unwrap();
        adapter.get_data(4, &mut second).unwrap();

        assert_eq!(first, [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(second, [5.0, 6.0]);
        assert_eq!(adapter.finish(), 0);
        assert_eq!(source.pops, 6);
    }

    #[test]
    fn test_read_past_window_rejected() {
        let mut source = CountingSource { pops: 0 };
        let mut adapter = FeedAdapter::new(&mut source, 4);
        let mut out = [0.0; 3];

        assert_eq!(
            adapter.get_data(2, &mut out),
            Err(InferenceError::InvalidRead {
                offset: 2,
                length: 3,
                window: 4
            })
        );
        assert_eq!(adapter.consumed(), 0);
    }

    #[test]
    fn test_out_of_order_read_rejected() {
        let mut source = CountingSource { pops: 0 };
        let mut adapter = FeedAdapter::new(&mut source, 4);
        let mut out = [0.0; 2];

        assert_eq!(
            adapter.get_data(2, &mut out),
            Err(InferenceError::InvalidRead {
                offset: 2,
                length: 2,
                window: 4
            })
        );
        assert_eq!(adapter.consumed(), 0);

        adapter.get_data(0, &mut out).unwrap();
        assert_eq!(out, [1.0, 2.0]);
        assert!(adapter.get_data(0, &mut out).is_err());
        adapter.get_data(2, &mut out).unwrap();
        assert_eq!(out, [3.0, 4.0]);
        assert_eq!(source.pops, 4);
    }

    #[test]
    fn test_finish_drains_unread_samples() {
        let mut source = CountingSource { pops: 0 };
        let mut adapter = FeedAdapter::new(&mut source, 10);
        let mut out = [0.0; 3];
        adapter.get_data(0, &mut out).unwrap();

        assert_eq!(adapter.finish(), 7);
        assert_eq!(source.pops, 10);
    }

    #[test]
    fn test_adapter_over_ring_buffer() {
        let (mut tx, mut rx) = ring_buffer::channel(8).unwrap();
        for i in 0..4 {
            tx.try_push(i as f32).unwrap();
        }

        let mut adapter = FeedAdapter::new(&mut rx, 4);
        let mut out = [0.0; 4];
        adapter.get_data(0, &mut out).unwrap();
        adapter.finish();

        assert_eq!(out, [0.0, 1.0, 2.0, 3.0]);
        assert!(rx.is_empty());
    }

    #[test]
    fn test_static_signal_copies_range() {
        let samples = [1.0, 2.0, 3.0, 4.0, 5.0];
        let mut signal = StaticSignal::new(&samples);
        let mut out = [0.0; 2];

        signal.get_data(3, &mut out).unwrap();
        assert_eq!(out, [4.0, 5.0]);
        assert_eq!(signal.total_length(), 5);
        assert!(signal.get_data(4, &mut out).is_err());
    }

    proptest! {
        #[test]
        fn prop_window_consumes_exactly_window_samples(
            window in 1usize..256,
            increment in 1usize..64,
            windows in 1usize..8,
        ) {
            let mut source = CountingSource { pops: 0 };
            for _ in 0..windows {
                let mut adapter = FeedAdapter::new(&mut source, window);
                let mut offset = 0;
                let mut chunk = vec![0.0; increment];
                while offset < window {
                    let len = increment.min(window - offset);
                    adapter.get_data(offset, &mut chunk[..len]).unwrap();
                    offset += len;
                }
                adapter.finish();
            }
            prop_assert_eq!(source.pops, window * windows);
        }
    }
}
