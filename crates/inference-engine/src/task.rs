//! Inference task: one classifier invocation per window

use crate::engine::{ensure_window, Classifier, InferenceResult};
use crate::signal::{BlockingSource, FeedAdapter};
use crate::InferenceError;
use ring_buffer::Producer;
use tracing::{debug, info, warn};

/// What happened to one window
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowOutcome {
    /// Result committed to the result queue
    Published,
    /// Classifier failed; the window's samples are gone and nothing was published
    Failed(InferenceError),
}

/// Runs on the inference core.
///
/// Blocks only while pulling samples and while committing a result: a
/// computed result is never dropped, so the result queue push waits for the
/// reporting side to drain.
pub struct InferenceTask<C, S> {
    classifier: C,
    samples: S,
    results: Producer<InferenceResult>,
    window_size: usize,
    debug: bool,
    windows: u64,
    failures: u64,
}

impl<C: Classifier, S: BlockingSource> InferenceTask<C, S> {
    /// Create a task, refusing a window size the classifier was not built for
    pub fn new(
        classifier: C,
        samples: S,
        results: Producer<InferenceResult>,
        window_size: usize,
        debug: bool,
    ) -> Result<Self, InferenceError> {
        ensure_window(classifier.info(), window_size)?;
        info!(
            "Creating inference task: model={}, window={}",
            classifier.info().name,
            window_size
        );
        Ok(Self {
            classifier,
            samples,
            results,
            window_size,
            debug,
            windows: 0,
            failures: 0,
        })
    }

    /// Classify the next window and publish its result
    pub fn step(&mut self) -> WindowOutcome {
        let mut feed = FeedAdapter::new(&mut self.samples, self.window_size);
        let outcome = self.classifier.classify(&mut feed, self.debug);
        let discarded = feed.finish();
        if discarded > 0 {
            debug!(discarded, "Classifier left samples unread");
        }
        self.windows += 1;

        match outcome {
            Ok(result) => {
                debug!("Classifier returned: 0");
                self.results.push_blocking(result);
                WindowOutcome::Published
            }
            Err(e) => {
                self.failures += 1;
                warn!(
                    status = e.status_code(),
                    failures = self.failures,
                    "Classifier failed, window skipped: {}",
                    e
                );
                WindowOutcome::Failed(e)
            }
        }
    }

    /// Run forever
    pub fn run(mut self) {
        info!("Starting inference task");
        loop {
            self.step();
        }
    }

    /// Windows processed so far
    pub fn windows(&self) -> u64 {
        self.windows
    }

    /// Windows whose classification failed
    pub fn failures(&self) -> u64 {
        self.failures
    }
}
