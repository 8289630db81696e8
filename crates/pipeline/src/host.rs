//! Cooperative loop of the acquisition/reporting core

use crate::report::{ReportSink, Reporter};
use acquisition::{AcquisitionLoop, BatchOutcome, SampleSource};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// Ticks between acquisition statistics log lines
const STATS_INTERVAL_TICKS: u64 = 500;

/// Effect of one host tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostStep {
    /// A result was rendered this tick
    pub reported: bool,
    /// What the acquisition step enqueued
    pub batch: BatchOutcome,
}

/// One tick = poll the reporter, then acquire one batch.
///
/// Neither half blocks; the only pauses are the sampling period and the
/// display delay after a rendered report, both applied by [`HostLoop::run`].
pub struct HostLoop<S, K> {
    reporter: Reporter<K>,
    acquisition: AcquisitionLoop<S>,
    sample_period: Duration,
    display_delay: Duration,
    ticks: u64,
}

impl<S: SampleSource, K: ReportSink> HostLoop<S, K> {
    pub fn new(
        reporter: Reporter<K>,
        acquisition: AcquisitionLoop<S>,
        sample_period: Duration,
        display_delay: Duration,
    ) -> Self {
        Self {
            reporter,
            acquisition,
            sample_period,
            display_delay,
            ticks: 0,
        }
    }

    /// Run one tick without sleeping
    pub fn step(&mut self) -> HostStep {
        let reported = self.reporter.poll();
        let batch = self.acquisition.step();
        self.ticks += 1;

        if self.ticks % STATS_INTERVAL_TICKS == 0 {
            debug!(
                pushed = self.acquisition.pushed(),
                dropped = self.acquisition.dropped(),
                fill = self.acquisition.queue_fill(),
                reported = self.reporter.reported(),
                "Acquisition statistics"
            );
        }

        HostStep { reported, batch }
    }

    /// Pause to apply after a tick
    pub fn pause_after(&self, step: &HostStep) -> Duration {
        if step.reported {
            self.sample_period + self.display_delay
        } else {
            self.sample_period
        }
    }

    /// Run forever
    pub fn run(mut self) {
        info!(
            "Starting host loop: period={:?}, display delay={:?}",
            self.sample_period, self.display_delay
        );
        loop {
            let step = self.step();
            thread::sleep(self.pause_after(&step));
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn reporter(&self) -> &Reporter<K> {
        &self.reporter
    }

    pub fn acquisition(&self) -> &AcquisitionLoop<S> {
        &self.acquisition
    }
}
