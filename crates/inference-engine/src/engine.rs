//! Classifier interface and inference results

use crate::signal::Signal;
use crate::InferenceError;
use std::fmt;
use std::time::Instant;
use tracing::{debug, info};

/// Static properties of a classifier, fixed when the model is built
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    /// Model name for the startup banner
    pub name: String,
    /// Required window length in samples
    pub window_size: usize,
    /// Raw sample increment the model advances by per slice
    pub frame_increment: usize,
    /// Output labels, in result order
    pub labels: Vec<String>,
    /// Whether results carry an anomaly score
    pub has_anomaly: bool,
}

impl ModelInfo {
    /// Number of output labels
    pub fn label_count(&self) -> usize {
        self.labels.len()
    }
}

/// Refuse to run with a window the classifier was not built for
pub fn ensure_window(info: &ModelInfo, window_size: usize) -> Result<(), InferenceError> {
    if info.window_size != window_size {
        return Err(InferenceError::WindowSizeMismatch {
            expected: info.window_size,
            actual: window_size,
        });
    }
    Ok(())
}

/// Pull-based classifier collaborator.
///
/// `classify` pulls its whole window from `signal` and returns one result, or
/// an engine failure carrying the non-zero status code.
pub trait Classifier {
    /// Static model properties
    fn info(&self) -> &ModelInfo;

    /// Classify one window
    fn classify(
        &mut self,
        signal: &mut dyn Signal,
        debug: bool,
    ) -> Result<InferenceResult, InferenceError>;
}

/// Confidence for one label
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: String,
    pub value: f32,
}

/// Stage durations in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timing {
    pub dsp_ms: u64,
    pub classification_ms: u64,
    pub anomaly_ms: u64,
}

/// Result of one window
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceResult {
    /// Label confidences in model label order
    pub classification: Vec<Classification>,
    /// Anomaly score, when the model has one
    pub anomaly: Option<f32>,
    /// Stage timing
    pub timing: Timing,
}

impl InferenceResult {
    /// Label with the highest confidence
    pub fn top(&self) -> Option<&Classification> {
        self.classification
            .iter()
            .max_by(|a, b| a.value.total_cmp(&b.value))
    }
}

/// Renders the report line:
/// `Predictions (DSP: 3 ms., Classification: 1 ms., Anomaly: 0 ms.): [0.25000, 0.75000, 0.120]`
impl fmt::Display for InferenceResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Predictions (DSP: {} ms., Classification: {} ms., Anomaly: {} ms.): [",
            self.timing.dsp_ms, self.timing.classification_ms, self.timing.anomaly_ms
        )?;
        for (i, c) in self.classification.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{:.5}", c.value)?;
        }
        if let Some(anomaly) = self.anomaly {
            if !self.classification.is_empty() {
                f.write_str(", ")?;
            }
            write!(f, "{:.3}", anomaly)?;
        }
        f.write_str("]")
    }
}

/// Status returned when the window contains non-finite samples
const STATUS_DSP_ERROR: i32 = -5;

/// Energy-band reference classifier.
///
/// Pulls its window in `frame_increment` slices, computes the RMS level and
/// scores each label by closeness of the RMS to that label's band centre
/// (`threshold * index`). The anomaly score is how far the peak stands above
/// the RMS, in thresholds. Stands in for a trained model on hosts that have
/// none linked.
pub struct ThresholdClassifier {
    info: ModelInfo,
    threshold: f32,
    window: Vec<f32>,
}

impl ThresholdClassifier {
    /// Create a classifier over `labels`, ordered from lowest to highest energy
    pub fn new(
        window_size: usize,
        frame_increment: usize,
        labels: Vec<String>,
        has_anomaly: bool,
        threshold: f32,
    ) -> Self {
        info!(
            "Creating threshold classifier: window={}, increment={}, labels={:?}",
            window_size, frame_increment, labels
        );
        Self {
            info: ModelInfo {
                name: "threshold-rms".to_string(),
                window_size,
                frame_increment: frame_increment.max(1),
                labels,
                has_anomaly,
            },
            threshold,
            window: vec![0.0; window_size],
        }
    }

    fn pull_window(&mut self, signal: &mut dyn Signal) -> Result<(), InferenceError> {
        let step = self.info.frame_increment;
        let mut offset = 0;
        while offset < self.window.len() {
            let end = (offset + step).min(self.window.len());
            signal.get_data(offset, &mut self.window[offset..end])?;
            offset = end;
        }
        Ok(())
    }

    fn scores(&self, rms: f32) -> Vec<Classification> {
        let weights: Vec<f32> = (0..self.info.labels.len())
            .map(|i| {
                let centre = self.threshold * i as f32;
                (-(rms - centre).abs() / self.threshold.max(f32::EPSILON)).exp()
            })
            .collect();
        let total: f32 = weights.iter().sum::<f32>().max(f32::EPSILON);

        self.info
            .labels
            .iter()
            .zip(weights)
            .map(|(label, w)| Classification {
                label: label.clone(),
                value: w / total,
            })
            .collect()
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

impl Classifier for ThresholdClassifier {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn classify(
        &mut self,
        signal: &mut dyn Signal,
        debug: bool,
    ) -> Result<InferenceResult, InferenceError> {
        if signal.total_length() != self.info.window_size {
            return Err(InferenceError::WindowSizeMismatch {
                expected: self.info.window_size,
                actual: signal.total_length(),
            });
        }

        let dsp_start = Instant::now();
        self.pull_window(signal)?;
        if self.window.iter().any(|v| !v.is_finite()) {
            return Err(InferenceError::EngineFailure {
                code: STATUS_DSP_ERROR,
            });
        }
        let n = self.window.len().max(1) as f32;
        let rms = (self.window.iter().map(|v| v * v).sum::<f32>() / n).sqrt();
        let peak = self.window.iter().fold(0.0f32, |m, v| m.max(v.abs()));
        let dsp_ms = elapsed_ms(dsp_start);

        let class_start = Instant::now();
        let classification = self.scores(rms);
        let classification_ms = elapsed_ms(class_start);

        let anomaly_start = Instant::now();
        let anomaly = self
            .info
            .has_anomaly
            .then(|| (peak - rms) / self.threshold.max(f32::EPSILON));
        let anomaly_ms = elapsed_ms(anomaly_start);

        if debug {
            debug!(rms, peak, "Window features");
        }

        Ok(InferenceResult {
            classification,
            anomaly,
            timing: Timing {
                dsp_ms,
                classification_ms,
                anomaly_ms,
            },
        })
    }
}
