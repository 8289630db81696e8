//! Sample sources: cyclic replay buffer and synthetic live sensor

use crate::AcquisitionError;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use std::path::Path;
use tracing::info;

/// Synchronous batch source; always fills the whole buffer
pub trait SampleSource {
    /// Fill `out` with the next `out.len()` samples
    fn get_batch(&mut self, out: &mut [f32]);
}

impl<T: SampleSource + ?Sized> SampleSource for Box<T> {
    fn get_batch(&mut self, out: &mut [f32]) {
        (**self).get_batch(out)
    }
}

/// Deterministic, endlessly repeating replay of a captured recording.
///
/// Samples are read cyclically from the current offset. After each batch the
/// offset advances by the batch length and returns to zero once it reaches
/// the end of the recording, so a recording of length `L` restarts after
/// `ceil(L / batch)` batches.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    data: Vec<f32>,
    offset: usize,
}

impl ReplaySource {
    /// Replay `data` from the start
    pub fn new(data: Vec<f32>) -> Result<Self, AcquisitionError> {
        if data.is_empty() {
            return Err(AcquisitionError::EmptyReplay);
        }
        Ok(Self { data, offset: 0 })
    }

    /// Current read offset
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Recording length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false; an empty recording is rejected at construction
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The whole recording
    pub fn samples(&self) -> &[f32] {
        &self.data
    }
}

impl SampleSource for ReplaySource {
    fn get_batch(&mut self, out: &mut [f32]) {
        let len = self.data.len();
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.data[(self.offset + i) % len];
        }
        self.offset += out.len();
        if self.offset >= len {
            self.offset = 0;
        }
    }
}

/// Sine-wave stand-in for a live sensor axis
#[derive(Debug, Clone)]
pub struct SyntheticSensor {
    frequency_hz: f32,
    amplitude: f32,
    sample_rate_hz: f32,
    index: u64,
}

impl SyntheticSensor {
    pub fn new(frequency_hz: f32, amplitude: f32, sample_rate_hz: f32) -> Self {
        Self {
            frequency_hz,
            amplitude,
            sample_rate_hz: sample_rate_hz.max(f32::EPSILON),
            index: 0,
        }
    }
}

impl SampleSource for SyntheticSensor {
    fn get_batch(&mut self, out: &mut [f32]) {
        let period = (self.sample_rate_hz / self.frequency_hz.max(f32::EPSILON)).max(1.0) as u64;
        for slot in out.iter_mut() {
            let phase = (self.index % period) as f32 / period as f32;
            *slot = self.amplitude * (TAU * phase).sin();
            self.index = self.index.wrapping_add(1);
        }
    }
}

/// Which source feeds the acquisition loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Synthetic,
    Replay,
}

/// Sample source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Recording used by the replay source
    pub replay_path: Option<String>,
    pub frequency_hz: f32,
    pub amplitude: f32,
    pub sample_rate_hz: f32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Synthetic,
            replay_path: None,
            frequency_hz: 1.0,
            amplitude: 1.0,
            sample_rate_hz: 62.5,
        }
    }
}

impl SourceConfig {
    /// Build the configured source
    pub fn build(&self) -> Result<Box<dyn SampleSource + Send>, AcquisitionError> {
        match self.kind {
            SourceKind::Synthetic => {
                info!(
                    "Using synthetic sensor: {} Hz, amplitude {}",
                    self.frequency_hz, self.amplitude
                );
                Ok(Box::new(SyntheticSensor::new(
                    self.frequency_hz,
                    self.amplitude,
                    self.sample_rate_hz,
                )))
            }
            SourceKind::Replay => {
                let path = self
                    .replay_path
                    .as_deref()
                    .ok_or(AcquisitionError::MissingReplayPath)?;
                Ok(Box::new(ReplaySource::new(load_replay(path)?)?))
            }
        }
    }
}

/// Parse a recording: numbers separated by commas and/or whitespace.
/// Lines starting with `#` are comments.
pub fn parse_replay(text: &str) -> Result<Vec<f32>, AcquisitionError> {
    let mut samples = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        for token in line.split(|c: char| c == ',' || c.is_whitespace()) {
            if token.is_empty() {
                continue;
            }
            let value = token
                .parse::<f32>()
                .map_err(|_| AcquisitionError::InvalidSample {
                    line: idx + 1,
                    value: token.to_string(),
                })?;
            samples.push(value);
        }
    }
    Ok(samples)
}

/// Load a recording from a file
pub fn load_replay(path: impl AsRef<Path>) -> Result<Vec<f32>, AcquisitionError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let samples = parse_replay(&text)?;
    info!("Loaded {} replay samples from {}", samples.len(), path.display());
    Ok(samples)
}
