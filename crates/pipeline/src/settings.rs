//! Pipeline settings
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `PIPELINE__*` environment variables (`__` separates nesting,
//! e.g. `PIPELINE__SOURCE__KIND=replay`).

use crate::error::PipelineError;
use acquisition::SourceConfig;
use command_link::{SerialSettings, DEFAULT_BAUD_RATE};
use config::{Config, Environment, File};
use inference_engine::ThresholdClassifier;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Environment variable naming the configuration file
pub const CONFIG_PATH_ENV: &str = "PIPELINE_CONFIG";

/// How the binary drives the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Acquisition, inference and reporting on their own cores
    #[default]
    Continuous,
    /// Classify one captured window over and over
    Standalone,
}

/// Reference classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Labels from lowest to highest signal energy
    pub labels: Vec<String>,
    /// Report an anomaly score
    pub anomaly: bool,
    /// RMS band width
    pub threshold: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            labels: vec!["idle".to_string(), "motion".to_string()],
            anomaly: true,
            threshold: 0.5,
        }
    }
}

impl ClassifierConfig {
    /// Build the reference classifier for the configured window
    pub fn build(&self, window_size: usize, frame_increment: usize) -> ThresholdClassifier {
        ThresholdClassifier::new(
            window_size,
            frame_increment,
            self.labels.clone(),
            self.anomaly,
            self.threshold,
        )
    }
}

/// Serial command link configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandLinkConfig {
    /// Serial device; the link is disabled when unset
    pub device: Option<String>,
    pub baud_rate: u32,
}

impl Default for CommandLinkConfig {
    fn default() -> Self {
        Self {
            device: None,
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

impl CommandLinkConfig {
    /// Serial settings when a device is configured
    pub fn settings(&self) -> Option<SerialSettings> {
        self.device.as_ref().map(|device| SerialSettings {
            device: device.clone(),
            baud_rate: self.baud_rate,
        })
    }
}

/// Top-level pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub mode: Mode,
    /// Samples per inference window
    pub window_size: usize,
    /// Samples per acquisition tick
    pub batch_size: usize,
    /// Extra sample queue slots beyond one window
    pub sample_slack: usize,
    pub result_capacity: usize,
    pub command_capacity: usize,
    /// Acquisition period
    pub sample_period_ms: u64,
    /// Pause after each rendered report
    pub display_delay_ms: u64,
    /// Debug flag forwarded to the classifier
    pub debug_classifier: bool,
    pub log_level: String,
    pub source: SourceConfig,
    pub classifier: ClassifierConfig,
    pub command_link: CommandLinkConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Continuous,
            window_size: 64,
            batch_size: 8,
            sample_slack: 16,
            result_capacity: 2,
            command_capacity: 4,
            sample_period_ms: 16,
            display_delay_ms: 2000,
            debug_classifier: false,
            log_level: "info".to_string(),
            source: SourceConfig::default(),
            classifier: ClassifierConfig::default(),
            command_link: CommandLinkConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load from defaults, an optional file and the environment.
    ///
    /// `path` takes precedence over the `PIPELINE_CONFIG` variable.
    pub fn load(path: Option<&str>) -> Result<Self, PipelineError> {
        let env_path = std::env::var(CONFIG_PATH_ENV).ok();
        let path = path.or(env_path.as_deref());

        let mut builder = Config::builder();
        if let Some(path) = path {
            debug!("Reading configuration from {}", path);
            builder = builder.add_source(File::with_name(path));
        }
        builder = builder.add_source(
            Environment::with_prefix("PIPELINE")
                .separator("__")
                .try_parsing(true),
        );

        let config: PipelineConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<(), PipelineError> {
        let nonzero = [
            ("window_size", self.window_size),
            ("batch_size", self.batch_size),
            ("result_capacity", self.result_capacity),
            ("command_capacity", self.command_capacity),
        ];
        for (name, value) in nonzero {
            if value == 0 {
                return Err(PipelineError::InvalidConfig(format!("{} must be at least 1", name)));
            }
        }
        if self.classifier.labels.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "classifier.labels must not be empty".to_string(),
            ));
        }
        if self.classifier.threshold.is_nan() || self.classifier.threshold <= 0.0 {
            return Err(PipelineError::InvalidConfig(
                "classifier.threshold must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Sample queue capacity: one window plus slack
    pub fn sample_capacity(&self) -> usize {
        self.window_size + self.sample_slack
    }

    pub fn sample_period(&self) -> Duration {
        Duration::from_millis(self.sample_period_ms)
    }

    pub fn display_delay(&self) -> Duration {
        Duration::from_millis(self.display_delay_ms)
    }
}
