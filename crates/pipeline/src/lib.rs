//! Sensor Inference Pipeline
//!
//! Wires the data plane together on a dual-core layout:
//!
//! ```text
//! acquisition ─▶ sample queue ─▶ feed adapter ─▶ classifier ─▶ result queue ─▶ reporting
//!  (host core)                     (inference core)                           (host core)
//!
//! UART bytes ─▶ command link ─▶ link state / command queue ─▶ reporting
//!  (interrupt context)
//! ```

mod error;
mod host;
mod report;
mod runtime;
mod settings;

pub use settings::{ClassifierConfig, CommandLinkConfig, Mode, PipelineConfig, CONFIG_PATH_ENV};
pub use error::PipelineError;
pub use host::{HostLoop, HostStep};
pub use report::{ReportSink, Reporter, TracingSink};
pub use runtime::{run_standalone, standalone_window, Pipeline, Standalone};

use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging.
///
/// `RUST_LOG` overrides `level` when set.
pub fn init_logging(level: &str) -> Result<(), PipelineError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| PipelineError::Logging(e.to_string()))
}
