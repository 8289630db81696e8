//! Sensor Inference Pipeline - Main Entry Point

use pipeline::{init_logging, run_standalone, Mode, Pipeline, PipelineConfig};
use tracing::{error, info};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1);
    let config = PipelineConfig::load(path.as_deref())?;
    init_logging(&config.log_level)?;

    info!("=== Sensor Inference Pipeline v{} ===", env!("CARGO_PKG_VERSION"));

    let outcome = match config.mode {
        Mode::Continuous => Pipeline::start(&config).map(Pipeline::run),
        Mode::Standalone => run_standalone(&config),
    };

    if let Err(e) = outcome {
        error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}
