//! Startup: queue construction, validation and thread placement

use crate::settings::PipelineConfig;
use crate::error::PipelineError;
use crate::host::HostLoop;
use crate::report::{ReportSink, Reporter, TracingSink};
use acquisition::{AcquisitionLoop, SampleSource, SourceKind, SyntheticSensor};
use command_link::{spawn_serial_link, CommandLink, LinkError, LinkState};
use inference_engine::{ensure_window, Classifier, InferenceTask, StaticSignal};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// A started pipeline: the inference core is running, the host loop is ready
/// to be driven by the calling thread.
pub struct Pipeline<S, K> {
    host: HostLoop<S, K>,
    inference: JoinHandle<()>,
    command_link: Option<JoinHandle<Result<u64, LinkError>>>,
}

impl Pipeline<Box<dyn SampleSource + Send>, TracingSink> {
    /// Start with the reference classifier and the configured source
    pub fn start(config: &PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let classifier = config
            .classifier
            .build(config.window_size, config.batch_size);
        let source = config.source.build()?;
        Self::start_with(config, classifier, source, TracingSink)
    }
}

impl<S: SampleSource, K: ReportSink> Pipeline<S, K> {
    /// Start with an explicit classifier, source and report sink.
    ///
    /// Fails before any thread is spawned if the classifier's window does
    /// not match `window_size`.
    pub fn start_with<C>(
        config: &PipelineConfig,
        classifier: C,
        source: S,
        sink: K,
    ) -> Result<Self, PipelineError>
    where
        C: Classifier + Send + 'static,
    {
        config.validate()?;
        ensure_window(classifier.info(), config.window_size)?;

        let model = classifier.info();
        info!(
            "Edge inference pipeline: model={}, labels={}, anomaly={}",
            model.name,
            model.label_count(),
            model.has_anomaly
        );
        info!(
            "window={}, batch={}, sample queue={}, result queue={}",
            config.window_size,
            config.batch_size,
            config.sample_capacity(),
            config.result_capacity
        );
        if model.frame_increment != config.batch_size {
            warn!(
                "Batch size {} differs from model increment {}",
                config.batch_size, model.frame_increment
            );
        }

        let (sample_tx, sample_rx) = ring_buffer::channel::<f32>(config.sample_capacity())?;
        let (result_tx, result_rx) = ring_buffer::channel(config.result_capacity)?;
        let (command_tx, command_rx) = ring_buffer::channel(config.command_capacity)?;
        let link = LinkState::new();

        let task = InferenceTask::new(
            classifier,
            sample_rx,
            result_tx,
            config.window_size,
            config.debug_classifier,
        )?;
        let inference = thread::Builder::new()
            .name("inference-core".to_string())
            .spawn(move || task.run())
            .map_err(|e| PipelineError::Thread {
                name: "inference-core",
                reason: e.to_string(),
            })?;

        let command_link = match config.command_link.settings() {
            Some(settings) => Some(spawn_serial_link(
                settings,
                CommandLink::new(link.clone(), command_tx),
            )?),
            None => {
                info!("No command link device configured");
                None
            }
        };

        let reporter = Reporter::new(result_rx, command_rx, link, sink);
        let acquisition = AcquisitionLoop::new(source, sample_tx, config.batch_size);
        let host = HostLoop::new(
            reporter,
            acquisition,
            config.sample_period(),
            config.display_delay(),
        );

        Ok(Self {
            host,
            inference,
            command_link,
        })
    }

    /// The acquisition/reporting loop, for stepping manually
    pub fn host_mut(&mut self) -> &mut HostLoop<S, K> {
        &mut self.host
    }

    pub fn host(&self) -> &HostLoop<S, K> {
        &self.host
    }

    /// Whether the inference core is still running
    pub fn inference_running(&self) -> bool {
        !self.inference.is_finished()
    }

    /// Whether the command link reader is still running, `None` when no
    /// device is configured. The reader logs its own failure on exit.
    pub fn command_link_running(&self) -> Option<bool> {
        self.command_link
            .as_ref()
            .map(|handle| !handle.is_finished())
    }

    /// Drive the host loop on the calling thread forever
    pub fn run(self) {
        if let Some(handle) = &self.command_link {
            info!(
                "Command link reader running on {:?}",
                handle.thread().name()
            );
        }
        self.host.run();
    }
}

/// Window used by standalone mode.
///
/// A replay recording must hold exactly one window. Without one, a window is
/// taken from the synthetic sensor.
pub fn standalone_window(config: &PipelineConfig) -> Result<Vec<f32>, PipelineError> {
    match config.source.kind {
        SourceKind::Replay => {
            let path = config
                .source
                .replay_path
                .as_deref()
                .ok_or(acquisition::AcquisitionError::MissingReplayPath)?;
            let samples = acquisition::load_replay(path)?;
            if samples.len() != config.window_size {
                return Err(PipelineError::FeatureSizeMismatch {
                    expected: config.window_size,
                    actual: samples.len(),
                });
            }
            Ok(samples)
        }
        SourceKind::Synthetic => {
            let mut sensor = SyntheticSensor::new(
                config.source.frequency_hz,
                config.source.amplitude,
                config.source.sample_rate_hz,
            );
            let mut window = vec![0.0; config.window_size];
            sensor.get_batch(&mut window);
            Ok(window)
        }
    }
}

/// Classifies one captured window repeatedly.
///
/// Any classifier failure is fatal here: the same window would fail again.
pub struct Standalone<C, K> {
    classifier: C,
    window: Vec<f32>,
    sink: K,
    debug: bool,
}

impl<C: Classifier, K: ReportSink> Standalone<C, K> {
    pub fn new(
        classifier: C,
        window: Vec<f32>,
        sink: K,
        debug: bool,
    ) -> Result<Self, PipelineError> {
        let expected = classifier.info().window_size;
        if window.len() != expected {
            return Err(PipelineError::FeatureSizeMismatch {
                expected,
                actual: window.len(),
            });
        }
        Ok(Self {
            classifier,
            window,
            sink,
            debug,
        })
    }

    /// Classify the window once and report the result
    pub fn step(&mut self) -> Result<(), PipelineError> {
        let mut signal = StaticSignal::new(&self.window);
        let result = match self.classifier.classify(&mut signal, self.debug) {
            Ok(result) => result,
            Err(e) => {
                debug!("Classifier returned: {}", e.status_code());
                return Err(e.into());
            }
        };
        debug!("Classifier returned: 0");
        self.sink.report(&result.to_string());
        Ok(())
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }
}

/// Run standalone mode until the classifier fails
pub fn run_standalone(config: &PipelineConfig) -> Result<(), PipelineError> {
    config.validate()?;
    let classifier = config
        .classifier
        .build(config.window_size, config.batch_size);
    let window = standalone_window(config)?;
    let mut standalone = Standalone::new(classifier, window, TracingSink, config.debug_classifier)?;

    info!("Edge inference standalone run over a fixed window");
    loop {
        standalone.step()?;
        thread::sleep(config.display_delay());
    }
}
