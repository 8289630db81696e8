use acquisition::ReplaySource;
use command_link::{encode_frame, CommandLink, LinkState};
use inference_engine::{
    Classification, Classifier, InferenceError, InferenceResult, ModelInfo, Signal, Timing,
};
use pipeline::{Pipeline, PipelineConfig, PipelineError, Reporter};
use std::thread;
use std::time::Duration;

/// Reports the first and last sample of each window
struct EdgeClassifier {
    info: ModelInfo,
}

impl EdgeClassifier {
    fn new(window_size: usize, frame_increment: usize) -> Self {
        Self {
            info: ModelInfo {
                name: "edges".to_string(),
                window_size,
                frame_increment,
                labels: vec!["first".to_string(), "last".to_string()],
                has_anomaly: false,
            },
        }
    }
}

impl Classifier for EdgeClassifier {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn classify(
        &mut self,
        signal: &mut dyn Signal,
        _debug: bool,
    ) -> Result<InferenceResult, InferenceError> {
        let mut window = vec![0.0; signal.total_length()];
        let step = self.info.frame_increment;
        for offset in (0..window.len()).step_by(step) {
            let end = (offset + step).min(window.len());
            signal.get_data(offset, &mut window[offset..end])?;
        }
        let value = |label: &str, value: f32| Classification {
            label: label.to_string(),
            value,
        };
        Ok(InferenceResult {
            classification: vec![
                value("first", window[0]),
                value("last", window[window.len() - 1]),
            ],
            anomaly: None,
            timing: Timing::default(),
        })
    }
}

fn parse_values(line: &str) -> Vec<f32> {
    let start = line.rfind('[').unwrap() + 1;
    let end = line.rfind(']').unwrap();
    line[start..end]
        .split(", ")
        .map(|v| v.parse().unwrap())
        .collect()
}

fn test_config() -> PipelineConfig {
    PipelineConfig {
        window_size: 8,
        batch_size: 4,
        sample_slack: 16,
        result_capacity: 2,
        ..Default::default()
    }
}

#[test]
fn continuous_pipeline_reports_ordered_disjoint_windows() {
    let config = test_config();
    let source = ReplaySource::new((0..100_000).map(|i| i as f32).collect()).unwrap();
    let classifier = EdgeClassifier::new(8, 4);
    let mut pipeline =
        Pipeline::start_with(&config, classifier, source, Vec::<String>::new()).unwrap();

    for _ in 0..20_000 {
        pipeline.host_mut().step();
        if pipeline.host().reporter().reported() >= 6 {
            break;
        }
        thread::sleep(Duration::from_micros(200));
    }

    let lines = pipeline.host().reporter().sink().clone();
    assert!(lines.len() >= 6, "only {} results reported", lines.len());

    let windows: Vec<Vec<f32>> = lines.iter().map(|l| parse_values(l)).collect();
    assert_eq!(windows[0], vec![0.0, 7.0]);
    for pair in windows.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        assert!(next[0] > prev[1], "windows overlap: {:?} then {:?}", prev, next);
    }
    for window in &windows {
        assert!(window[1] - window[0] >= 7.0);
    }
    assert!(pipeline.inference_running());
}

#[test]
fn every_published_result_is_reported() {
    let config = test_config();
    let source = ReplaySource::new((0..100_000).map(|i| i as f32).collect()).unwrap();
    let classifier = EdgeClassifier::new(8, 8);
    let mut pipeline =
        Pipeline::start_with(&config, classifier, source, Vec::<String>::new()).unwrap();

    // Two acquisition ticks fill one window; poll until four results arrive
    let mut ticks = 0;
    while pipeline.host().reporter().reported() < 4 && ticks < 50_000 {
        pipeline.host_mut().step();
        ticks += 1;
        thread::sleep(Duration::from_micros(100));
    }

    let lines = pipeline.host().reporter().sink();
    assert_eq!(lines.len(), 4);
    let firsts: Vec<f32> = lines.iter().map(|l| parse_values(l)[0]).collect();
    assert!(firsts.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn startup_refuses_window_mismatch() {
    let config = test_config();
    let source = ReplaySource::new(vec![0.0; 4]).unwrap();
    let classifier = EdgeClassifier::new(16, 4);
    let err = Pipeline::start_with(&config, classifier, source, Vec::<String>::new())
        .err()
        .unwrap();
    assert!(matches!(
        err,
        PipelineError::Inference(InferenceError::WindowSizeMismatch { .. })
    ));
}

#[test]
fn command_link_reaches_reporter() {
    let (_result_tx, result_rx) = ring_buffer::channel::<InferenceResult>(2).unwrap();
    let (command_tx, command_rx) = ring_buffer::channel(4).unwrap();
    let link = LinkState::new();
    let mut uart = CommandLink::new(link.clone(), command_tx);
    let mut reporter = Reporter::new(result_rx, command_rx, link, Vec::<String>::new());

    let interrupt = thread::spawn(move || {
        let mut stream = vec![0x00, 0xF5];
        stream.extend(encode_frame(b"IND=BLECONNECTED"));
        for byte in stream {
            uart.on_byte(byte);
        }
        uart
    });
    let uart = interrupt.join().unwrap();

    reporter.poll();
    assert!(reporter.is_connected());
    assert!(!uart.is_framing());
}
