//! Reporting loop: drains results and commands without ever blocking

use command_link::{Command, LinkState};
use inference_engine::InferenceResult;
use ring_buffer::Consumer;
use tracing::{info, warn};

/// Line-oriented output for rendered results
pub trait ReportSink {
    fn report(&mut self, line: &str);
}

/// Writes each report line to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn report(&mut self, line: &str) {
        info!(target: "report", "{}", line);
    }
}

impl ReportSink for Vec<String> {
    fn report(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

/// Drains the result queue and the command queue.
///
/// Logs every command verbatim and every link state transition.
pub struct Reporter<K> {
    results: Consumer<InferenceResult>,
    commands: Consumer<Command>,
    link: LinkState,
    last_connected: bool,
    sink: K,
    reported: u64,
}

impl<K: ReportSink> Reporter<K> {
    pub fn new(
        results: Consumer<InferenceResult>,
        commands: Consumer<Command>,
        link: LinkState,
        sink: K,
    ) -> Self {
        let last_connected = link.is_connected();
        Self {
            results,
            commands,
            link,
            last_connected,
            sink,
            reported: 0,
        }
    }

    /// Render at most one pending result. Returns whether one was rendered.
    pub fn poll(&mut self) -> bool {
        self.drain_commands();
        self.check_link();

        match self.results.try_pop() {
            Some(result) => {
                self.sink.report(&result.to_string());
                self.reported += 1;
                true
            }
            None => false,
        }
    }

    fn drain_commands(&mut self) {
        while let Some(command) = self.commands.try_pop() {
            if command.is_truncated() {
                warn!("Command truncated to {} bytes: {}", command.len(), command);
            } else {
                info!("Command received: {}", command);
            }
        }
    }

    fn check_link(&mut self) {
        let connected = self.link.is_connected();
        if connected != self.last_connected {
            if connected {
                info!("Peer connected");
            } else {
                info!("Peer disconnected");
            }
            self.last_connected = connected;
        }
    }

    /// Current peer connectivity
    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    /// Results rendered so far
    pub fn reported(&self) -> u64 {
        self.reported
    }

    /// The output sink
    pub fn sink(&self) -> &K {
        &self.sink
    }
}
