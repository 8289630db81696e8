//! Link state and the interrupt-side command handler

use crate::parser::{Command, FrameParser};
use ring_buffer::Producer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Whether the peer currently reports an established connection.
///
/// A single word written only by [`CommandLink`]; readers take a plain
/// relaxed load, since either value is meaningful on its own.
#[derive(Debug, Clone, Default)]
pub struct LinkState {
    connected: Arc<AtomicBool>,
}

impl LinkState {
    /// Create a disconnected link state
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the peer is connected
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub(crate) fn set(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }
}

/// Body of the UART receive interrupt.
///
/// Parses bytes, updates [`LinkState`] on recognized commands and hands every
/// completed command to the reporting side through a bounded queue. A full
/// queue drops the command; the link state has already been applied.
pub struct CommandLink {
    parser: FrameParser,
    link: LinkState,
    commands: Producer<Command>,
    dropped: u64,
}

impl CommandLink {
    /// Create a handler publishing into `commands`
    pub fn new(link: LinkState, commands: Producer<Command>) -> Self {
        Self {
            parser: FrameParser::new(),
            link,
            commands,
            dropped: 0,
        }
    }

    /// Handle one received byte
    #[inline]
    pub fn on_byte(&mut self, byte: u8) {
        let Some(command) = self.parser.push_byte(byte) else {
            return;
        };

        if let Some(connected) = command.event().link_state() {
            self.link.set(connected);
        }

        if self.commands.try_push(command).is_err() {
            self.dropped += 1;
        }
    }

    /// Handle a run of received bytes in arrival order
    pub fn on_bytes(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.on_byte(*byte);
        }
    }

    /// Commands dropped because the command queue was full
    pub fn dropped_commands(&self) -> u64 {
        self.dropped
    }

    /// Handle to the link state this handler writes
    pub fn link_state(&self) -> LinkState {
        self.link.clone()
    }

    /// Whether a frame is currently open
    pub fn is_framing(&self) -> bool {
        self.parser.is_framing()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::encode_frame;

    #[test]
    fn test_connect_then_disconnect() {
        let (tx, mut rx) = ring_buffer::channel(4).unwrap();
        let link = LinkState::new();
        let mut handler = CommandLink::new(link.clone(), tx);

        let mut connect = vec![0xF5, 0xF4];
        connect.extend_from_slice(b"IND=BLECONNECTED");
        connect.extend_from_slice(&[0x0D, 0x0A]);
        handler.on_bytes(&connect);
        assert!(link.is_connected());

        handler.on_bytes(&encode_frame(b"IND=BLEDISCONNECTED"));
        assert!(!link.is_connected());

        assert_eq!(rx.try_pop().unwrap().as_bytes(), b"IND=BLECONNECTED");
        assert_eq!(rx.try_pop().unwrap().as_bytes(), b"IND=BLEDISCONNECTED");
        assert!(rx.try_pop().is_none());
    }

    #[test]
    fn test_unrecognized_command_leaves_state() {
        let (tx, mut rx) = ring_buffer::channel(4).unwrap();
        let link = LinkState::new();
        let mut handler = CommandLink::new(link.clone(), tx);

        handler.on_bytes(&encode_frame(b"IND=BLECONNECTED"));
        handler.on_bytes(&encode_frame(b"AT+VERSION"));

        assert!(link.is_connected());
        rx.try_pop();
        assert_eq!(rx.try_pop().unwrap().to_string(), "AT+VERSION");
    }

    #[test]
    fn test_noise_leaves_state_unchanged() {
        let (tx, mut rx) = ring_buffer::channel(4).unwrap();
        let link = LinkState::new();
        let mut handler = CommandLink::new(link.clone(), tx);

        handler.on_bytes(b"IND=BLECONNECTED\r\n");
        assert!(!link.is_connected());
        assert!(!handler.is_framing());
        assert!(rx.try_pop().is_none());
    }

    #[test]
    fn test_full_queue_drops_command_but_applies_state() {
        let (tx, mut rx) = ring_buffer::channel(1).unwrap();
        let link = LinkState::new();
        let mut handler = CommandLink::new(link.clone(), tx);

        handler.on_bytes(&encode_frame(b"HELLO"));
        handler.on_bytes(&encode_frame(b"IND=BLECONNECTED"));

        assert!(link.is_connected());
        assert_eq!(handler.dropped_commands(), 1);
        assert_eq!(rx.try_pop().unwrap().to_string(), "HELLO");
    }
}
