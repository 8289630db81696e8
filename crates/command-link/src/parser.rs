//! Byte-at-a-time frame parser
//!
//! Runs in interrupt context: every call is O(1), never blocks and never
//! allocates. The command buffer is a fixed array reused between frames.

use crate::marker;
use crate::protocol::LinkEvent;
use std::borrow::Cow;
use std::fmt;

/// Maximum stored payload length, including the two end-marker bytes
pub const COMMAND_CAPACITY: usize = 32;

/// A completed command payload, copied out of the parser's buffer
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Command {
    bytes: [u8; COMMAND_CAPACITY],
    len: usize,
    truncated: bool,
}

impl Command {
    /// Build a command from a payload, truncating to capacity
    pub fn from_payload(payload: &[u8]) -> Self {
        let len = payload.len().min(COMMAND_CAPACITY);
        let mut bytes = [0u8; COMMAND_CAPACITY];
        bytes[..len].copy_from_slice(&payload[..len]);
        Self {
            bytes,
            len,
            truncated: payload.len() > COMMAND_CAPACITY,
        }
    }

    /// Payload bytes without markers
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Payload as text, with invalid UTF-8 replaced
    pub fn as_str_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }

    /// Payload length
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the payload is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether bytes were dropped because the frame overflowed the buffer
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Classify the payload
    pub fn event(&self) -> LinkEvent {
        LinkEvent::from_payload(self.as_bytes())
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("payload", &self.as_str_lossy())
            .field("truncated", &self.truncated)
            .finish()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str_lossy())
    }
}

/// Streaming parser for `F5 F4 <payload> 0D 0A` frames
#[derive(Debug, Clone)]
pub struct FrameParser {
    buffer: [u8; COMMAND_CAPACITY],
    write_index: usize,
    framing_active: bool,
    previous_byte: u8,
    truncated: bool,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    /// Create an idle parser
    pub const fn new() -> Self {
        Self {
            buffer: [0u8; COMMAND_CAPACITY],
            write_index: 0,
            framing_active: false,
            previous_byte: 0,
            truncated: false,
        }
    }

    /// Feed one byte, returning a command when it completes a frame.
    ///
    /// Bytes past [`COMMAND_CAPACITY`] are dropped and the command is marked
    /// truncated. A start marker always restarts the buffer, even inside an
    /// open frame. An end marker with fewer than two stored bytes (including
    /// one outside any frame) resets the parser and yields nothing.
    pub fn push_byte(&mut self, byte: u8) -> Option<Command> {
        if self.framing_active {
            if self.write_index < COMMAND_CAPACITY {
                self.buffer[self.write_index] = byte;
                self.write_index += 1;
            } else {
                self.truncated = true;
            }
        }

        let mut completed = None;
        if byte == marker::START_2 && self.previous_byte == marker::START_1 {
            self.framing_active = true;
            self.write_index = 0;
            self.truncated = false;
        } else if byte == marker::END_2 && self.previous_byte == marker::END_1 {
            completed = self.seal();
        }

        self.previous_byte = byte;
        completed
    }

    /// Close the current frame, trimming the two stored end-marker bytes
    fn seal(&mut self) -> Option<Command> {
        let was_active = self.framing_active;
        let written = self.write_index;
        let truncated = self.truncated;

        self.framing_active = false;
        self.write_index = 0;
        self.truncated = false;

        if !was_active || written < 2 {
            return None;
        }

        let len = written - 2;
        self.buffer[len] = 0;

        let mut bytes = [0u8; COMMAND_CAPACITY];
        bytes[..len].copy_from_slice(&self.buffer[..len]);
        Some(Command {
            bytes,
            len,
            truncated,
        })
    }

    /// Whether a frame is currently open
    pub fn is_framing(&self) -> bool {
        self.framing_active
    }

    /// Number of bytes stored for the open frame
    pub fn buffered_len(&self) -> usize {
        self.write_index
    }

    /// Discard any partial frame
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
