//! Command Link Protocol Definitions

use crate::marker;

/// Payload reported by the peer when a BLE central connects
pub const BLE_CONNECTED: &[u8] = b"IND=BLECONNECTED";

/// Payload reported by the peer when the BLE central goes away
pub const BLE_DISCONNECTED: &[u8] = b"IND=BLEDISCONNECTED";

/// Meaning of a completed command payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// Peer connection established
    Connected,
    /// Peer connection lost
    Disconnected,
    /// Any other payload; logged and otherwise ignored
    Unrecognized,
}

impl LinkEvent {
    /// Classify a payload. Matching is exact and case-sensitive.
    pub fn from_payload(payload: &[u8]) -> Self {
        match payload {
            BLE_CONNECTED => LinkEvent::Connected,
            BLE_DISCONNECTED => LinkEvent::Disconnected,
            _ => LinkEvent::Unrecognized,
        }
    }

    /// Link state this event sets, if any
    pub fn link_state(&self) -> Option<bool> {
        match self {
            LinkEvent::Connected => Some(true),
            LinkEvent::Disconnected => Some(false),
            LinkEvent::Unrecognized => None,
        }
    }
}

/// Wrap a payload in start and end markers
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + 4);
    frame.extend_from_slice(&[marker::START_1, marker::START_2]);
    frame.extend_from_slice(payload);
    frame.extend_from_slice(&[marker::END_1, marker::END_2]);
    frame
}
