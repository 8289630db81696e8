//! Serial Command Link
//!
//! Extracts framed command messages from the byte stream of the peer's UART
//! and tracks whether the peer reports an established connection.
//!
//! Wire format: `F5 F4 <payload> 0D 0A`. The payload is ASCII and never
//! contains the `0D 0A` end sequence.

mod error;
mod link;
mod parser;
mod protocol;
mod serial;

pub use error::LinkError;
pub use link::{CommandLink, LinkState};
pub use parser::{Command, FrameParser, COMMAND_CAPACITY};
pub use protocol::{encode_frame, LinkEvent};
pub use serial::{pump_bytes, run_serial_link, spawn_serial_link, SerialSettings, DEFAULT_BAUD_RATE};

/// Frame marker constants
pub mod marker {
    /// First byte of the start marker
    pub const START_1: u8 = 0xF5;
    /// Second byte of the start marker
    pub const START_2: u8 = 0xF4;
    /// First byte of the end marker (carriage return)
    pub const END_1: u8 = 0x0D;
    /// Second byte of the end marker (line feed)
    pub const END_2: u8 = 0x0A;
}
