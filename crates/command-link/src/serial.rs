//! Serial byte source for the command link
//!
//! On a hosted target the UART receive interrupt is modelled by a dedicated
//! reader thread that feeds every received byte to [`CommandLink::on_byte`].

use crate::error::LinkError;
use crate::link::CommandLink;
use std::thread::{self, JoinHandle};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_serial::{DataBits, Parity, SerialPortBuilderExt, StopBits};
use tracing::{debug, error, info, warn};

/// Default UART baud rate
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Serial port settings (8 data bits, 1 stop bit, no parity)
#[derive(Debug, Clone)]
pub struct SerialSettings {
    /// Serial port device path (e.g., "/dev/ttyUSB0" or "COM3")
    pub device: String,
    /// Baud rate
    pub baud_rate: u32,
}

impl SerialSettings {
    /// Settings for `device` at the default baud rate
    pub fn new(device: &str) -> Self {
        Self {
            device: device.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

/// Feed every byte from `reader` into the handler until end of stream.
///
/// Returns the number of bytes consumed.
pub async fn pump_bytes<R>(mut reader: R, link: &mut CommandLink) -> Result<u64, LinkError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 64];
    let mut total = 0u64;
    let mut reported_drops = 0u64;

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            debug!("Command link byte source closed after {} bytes", total);
            return Ok(total);
        }

        link.on_bytes(&buf[..n]);
        total += n as u64;

        let dropped = link.dropped_commands();
        if dropped > reported_drops {
            warn!(dropped, "Command queue full, commands dropped");
            reported_drops = dropped;
        }
    }
}

/// Open the serial port and pump it into the handler
pub async fn run_serial_link(
    settings: &SerialSettings,
    link: &mut CommandLink,
) -> Result<u64, LinkError> {
    info!(
        "Opening command link on {} at {} baud",
        settings.device, settings.baud_rate
    );

    let port = tokio_serial::new(&settings.device, settings.baud_rate)
        .data_bits(DataBits::Eight)
        .stop_bits(StopBits::One)
        .parity(Parity::None)
        .open_native_async()?;

    pump_bytes(port, link).await
}

/// Run the serial reader on its own thread with a single-threaded runtime
pub fn spawn_serial_link(
    settings: SerialSettings,
    mut link: CommandLink,
) -> Result<JoinHandle<Result<u64, LinkError>>, LinkError> {
    thread::Builder::new()
        .name("uart-rx".to_string())
        .spawn(move || {
            let outcome = tokio::runtime::Builder::new_current_thread()
                .enable_io()
                .build()
                .map_err(|e| LinkError::Runtime(e.to_string()))
                .and_then(|runtime| runtime.block_on(run_serial_link(&settings, &mut link)));
            match &outcome {
                Ok(total) => info!("Command link closed after {} bytes", total),
                Err(e) => error!("Command link stopped on {}: {}", settings.device, e),
            }
            outcome
        })
        .map_err(|e| LinkError::Runtime(e.to_string()))
}
