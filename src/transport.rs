//! Byte-level access to the supply's serial port.
//!
//! The driver talks through the [`Link`] trait so tests can substitute a
//! scripted double; [`SerialLink`] is the real implementation over a
//! `serialport` handle configured for the KA-series line discipline.

use std::io;
use std::time::Duration;

use serialport::{ClearBuffer, DataBits, Parity, SerialPort, StopBits};
use thiserror::Error;
use tracing::info;

/// Fixed line speed of the KA-series protocol.
pub const BAUD_RATE: u32 = 9600;

/// How long a read blocks before handing back whatever has arrived.
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Failure to obtain a usable connection.
#[derive(Error, Debug)]
pub enum OpenError {
    /// The path does not exist, is not a serial device, or is already held
    /// by another process.
    #[error("device unavailable: {0}")]
    Unavailable(#[from] serialport::Error),
}

/// One duplex byte-stream connection to the instrument.
///
/// Replies carry no terminator, so framing is write/read ordering plus
/// [`discard_input`](Link::discard_input) between round-trips. A read that
/// times out short is the normal degraded case, not a failure.
pub trait Link: embedded_io::Read + embedded_io::Write {
    /// Drop any buffered-but-unread bytes so the next read starts clean.
    fn discard_input(&mut self) -> Result<(), Self::Error>;
}

/// A [`Link`] over a real serial device, 9600-8-N-1.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
}

impl SerialLink {
    /// Open `path` with the fixed KA-series settings and discard anything a
    /// previous session may have left in the input buffer.
    pub fn open(path: &str) -> Result<Self, OpenError> {
        let port = serialport::new(path, BAUD_RATE)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(READ_TIMEOUT)
            .open()?;
        port.clear(ClearBuffer::Input)?;
        info!(path, "serial link open");
        Ok(SerialLink { port })
    }
}

impl embedded_io::ErrorType for SerialLink {
    type Error = io::Error;
}

impl embedded_io::Read for SerialLink {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        io::Read::read(&mut self.port, buf)
    }
}

impl embedded_io::Write for SerialLink {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        io::Write::write(&mut self.port, buf)
    }

    /// Blocks until written bytes are physically transmitted.
    fn flush(&mut self) -> Result<(), Self::Error> {
        io::Write::flush(&mut self.port)
    }
}

impl Link for SerialLink {
    fn discard_input(&mut self) -> Result<(), Self::Error> {
        self.port
            .clear(ClearBuffer::Input)
            .map_err(io::Error::from)
    }
}
