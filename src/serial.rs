use std::io;
use std::time::Duration;

use serialport::SerialPort;

/// A platform serial port exposed through the embedded-io traits the
/// transport is written against.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
}

impl SerialLink {
    /// Open `name` at `baud_rate`, 8N1, with `timeout` applied to each read.
    pub fn open(name: &str, baud_rate: u32, timeout: Duration) -> serialport::Result<SerialLink> {
        let port = serialport::new(name, baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .timeout(timeout)
            .open()?;
        Ok(SerialLink { port })
    }
}

impl core::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SerialLink")
            .field("port", &self.port.name())
            .finish()
    }
}

#[derive(Debug)]
pub struct ErrorShim(pub io::Error);

impl embedded_io::Error for ErrorShim {
    fn kind(&self) -> embedded_io::ErrorKind {
        use io::ErrorKind::*;
        match self.0.kind() {
            // Some platforms report an expired read timeout as WouldBlock
            TimedOut | WouldBlock => embedded_io::ErrorKind::TimedOut,
            Interrupted => embedded_io::ErrorKind::Interrupted,
            NotFound => embedded_io::ErrorKind::NotFound,
            PermissionDenied => embedded_io::ErrorKind::PermissionDenied,
            BrokenPipe => embedded_io::ErrorKind::BrokenPipe,
            InvalidInput => embedded_io::ErrorKind::InvalidInput,
            InvalidData => embedded_io::ErrorKind::InvalidData,
            Unsupported => embedded_io::ErrorKind::Unsupported,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

impl From<io::Error> for ErrorShim {
    fn from(value: io::Error) -> Self {
        ErrorShim(value)
    }
}

impl embedded_io::ErrorType for SerialLink {
    type Error = ErrorShim;
}

impl embedded_io::Read for SerialLink {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        Ok(io::Read::read(&mut self.port, buf)?)
    }
}

impl embedded_io::Write for SerialLink {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        Ok(io::Write::write(&mut self.port, buf)?)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(io::Write::flush(&mut self.port)?)
    }
}
