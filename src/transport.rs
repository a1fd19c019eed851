use std::thread;
use std::time::Duration;

use embedded_io::{Error, ErrorKind, Read, Write};
use log::{debug, trace};

use crate::error::{TelegramError, TransportError};
use crate::telegram::{TelegramReceiver, encode_request};

/// Query the firmware version. Any valid answer identifies the watch.
pub const CMD_READ_VERSION: u8 = 0x10;
/// Read a block of device memory: address (3 bytes, LE) and size (1 byte).
pub const CMD_READ_MEMORY: u8 = 0x12;

/// Timing of one send-then-receive cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    /// Pause after writing, per byte of the request frame.
    pub settle_per_byte: Duration,
    /// Pause after the first read timeout of an attempt before reading on.
    pub timeout_pause: Duration,
}

impl TransportConfig {
    /// Pause after writing a frame of `frame_len` bytes. Saturates.
    pub fn settle_time(&self, frame_len: usize) -> Duration {
        let bytes = u32::try_from(frame_len).unwrap_or(u32::MAX);
        self.settle_per_byte.saturating_mul(bytes)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            settle_per_byte: Duration::from_millis(2),
            timeout_pause: Duration::from_millis(10),
        }
    }
}

/// Request/response transport over an exclusively owned link.
///
/// Only one transaction is ever in flight. Every failed attempt (timeout,
/// framing error, checksum mismatch, link fault) resends the request until
/// the repeat budget is spent.
#[derive(Debug)]
pub struct TelegramTransport<L> {
    link: L,
    config: TransportConfig,
    receiver: TelegramReceiver,
}

impl<L: Read + Write> TelegramTransport<L> {
    pub fn new(link: L, config: TransportConfig) -> TelegramTransport<L> {
        TelegramTransport {
            link,
            config,
            receiver: TelegramReceiver::new(),
        }
    }

    /// Send `payload` and return the payload of the answer.
    ///
    /// Performs at most `repeat + 1` full cycles. Nothing partial is ever
    /// returned.
    pub fn send(&mut self, payload: &[u8], repeat: u8) -> Result<Vec<u8>, TransportError> {
        let frame = encode_request(payload).map_err(TransportError::Request)?;
        let attempts = u32::from(repeat) + 1;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.exchange(&frame) {
                Ok(response) => {
                    trace!(
                        "command {:#04x}: {} byte answer on attempt {attempt}",
                        payload[0],
                        response.len()
                    );
                    return Ok(response);
                }
                Err(last) if attempt >= attempts => {
                    debug!("command {:#04x}: giving up after {attempt} attempts: {last}", payload[0]);
                    return Err(TransportError::Exhausted { attempts, last });
                }
                Err(e) => {
                    debug!("command {:#04x}: attempt {attempt}/{attempts} failed: {e}", payload[0]);
                }
            }
        }
    }

    fn exchange(&mut self, frame: &[u8]) -> Result<Vec<u8>, TelegramError> {
        self.link
            .write_all(frame)
            .map_err(|e| TelegramError::Io(e.kind()))?;
        self.link.flush().map_err(|e| TelegramError::Io(e.kind()))?;
        // The watch needs time to digest the request before it answers
        let settle = self.config.settle_time(frame.len());
        if !settle.is_zero() {
            thread::sleep(settle);
        }
        self.receive()
    }

    fn receive(&mut self) -> Result<Vec<u8>, TelegramError> {
        self.receiver.reset();
        let mut timed_out = false;
        let mut byte = [0; 1];
        loop {
            let timeout = match self.link.read(&mut byte) {
                Ok(0) => true,
                Ok(_) => {
                    if let Some(result) = self.receiver.push(byte[0]) {
                        return result;
                    }
                    false
                }
                Err(e) if e.kind() == ErrorKind::TimedOut => true,
                Err(e) if e.kind() == ErrorKind::Interrupted => false,
                Err(e) => return Err(TelegramError::Io(e.kind())),
            };
            if timeout {
                if timed_out {
                    return Err(TelegramError::Timeout);
                }
                timed_out = true;
                if !self.config.timeout_pause.is_zero() {
                    thread::sleep(self.config.timeout_pause);
                }
            }
        }
    }

    pub fn link(&self) -> &L {
        &self.link
    }
}
