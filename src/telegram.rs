
use crate::{Decode, Encode, error::TelegramError};

/// First start marker of a telegram
pub const STX1: u8 = 0xA0;
/// Second start marker of a telegram
pub const STX2: u8 = 0xA2;
/// First end marker of a telegram
pub const ETX1: u8 = 0xB0;
/// Second end marker of a telegram
pub const ETX2: u8 = 0xB3;

/// Start: 2, Length: 2, Checksum: 2, End: 2
pub const FRAME_OVERHEAD: usize = 8;
/// Length field is a u16
pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize;
/// Requests are short commands, so the host never frames more than this.
pub const MAX_REQUEST_SIZE: usize = u8::MAX as usize;
pub const MAX_REQUEST_FRAME_SIZE: usize = MAX_REQUEST_SIZE + FRAME_OVERHEAD;

/// 16-bit sum of all payload bytes, wrapping.
pub fn checksum(payload: &[u8]) -> u16 {
    payload
        .iter()
        .fold(0u16, |sum, b| sum.wrapping_add(u16::from(*b)))
}

/// Telegrams consist of two start markers, a big-endian length, the
/// payload, a big-endian checksum and two end markers.
///
/// Marker bytes inside the payload are not escaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Telegram<'a> {
    payload: &'a [u8],
    checksum: u16,
}

impl<'a> Telegram<'a> {
    pub fn new(payload: &'a [u8]) -> Result<Telegram<'a>, TelegramError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(TelegramError::PayloadTooLarge {
                found: payload.len(),
                limit: MAX_PAYLOAD_SIZE,
            });
        }
        Ok(Telegram {
            payload,
            checksum: checksum(payload),
        })
    }

    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    pub fn checksum(&self) -> u16 {
        self.checksum
    }

    /// Length in a slice this telegram occupies including markers
    pub fn len(&self) -> usize {
        self.payload.len() + FRAME_OVERHEAD
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

impl Encode for Telegram<'_> {
    type Error = TelegramError;

    fn encode(&self, buffer: &mut [u8]) -> Result<usize, Self::Error> {
        let size = self.len();
        if buffer.len() < size {
            return Err(TelegramError::EncodeBufferTooSmall {
                expected: size,
                found: buffer.len(),
            });
        }
        let length = (self.payload.len() as u16).to_be_bytes();
        let chk = self.checksum.to_be_bytes();
        let end = self.payload.len() + 4;

        buffer[0] = STX1;
        buffer[1] = STX2;
        buffer[2..4].copy_from_slice(&length);
        buffer[4..end].copy_from_slice(self.payload);
        buffer[end..end + 2].copy_from_slice(&chk);
        buffer[end + 2] = ETX1;
        buffer[end + 3] = ETX2;

        Ok(size)
    }
}

impl<'a> Decode<'a> for Telegram<'a> {
    type Error = TelegramError;

    /// Strict decode of a telegram starting at the first byte of `data`.
    /// Use [`TelegramReceiver`] for a byte stream that needs resyncing.
    fn decode(data: &'a [u8]) -> Result<Self, Self::Error> {
        if data.len() < FRAME_OVERHEAD {
            return Err(TelegramError::DecodeBufferTooSmall {
                expected_at_least: FRAME_OVERHEAD,
                found: data.len(),
            });
        }
        if data[0] != STX1 || data[1] != STX2 {
            return Err(TelegramError::MissingStart);
        }
        let size = u16::from_be_bytes([data[2], data[3]]) as usize;
        if data.len() < size + FRAME_OVERHEAD {
            return Err(TelegramError::DecodeBufferTooSmall {
                expected_at_least: size + FRAME_OVERHEAD,
                found: data.len(),
            });
        }

        let payload = &data[4..size + 4];
        let found = u16::from_be_bytes([data[size + 4], data[size + 5]]);
        let calculated = checksum(payload);
        if calculated != found {
            return Err(TelegramError::ChecksumMismatch { calculated, found });
        }
        if data[size + 6] != ETX1 {
            return Err(TelegramError::MissingEnd {
                index: size + 6,
                found: data[size + 6],
            });
        }
        if data[size + 7] != ETX2 {
            return Err(TelegramError::MissingEnd {
                index: size + 7,
                found: data[size + 7],
            });
        }

        Ok(Telegram {
            payload,
            checksum: found,
        })
    }
}

/// Encode a request into a fixed-capacity buffer ready to be written out.
pub fn encode_request(
    payload: &[u8],
) -> Result<heapless::Vec<u8, MAX_REQUEST_FRAME_SIZE>, TelegramError> {
    if payload.is_empty() {
        return Err(TelegramError::EmptyPayload);
    }
    if payload.len() > MAX_REQUEST_SIZE {
        return Err(TelegramError::PayloadTooLarge {
            found: payload.len(),
            limit: MAX_REQUEST_SIZE,
        });
    }
    let telegram = Telegram::new(payload)?;
    let mut buf = [0; MAX_REQUEST_FRAME_SIZE];
    let size = telegram.encode(&mut buf)?;

    let mut out = heapless::Vec::new();
    out.extend_from_slice(&buf[0..size])
        .map_err(|_| TelegramError::EncodeBufferTooSmall {
            expected: size,
            found: MAX_REQUEST_FRAME_SIZE,
        })?;
    Ok(out)
}

/// Position of the receiver inside a telegram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxState {
    WaitStart1,
    WaitStart2,
    LenHi,
    LenLo { hi: u8 },
    Payload { remaining: u16 },
    ChkHi,
    ChkLo { hi: u8 },
    WaitEnd1,
    WaitEnd2,
}

/// Byte driven receive state machine.
///
/// Bytes ahead of the start markers are discarded. The payload checksum is
/// accumulated while the payload streams in and compared once the second
/// end marker arrives.
#[derive(Debug)]
pub struct TelegramReceiver {
    state: RxState,
    payload: Vec<u8>,
    sum: u16,
    received: u16,
}

impl Default for TelegramReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl TelegramReceiver {
    pub fn new() -> TelegramReceiver {
        TelegramReceiver {
            state: RxState::WaitStart1,
            payload: Vec::new(),
            sum: 0,
            received: 0,
        }
    }

    pub fn state(&self) -> RxState {
        self.state
    }

    /// Drop everything collected so far and wait for a fresh start marker.
    pub fn reset(&mut self) {
        self.state = RxState::WaitStart1;
        self.payload.clear();
        self.sum = 0;
        self.received = 0;
    }

    /// Feed one byte. Returns `None` while the telegram is incomplete.
    ///
    /// A completed telegram yields its payload if the checksum matches. A
    /// wrong second end marker yields [`TelegramError::MissingEnd`] and
    /// leaves the receiver waiting for a new start marker.
    pub fn push(&mut self, x: u8) -> Option<Result<Vec<u8>, TelegramError>> {
        self.state = match self.state {
            RxState::WaitStart1 if x == STX1 => RxState::WaitStart2,
            RxState::WaitStart1 => RxState::WaitStart1,
            RxState::WaitStart2 if x == STX2 => RxState::LenHi,
            // A repeated first marker may still be the real start
            RxState::WaitStart2 if x == STX1 => RxState::WaitStart2,
            RxState::WaitStart2 => RxState::WaitStart1,
            RxState::LenHi => RxState::LenLo { hi: x },
            RxState::LenLo { hi } => {
                self.payload.clear();
                self.sum = 0;
                match u16::from_be_bytes([hi, x]) {
                    0 => RxState::ChkHi,
                    remaining => {
                        self.payload.reserve(remaining as usize);
                        RxState::Payload { remaining }
                    }
                }
            }
            RxState::Payload { remaining } => {
                self.payload.push(x);
                self.sum = self.sum.wrapping_add(u16::from(x));
                match remaining - 1 {
                    0 => RxState::ChkHi,
                    remaining => RxState::Payload { remaining },
                }
            }
            RxState::ChkHi => RxState::ChkLo { hi: x },
            RxState::ChkLo { hi } => {
                self.received = u16::from_be_bytes([hi, x]);
                RxState::WaitEnd1
            }
            RxState::WaitEnd1 if x == ETX1 => RxState::WaitEnd2,
            RxState::WaitEnd1 => RxState::WaitEnd1,
            RxState::WaitEnd2 => {
                let index = self.payload.len() + 7;
                self.state = RxState::WaitStart1;
                if x != ETX2 {
                    self.payload.clear();
                    return Some(Err(TelegramError::MissingEnd { index, found: x }));
                }
                let payload = core::mem::take(&mut self.payload);
                if self.sum != self.received {
                    return Some(Err(TelegramError::ChecksumMismatch {
                        calculated: self.sum,
                        found: self.received,
                    }));
                }
                return Some(Ok(payload));
            }
        };
        None
    }
}
