//! Error types for every layer of an import.

use std::path::PathBuf;

use thiserror::Error;

/// Error encoding, receiving or validating a single telegram.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TelegramError {
    #[error("telegram payload is empty")]
    EmptyPayload,
    #[error("telegram payload of {found} bytes exceeds the limit of {limit}")]
    PayloadTooLarge { found: usize, limit: usize },
    #[error("buffer of {found} bytes too small, need {expected}")]
    EncodeBufferTooSmall { expected: usize, found: usize },
    #[error("frame of {found} bytes truncated, need at least {expected_at_least}")]
    DecodeBufferTooSmall { expected_at_least: usize, found: usize },
    #[error("missing start markers")]
    MissingStart,
    #[error("expected end marker at {index}, found {found:#04x}")]
    MissingEnd { index: usize, found: u8 },
    #[error("checksum mismatch: calculated {calculated:#06x}, received {found:#06x}")]
    ChecksumMismatch { calculated: u16, found: u16 },
    #[error("no response before the read timeout")]
    Timeout,
    #[error("link fault: {0:?}")]
    Io(embedded_io::ErrorKind),
}

/// Error from a complete send-then-receive transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("invalid request: {0}")]
    Request(TelegramError),
    #[error("no valid response after {attempts} attempts, last failure: {last}")]
    Exhausted { attempts: u32, last: TelegramError },
}

/// Error opening or enumerating serial interfaces.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

/// Error aborting a memory dump. No partial image survives one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DumpError {
    #[error("reading block at {address:#08x} failed: {source}")]
    Transport {
        address: u32,
        #[source]
        source: TransportError,
    },
    #[error("block at {address:#08x} returned {found} bytes, expected {expected}")]
    ShortBlock {
        address: u32,
        expected: usize,
        found: usize,
    },
}

/// Error reading a fixed-layout record out of the memory image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("{record} record of {size} bytes at {offset:#x} exceeds image of {available} bytes")]
    OutOfBounds {
        record: &'static str,
        offset: usize,
        size: usize,
        available: usize,
    },
    #[error("field {field} does not fit in a {record_size} byte record")]
    FieldOutOfRecord {
        field: &'static str,
        record_size: usize,
    },
    #[error("field {field} is {width} bytes wide, read as {requested}")]
    Width {
        field: &'static str,
        width: usize,
        requested: usize,
    },
}

/// Error decoding one activity. Only that activity is lost.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("invalid {field} timestamp {year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}")]
    InvalidTimestamp {
        field: &'static str,
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
    },
}

/// Error loading the import configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Error ending an import before any activity was decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("no watch answered on any serial port")]
    DeviceNotFound,
    #[error(transparent)]
    Dump(#[from] DumpError),
    #[error("memory image of {found} bytes is shorter than the {expected} byte header")]
    ImageTooShort { expected: usize, found: usize },
}
