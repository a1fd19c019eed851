//! Import of workouts from an Ultrasport NavRun 500 GPS watch.
//!
//! The watch speaks a framed request/response protocol over a serial line
//! ([`telegram`], [`transport`]). An import finds the port the watch is on
//! ([`discovery`]), dumps its memory page by page ([`memory`]), and decodes
//! each activity listed in the header page ([`locator`], [`decoder`]) into a
//! caller supplied result sink ([`activity`]).

pub mod activity;
pub mod config;
pub mod decoder;
pub mod discovery;
pub mod error;
pub mod import;
pub mod layout;
pub mod locator;
pub mod memory;
pub mod monitor;
pub mod serial;
pub mod telegram;
pub mod transport;

#[cfg(test)]
mod testing;

/// Serialise into a caller provided buffer, returning the bytes written.
pub trait Encode {
    type Error;

    fn encode(&self, buffer: &mut [u8]) -> Result<usize, Self::Error>;
}

pub trait Decode<'a>
where
    Self: Sized,
{
    type Error;

    fn decode(data: &'a [u8]) -> Result<Self, Self::Error>;
}

pub use activity::{ActivityBuilder, ActivityRecord, ImportResults, ImportedActivity};
pub use config::ImportConfig;
pub use discovery::{PortProvider, SystemPorts};
pub use error::{DecodeError, DumpError, ImportError, TelegramError, TransportError};
pub use import::{ImportOutcome, import_device, import_image, read_device};
pub use memory::MemoryImage;
pub use monitor::{LogMonitor, ProgressMonitor};
pub use telegram::Telegram;
pub use transport::TelegramTransport;
