//! One import run: find the watch, dump its memory, decode the activities.

use core::fmt;

use log::{info, warn};

use crate::activity::ImportResults;
use crate::config::ImportConfig;
use crate::decoder::decode;
use crate::discovery::{PortProvider, discover};
use crate::error::ImportError;
use crate::locator::{HEADER_SIZE, locate};
use crate::memory::{MemoryImage, MemoryReader};
use crate::monitor::{Progress, ProgressMonitor};

/// What the caller learns about an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    DeviceNotFound,
    ReadFailed,
    /// Activities handed to the result sink. Zero is still a success.
    Imported { activities: usize },
}

impl fmt::Display for ImportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportOutcome::DeviceNotFound => write!(f, "device not found"),
            ImportOutcome::ReadFailed => write!(f, "read failed"),
            ImportOutcome::Imported { activities } => write!(f, "imported {activities} activities"),
        }
    }
}

impl From<&ImportError> for ImportOutcome {
    fn from(value: &ImportError) -> Self {
        match value {
            ImportError::DeviceNotFound => ImportOutcome::DeviceNotFound,
            ImportError::Dump(_) | ImportError::ImageTooShort { .. } => ImportOutcome::ReadFailed,
        }
    }
}

/// Locate the watch and pull its complete memory image.
///
/// The port is closed again before this returns.
pub fn read_device<P: PortProvider>(
    provider: &mut P,
    config: &ImportConfig,
    monitor: &mut dyn ProgressMonitor,
) -> Result<MemoryImage, ImportError> {
    monitor.set_status_text("Searching for watch");
    let mut device = discover(provider, config).ok_or(ImportError::DeviceNotFound)?;

    monitor.set_status_text(&format!("Reading watch memory on {}", device.port_name));
    let image = MemoryReader::new(&mut device.transport, config.read_retries).read_image(monitor)?;
    Ok(image)
}

/// Decode every activity in `image` into `results`.
///
/// An activity that fails to decode is logged and skipped.
pub fn decode_image<R: ImportResults>(image: &[u8], results: &mut R) -> Result<usize, ImportError> {
    if image.len() < HEADER_SIZE {
        return Err(ImportError::ImageTooShort {
            expected: HEADER_SIZE,
            found: image.len(),
        });
    }

    let offsets = locate(image);
    info!("{} activities in index", offsets.len());
    let mut imported = 0;
    for offset in offsets {
        match decode(image, offset) {
            Ok(record) => {
                record.export(results);
                imported += 1;
            }
            Err(e) => warn!("skipping activity at {offset:#x}: {e}"),
        }
    }
    Ok(imported)
}

/// Import from an image read earlier, e.g. a saved dump.
pub fn import_image<R: ImportResults>(
    image: &[u8],
    monitor: &mut dyn ProgressMonitor,
    results: &mut R,
) -> ImportOutcome {
    monitor.set_status_text("Decoding activities");
    match decode_image(image, results) {
        Ok(activities) => {
            Progress::default().report(monitor, 1.0);
            info!("imported {activities} activities");
            ImportOutcome::Imported { activities }
        }
        Err(e) => fail(monitor, &e),
    }
}

/// Import straight from the watch.
pub fn import_device<P: PortProvider, R: ImportResults>(
    provider: &mut P,
    config: &ImportConfig,
    monitor: &mut dyn ProgressMonitor,
    results: &mut R,
) -> ImportOutcome {
    match read_device(provider, config, monitor) {
        Ok(image) => import_image(image.as_bytes(), monitor, results),
        Err(e) => fail(monitor, &e),
    }
}

fn fail(monitor: &mut dyn ProgressMonitor, error: &ImportError) -> ImportOutcome {
    warn!("import failed: {error}");
    monitor.set_error_text(&error.to_string());
    ImportOutcome::from(error)
}
