//! Paged dump of the watch memory.

use embedded_io::{Read, Write};
use log::{debug, info, warn};

use crate::error::DumpError;
use crate::locator::{TABLE_END, index_table};
use crate::monitor::{Progress, ProgressMonitor};
use crate::transport::{CMD_READ_MEMORY, TelegramTransport};

/// Bytes of memory per read-memory command
pub const BLOCK_SIZE: usize = 0x80;
pub const BLOCKS_PER_PAGE: usize = 32;
pub const PAGE_SIZE: usize = BLOCK_SIZE * BLOCKS_PER_PAGE;
/// Status: 1, Data: BLOCK_SIZE
pub const BLOCK_RESPONSE_SIZE: usize = BLOCK_SIZE + 1;

const HEADER_DONE: f32 = 0.05;
const PAGES_START: f32 = 0.10;

/// Complete memory image as read from the watch, or from a saved dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryImage(Vec<u8>);

impl MemoryImage {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for MemoryImage {
    fn from(value: Vec<u8>) -> Self {
        MemoryImage(value)
    }
}

impl AsRef<[u8]> for MemoryImage {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Number of pages after the header that hold data.
///
/// The index table at 0x100 lists page numbers in use, activities
/// separated by single 0xFF bytes, e.g. `01 02 03 FF 04 05 FF FF`. The
/// byte before the first `FF FF` pair is the last used page.
pub fn max_page(header: &[u8]) -> u8 {
    let Some(table) = index_table(header) else {
        return 0;
    };
    match table.windows(2).position(|w| w == [TABLE_END, TABLE_END]) {
        // table[0] is never TABLE_END here, so i >= 1
        Some(i) => table[i - 1],
        None => table
            .iter()
            .rev()
            .copied()
            .find(|&v| v != TABLE_END)
            .unwrap_or(0),
    }
}

/// Payload of a read-memory request.
pub fn read_memory_request(address: u32, size: u8) -> [u8; 5] {
    let a = address.to_le_bytes();
    [CMD_READ_MEMORY, a[0], a[1], a[2], size]
}

/// Pulls the memory image out of the watch block by block.
pub struct MemoryReader<'t, L> {
    transport: &'t mut TelegramTransport<L>,
    retries: u8,
}

impl<'t, L: Read + Write> MemoryReader<'t, L> {
    pub fn new(transport: &'t mut TelegramTransport<L>, retries: u8) -> MemoryReader<'t, L> {
        MemoryReader { transport, retries }
    }

    /// Read the 128 bytes at `address`, dropping the status byte.
    pub fn read_block(&mut self, address: u32) -> Result<[u8; BLOCK_SIZE], DumpError> {
        let request = read_memory_request(address, BLOCK_SIZE as u8);
        let response = self
            .transport
            .send(&request, self.retries)
            .map_err(|source| {
                warn!("read at {address:#08x} failed: {source}");
                DumpError::Transport { address, source }
            })?;
        if response.len() < BLOCK_RESPONSE_SIZE {
            warn!(
                "read at {address:#08x} returned {} bytes",
                response.len()
            );
            return Err(DumpError::ShortBlock {
                address,
                expected: BLOCK_RESPONSE_SIZE,
                found: response.len(),
            });
        }
        let mut block = [0; BLOCK_SIZE];
        block.copy_from_slice(&response[1..BLOCK_RESPONSE_SIZE]);
        Ok(block)
    }

    /// Read the header page, then every page it marks as used.
    ///
    /// Any failing block aborts the whole dump.
    pub fn read_image(
        &mut self,
        monitor: &mut dyn ProgressMonitor,
    ) -> Result<MemoryImage, DumpError> {
        let mut progress = Progress::default();
        let mut image = Vec::with_capacity(PAGE_SIZE);

        debug!("reading header");
        for block in 0..BLOCKS_PER_PAGE {
            let address = (block * BLOCK_SIZE) as u32;
            image.extend_from_slice(&self.read_block(address)?);
        }
        progress.report(monitor, HEADER_DONE);

        let pages = max_page(&image);
        debug!("last used page: {pages:#04x}");
        if pages == 0 {
            progress.report(monitor, 1.0);
            info!("no pages in use, image is {} bytes", image.len());
            return Ok(MemoryImage(image));
        }

        let total = usize::from(pages) * BLOCKS_PER_PAGE;
        image.reserve(total * BLOCK_SIZE);
        progress.report(monitor, PAGES_START);

        let mut done = 0;
        for page in 1..=usize::from(pages) {
            debug!("reading page {page}/{pages}");
            for block in 0..BLOCKS_PER_PAGE {
                let address = (page * PAGE_SIZE + block * BLOCK_SIZE) as u32;
                image.extend_from_slice(&self.read_block(address)?);
                done += 1;
                let fraction = PAGES_START + (1.0 - PAGES_START) * done as f32 / total as f32;
                progress.report(monitor, fraction);
            }
        }
        // Guard against rounding short of completion
        progress.report(monitor, 1.0);

        info!("read {} bytes in {} pages", image.len(), usize::from(pages) + 1);
        Ok(MemoryImage(image))
    }
}
