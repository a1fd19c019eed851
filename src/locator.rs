//! The activity index table in the header page of the memory image.

/// Size of the header page. Anything shorter is not a usable image.
pub const HEADER_SIZE: usize = 0x1000;
/// Start of the index table inside the header page.
pub const INDEX_TABLE_OFFSET: usize = 0x100;
/// Terminates the index table.
pub const TABLE_END: u8 = 0xFF;
/// The table is never read past the 16-bit address space.
pub const ADDRESS_LIMIT: usize = 0xFFFF;
/// Index entries are page numbers.
pub const PAGE_SHIFT: u32 = 12;

/// The index table, from its start up to the end of the readable range.
/// `None` if there is no image or the table is empty.
pub(crate) fn index_table(image: &[u8]) -> Option<&[u8]> {
    if image.len() < HEADER_SIZE || image[INDEX_TABLE_OFFSET] == TABLE_END {
        return None;
    }
    let end = image.len().min(ADDRESS_LIMIT + 1);
    Some(&image[INDEX_TABLE_OFFSET..end])
}

/// Start offsets of all recorded activities, in table order.
pub fn locate(image: &[u8]) -> Vec<usize> {
    let Some(table) = index_table(image) else {
        return Vec::new();
    };
    table
        .iter()
        .take_while(|&&v| v != TABLE_END)
        .map(|&v| usize::from(v) << PAGE_SHIFT)
        .collect()
}
