//! Declarative byte layouts for the fixed-size records in the memory image.
//!
//! A [`Layout`] names a record and its size; a [`Field`] names a byte range
//! inside it and how to read it. Records are bounds checked once when they
//! are cut out of the image, fields again when they are read.

use crate::error::LayoutError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub offset: usize,
    pub width: usize,
    pub endian: Endian,
}

impl Field {
    /// Little-endian integer field.
    pub const fn le(name: &'static str, offset: usize, width: usize) -> Field {
        Field {
            name,
            offset,
            width,
            endian: Endian::Little,
        }
    }

    /// Raw byte group such as a packed timestamp.
    pub const fn bytes(name: &'static str, offset: usize, width: usize) -> Field {
        Field::le(name, offset, width)
    }

    pub const fn end(&self) -> usize {
        self.offset + self.width
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub name: &'static str,
    pub size: usize,
}

impl Layout {
    pub const fn new(name: &'static str, size: usize) -> Layout {
        Layout { name, size }
    }

    /// Cut the record starting at `offset` out of `image`.
    pub fn record<'a>(&self, image: &'a [u8], offset: usize) -> Result<Record<'a>, LayoutError> {
        let bytes = offset
            .checked_add(self.size)
            .and_then(|end| image.get(offset..end))
            .ok_or(LayoutError::OutOfBounds {
                record: self.name,
                offset,
                size: self.size,
                available: image.len(),
            })?;
        Ok(Record { bytes })
    }
}

/// A bounds-checked record.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    bytes: &'a [u8],
}

impl<'a> Record<'a> {
    pub fn slice(&self, field: Field) -> Result<&'a [u8], LayoutError> {
        self.bytes
            .get(field.offset..field.end())
            .ok_or(LayoutError::FieldOutOfRecord {
                field: field.name,
                record_size: self.bytes.len(),
            })
    }

    pub fn array<const N: usize>(&self, field: Field) -> Result<[u8; N], LayoutError> {
        let s = self.checked(field, N)?;
        let mut out = [0; N];
        out.copy_from_slice(s);
        Ok(out)
    }

    fn checked(&self, field: Field, requested: usize) -> Result<&'a [u8], LayoutError> {
        if field.width != requested {
            return Err(LayoutError::Width {
                field: field.name,
                width: field.width,
                requested,
            });
        }
        self.slice(field)
    }

    fn uint(&self, field: Field, requested: usize) -> Result<u64, LayoutError> {
        let s = self.checked(field, requested)?;
        let fold = |acc: u64, b: &u8| (acc << 8) | u64::from(*b);
        Ok(match field.endian {
            Endian::Big => s.iter().fold(0, fold),
            Endian::Little => s.iter().rev().fold(0, fold),
        })
    }

    pub fn u8(&self, field: Field) -> Result<u8, LayoutError> {
        Ok(self.uint(field, 1)? as u8)
    }

    pub fn u16(&self, field: Field) -> Result<u16, LayoutError> {
        Ok(self.uint(field, 2)? as u16)
    }

    pub fn u32(&self, field: Field) -> Result<u32, LayoutError> {
        Ok(self.uint(field, 4)? as u32)
    }

    pub fn i16(&self, field: Field) -> Result<i16, LayoutError> {
        Ok(self.u16(field)? as i16)
    }

    pub fn i32(&self, field: Field) -> Result<i32, LayoutError> {
        Ok(self.u32(field)? as i32)
    }
}
