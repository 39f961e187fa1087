//! TIFF data structures

use std::fmt;

use super::ifd::IFD;
use super::{BIGTIFF_MAGIC, TIFF_MAGIC};
use crate::io::ByteOrder;

/// The fixed header at the start of a TIFF or BigTIFF file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffHeader {
    pub byte_order: ByteOrder,
    /// Whether this is BigTIFF format
    pub big_tiff: bool,
    /// Offset of the first directory
    pub first_ifd_offset: u64,
}

impl TiffHeader {
    pub fn new(byte_order: ByteOrder, big_tiff: bool, first_ifd_offset: u64) -> Self {
        Self {
            byte_order,
            big_tiff,
            first_ifd_offset,
        }
    }

    pub fn magic(&self) -> u16 {
        if self.big_tiff {
            BIGTIFF_MAGIC
        } else {
            TIFF_MAGIC
        }
    }

    /// Header length in bytes: 8 classic, 16 BigTIFF
    pub fn len(&self) -> u64 {
        if self.big_tiff {
            16
        } else {
            8
        }
    }

    /// Size of one directory entry
    pub fn entry_size(&self) -> u64 {
        if self.big_tiff {
            20
        } else {
            12
        }
    }

    /// Width of offset, count and next-directory fields
    pub fn offset_size(&self) -> u64 {
        if self.big_tiff {
            8
        } else {
            4
        }
    }

    /// Width of a directory's leading entry count
    pub fn count_size(&self) -> u64 {
        if self.big_tiff {
            8
        } else {
            2
        }
    }
}

/// Represents a parsed TIFF or BigTIFF file
#[derive(Debug)]
pub struct Tiff {
    pub header: TiffHeader,
    /// Image File Directories
    pub ifds: Vec<IFD>,
}

impl Tiff {
    pub fn new(header: TiffHeader) -> Self {
        Self {
            header,
            ifds: Vec::new(),
        }
    }

    pub fn add_ifd(&mut self, ifd: IFD) {
        self.ifds.push(ifd);
    }

    /// Returns the main (first) IFD
    pub fn main_ifd(&self) -> Option<&IFD> {
        self.ifds.first()
    }

    pub fn ifd_count(&self) -> usize {
        self.ifds.len()
    }

    pub fn is_big_tiff(&self) -> bool {
        self.header.big_tiff
    }
}

impl fmt::Display for Tiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TIFF File Information:")?;
        writeln!(f, "  Format: {}", if self.header.big_tiff { "BigTIFF" } else { "TIFF" })?;
        writeln!(
            f,
            "  Byte order: {}",
            if self.header.byte_order.is_little() {
                "little-endian"
            } else {
                "big-endian"
            }
        )?;
        writeln!(f, "  Number of IFDs: {}", self.ifds.len())?;

        for (index, ifd) in self.ifds.iter().enumerate() {
            match ifd.offset() {
                Some(offset) => writeln!(f, "\nIFD {} (offset {}):", index, offset)?,
                None => writeln!(f, "\nIFD {}:", index)?,
            }
            if let Ok(dims) = ifd.dimensions() {
                writeln!(f, "  Dimensions: {} x {}", dims.width, dims.height)?;
            }
            writeln!(f, "  Tiled: {}", if ifd.is_tiled() { "Yes" } else { "No" })?;
            for (tag, value) in ifd.iter() {
                writeln!(f, "  {} ({}): {}", super::tags::tag_name(tag), tag, value)?;
            }
        }

        Ok(())
    }
}
