//! Byte order (endianness) handling
//!
//! Reads and writes multi-byte values in either TIFF byte order. The same
//! enum drives the parser, the on-demand offset tables and the output sink,
//! so every fixed-width field in a file goes through one of these methods.

use std::io::{self, Read, Result, Write};

use serde::{Deserialize, Serialize};

/// Represents the byte order (endianness) of binary data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ByteOrder {
    /// Little-endian byte order (least significant byte first), marker `II`
    #[default]
    LittleEndian,
    /// Big-endian byte order (most significant byte first), marker `MM`
    BigEndian,
}

macro_rules! endian_rw {
    ($ty:ty, $n:expr, $read:ident, $write:ident, $decode:ident) => {
        /// Reads one value in this byte order
        pub fn $read<R: Read + ?Sized>(&self, reader: &mut R) -> Result<$ty> {
            let mut buf = [0u8; $n];
            reader.read_exact(&mut buf)?;
            Ok(self.$decode(&buf))
        }

        /// Writes one value in this byte order
        pub fn $write<W: Write + ?Sized>(&self, writer: &mut W, value: $ty) -> Result<()> {
            let bytes = match self {
                ByteOrder::LittleEndian => value.to_le_bytes(),
                ByteOrder::BigEndian => value.to_be_bytes(),
            };
            writer.write_all(&bytes)
        }

        /// Decodes one value from the start of `bytes`
        ///
        /// Panics if `bytes` is shorter than the value width; callers slice
        /// from buffers they sized themselves.
        pub fn $decode(&self, bytes: &[u8]) -> $ty {
            let mut buf = [0u8; $n];
            buf.copy_from_slice(&bytes[..$n]);
            match self {
                ByteOrder::LittleEndian => <$ty>::from_le_bytes(buf),
                ByteOrder::BigEndian => <$ty>::from_be_bytes(buf),
            }
        }
    };
}

impl ByteOrder {
    /// Detects byte order from TIFF magic bytes
    ///
    /// TIFF files start with either "II" (0x4949) for little-endian
    /// or "MM" (0x4D4D) for big-endian.
    pub fn from_tiff_magic(magic: [u8; 2]) -> Option<Self> {
        match &magic {
            b"II" => Some(ByteOrder::LittleEndian),
            b"MM" => Some(ByteOrder::BigEndian),
            _ => None,
        }
    }

    /// Returns the two marker bytes written at the start of a file
    pub fn marker(&self) -> [u8; 2] {
        match self {
            ByteOrder::LittleEndian => *b"II",
            ByteOrder::BigEndian => *b"MM",
        }
    }

    /// Reads and detects byte order from a reader
    pub fn detect<R: Read + ?Sized>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 2];
        reader.read_exact(&mut magic)?;

        Self::from_tiff_magic(magic).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid byte order magic bytes: {:02X}{:02X}", magic[0], magic[1]),
            )
        })
    }

    /// Returns whether this is little-endian
    pub fn is_little(&self) -> bool {
        matches!(self, ByteOrder::LittleEndian)
    }

    endian_rw!(u16, 2, read_u16, write_u16, u16_from);
    endian_rw!(u32, 4, read_u32, write_u32, u32_from);
    endian_rw!(u64, 8, read_u64, write_u64, u64_from);
    endian_rw!(i16, 2, read_i16, write_i16, i16_from);
    endian_rw!(i32, 4, read_i32, write_i32, i32_from);
    endian_rw!(i64, 8, read_i64, write_i64, i64_from);
    endian_rw!(f32, 4, read_f32, write_f32, f32_from);
    endian_rw!(f64, 8, read_f64, write_f64, f64_from);
}
