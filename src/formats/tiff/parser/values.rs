//! Directory and tag value decoding over a borrowed stream

use std::collections::HashSet;
use std::io::{Read, Seek, SeekFrom};

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::formats::tiff::rational::Rational;
use crate::formats::tiff::tags::FieldType;
use crate::formats::tiff::types::TiffHeader;
use crate::formats::tiff::value::TagValue;
use crate::formats::tiff::{IFDEntry, BIGTIFF_MAGIC, IFD, TIFF_MAGIC};
use crate::io::ByteOrder;

/// Reads and validates the file header at offset 0
pub fn read_header<R: Read + Seek + ?Sized>(reader: &mut R) -> Result<TiffHeader> {
    reader.seek(SeekFrom::Start(0))?;
    let mut marker = [0u8; 2];
    reader.read_exact(&mut marker)?;
    let byte_order = ByteOrder::from_tiff_magic(marker)
        .ok_or_else(|| Error::InvalidByteOrder(u16::from_be_bytes(marker)))?;

    let magic = byte_order.read_u16(reader)?;
    match magic {
        TIFF_MAGIC => {
            let first = byte_order.read_u32(reader)? as u64;
            Ok(TiffHeader::new(byte_order, false, first))
        }
        BIGTIFF_MAGIC => {
            let offset_size = byte_order.read_u16(reader)?;
            if offset_size != 8 {
                return Err(Error::InvalidFormat(format!(
                    "Invalid BigTIFF offset size: {}",
                    offset_size
                )));
            }
            let _reserved = byte_order.read_u16(reader)?;
            let first = byte_order.read_u64(reader)?;
            Ok(TiffHeader::new(byte_order, true, first))
        }
        _ => Err(Error::InvalidMagic(magic)),
    }
}

/// Decodes directories and tag payloads from a stream it borrows
///
/// Every value is read eagerly; lazily read offset tables need a shared
/// stream and are produced by [`super::TiffParser`] instead.
pub struct DirectoryReader<'a, R: Read + Seek + ?Sized> {
    reader: &'a mut R,
    header: TiffHeader,
}

impl<'a, R: Read + Seek + ?Sized> DirectoryReader<'a, R> {
    pub fn new(reader: &'a mut R, header: TiffHeader) -> Self {
        Self { reader, header }
    }

    /// Reads the header and wraps the stream
    pub fn open(reader: &'a mut R) -> Result<Self> {
        let header = read_header(reader)?;
        Ok(Self::new(reader, header))
    }

    pub fn header(&self) -> TiffHeader {
        self.header
    }

    fn order(&self) -> ByteOrder {
        self.header.byte_order
    }

    fn stream_len(&mut self) -> Result<u64> {
        let pos = self.reader.stream_position()?;
        let len = self.reader.seek(SeekFrom::End(0))?;
        self.reader.seek(SeekFrom::Start(pos))?;
        Ok(len)
    }

    fn read_offset(&mut self) -> Result<u64> {
        let order = self.order();
        if self.header.big_tiff {
            Ok(order.read_u64(self.reader)?)
        } else {
            Ok(order.read_u32(self.reader)? as u64)
        }
    }

    /// Number of entries in the directory at `offset`
    pub fn entry_count(&mut self, offset: u64) -> Result<u64> {
        let order = self.order();
        self.reader.seek(SeekFrom::Start(offset))?;
        if self.header.big_tiff {
            Ok(order.read_u64(self.reader)?)
        } else {
            Ok(order.read_u16(self.reader)? as u64)
        }
    }

    /// File position of the next-directory pointer of the directory at
    /// `offset`
    pub fn next_pointer_position(&mut self, offset: u64) -> Result<u64> {
        let count = self.entry_count(offset)?;
        self.entries_end(offset, count)
    }

    /// End of the entry table of a directory at `offset` with `count`
    /// entries
    fn entries_end(&self, offset: u64, count: u64) -> Result<u64> {
        count
            .checked_mul(self.header.entry_size())
            .and_then(|n| n.checked_add(self.header.count_size()))
            .and_then(|n| n.checked_add(offset))
            .ok_or_else(|| {
                Error::InvalidFormat(format!(
                    "IFD at {} declares an impossible entry count {}",
                    offset, count
                ))
            })
    }

    /// Value of the next-directory pointer of the directory at `offset`
    pub fn next_ifd_offset(&mut self, offset: u64) -> Result<u64> {
        let pos = self.next_pointer_position(offset)?;
        self.reader.seek(SeekFrom::Start(pos))?;
        self.read_offset()
    }

    /// Offsets of every directory, following the next-directory chain
    ///
    /// The chain ends at a zero pointer, or at a pointer to the very end of
    /// the file as left by a writer that has not finished its last plane.
    /// Pointers further out and pointers back to an earlier directory are
    /// errors.
    pub fn ifd_offsets(&mut self) -> Result<Vec<u64>> {
        let len = self.stream_len()?;
        let mut offsets = Vec::new();
        let mut seen = HashSet::new();
        let mut offset = self.header.first_ifd_offset;

        while offset != 0 {
            if offset == len {
                debug!("IFD chain left open at end of file ({})", offset);
                break;
            }
            if offset.saturating_add(self.header.count_size()) > len {
                return Err(Error::InvalidOffset(offset));
            }
            if !seen.insert(offset) {
                return Err(Error::InvalidFormat(format!(
                    "IFD chain loops back to offset {}",
                    offset
                )));
            }
            offsets.push(offset);
            offset = self.next_ifd_offset(offset)?;
        }

        debug!("Found {} IFD offsets", offsets.len());
        Ok(offsets)
    }

    /// Raw entries of the directory at `offset`, in file order
    ///
    /// Inline payloads get the absolute position of the entry's value field
    /// as their `value_offset`.
    pub fn entries(&mut self, offset: u64) -> Result<Vec<IFDEntry>> {
        let order = self.order();
        let count = self.entry_count(offset)?;
        let len = self.stream_len()?;
        if self.entries_end(offset, count)? > len {
            return Err(Error::InvalidFormat(format!(
                "IFD at {} declares {} entries past the end of the file",
                offset, count
            )));
        }

        let mut entries = Vec::with_capacity(count as usize);
        for i in 0..count {
            let entry_pos = offset + self.header.count_size() + i * self.header.entry_size();
            self.reader.seek(SeekFrom::Start(entry_pos))?;
            let tag = order.read_u16(self.reader)?;
            let field_type = order.read_u16(self.reader)?;
            let count = self.read_offset()?;
            let value_field = entry_pos + 4 + self.header.offset_size();

            let mut entry = IFDEntry::new(tag, field_type, count, value_field);
            if entry.checked_payload_len().is_none() {
                return Err(Error::InvalidFormat(format!(
                    "Entry {} of IFD at {} declares an impossible count {}",
                    i, offset, count
                )));
            }
            if !entry.is_inline(self.header.big_tiff) {
                entry.value_offset = self.read_offset()?;
            }
            trace!("{}", entry);
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Fails unless the entry's payload lies within the file
    pub fn check_payload(&mut self, entry: &IFDEntry) -> Result<()> {
        let len = entry.payload_len();
        let file_len = self.stream_len()?;
        if entry.value_offset.checked_add(len).map_or(true, |end| end > file_len) {
            return Err(Error::InvalidOffset(entry.value_offset));
        }
        Ok(())
    }

    fn payload(&mut self, entry: &IFDEntry) -> Result<Vec<u8>> {
        self.check_payload(entry)?;
        let len = entry.payload_len();
        let mut bytes = vec![0u8; len as usize];
        self.reader.seek(SeekFrom::Start(entry.value_offset))?;
        self.reader.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    /// Decodes one entry's payload
    ///
    /// Single numeric values become scalars; everything else becomes an
    /// array. Unknown field types are kept as [`TagValue::Unresolved`].
    pub fn read_value(&mut self, entry: &IFDEntry) -> Result<TagValue> {
        let Some(field_type) = entry.field_type() else {
            debug!("Unknown field type {} for tag {}", entry.field_type, entry.tag);
            return Ok(TagValue::Unresolved(entry.clone()));
        };

        let order = self.order();
        let bytes = self.payload(entry)?;
        let width = field_type.bytes_per_element();
        let items = bytes.chunks_exact(width);
        let single = entry.count == 1;

        Ok(match field_type {
            FieldType::Byte if single => TagValue::Byte(bytes[0]),
            FieldType::Byte => TagValue::Bytes(bytes),
            FieldType::Ascii => {
                let text = String::from_utf8_lossy(&bytes);
                TagValue::Text(text.trim_end_matches('\0').to_string())
            }
            FieldType::Short if single => TagValue::Short(order.u16_from(&bytes)),
            FieldType::Short => TagValue::Shorts(items.map(|c| order.u16_from(c)).collect()),
            FieldType::Long | FieldType::Ifd if single => {
                TagValue::Long(order.u32_from(&bytes) as u64)
            }
            FieldType::Long | FieldType::Ifd => {
                TagValue::Longs(items.map(|c| order.u32_from(c) as u64).collect())
            }
            FieldType::Long8 | FieldType::Ifd8 if single => TagValue::Long(order.u64_from(&bytes)),
            FieldType::Long8 | FieldType::Ifd8 => {
                TagValue::Longs(items.map(|c| order.u64_from(c)).collect())
            }
            FieldType::Rational => {
                let mut values: Vec<Rational> = items
                    .map(|c| {
                        Rational::new(order.u32_from(c) as i64, order.u32_from(&c[4..]) as i64)
                    })
                    .collect();
                if single {
                    TagValue::Rational(values.remove(0))
                } else {
                    TagValue::Rationals(values)
                }
            }
            FieldType::SByte => TagValue::SBytes(bytes.into_iter().map(|b| b as i8).collect()),
            FieldType::Undefined => TagValue::Undefined(bytes),
            FieldType::SShort => TagValue::SShorts(items.map(|c| order.i16_from(c)).collect()),
            FieldType::SLong => TagValue::SLongs(items.map(|c| order.i32_from(c)).collect()),
            FieldType::SLong8 => TagValue::SLong8s(items.map(|c| order.i64_from(c)).collect()),
            FieldType::SRational => TagValue::SRationals(
                items
                    .map(|c| {
                        Rational::new(order.i32_from(c) as i64, order.i32_from(&c[4..]) as i64)
                    })
                    .collect(),
            ),
            FieldType::Float if single => TagValue::Float(order.f32_from(&bytes)),
            FieldType::Float => TagValue::Floats(items.map(|c| order.f32_from(c)).collect()),
            FieldType::Double if single => TagValue::Double(order.f64_from(&bytes)),
            FieldType::Double => TagValue::Doubles(items.map(|c| order.f64_from(c)).collect()),
        })
    }

    /// Reads the directory at `offset` with every value decoded
    pub fn ifd(&mut self, offset: u64) -> Result<IFD> {
        let entries = self.entries(offset)?;
        let mut ifd = self.empty_ifd(offset);
        for entry in &entries {
            let value = self.read_value(entry)?;
            ifd.put_value(entry.tag, value);
        }
        Ok(ifd)
    }

    /// A directory stamped with this file's byte order, width mode and
    /// `offset`, holding no tags
    pub fn empty_ifd(&self, offset: u64) -> IFD {
        let mut ifd = IFD::new();
        ifd.set_byte_order(self.header.byte_order);
        ifd.set_big_tiff(self.header.big_tiff);
        ifd.set_offset(offset);
        ifd
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::tiff::tags;
    use std::io::Cursor;

    /// Classic little-endian file with one directory:
    /// ImageWidth SHORT 7, XResolution RATIONAL 3/2 at 100,
    /// ImageDescription ASCII "Hi" inline, BitsPerSample SHORT [8, 16] inline.
    fn classic_file() -> Vec<u8> {
        let mut data = vec![0u8; 120];
        data[..8].copy_from_slice(&[b'I', b'I', 42, 0, 8, 0, 0, 0]);
        let mut pos = 8;
        let mut put = |bytes: &[u8]| {
            data[pos..pos + bytes.len()].copy_from_slice(bytes);
            pos += bytes.len();
        };
        put(&4u16.to_le_bytes());
        put(&[0, 1, 3, 0, 1, 0, 0, 0, 7, 0, 0, 0]);
        put(&[2, 1, 3, 0, 2, 0, 0, 0, 8, 0, 16, 0]);
        put(&[14, 1, 2, 0, 3, 0, 0, 0, b'H', b'i', 0, 0]);
        put(&[26, 1, 5, 0, 1, 0, 0, 0, 100, 0, 0, 0]);
        put(&0u32.to_le_bytes());
        data[100..108].copy_from_slice(&[3, 0, 0, 0, 2, 0, 0, 0]);
        data
    }

    #[test]
    fn test_read_header_classic() {
        let mut cursor = Cursor::new(classic_file());
        let header = read_header(&mut cursor).unwrap();
        assert_eq!(header, TiffHeader::new(ByteOrder::LittleEndian, false, 8));
    }

    #[test]
    fn test_read_header_big_tiff() {
        let mut data = b"MM".to_vec();
        data.extend_from_slice(&43u16.to_be_bytes());
        data.extend_from_slice(&8u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&16u64.to_be_bytes());
        let header = read_header(&mut Cursor::new(data)).unwrap();
        assert!(header.big_tiff);
        assert_eq!(header.byte_order, ByteOrder::BigEndian);
        assert_eq!(header.first_ifd_offset, 16);
    }

    #[test]
    fn test_read_header_rejects_garbage() {
        let err = read_header(&mut Cursor::new(b"XX*\0\x08\0\0\0".to_vec())).unwrap_err();
        assert!(matches!(err, Error::InvalidByteOrder(_)));

        let err = read_header(&mut Cursor::new(b"II\x07\0\x08\0\0\0".to_vec())).unwrap_err();
        assert!(matches!(err, Error::InvalidMagic(7)));
    }

    #[test]
    fn test_entries_and_values() {
        let mut cursor = Cursor::new(classic_file());
        let mut reader = DirectoryReader::open(&mut cursor).unwrap();
        assert_eq!(reader.ifd_offsets().unwrap(), vec![8]);

        let entries = reader.entries(8).unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].value_offset, 8 + 2 + 8);
        assert_eq!(entries[3].value_offset, 100);

        let ifd = reader.ifd(8).unwrap();
        assert_eq!(ifd.get_value(tags::IMAGE_WIDTH), Some(&TagValue::Short(7)));
        assert_eq!(ifd.get_value(tags::BITS_PER_SAMPLE), Some(&TagValue::Shorts(vec![8, 16])));
        assert_eq!(ifd.comment(), Some("Hi".to_string()));
        assert_eq!(ifd.get_rational(tags::X_RESOLUTION).unwrap(), Some(Rational::new(3, 2)));
        assert_eq!(ifd.offset(), Some(8));
        assert_eq!(ifd.big_tiff(), Some(false));
    }

    #[test]
    fn test_unknown_type_is_unresolved() {
        let mut data = classic_file();
        data[10 + 2] = 99;
        let mut cursor = Cursor::new(data);
        let mut reader = DirectoryReader::open(&mut cursor).unwrap();
        let ifd = reader.ifd(8).unwrap();
        assert!(matches!(ifd.get_value(tags::IMAGE_WIDTH), Some(TagValue::Unresolved(_))));
    }

    #[test]
    fn test_offset_past_end_rejected() {
        let mut data = classic_file();
        data[4..8].copy_from_slice(&5000u32.to_le_bytes());
        let mut cursor = Cursor::new(data);
        let mut reader = DirectoryReader::open(&mut cursor).unwrap();
        assert!(matches!(reader.ifd_offsets(), Err(Error::InvalidOffset(5000))));
    }

    #[test]
    fn test_pointer_to_eof_ends_chain() {
        let mut data = classic_file();
        let next = 8 + 2 + 4 * 12;
        data[next..next + 4].copy_from_slice(&120u32.to_le_bytes());
        let mut cursor = Cursor::new(data);
        let mut reader = DirectoryReader::open(&mut cursor).unwrap();
        assert_eq!(reader.ifd_offsets().unwrap(), vec![8]);
    }

    /// BigTIFF file with one directory at 16 holding a single
    /// ImageDescription SHORT entry of `count` values
    fn big_tiff_file(ifd_entries: u64, count: u64) -> Vec<u8> {
        let mut data = vec![b'I', b'I', 43, 0, 8, 0, 0, 0];
        data.extend_from_slice(&16u64.to_le_bytes());
        data.extend_from_slice(&ifd_entries.to_le_bytes());
        data.extend_from_slice(&tags::IMAGE_DESCRIPTION.to_le_bytes());
        data.extend_from_slice(&3u16.to_le_bytes());
        data.extend_from_slice(&count.to_le_bytes());
        data.extend_from_slice(&100u64.to_le_bytes());
        data.extend_from_slice(&0u64.to_le_bytes());
        data.resize(120, 0);
        data
    }

    #[test]
    fn test_overflowing_value_count_rejected() {
        let mut cursor = Cursor::new(big_tiff_file(1, u64::MAX));
        let mut reader = DirectoryReader::open(&mut cursor).unwrap();
        assert!(matches!(reader.entries(16), Err(Error::InvalidFormat(_))));
        assert!(matches!(reader.ifd(16), Err(Error::InvalidFormat(_))));

        let mut cursor = Cursor::new(big_tiff_file(1, 2));
        let mut reader = DirectoryReader::open(&mut cursor).unwrap();
        assert_eq!(reader.entries(16).unwrap()[0].payload_len(), 4);
    }

    #[test]
    fn test_overflowing_entry_count_rejected() {
        let mut cursor = Cursor::new(big_tiff_file(u64::MAX, 1));
        let mut reader = DirectoryReader::open(&mut cursor).unwrap();
        assert!(matches!(reader.entries(16), Err(Error::InvalidFormat(_))));
        assert!(matches!(reader.next_pointer_position(16), Err(Error::InvalidFormat(_))));
        assert!(matches!(reader.ifd_offsets(), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn test_cycle_rejected() {
        let mut data = classic_file();
        let next = 8 + 2 + 4 * 12;
        data[next..next + 4].copy_from_slice(&8u32.to_le_bytes());
        let mut cursor = Cursor::new(data);
        let mut reader = DirectoryReader::open(&mut cursor).unwrap();
        assert!(matches!(reader.ifd_offsets(), Err(Error::InvalidFormat(_))));
    }
}
