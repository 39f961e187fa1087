//! Raw directory entries

use std::fmt;

use super::tags::{self, FieldType};

/// One directory entry as it sits on disk
///
/// `value_offset` is the file offset of the payload. For payloads small
/// enough to sit inside the entry it is the absolute position of the entry's
/// value field, so both cases read the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IFDEntry {
    /// TIFF tag identifier
    pub tag: u16,
    /// Field type code
    pub field_type: u16,
    /// Number of values
    pub count: u64,
    /// Offset of the value
    pub value_offset: u64,
}

impl IFDEntry {
    /// Creates a new IFD entry
    pub fn new(tag: u16, field_type: u16, count: u64, value_offset: u64) -> Self {
        Self {
            tag,
            field_type,
            count,
            value_offset,
        }
    }

    /// Decoded field type, if the code is known
    pub fn field_type(&self) -> Option<FieldType> {
        FieldType::from_code(self.field_type)
    }

    /// Returns the size in bytes of one element of this entry's type
    ///
    /// Unknown type codes count as one byte each.
    pub fn field_type_size(&self) -> usize {
        self.field_type().map_or(1, |t| t.bytes_per_element())
    }

    /// Total payload length in bytes, or `None` when the count is too large
    /// for any file
    pub fn checked_payload_len(&self) -> Option<u64> {
        self.count.checked_mul(self.field_type_size() as u64)
    }

    /// Total payload length in bytes
    ///
    /// Saturates at `u64::MAX`; the parser rejects entries whose length
    /// overflows.
    pub fn payload_len(&self) -> u64 {
        self.checked_payload_len().unwrap_or(u64::MAX)
    }

    /// Returns whether the value is stored inline (in the value field)
    pub fn is_inline(&self, is_big_tiff: bool) -> bool {
        let inline_size = if is_big_tiff { 8 } else { 4 };
        self.payload_len() <= inline_size
    }
}

impl fmt::Display for IFDEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tag={} ({}); type={}; count={}; offset={}",
            self.tag,
            tags::tag_name(self.tag),
            tags::field_type_name(self.field_type),
            self.count,
            self.value_offset
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ifd_entry_creation() {
        let entry = IFDEntry::new(256, 4, 1, 1024);
        assert_eq!(entry.tag, 256);
        assert_eq!(entry.field_type(), Some(FieldType::Long));
        assert_eq!(entry.count, 1);
        assert_eq!(entry.value_offset, 1024);
    }

    #[test]
    fn test_payload_len() {
        assert_eq!(IFDEntry::new(270, 2, 12, 0).payload_len(), 12);
        assert_eq!(IFDEntry::new(282, 5, 1, 0).payload_len(), 8);
        assert_eq!(IFDEntry::new(273, 16, 3, 0).payload_len(), 24);
        assert_eq!(IFDEntry::new(1, 99, 3, 0).payload_len(), 3);
    }

    #[test]
    fn test_is_inline() {
        let entry = IFDEntry::new(256, 3, 1, 0);
        assert!(entry.is_inline(false));

        let entry = IFDEntry::new(256, 4, 2, 0);
        assert!(!entry.is_inline(false));
        assert!(entry.is_inline(true));

        let entry = IFDEntry::new(282, 5, 1, 0);
        assert!(!entry.is_inline(false));
        assert!(entry.is_inline(true));
    }

    #[test]
    fn test_display() {
        let entry = IFDEntry::new(270, 2, 6, 300);
        assert_eq!(
            entry.to_string(),
            "tag=270 (ImageDescription); type=ASCII; count=6; offset=300"
        );
    }
}
