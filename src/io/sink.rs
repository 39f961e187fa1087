//! Endian-aware output wrapper
//!
//! [`DataSink`] wraps any seekable writer and writes fixed-width values in a
//! chosen byte order. It backs both the output file and the in-memory side
//! buffers the directory serializer fills with out-of-line payloads.

use std::io::{Cursor, Result, Seek, SeekFrom, Write};

use super::ByteOrder;

/// A writer that knows its byte order and can report its length
pub struct DataSink<W> {
    inner: W,
    order: ByteOrder,
}

impl DataSink<Cursor<Vec<u8>>> {
    /// Creates an empty in-memory sink
    pub fn memory(order: ByteOrder) -> Self {
        Self::new(Cursor::new(Vec::new()), order)
    }

    /// Returns the bytes written to an in-memory sink
    pub fn bytes(&self) -> &[u8] {
        self.inner.get_ref()
    }
}

impl<W> DataSink<W> {
    /// Creates a new sink over `inner`
    pub fn new(inner: W, order: ByteOrder) -> Self {
        Self { inner, order }
    }

    /// Changes the byte order used for subsequent writes
    pub fn set_order(&mut self, order: ByteOrder) {
        self.order = order;
    }

    /// Returns the byte order used for writes
    pub fn order(&self) -> ByteOrder {
        self.order
    }

    /// Returns a mutable reference to the underlying writer
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Consumes the sink and returns the underlying writer
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write + Seek> DataSink<W> {
    /// Current absolute position
    pub fn position(&mut self) -> Result<u64> {
        self.inner.stream_position()
    }

    /// Seeks to an absolute position
    pub fn seek_to(&mut self, pos: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    /// Seeks to the end and returns the new position
    pub fn seek_end(&mut self) -> Result<u64> {
        self.inner.seek(SeekFrom::End(0))
    }

    /// Total length of the underlying stream; the position is preserved
    pub fn length(&mut self) -> Result<u64> {
        let pos = self.inner.stream_position()?;
        let len = self.inner.seek(SeekFrom::End(0))?;
        self.inner.seek(SeekFrom::Start(pos))?;
        Ok(len)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.order.write_u16(&mut self.inner, value)
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.order.write_u32(&mut self.inner, value)
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.order.write_u64(&mut self.inner, value)
    }

    /// Writes an offset or count field: 8 bytes in BigTIFF, 4 bytes otherwise
    ///
    /// Callers validate classic-mode values against `u32::MAX` before writing.
    pub fn write_offset(&mut self, value: u64, big_tiff: bool) -> Result<()> {
        if big_tiff {
            self.write_u64(value)
        } else {
            self.write_u32(value as u32)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_writes_in_order() {
        let mut sink = DataSink::memory(ByteOrder::BigEndian);
        sink.write_u16(0x0102).unwrap();
        sink.write_u32(0x03040506).unwrap();
        assert_eq!(sink.bytes(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_write_offset_width() {
        let mut sink = DataSink::memory(ByteOrder::LittleEndian);
        sink.write_offset(8, false).unwrap();
        assert_eq!(sink.length().unwrap(), 4);
        sink.write_offset(16, true).unwrap();
        assert_eq!(sink.length().unwrap(), 12);
        assert_eq!(&sink.bytes()[4..], &16u64.to_le_bytes());
    }

    #[test]
    fn test_length_preserves_position() {
        let mut sink = DataSink::memory(ByteOrder::LittleEndian);
        sink.write_bytes(&[0u8; 10]).unwrap();
        sink.seek_to(3).unwrap();
        assert_eq!(sink.length().unwrap(), 10);
        assert_eq!(sink.position().unwrap(), 3);
    }

    #[test]
    fn test_overwrite_in_middle() {
        let mut sink = DataSink::memory(ByteOrder::LittleEndian);
        sink.write_bytes(&[0u8; 6]).unwrap();
        sink.seek_to(2).unwrap();
        sink.write_u16(0xABCD).unwrap();
        assert_eq!(sink.bytes(), &[0, 0, 0xCD, 0xAB, 0, 0]);
    }
}
