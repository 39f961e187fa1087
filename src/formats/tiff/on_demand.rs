//! Lazily read offset tables

use std::fmt;
use std::io::Read;
use std::sync::{Arc, MutexGuard};

use crate::error::{Error, Result};
use crate::io::{with_position, ByteOrder, SeekableReader, SharedReader};

/// A run of 8-byte integers at a fixed file offset, read on access
///
/// Used for BigTIFF strip and tile tables that are too large to load when a
/// directory is parsed. Every read locks the shared stream and goes through
/// [`with_position`], so the stream's position is the same before and after.
#[derive(Clone)]
pub struct OnDemandOffsetArray {
    stream: SharedReader,
    base: u64,
    size: usize,
    order: ByteOrder,
}

impl OnDemandOffsetArray {
    /// Creates a view of `size` values starting at `base`
    pub fn new(stream: SharedReader, base: u64, size: usize, order: ByteOrder) -> Self {
        Self {
            stream,
            base,
            size,
            order,
        }
    }

    /// Number of values in the table
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// File offset of the first value
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Reads the value at `index`
    pub fn get(&self, index: usize) -> Result<u64> {
        if index >= self.size {
            return Err(Error::OutOfBounds(format!(
                "Offset index {} out of range ({} values)",
                index, self.size
            )));
        }
        let mut stream = self.lock()?;
        let order = self.order;
        let pos = self.base + index as u64 * 8;
        Ok(with_position(&mut *stream, pos, |s| order.read_u64(s))?)
    }

    /// Reads the whole table in one pass
    pub fn to_array(&self) -> Result<Vec<u64>> {
        let mut stream = self.lock()?;
        let len = self.size * 8;
        let raw = with_position(&mut *stream, self.base, |s| {
            let mut buf = vec![0u8; len];
            s.read_exact(&mut buf)?;
            Ok(buf)
        })?;
        Ok(raw.chunks_exact(8).map(|c| self.order.u64_from(c)).collect())
    }

    fn lock(&self) -> Result<MutexGuard<'_, dyn SeekableReader + 'static>> {
        self.stream
            .lock()
            .map_err(|_| Error::InvalidFormat("Offset table stream lock poisoned".to_string()))
    }
}

impl PartialEq for OnDemandOffsetArray {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.stream, &other.stream)
            && self.base == other.base
            && self.size == other.size
            && self.order == other.order
    }
}

impl fmt::Debug for OnDemandOffsetArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnDemandOffsetArray")
            .field("base", &self.base)
            .field("size", &self.size)
            .field("order", &self.order)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::shared;
    use std::io::{Cursor, Seek, SeekFrom};

    fn table(order: ByteOrder, values: &[u64], pad: usize) -> Vec<u8> {
        let mut data = vec![0xEEu8; pad];
        for &v in values {
            order.write_u64(&mut data, v).unwrap();
        }
        data
    }

    #[test]
    fn test_get_reads_single_values() {
        let data = table(ByteOrder::BigEndian, &[10, 20, 30], 5);
        let arr = OnDemandOffsetArray::new(shared(Cursor::new(data)), 5, 3, ByteOrder::BigEndian);
        assert_eq!(arr.get(0).unwrap(), 10);
        assert_eq!(arr.get(2).unwrap(), 30);
        assert!(arr.get(3).is_err());
    }

    #[test]
    fn test_to_array() {
        let values = [1u64, 1 << 40, 7, 99];
        let data = table(ByteOrder::LittleEndian, &values, 16);
        let arr = OnDemandOffsetArray::new(shared(Cursor::new(data)), 16, 4, ByteOrder::LittleEndian);
        assert_eq!(arr.to_array().unwrap(), values.to_vec());
    }

    #[test]
    fn test_reads_restore_stream_position() {
        let data = table(ByteOrder::LittleEndian, &[4, 5], 3);
        let stream = shared(Cursor::new(data));
        stream.lock().unwrap().seek(SeekFrom::Start(1)).unwrap();

        let arr = OnDemandOffsetArray::new(stream.clone(), 3, 2, ByteOrder::LittleEndian);
        assert_eq!(arr.get(1).unwrap(), 5);
        arr.to_array().unwrap();

        assert_eq!(stream.lock().unwrap().stream_position().unwrap(), 1);
    }

    #[test]
    fn test_equality_is_by_stream_identity() {
        let stream = shared(Cursor::new(vec![0u8; 16]));
        let a = OnDemandOffsetArray::new(stream.clone(), 0, 2, ByteOrder::LittleEndian);
        let b = OnDemandOffsetArray::new(stream, 0, 2, ByteOrder::LittleEndian);
        let c = OnDemandOffsetArray::new(shared(Cursor::new(vec![0u8; 16])), 0, 2, ByteOrder::LittleEndian);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
