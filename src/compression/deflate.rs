//! Deflate/ZIP compression

use crate::error::Result;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use std::io::{Read, Write};

/// Compresses data into a zlib stream at the given level
pub fn compress(data: &[u8], level: u32) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::new(level.min(9)));
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Decompresses Deflate/ZIP compressed data
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed)?;
    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deflate_roundtrip() {
        let original = b"Hello, world! This is test data for compression.";
        let compressed = compress(original, 6).unwrap();
        assert_eq!(&compressed[..1], &[0x78]);
        assert_eq!(decompress(&compressed).unwrap(), original);
    }

    #[test]
    fn test_level_is_clamped() {
        let data = vec![7u8; 512];
        let compressed = compress(&data, 42).unwrap();
        assert!(compressed.len() < data.len());
        assert_eq!(decompress(&compressed).unwrap(), data);
    }
}
