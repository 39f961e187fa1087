//! Compression and predictor steps applied to each strip or tile
//!
//! The saver only talks to the [`Codec`] trait: it asks for the predictor
//! step and then for compression, once per chunk. [`DefaultCodec`] wires
//! those calls to the codecs in this module.

pub mod deflate;
pub mod lzw;
pub mod packbits;
pub mod predictor;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::formats::tiff::IFD;

/// Compression types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// No compression
    None,
    /// LZW compression
    Lzw,
    /// Pre-1992 JPEG compression
    OldJpeg,
    /// JPEG compression
    Jpeg,
    /// Deflate/ZIP compression
    Deflate,
    /// Deflate/ZIP compression under the older 32946 code
    AdobeDeflate,
    /// PackBits compression
    PackBits,
}

impl Compression {
    /// Creates compression from TIFF compression tag value
    pub fn from_tag(value: u64) -> Result<Self> {
        match value {
            1 => Ok(Compression::None),
            5 => Ok(Compression::Lzw),
            6 => Ok(Compression::OldJpeg),
            7 => Ok(Compression::Jpeg),
            8 => Ok(Compression::Deflate),
            32946 => Ok(Compression::AdobeDeflate),
            32773 => Ok(Compression::PackBits),
            _ => Err(Error::Unsupported(format!("Compression type {}", value))),
        }
    }

    /// Tag value for this compression type
    pub fn code(&self) -> u16 {
        match self {
            Compression::None => 1,
            Compression::Lzw => 5,
            Compression::OldJpeg => 6,
            Compression::Jpeg => 7,
            Compression::Deflate => 8,
            Compression::AdobeDeflate => 32946,
            Compression::PackBits => 32773,
        }
    }

    /// Returns the name of this compression type
    pub fn name(&self) -> &'static str {
        match self {
            Compression::None => "None",
            Compression::Lzw => "LZW",
            Compression::OldJpeg => "Old JPEG",
            Compression::Jpeg => "JPEG",
            Compression::Deflate | Compression::AdobeDeflate => "Deflate/ZIP",
            Compression::PackBits => "PackBits",
        }
    }

    /// Compresses one chunk
    pub fn compress(&self, data: &[u8], options: &CodecOptions) -> Result<Vec<u8>> {
        match self {
            Compression::None => Ok(data.to_vec()),
            Compression::Lzw => Ok(lzw::compress(data)),
            Compression::Deflate | Compression::AdobeDeflate => deflate::compress(data, options.deflate_level),
            Compression::PackBits => Ok(packbits::compress(data)),
            Compression::OldJpeg | Compression::Jpeg => Err(Error::Unsupported(format!(
                "{} compression is not available for writing",
                self.name()
            ))),
        }
    }

    /// Decompresses one chunk
    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Compression::None => Ok(data.to_vec()),
            Compression::Lzw => lzw::decompress(data),
            Compression::Deflate | Compression::AdobeDeflate => deflate::decompress(data),
            Compression::PackBits => packbits::decompress(data),
            Compression::OldJpeg | Compression::Jpeg => Err(Error::Unsupported(format!(
                "{} decompression",
                self.name()
            ))),
        }
    }
}

/// Options handed to the codec for every chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecOptions {
    /// zlib level, 0 to 9
    pub deflate_level: u32,
    /// Quality for lossy codecs, 0.0 to 1.0
    pub quality: f64,
    /// Chunk width in pixels, set per chunk by the saver
    #[serde(skip)]
    pub width: u64,
    /// Chunk height in pixels, set per chunk by the saver
    #[serde(skip)]
    pub height: u64,
    /// Samples stored per pixel in the chunk, set per chunk by the saver
    #[serde(skip)]
    pub channels: u64,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            deflate_level: 6,
            quality: 1.0,
            width: 0,
            height: 0,
            channels: 1,
        }
    }
}

/// The per-chunk encoding contract used by the saver
///
/// Both steps run on chunk-private buffers and may be called from several
/// threads at once.
pub trait Codec: Send + Sync {
    /// Applies the directory's predictor to `data` in place
    fn difference(&self, data: &mut [u8], ifd: &IFD) -> Result<()>;

    /// Compresses one chunk
    fn compress(&self, compression: Compression, data: &[u8], options: &CodecOptions) -> Result<Vec<u8>>;
}

/// Codec backed by the built-in compressors
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCodec;

impl Codec for DefaultCodec {
    fn difference(&self, data: &mut [u8], ifd: &IFD) -> Result<()> {
        predictor::difference(data, ifd)
    }

    fn compress(&self, compression: Compression, data: &[u8], options: &CodecOptions) -> Result<Vec<u8>> {
        compression.compress(data, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_from_tag() {
        assert_eq!(Compression::from_tag(1).unwrap(), Compression::None);
        assert_eq!(Compression::from_tag(8).unwrap(), Compression::Deflate);
        assert_eq!(Compression::from_tag(32946).unwrap(), Compression::AdobeDeflate);
        assert_eq!(Compression::from_tag(5).unwrap(), Compression::Lzw);
        assert!(Compression::from_tag(99).is_err());
    }

    #[test]
    fn test_code_roundtrip() {
        for code in [1u16, 5, 6, 7, 8, 32946, 32773] {
            assert_eq!(Compression::from_tag(code as u64).unwrap().code(), code);
        }
    }

    #[test]
    fn test_compression_name() {
        assert_eq!(Compression::None.name(), "None");
        assert_eq!(Compression::Deflate.name(), "Deflate/ZIP");
    }

    #[test]
    fn test_no_compression() {
        let data = vec![1u8, 2, 3, 4];
        let packed = Compression::None.compress(&data, &CodecOptions::default()).unwrap();
        assert_eq!(Compression::None.decompress(&packed).unwrap(), data);
    }

    #[test]
    fn test_codecs_roundtrip() {
        let data: Vec<u8> = (0..2000u32).map(|i| ((i / 7) % 251) as u8).collect();
        let options = CodecOptions::default();
        for c in [Compression::Lzw, Compression::Deflate, Compression::AdobeDeflate, Compression::PackBits] {
            let packed = c.compress(&data, &options).unwrap();
            assert_eq!(c.decompress(&packed).unwrap(), data, "{}", c.name());
        }
    }

    #[test]
    fn test_jpeg_write_unsupported() {
        let err = Compression::Jpeg.compress(&[0u8; 4], &CodecOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }

    #[test]
    fn test_codec_options_from_json() {
        let options: CodecOptions = serde_json::from_str(r#"{"deflate_level": 9}"#).unwrap();
        assert_eq!(options.deflate_level, 9);
        assert_eq!(options.quality, 1.0);
    }
}
