//! Splitting a pixel buffer into strips or tiles, and encoding them

use rayon::prelude::*;
use tracing::debug;

use crate::compression::{Codec, CodecOptions};
use crate::error::{Error, Result};
use crate::formats::tiff::IFD;
use crate::types::{PixelType, Region};

/// How one write call's buffer maps onto strips or tiles
///
/// Chunks of an interleaved plane are numbered row-major over the region.
/// Planar chunks are numbered channel-major: every chunk of channel 0, then
/// channel 1, and so on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkLayout {
    /// Region width in pixels
    pub width: u64,
    /// Region height in pixels
    pub height: u64,
    pub bytes_per_pixel: usize,
    pub channels: usize,
    pub tile_width: u64,
    pub tile_length: u64,
    pub interleaved: bool,
    pub tiled: bool,
}

impl ChunkLayout {
    /// Reads chunk geometry from a directory that already went through
    /// `make_valid_ifd`
    pub fn new(ifd: &IFD, region: &Region, pixel_type: PixelType, channels: usize) -> Result<Self> {
        let tile_width = ifd.tile_width()?;
        let tile_length = ifd.tile_length()?;
        if tile_width == 0 || tile_length == 0 {
            return Err(Error::InvalidFormat(format!(
                "Invalid chunk size {} x {}",
                tile_width, tile_length
            )));
        }
        Ok(Self {
            width: region.width,
            height: region.height,
            bytes_per_pixel: pixel_type.bytes_per_pixel(),
            channels,
            tile_width,
            tile_length,
            interleaved: ifd.is_interleaved()?,
            tiled: ifd.is_tiled(),
        })
    }

    /// Chunks across the region
    pub fn across(&self) -> u64 {
        self.width.div_ceil(self.tile_width)
    }

    /// Chunks down the region
    pub fn down(&self) -> u64 {
        self.height.div_ceil(self.tile_length)
    }

    /// Chunks per channel plane
    pub fn per_channel(&self) -> u64 {
        self.across() * self.down()
    }

    /// Total chunks this write produces
    pub fn chunk_count(&self) -> u64 {
        if self.interleaved {
            self.per_channel()
        } else {
            self.per_channel() * self.channels as u64
        }
    }

    /// Bytes of one pixel inside a chunk
    fn chunk_pixel_len(&self) -> usize {
        if self.interleaved {
            self.bytes_per_pixel * self.channels
        } else {
            self.bytes_per_pixel
        }
    }

    /// Bytes the buffer should hold for the whole region
    pub fn expected_len(&self) -> u64 {
        self.width * self.height * (self.bytes_per_pixel * self.channels) as u64
    }

    /// Position of chunk `index` within the region's chunk grid, as
    /// `(column, row, channel)`
    pub fn grid_position(&self, index: u64) -> (u64, u64, u64) {
        let per_channel = self.per_channel();
        let (channel, local) = if self.interleaved {
            (0, index)
        } else {
            (index / per_channel, index % per_channel)
        };
        (local % self.across(), local / self.across(), channel)
    }

    /// Copies the buffer into per-chunk buffers
    ///
    /// Tiles are always full size, with pixels outside the region zeroed.
    /// Strips hold only the rows the region has. Bytes missing from a short
    /// buffer read as zero. A buffer that is exactly one chunk is copied as
    /// is.
    pub fn split(&self, buf: &[u8]) -> Vec<Vec<u8>> {
        let single = self.chunk_count() == 1
            && self.width == self.tile_width
            && (!self.tiled || self.height == self.tile_length)
            && buf.len() as u64 == self.expected_len();
        if single {
            return vec![buf.to_vec()];
        }

        (0..self.chunk_count())
            .map(|index| self.chunk(buf, index))
            .collect()
    }

    fn chunk(&self, buf: &[u8], index: u64) -> Vec<u8> {
        let (col, row, channel) = self.grid_position(index);
        let x0 = col * self.tile_width;
        let y0 = row * self.tile_length;
        let rows = if self.tiled {
            self.tile_length
        } else {
            self.tile_length.min(self.height - y0)
        };
        let pixel = self.chunk_pixel_len();
        let row_len = self.tile_width as usize * pixel;
        let plane_len = (self.width * self.height) as usize * self.bytes_per_pixel;
        let channel_base = if self.interleaved {
            0
        } else {
            channel as usize * plane_len
        };

        let mut out = Vec::with_capacity(rows as usize * row_len);
        for r in 0..rows {
            let y = y0 + r;
            if y >= self.height {
                out.resize(out.len() + row_len, 0);
                continue;
            }
            let cols = self.tile_width.min(self.width - x0) as usize;
            let start = channel_base + ((y * self.width + x0) as usize) * pixel;
            copy_span(&mut out, buf, start, cols * pixel);
            out.resize(out.len() + (row_len - cols * pixel), 0);
        }
        out
    }
}

/// Appends `buf[start..start + len]`, zero-filling whatever `buf` lacks
fn copy_span(out: &mut Vec<u8>, buf: &[u8], start: usize, len: usize) {
    let end = (start + len).min(buf.len());
    if start < end {
        out.extend_from_slice(&buf[start..end]);
    }
    let copied = end.saturating_sub(start);
    out.resize(out.len() + (len - copied), 0);
}

/// Runs every chunk through the predictor and compressor
///
/// Chunks are independent and are encoded on the rayon pool.
pub fn encode_chunks(
    chunks: Vec<Vec<u8>>,
    ifd: &IFD,
    codec: &dyn Codec,
    options: &CodecOptions,
) -> Result<Vec<Vec<u8>>> {
    let compression = ifd.compression()?;
    let total = chunks.len();
    chunks
        .into_par_iter()
        .enumerate()
        .map(|(i, mut chunk)| {
            codec.difference(&mut chunk, ifd)?;
            let packed = codec.compress(compression, &chunk, options)?;
            debug!("Compressed strip {}/{} length {}", i + 1, total, packed.len());
            Ok(packed)
        })
        .collect()
}
