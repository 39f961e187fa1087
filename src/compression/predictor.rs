//! Horizontal differencing predictor
//!
//! Predictor 2 replaces every sample with its difference from the sample of
//! the same channel one pixel to the left. Rows restart at the chunk's row
//! width, so the first pixel of each row is stored as-is.

use crate::error::{Error, Result};
use crate::formats::tiff::{tags, IFD};
use crate::io::ByteOrder;

/// Row layout of a chunk as the predictor sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictorLayout {
    /// Pixels per row
    pub width: usize,
    /// Samples stored per pixel
    pub samples: usize,
    /// Bytes per sample
    pub bytes: usize,
    pub order: ByteOrder,
}

impl PredictorLayout {
    /// Reads the chunk layout from a directory
    ///
    /// Rows are tile-width wide; planar chunks carry one sample per pixel.
    pub fn from_ifd(ifd: &IFD) -> Result<Self> {
        let bytes = ifd.bytes_per_sample()?.first().copied().unwrap_or(1);
        let samples = if ifd.planar_configuration()? == 2 {
            1
        } else {
            ifd.bits_per_sample()?.len()
        };
        Ok(Self {
            width: ifd.tile_width()? as usize,
            samples,
            bytes,
            order: ifd.byte_order().unwrap_or_default(),
        })
    }

    fn pixel_len(&self) -> usize {
        self.bytes * self.samples
    }
}

fn predictor_of(ifd: &IFD) -> Result<Option<PredictorLayout>> {
    match ifd.get_int_value(tags::PREDICTOR).unwrap_or(1) {
        1 => Ok(None),
        2 => PredictorLayout::from_ifd(ifd).map(Some),
        other => Err(Error::Unsupported(format!("Predictor {}", other))),
    }
}

/// Applies the directory's predictor before compression
pub fn difference(data: &mut [u8], ifd: &IFD) -> Result<()> {
    if let Some(layout) = predictor_of(ifd)? {
        horizontal_difference(data, &layout);
    }
    Ok(())
}

/// Reverses the directory's predictor after decompression
pub fn undifference(data: &mut [u8], ifd: &IFD) -> Result<()> {
    if let Some(layout) = predictor_of(ifd)? {
        horizontal_accumulate(data, &layout);
    }
    Ok(())
}

fn read_sample(data: &[u8], at: usize, bytes: usize, order: ByteOrder) -> u64 {
    let mut value = 0u64;
    for i in 0..bytes {
        let b = match order {
            ByteOrder::BigEndian => data[at + i],
            ByteOrder::LittleEndian => data[at + bytes - 1 - i],
        };
        value = (value << 8) | b as u64;
    }
    value
}

fn write_sample(data: &mut [u8], at: usize, bytes: usize, order: ByteOrder, mut value: u64) {
    for i in 0..bytes {
        let idx = match order {
            ByteOrder::BigEndian => at + bytes - 1 - i,
            ByteOrder::LittleEndian => at + i,
        };
        data[idx] = value as u8;
        value >>= 8;
    }
}

/// Differencing over whole samples, walking backwards so every subtraction
/// sees the original left neighbour
pub fn horizontal_difference(data: &mut [u8], layout: &PredictorLayout) {
    let len = layout.pixel_len();
    if len == 0 || layout.width == 0 || data.len() < layout.bytes {
        return;
    }
    let mut b = (data.len() / layout.bytes - 1) * layout.bytes;
    loop {
        if (b / len) % layout.width != 0 && b >= len {
            let value = read_sample(data, b, layout.bytes, layout.order);
            let left = read_sample(data, b - len, layout.bytes, layout.order);
            write_sample(data, b, layout.bytes, layout.order, value.wrapping_sub(left));
        }
        if b < layout.bytes {
            break;
        }
        b -= layout.bytes;
    }
}

/// Inverse of [`horizontal_difference`]
pub fn horizontal_accumulate(data: &mut [u8], layout: &PredictorLayout) {
    let len = layout.pixel_len();
    if len == 0 || layout.width == 0 {
        return;
    }
    let mut b = len;
    while b + layout.bytes <= data.len() {
        if (b / len) % layout.width != 0 {
            let value = read_sample(data, b, layout.bytes, layout.order);
            let left = read_sample(data, b - len, layout.bytes, layout.order);
            write_sample(data, b, layout.bytes, layout.order, value.wrapping_add(left));
        }
        b += layout.bytes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::tiff::TagValue;

    fn layout(width: usize, samples: usize, bytes: usize, order: ByteOrder) -> PredictorLayout {
        PredictorLayout {
            width,
            samples,
            bytes,
            order,
        }
    }

    #[test]
    fn test_accumulate_single_byte_rows() {
        let mut data = vec![1, 2, 3, 4, 5, 6];
        horizontal_accumulate(&mut data, &layout(3, 1, 1, ByteOrder::LittleEndian));
        assert_eq!(data, vec![1, 3, 6, 4, 9, 15]);
    }

    #[test]
    fn test_difference_single_byte_rows() {
        let mut data = vec![1, 3, 6, 4, 9, 15];
        horizontal_difference(&mut data, &layout(3, 1, 1, ByteOrder::LittleEndian));
        assert_eq!(data, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_difference_interleaved_rgb() {
        let mut data = vec![10, 20, 30, 11, 22, 33];
        horizontal_difference(&mut data, &layout(2, 3, 1, ByteOrder::LittleEndian));
        assert_eq!(data, vec![10, 20, 30, 1, 2, 3]);
    }

    #[test]
    fn test_difference_wraps() {
        let mut data = vec![200, 10];
        horizontal_difference(&mut data, &layout(2, 1, 1, ByteOrder::LittleEndian));
        assert_eq!(data, vec![200, 66]);
    }

    #[test]
    fn test_sixteen_bit_roundtrip_both_orders() {
        for order in [ByteOrder::LittleEndian, ByteOrder::BigEndian] {
            let mut data = Vec::new();
            for v in [1000u16, 1003, 998, 65535, 7, 9] {
                order.write_u16(&mut data, v).unwrap();
            }
            let original = data.clone();
            let l = layout(3, 1, 2, order);
            horizontal_difference(&mut data, &l);
            assert_eq!(order.u16_from(&data[2..]), 3);
            assert_eq!(order.u16_from(&data[4..]), 998u16.wrapping_sub(1003));
            horizontal_accumulate(&mut data, &l);
            assert_eq!(data, original);
        }
    }

    #[test]
    fn test_predictor_from_directory() {
        let mut ifd = IFD::new();
        ifd.put_value(tags::IMAGE_WIDTH, 2u32);
        ifd.put_value(tags::IMAGE_LENGTH, 1u32);
        ifd.put_value(tags::BITS_PER_SAMPLE, TagValue::Shorts(vec![8]));

        let mut data = vec![5, 7];
        difference(&mut data, &ifd).unwrap();
        assert_eq!(data, vec![5, 7]);

        ifd.put_value(tags::PREDICTOR, 2u16);
        difference(&mut data, &ifd).unwrap();
        assert_eq!(data, vec![5, 2]);
        undifference(&mut data, &ifd).unwrap();
        assert_eq!(data, vec![5, 7]);

        ifd.put_value(tags::PREDICTOR, 3u16);
        assert!(difference(&mut data, &ifd).is_err());
    }
}
