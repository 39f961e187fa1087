//! Image File Directory (IFD) model
//!
//! An [`IFD`] is an ordered map from tag id to [`TagValue`], plus the byte
//! order and width mode the directory was read with or will be written with.
//! Derived accessors (geometry, sample layout, strip and tile tables) are
//! computed from the stored tags on every call.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use super::on_demand::OnDemandOffsetArray;
use super::rational::Rational;
use super::tags;
use super::value::{TagValue, ValueKind};
use crate::compression::Compression;
use crate::error::{Error, Result};
use crate::io::ByteOrder;
use crate::types::{Dimensions, PixelType};

/// Photometric interpretation codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoInterp {
    WhiteIsZero,
    BlackIsZero,
    Rgb,
    RgbPalette,
    TransparencyMask,
    Cmyk,
    YCbCr,
    CieLab,
    Other(u16),
}

impl PhotoInterp {
    pub fn from_code(code: u16) -> Self {
        match code {
            0 => PhotoInterp::WhiteIsZero,
            1 => PhotoInterp::BlackIsZero,
            2 => PhotoInterp::Rgb,
            3 => PhotoInterp::RgbPalette,
            4 => PhotoInterp::TransparencyMask,
            5 => PhotoInterp::Cmyk,
            6 => PhotoInterp::YCbCr,
            8 => PhotoInterp::CieLab,
            other => PhotoInterp::Other(other),
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            PhotoInterp::WhiteIsZero => 0,
            PhotoInterp::BlackIsZero => 1,
            PhotoInterp::Rgb => 2,
            PhotoInterp::RgbPalette => 3,
            PhotoInterp::TransparencyMask => 4,
            PhotoInterp::Cmyk => 5,
            PhotoInterp::YCbCr => 6,
            PhotoInterp::CieLab => 8,
            PhotoInterp::Other(code) => *code,
        }
    }
}

/// Represents an Image File Directory
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IFD {
    values: BTreeMap<u16, TagValue>,
    byte_order: Option<ByteOrder>,
    big_tiff: Option<bool>,
    offset: Option<u64>,
}

fn number_as_i64(value: &TagValue) -> Option<i64> {
    match value {
        TagValue::Byte(v) => Some(*v as i64),
        TagValue::Short(v) => Some(*v as i64),
        TagValue::Long(v) => Some(*v as i64),
        TagValue::Float(v) => Some(*v as i64),
        TagValue::Double(v) => Some(*v as i64),
        TagValue::Rational(r) => Some(r.value() as i64),
        _ => None,
    }
}

impl IFD {
    /// Creates an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    // -- storage --

    /// Inserts or replaces a tag's value
    pub fn put_value<V: Into<TagValue>>(&mut self, tag: u16, value: V) {
        self.values.insert(tag, value.into());
    }

    /// Removes a tag, returning its value
    pub fn remove_value(&mut self, tag: u16) -> Option<TagValue> {
        self.values.remove(&tag)
    }

    /// Returns the raw value stored under a tag
    pub fn get_value(&self, tag: u16) -> Option<&TagValue> {
        self.values.get(&tag)
    }

    /// Returns a tag's value coerced into `kind`
    ///
    /// See [`TagValue::coerce`] for the conversion rules.
    pub fn get_value_as(&self, tag: u16, kind: ValueKind) -> Result<Option<TagValue>> {
        match self.values.get(&tag) {
            Some(value) => value.coerce(kind, tag),
            None => Ok(None),
        }
    }

    pub fn contains(&self, tag: u16) -> bool {
        self.values.contains_key(&tag)
    }

    /// Number of tags
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates tags in ascending order
    pub fn iter(&self) -> impl Iterator<Item = (u16, &TagValue)> {
        self.values.iter().map(|(tag, value)| (*tag, value))
    }

    pub fn byte_order(&self) -> Option<ByteOrder> {
        self.byte_order
    }

    pub fn set_byte_order(&mut self, order: ByteOrder) {
        self.byte_order = Some(order);
    }

    pub fn big_tiff(&self) -> Option<bool> {
        self.big_tiff
    }

    pub fn set_big_tiff(&mut self, big_tiff: bool) {
        self.big_tiff = Some(big_tiff);
    }

    /// File offset this directory was read from, if any
    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    pub fn set_offset(&mut self, offset: u64) {
        self.offset = Some(offset);
    }

    // -- typed getters --

    /// Scalar value of a numeric tag, or `default` when absent
    pub fn get_long_value(&self, tag: u16, default: u64) -> Result<u64> {
        match self.get_value_as(tag, ValueKind::Number)? {
            Some(v) => number_as_i64(&v)
                .map(|n| n as u64)
                .ok_or_else(|| Error::type_mismatch(tag, v.kind_name(), "Number")),
            None => Ok(default),
        }
    }

    /// Scalar value of a numeric tag; `None` when absent or not numeric
    pub fn get_int_value(&self, tag: u16) -> Option<i64> {
        self.get_value_as(tag, ValueKind::Number)
            .ok()
            .flatten()
            .and_then(|v| number_as_i64(&v))
    }

    /// Integer array value of a tag, widening narrower element types
    ///
    /// Scalars become one-element arrays and on-demand tables are read in
    /// full.
    pub fn get_long_array(&self, tag: u16) -> Result<Option<Vec<u64>>> {
        let Some(value) = self.values.get(&tag) else {
            return Ok(None);
        };
        let values = match value {
            TagValue::Longs(v) => v.clone(),
            TagValue::Shorts(v) => v.iter().map(|x| *x as u64).collect(),
            TagValue::Bytes(v) => v.iter().map(|x| *x as u64).collect(),
            TagValue::SShorts(v) => v.iter().map(|x| *x as u64).collect(),
            TagValue::SLongs(v) => v.iter().map(|x| *x as u64).collect(),
            TagValue::SLong8s(v) => v.iter().map(|x| *x as u64).collect(),
            TagValue::OnDemand(a) => a.to_array()?,
            scalar => match number_as_i64(scalar) {
                Some(n) => vec![n as u64],
                None => return Err(Error::type_mismatch(tag, value.kind_name(), "Longs")),
            },
        };
        Ok(Some(values))
    }

    /// Signed view of [`IFD::get_long_array`]
    pub fn get_int_array(&self, tag: u16) -> Result<Option<Vec<i64>>> {
        let Some(value) = self.values.get(&tag) else {
            return Ok(None);
        };
        let values = match value {
            TagValue::SBytes(v) => v.iter().map(|x| *x as i64).collect(),
            TagValue::SShorts(v) => v.iter().map(|x| *x as i64).collect(),
            TagValue::SLongs(v) => v.iter().map(|x| *x as i64).collect(),
            TagValue::SLong8s(v) => v.clone(),
            _ => self
                .get_long_array(tag)?
                .unwrap_or_default()
                .into_iter()
                .map(|x| x as i64)
                .collect(),
        };
        Ok(Some(values))
    }

    pub fn get_rational(&self, tag: u16) -> Result<Option<Rational>> {
        Ok(match self.get_value_as(tag, ValueKind::Rational)? {
            Some(TagValue::Rational(r)) => Some(r),
            _ => None,
        })
    }

    /// Text value of a tag; arrays are joined with spaces
    pub fn get_string(&self, tag: u16) -> Result<Option<String>> {
        Ok(match self.get_value_as(tag, ValueKind::Text)? {
            Some(TagValue::Text(s)) => Some(s),
            _ => None,
        })
    }

    /// Any tag rendered as text, with CR and CR-LF turned into LF
    ///
    /// Byte arrays are read as characters, control bytes other than NUL
    /// becoming line breaks.
    pub fn get_text(&self, tag: u16) -> Option<String> {
        let value = self.values.get(&tag)?;
        let text = match value {
            TagValue::Text(s) => s.clone(),
            TagValue::Bytes(bytes) => {
                let mut s = String::with_capacity(bytes.len());
                for &b in bytes {
                    let c = b as char;
                    if !c.is_control() {
                        s.push(c);
                    } else if b != 0 {
                        s.push('\n');
                    }
                }
                s
            }
            other if other.is_scalar() => other.to_string(),
            other => match other.coerce(ValueKind::Text, tag) {
                Ok(Some(TagValue::Text(s))) => s,
                _ => other.to_string(),
            },
        };
        Some(text.replace("\r\n", "\n").replace('\r', "\n"))
    }

    /// The ImageDescription text
    pub fn comment(&self) -> Option<String> {
        self.get_text(tags::IMAGE_DESCRIPTION)
    }

    // -- geometry --

    fn checked_dimension(&self, tag: u16) -> Result<u64> {
        let value = self.get_long_value(tag, 0)?;
        if value > i32::MAX as u64 {
            return Err(Error::InvalidFormat(format!(
                "{} > {} is not supported",
                tags::tag_name(tag),
                i32::MAX
            )));
        }
        Ok(value)
    }

    pub fn image_width(&self) -> Result<u64> {
        self.checked_dimension(tags::IMAGE_WIDTH)
    }

    pub fn image_length(&self) -> Result<u64> {
        self.checked_dimension(tags::IMAGE_LENGTH)
    }

    pub fn dimensions(&self) -> Result<Dimensions> {
        Ok(Dimensions::new(self.image_width()?, self.image_length()?))
    }

    /// True when tiles are described and strips are not
    pub fn is_tiled(&self) -> bool {
        !self.contains(tags::STRIP_OFFSETS) && self.contains(tags::TILE_WIDTH)
    }

    /// Tile width, or the image width for stripped images
    pub fn tile_width(&self) -> Result<u64> {
        match self.get_long_value(tags::TILE_WIDTH, 0)? {
            0 => self.image_width(),
            w => Ok(w),
        }
    }

    /// Tile length, or the rows per strip for stripped images
    pub fn tile_length(&self) -> Result<u64> {
        match self.get_long_value(tags::TILE_LENGTH, 0)? {
            0 => Ok(self.rows_per_strip()?.first().copied().unwrap_or(0)),
            l => Ok(l),
        }
    }

    pub fn tiles_per_row(&self) -> Result<u64> {
        let tile_width = self.tile_width()?;
        if tile_width == 0 {
            return Err(Error::InvalidFormat("TileWidth is zero".to_string()));
        }
        Ok(self.image_width()?.div_ceil(tile_width))
    }

    pub fn tiles_per_column(&self) -> Result<u64> {
        let tile_length = self.tile_length()?;
        if tile_length == 0 {
            return Err(Error::InvalidFormat("TileLength is zero".to_string()));
        }
        Ok(self.image_length()?.div_ceil(tile_length))
    }

    /// Rows per strip, clamped to the image length
    ///
    /// Defaults to the tile length or the image length when absent. Arrays
    /// whose elements differ are rejected.
    pub fn rows_per_strip(&self) -> Result<Vec<u64>> {
        let Some(mut rows) = self.get_long_array(tags::ROWS_PER_STRIP)? else {
            let tile_length = self.get_long_value(tags::TILE_LENGTH, 0)?;
            return Ok(vec![if tile_length == 0 {
                self.image_length()?
            } else {
                tile_length
            }]);
        };

        let image_length = self.image_length()?;
        for r in rows.iter_mut() {
            *r = (*r).min(image_length);
        }
        if rows.windows(2).any(|w| w[0] != w[1]) {
            return Err(Error::InvalidFormat(
                "Non-uniform RowsPerStrip is not supported".to_string(),
            ));
        }
        Ok(rows)
    }

    // -- sample layout --

    pub fn compression(&self) -> Result<Compression> {
        Compression::from_tag(self.get_long_value(tags::COMPRESSION, 1)?)
    }

    /// Samples per pixel; old-style JPEG is always three
    pub fn samples_per_pixel(&self) -> Result<u64> {
        if self.compression()? == Compression::OldJpeg {
            return Ok(3);
        }
        self.get_long_value(tags::SAMPLES_PER_PIXEL, 1)
    }

    /// Bits per sample, one entry per sample
    ///
    /// Defaults to `[1]`. An array shorter than SamplesPerPixel is replicated
    /// from its first element.
    pub fn bits_per_sample(&self) -> Result<Vec<u32>> {
        let mut bits: Vec<i64> = self
            .get_int_array(tags::BITS_PER_SAMPLE)?
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| vec![1]);

        let samples = self.samples_per_pixel()? as usize;
        if bits.len() < samples {
            debug!(
                "BitsPerSample length ({}) does not match SamplesPerPixel ({})",
                bits.len(),
                samples
            );
            bits = vec![bits[0]; samples];
        }
        for &b in bits.iter().take(samples) {
            if b < 1 {
                return Err(Error::InvalidFormat(format!("Illegal BitsPerSample ({})", b)));
            }
        }
        Ok(bits.into_iter().map(|b| b.max(0) as u32).collect())
    }

    /// Bytes per sample, rounding bit depths up to whole bytes
    pub fn bytes_per_sample(&self) -> Result<Vec<usize>> {
        Ok(self
            .bits_per_sample()?
            .into_iter()
            .map(|b| (b as usize).div_ceil(8).max(1))
            .collect())
    }

    /// Canonical pixel type from BitsPerSample and SampleFormat
    pub fn pixel_type(&self) -> Result<PixelType> {
        let mut bps = self.bits_per_sample()?[0];
        let format = self.get_int_value(tags::SAMPLE_FORMAT).unwrap_or(-1);

        bps = bps.div_ceil(8) * 8;
        if bps == 24 && format != 3 {
            bps = 32;
        }

        Ok(match bps {
            16 if format == 3 => PixelType::Float,
            16 if format == 2 => PixelType::Int16,
            16 => PixelType::Uint16,
            24 => PixelType::Float,
            64 => PixelType::Double,
            32 if format == 3 => PixelType::Float,
            32 if format == 2 => PixelType::Int32,
            32 => PixelType::Uint32,
            _ if format == 2 => PixelType::Int8,
            _ => PixelType::Uint8,
        })
    }

    pub fn photometric_interpretation(&self) -> Result<Option<PhotoInterp>> {
        match self.get_int_value(tags::PHOTOMETRIC_INTERPRETATION) {
            Some(code) => Ok(Some(PhotoInterp::from_code(code as u16))),
            None if self.compression()? == Compression::OldJpeg => Ok(Some(PhotoInterp::Rgb)),
            None => Ok(None),
        }
    }

    /// PlanarConfiguration: 1 (interleaved) or 2 (one plane per sample)
    pub fn planar_configuration(&self) -> Result<u16> {
        match self.get_long_value(tags::PLANAR_CONFIGURATION, 1)? {
            1 => Ok(1),
            2 => Ok(2),
            other => Err(Error::Unsupported(format!("PlanarConfiguration ({})", other))),
        }
    }

    pub fn is_interleaved(&self) -> Result<bool> {
        Ok(self.planar_configuration()? == 1)
    }

    // -- strip and tile tables --

    /// Number of strips or tiles the geometry calls for
    pub fn strip_count(&self) -> Result<u64> {
        let per_plane = if self.is_tiled() {
            self.tiles_per_row()? * self.tiles_per_column()?
        } else {
            let rows = self.rows_per_strip()?[0];
            if rows == 0 {
                return Err(Error::InvalidFormat("RowsPerStrip is zero".to_string()));
            }
            self.image_length()?.div_ceil(rows)
        };
        Ok(if self.planar_configuration()? == 2 {
            per_plane * self.samples_per_pixel()?
        } else {
            per_plane
        })
    }

    fn offsets_tag(&self) -> u16 {
        if self.is_tiled() {
            tags::TILE_OFFSETS
        } else {
            tags::STRIP_OFFSETS
        }
    }

    fn byte_counts_tag(&self) -> u16 {
        if self.is_tiled() {
            tags::TILE_BYTE_COUNTS
        } else {
            tags::STRIP_BYTE_COUNTS
        }
    }

    /// Offset table left on disk, if the parser deferred it
    pub fn on_demand_strip_offsets(&self) -> Option<&OnDemandOffsetArray> {
        match self.values.get(&self.offsets_tag()) {
            Some(TagValue::OnDemand(a)) => Some(a),
            _ => None,
        }
    }

    fn check_table_len(&self, what: &str, len: usize) -> Result<()> {
        let expected = self.strip_count()?;
        if (len as u64) < expected {
            return Err(Error::InvalidFormat(format!(
                "{} length ({}) does not match expected number of strips ({})",
                what, len, expected
            )));
        }
        Ok(())
    }

    /// Strip or tile offsets, checked against [`IFD::strip_count`]
    pub fn strip_offsets(&self) -> Result<Option<Vec<u64>>> {
        let tag = self.offsets_tag();
        let Some(offsets) = self.get_long_array(tag)? else {
            return Ok(None);
        };
        self.check_table_len(tags::tag_name(tag), offsets.len())?;
        Ok(Some(offsets))
    }

    /// Strip or tile byte counts, checked against [`IFD::strip_count`]
    ///
    /// Without a byte count table the image size is split evenly across the
    /// offsets. For LZW data whose RowsPerStrip is absent or does not divide
    /// the image length, every count is doubled; this is a historical safety
    /// margin for readers that use the counts as upper bounds.
    pub fn strip_byte_counts(&self) -> Result<Option<Vec<u64>>> {
        let tag = self.byte_counts_tag();
        let image_length = self.image_length()?;

        let counts = match self.get_long_array(tag)? {
            Some(counts) => counts,
            None => {
                let Some(offsets) = self.strip_offsets()? else {
                    return Ok(None);
                };
                if offsets.is_empty() {
                    return Ok(Some(Vec::new()));
                }
                let bytes = self.bytes_per_sample()?[0] as u64;
                let samples = if self.planar_configuration()? == 2 {
                    1
                } else {
                    self.samples_per_pixel()?
                };
                let image_size = self.image_width()? * image_length * bytes * samples;
                vec![image_size / offsets.len() as u64; offsets.len()]
            }
        };

        let uneven = !self.contains(tags::ROWS_PER_STRIP) || {
            let rows = self.rows_per_strip()?[0];
            rows == 0 || image_length % rows != 0
        };
        let counts = if self.compression()? == Compression::Lzw && uneven {
            counts.into_iter().map(|c| c * 2).collect()
        } else {
            counts
        };

        self.check_table_len(tags::tag_name(tag), counts.len())?;
        Ok(Some(counts))
    }

    // -- resolution --

    /// Micrometres per resolution unit: 25400 for inches, 10000 for
    /// centimetres, 1 otherwise
    pub fn resolution_multiplier(&self) -> u32 {
        match self.get_int_value(tags::RESOLUTION_UNIT) {
            Some(2) => 25400,
            Some(3) => 10000,
            _ => 1,
        }
    }

    fn resolution(&self, tag: u16) -> Result<f64> {
        let per_unit = match self.get_rational(tag)? {
            Some(r) => 1.0 / r.value(),
            None => 0.0,
        };
        Ok(per_unit * self.resolution_multiplier() as f64)
    }

    /// Pixel width in micrometres
    pub fn x_resolution(&self) -> Result<f64> {
        self.resolution(tags::X_RESOLUTION)
    }

    /// Pixel height in micrometres
    pub fn y_resolution(&self) -> Result<f64> {
        self.resolution(tags::Y_RESOLUTION)
    }

    /// Dumps every tag at trace level
    pub fn log_contents(&self) {
        trace!("IFD directory entry values:");
        for (tag, value) in self.iter() {
            trace!("\t{}={}", tags::tag_name(tag), value);
        }
    }
}
