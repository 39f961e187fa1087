//! Directory serialization
//!
//! Each tag value is encoded into an [`EncodedEntry`]: its field type, its
//! element count and its payload bytes in file byte order. Payloads that fit
//! the entry's value slot (4 bytes classic, 8 bytes BigTIFF) are written into
//! the entry; the rest go to a side buffer written right after the directory.

use std::io::{Seek, Write};

use tracing::trace;

use crate::error::{Error, Result};
use crate::formats::tiff::rational::Rational;
use crate::formats::tiff::tags::{self, FieldType};
use crate::formats::tiff::value::TagValue;
use crate::formats::tiff::{IFDEntry, IFD};
use crate::io::{ByteOrder, DataSink};

/// Largest value a classic TIFF offset or count field can hold
pub const CLASSIC_LIMIT: u64 = u32::MAX as u64;

/// Size of a directory with `entries` entries, excluding out-of-line payloads
pub fn ifd_size(entries: usize, big_tiff: bool) -> u64 {
    let (fixed, per_entry) = if big_tiff { (16, 20) } else { (6, 12) };
    fixed + per_entry * entries as u64
}

/// Size of an entry's value slot
pub fn slot_size(big_tiff: bool) -> usize {
    if big_tiff {
        8
    } else {
        4
    }
}

/// Fails when a classic file would need a field wider than 32 bits
pub fn check_classic(value: u64, big_tiff: bool, what: &str) -> Result<()> {
    if !big_tiff && value > CLASSIC_LIMIT {
        return Err(Error::InvalidFormat(format!(
            "{} ({}) does not fit a classic TIFF; enable BigTIFF",
            what, value
        )));
    }
    Ok(())
}

/// The wire shape of one directory entry
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedEntry {
    pub tag: u16,
    pub field_type: FieldType,
    pub count: u64,
    /// Payload in file byte order
    pub payload: Vec<u8>,
    /// Whether the payload sits in the entry's value slot
    pub inline: bool,
}

fn encode_all<T: Copy>(
    values: &[T],
    order: ByteOrder,
    write: impl Fn(ByteOrder, &mut Vec<u8>, T) -> std::io::Result<()>,
) -> Result<Vec<u8>> {
    let mut payload = Vec::new();
    for &v in values {
        write(order, &mut payload, v)?;
    }
    Ok(payload)
}

fn encode_rationals(
    tag: u16,
    values: &[Rational],
    order: ByteOrder,
    signed: bool,
) -> Result<Vec<u8>> {
    let out_of_range = |r: &Rational| {
        Error::InvalidFormat(format!(
            "{}: {}/{} does not fit a {} field",
            tags::tag_name(tag),
            r.numerator,
            r.denominator,
            if signed { "SRATIONAL" } else { "RATIONAL" }
        ))
    };
    let mut payload = Vec::with_capacity(values.len() * 8);
    for r in values {
        if signed {
            let n = i32::try_from(r.numerator).map_err(|_| out_of_range(r))?;
            let d = i32::try_from(r.denominator).map_err(|_| out_of_range(r))?;
            order.write_i32(&mut payload, n)?;
            order.write_i32(&mut payload, d)?;
        } else {
            let n = u32::try_from(r.numerator).map_err(|_| out_of_range(r))?;
            let d = u32::try_from(r.denominator).map_err(|_| out_of_range(r))?;
            order.write_u32(&mut payload, n)?;
            order.write_u32(&mut payload, d)?;
        }
    }
    Ok(payload)
}

impl EncodedEntry {
    /// Encodes `value` for `tag`
    ///
    /// Scalars are written as one-element arrays. Integer arrays become LONG
    /// in classic files and LONG8 in BigTIFF; text becomes ASCII with a
    /// trailing NUL. Values with no field type fail with
    /// [`Error::UnsupportedValue`].
    pub fn encode(tag: u16, value: &TagValue, order: ByteOrder, big_tiff: bool) -> Result<Self> {
        let (field_type, count, payload) = match value.promoted() {
            TagValue::Bytes(q) => (FieldType::Byte, q.len(), q),
            TagValue::Text(s) => {
                let mut q = s.into_bytes();
                q.push(0);
                (FieldType::Ascii, q.len(), q)
            }
            TagValue::Shorts(q) => (
                FieldType::Short,
                q.len(),
                encode_all(&q, order, |o, w, v| o.write_u16(w, v))?,
            ),
            TagValue::Longs(q) => Self::longs(tag, &q, order, big_tiff)?,
            TagValue::OnDemand(a) => Self::longs(tag, &a.to_array()?, order, big_tiff)?,
            TagValue::Rationals(q) => (FieldType::Rational, q.len(), encode_rationals(tag, &q, order, false)?),
            TagValue::Floats(q) => (
                FieldType::Float,
                q.len(),
                encode_all(&q, order, |o, w, v| o.write_f32(w, v))?,
            ),
            TagValue::Doubles(q) => (
                FieldType::Double,
                q.len(),
                encode_all(&q, order, |o, w, v| o.write_f64(w, v))?,
            ),
            TagValue::SBytes(q) => (FieldType::SByte, q.len(), q.iter().map(|b| *b as u8).collect()),
            TagValue::Undefined(q) => (FieldType::Undefined, q.len(), q),
            TagValue::SShorts(q) => (
                FieldType::SShort,
                q.len(),
                encode_all(&q, order, |o, w, v| o.write_i16(w, v))?,
            ),
            TagValue::SLongs(q) => (
                FieldType::SLong,
                q.len(),
                encode_all(&q, order, |o, w, v| o.write_i32(w, v))?,
            ),
            TagValue::SLong8s(q) if big_tiff => (
                FieldType::SLong8,
                q.len(),
                encode_all(&q, order, |o, w, v| o.write_i64(w, v))?,
            ),
            TagValue::SRationals(q) => {
                (FieldType::SRational, q.len(), encode_rationals(tag, &q, order, true)?)
            }
            other => {
                return Err(Error::UnsupportedValue(format!(
                    "{} ({}): {}",
                    tags::tag_name(tag),
                    other.kind_name(),
                    other
                )))
            }
        };

        let count = count as u64;
        check_classic(count, big_tiff, "Value count")?;
        let inline = payload.len() <= slot_size(big_tiff);
        Ok(Self {
            tag,
            field_type,
            count,
            payload,
            inline,
        })
    }

    fn longs(
        tag: u16,
        values: &[u64],
        order: ByteOrder,
        big_tiff: bool,
    ) -> Result<(FieldType, usize, Vec<u8>)> {
        if big_tiff {
            return Ok((
                FieldType::Long8,
                values.len(),
                encode_all(values, order, |o, w, v| o.write_u64(w, v))?,
            ));
        }
        let mut payload = Vec::with_capacity(values.len() * 4);
        for &v in values {
            check_classic(v, false, tags::tag_name(tag))?;
            order.write_u32(&mut payload, v as u32)?;
        }
        Ok((FieldType::Long, values.len(), payload))
    }

    /// Writes the entry; `external_offset` is used when the payload is not
    /// inline
    pub fn write_to<W: Write + Seek>(
        &self,
        out: &mut DataSink<W>,
        external_offset: u64,
        big_tiff: bool,
    ) -> Result<()> {
        out.write_u16(self.tag)?;
        self.write_type_count_value(out, external_offset, big_tiff)
    }

    /// Writes everything after the tag: type, count and value slot
    pub fn write_type_count_value<W: Write + Seek>(
        &self,
        out: &mut DataSink<W>,
        external_offset: u64,
        big_tiff: bool,
    ) -> Result<()> {
        out.write_u16(self.field_type.code())?;
        out.write_offset(self.count, big_tiff)?;
        if self.inline {
            let mut slot = vec![0u8; slot_size(big_tiff)];
            slot[..self.payload.len()].copy_from_slice(&self.payload);
            out.write_bytes(&slot)?;
        } else {
            check_classic(external_offset, big_tiff, "Value offset")?;
            out.write_offset(external_offset, big_tiff)?;
        }
        Ok(())
    }

}

/// Serializes `ifd` at the sink's current position
///
/// Entries go out in ascending tag order, followed by the next-directory
/// pointer and then the out-of-line payloads. Returns the number of bytes
/// written.
pub fn write_ifd<W: Write + Seek>(
    out: &mut DataSink<W>,
    ifd: &IFD,
    next_offset: u64,
    big_tiff: bool,
) -> Result<u64> {
    let fp = out.position()?;
    let count = ifd.len();
    let base = fp + ifd_size(count, big_tiff);

    if big_tiff {
        out.write_u64(count as u64)?;
    } else {
        if count > u16::MAX as usize {
            return Err(Error::InvalidFormat(format!(
                "Too many directory entries for a classic TIFF ({})",
                count
            )));
        }
        out.write_u16(count as u16)?;
    }

    let mut extra: Vec<u8> = Vec::new();
    for (tag, value) in ifd.iter() {
        let entry = EncodedEntry::encode(tag, value, out.order(), big_tiff)?;
        let external_offset = base + extra.len() as u64;
        entry.write_to(out, external_offset, big_tiff)?;
        if !entry.inline {
            extra.extend_from_slice(&entry.payload);
        }
    }

    check_classic(next_offset, big_tiff, "Next IFD offset")?;
    out.write_offset(next_offset, big_tiff)?;
    out.write_bytes(&extra)?;

    let written = base - fp + extra.len() as u64;
    trace!("Wrote IFD at {} ({} entries, {} bytes)", fp, count, written);
    Ok(written)
}

/// Bytes `ifd` occupies when serialized
pub fn serialized_len(ifd: &IFD, order: ByteOrder, big_tiff: bool) -> Result<u64> {
    let mut len = ifd_size(ifd.len(), big_tiff);
    for (tag, value) in ifd.iter() {
        let entry = EncodedEntry::encode(tag, value, order, big_tiff)?;
        if !entry.inline {
            len += entry.payload.len() as u64;
        }
    }
    Ok(len)
}

/// Extent of a directory whose out-of-line payloads directly follow it
///
/// Returns the number of bytes from `offset` to the end of the last payload
/// when the payloads are packed back to back in tag order, as
/// [`write_ifd`] lays them out, and `None` for any other layout.
pub fn packed_extent(entries: &[IFDEntry], offset: u64, big_tiff: bool) -> Option<u64> {
    let mut expected = offset.checked_add(ifd_size(entries.len(), big_tiff))?;
    let mut sorted: Vec<&IFDEntry> = entries.iter().collect();
    sorted.sort_by_key(|e| e.tag);
    for entry in sorted.into_iter().filter(|e| !e.is_inline(big_tiff)) {
        if entry.value_offset != expected {
            return None;
        }
        expected = expected.checked_add(entry.payload_len())?;
    }
    Some(expected - offset)
}
