//! Where a plane's chunks and directory land in the file
//!
//! A plane is written against one of three sources of offset tables:
//!
//! - `Fresh`: no directory yet. A placeholder directory is written at the
//!   end of the file, the chunks are appended after it, and the directory is
//!   rewritten in place with the real tables.
//! - `Pending`: a tiled plane that an earlier region write started. Its
//!   tables and directory position are carried in [`PendingPlaneWrite`].
//! - `Existing`: random-access mode found the plane's directory on disk.
//!   Chunks that fit their old slot are written over it.

use tracing::debug;

use super::chunker::ChunkLayout;
use super::directory::{check_classic, packed_extent, serialized_len, write_ifd};
use super::SaverState;
use crate::config::SaverConfig;
use crate::error::{Error, Result};
use crate::formats::tiff::parser::{read_header, DirectoryReader};
use crate::formats::tiff::{tags, TagValue, IFD};
use crate::io::OutputSink;
use crate::types::Region;

/// Offset tables of a tiled plane that is being written region by region
///
/// At most one such plane is in progress per saver. A region write at the
/// plane's origin starts a new one; later regions of the same plane add
/// their tiles to it and rewrite its directory at `ifd_offset`, which has
/// room for `ifd_len` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPlaneWrite {
    pub plane: usize,
    /// Position of the plane's directory
    pub ifd_offset: u64,
    /// Bytes reserved for the directory and its out-of-line values
    pub ifd_len: u64,
    pub offsets: Vec<u64>,
    pub byte_counts: Vec<u64>,
}

/// What one write call targets
#[derive(Debug, Clone, Copy)]
pub(super) struct PlaneTarget {
    pub plane: usize,
    pub region: Region,
    pub last: bool,
}

#[derive(Debug)]
struct ExistingPlane {
    offset: u64,
    /// Next-directory pointer as found on disk
    next: u64,
    /// Bytes the directory and its packed payloads occupy, when known
    extent: Option<u64>,
    ifd: IFD,
    /// Position of the pointer that refers to this directory
    pointer: u64,
}

enum Source {
    Fresh,
    Pending(PendingPlaneWrite),
    Existing(ExistingPlane),
}

/// Looks up the directory for `plane` in what is already written
fn find_existing<W: OutputSink>(
    state: &mut SaverState<W>,
    config: &SaverConfig,
    plane: usize,
) -> Result<Option<ExistingPlane>> {
    let stream = state.out.get_mut();
    let header = read_header(stream)?;
    if header.big_tiff != config.big_tiff || header.byte_order != config.byte_order {
        return Err(Error::InvalidFormat(format!(
            "Output is {} {:?}, saver is configured for {} {:?}",
            if header.big_tiff { "BigTIFF" } else { "TIFF" },
            header.byte_order,
            if config.big_tiff { "BigTIFF" } else { "TIFF" },
            config.byte_order
        )));
    }

    let mut reader = DirectoryReader::new(stream, header);
    let offsets = reader.ifd_offsets()?;
    debug!("Found {} IFD offsets in output", offsets.len());
    let Some(&offset) = offsets.get(plane) else {
        return Ok(None);
    };

    let pointer = if plane == 0 {
        header.len() - header.offset_size()
    } else {
        reader.next_pointer_position(offsets[plane - 1])?
    };
    let entries = reader.entries(offset)?;
    let extent = packed_extent(&entries, offset, header.big_tiff);
    let next = reader.next_ifd_offset(offset)?;
    let ifd = reader.ifd(offset)?;
    Ok(Some(ExistingPlane {
        offset,
        next,
        extent,
        ifd,
        pointer,
    }))
}

/// Fails when a rewrite would change how the existing plane is chunked
fn check_compatible(existing: &IFD, ifd: &IFD) -> Result<()> {
    let same = existing.compression()? == ifd.compression()?
        && existing.is_tiled() == ifd.is_tiled()
        && existing.tile_width()? == ifd.tile_width()?
        && existing.tile_length()? == ifd.tile_length()?
        && existing.is_interleaved()? == ifd.is_interleaved()?;
    if !same {
        return Err(Error::InvalidFormat(
            "Rewritten plane must keep the compression and chunk layout of the existing one"
                .to_string(),
        ));
    }
    Ok(())
}

/// Reads an offset table from an existing directory
///
/// Tables are read raw; no byte-count adjustment is applied.
fn table(ifd: &IFD, tag: u16, total: usize, default: u64) -> Result<Vec<u64>> {
    match ifd.get_long_array(tag)? {
        Some(mut values) => {
            if values.len() < total {
                return Err(Error::InvalidFormat(format!(
                    "{} has {} entries, expected {}",
                    tags::tag_name(tag),
                    values.len(),
                    total
                )));
            }
            values.truncate(total);
            Ok(values)
        }
        None => Ok(vec![default; total]),
    }
}

/// Writes encoded chunks and the plane's directory
///
/// The directory in `ifd` receives the final offset and byte-count tables
/// and the position it was written at.
pub(super) fn write_plane<W: OutputSink>(
    state: &mut SaverState<W>,
    config: &SaverConfig,
    ifd: &mut IFD,
    layout: &ChunkLayout,
    chunks: &[Vec<u8>],
    target: PlaneTarget,
) -> Result<()> {
    let big = config.big_tiff;
    let order = config.byte_order;
    let region = target.region;
    debug!(
        "Writing plane {} region ({}, {}) {}x{}, {} chunks",
        target.plane,
        region.x,
        region.y,
        region.width,
        region.height,
        chunks.len()
    );

    let existing = if config.sequential {
        None
    } else {
        find_existing(state, config, target.plane)?
    };
    let at_origin = region.x == 0 && region.y == 0;
    let source = match existing {
        Some(e) => Source::Existing(e),
        None => match state.pending.take().filter(|p| p.plane == target.plane) {
            Some(pending) if layout.tiled && !at_origin => Source::Pending(pending),
            _ => Source::Fresh,
        },
    };
    if let Source::Existing(e) = &source {
        check_compatible(&e.ifd, ifd)?;
    }

    let tiles_per_row = ifd.tiles_per_row()?;
    let tile_count = tiles_per_row * ifd.tiles_per_column()?;
    let total = if layout.interleaved {
        tile_count as usize
    } else {
        (tile_count * layout.channels as u64) as usize
    };
    let (offsets_tag, counts_tag) = if layout.tiled {
        (tags::TILE_OFFSETS, tags::TILE_BYTE_COUNTS)
    } else {
        (tags::STRIP_OFFSETS, tags::STRIP_BYTE_COUNTS)
    };
    let default_count = if config.sequential && layout.tiled {
        chunks.first().map_or(0, |c| c.len() as u64)
    } else {
        0
    };

    let len_before = state.out.length()?;
    let (mut offsets, mut byte_counts, fp) = match &source {
        Source::Existing(e) => (
            table(&e.ifd, offsets_tag, total, 0)?,
            table(&e.ifd, counts_tag, total, default_count)?,
            e.offset,
        ),
        Source::Pending(p) => (p.offsets.clone(), p.byte_counts.clone(), p.ifd_offset),
        Source::Fresh => (vec![0; total], vec![default_count; total], state.out.seek_end()?),
    };
    if offsets.len() != total || byte_counts.len() != total {
        return Err(Error::InvalidFormat(format!(
            "Pending plane has {} chunks, layout needs {}",
            offsets.len(),
            total
        )));
    }

    ifd.put_value(offsets_tag, TagValue::Longs(offsets.clone()));
    ifd.put_value(counts_tag, TagValue::Longs(byte_counts.clone()));
    let dir_len = serialized_len(ifd, order, big)?;
    if let Source::Pending(p) = &source {
        if dir_len > p.ifd_len {
            let err = Error::InvalidFormat(format!(
                "IFD of plane {} grew from {} to {} bytes between region writes",
                target.plane, p.ifd_len, dir_len
            ));
            state.pending = Some(p.clone());
            return Err(err);
        }
    }
    let data_len: u64 = chunks.iter().map(|c| c.len() as u64).sum();
    let fresh_dir = if matches!(source, Source::Fresh) { dir_len } else { 0 };
    check_classic(len_before + fresh_dir + data_len + dir_len, big, "File size")?;

    if matches!(source, Source::Fresh) {
        state.out.seek_to(fp)?;
        write_ifd(&mut state.out, ifd, 0, big)?;
    }

    let reuse = !matches!(source, Source::Fresh);
    let tile_width = layout.tile_width;
    let tile_length = layout.tile_length;
    for (i, chunk) in chunks.iter().enumerate() {
        let (kx, ky, channel) = layout.grid_position(i as u64);
        let slot = (region.y / tile_length + ky) * tiles_per_row
            + region.x / tile_width
            + kx
            + channel * tile_count;
        let slot = slot as usize;
        if slot >= total {
            return Err(Error::OutOfBounds(format!(
                "Chunk {} maps to slot {} of {}",
                i, slot, total
            )));
        }

        let len = chunk.len() as u64;
        let position = if reuse && offsets[slot] != 0 && len <= byte_counts[slot] {
            state.out.seek_to(offsets[slot])?;
            offsets[slot]
        } else {
            state.out.seek_end()?
        };
        state.out.write_bytes(chunk)?;
        offsets[slot] = position;
        byte_counts[slot] = len;
        debug!("Wrote strip {} ({} bytes) at {}", slot, len, position);
    }
    let end_fp = state.out.length()?;

    ifd.put_value(offsets_tag, TagValue::Longs(offsets.clone()));
    ifd.put_value(counts_tag, TagValue::Longs(byte_counts.clone()));
    ifd.log_contents();

    let ifd_offset = match &source {
        Source::Existing(e) => {
            let fits = e.extent.is_some_and(|extent| dir_len <= extent);
            let (position, end_after) = if fits {
                (e.offset, end_fp)
            } else {
                (end_fp, end_fp + dir_len)
            };
            let next = if target.last {
                0
            } else if e.next == len_before {
                end_after
            } else {
                e.next
            };
            state.out.seek_to(position)?;
            write_ifd(&mut state.out, ifd, next, big)?;
            if !fits {
                debug!("Relocated IFD {} from {} to {}", target.plane, e.offset, position);
                state.out.seek_to(e.pointer)?;
                state.out.write_offset(position, big)?;
            }
            position
        }
        Source::Pending(_) | Source::Fresh => {
            let next = if target.last { 0 } else { end_fp };
            state.out.seek_to(fp)?;
            write_ifd(&mut state.out, ifd, next, big)?;
            fp
        }
    };
    ifd.set_offset(ifd_offset);

    state.pending = match source {
        Source::Existing(_) => None,
        _ if !layout.tiled => None,
        Source::Pending(p) => Some(PendingPlaneWrite {
            offsets,
            byte_counts,
            ..p
        }),
        Source::Fresh => Some(PendingPlaneWrite {
            plane: target.plane,
            ifd_offset,
            ifd_len: dir_len,
            offsets,
            byte_counts,
        }),
    };
    Ok(())
}
