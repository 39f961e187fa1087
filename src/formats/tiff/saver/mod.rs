//! TIFF writer engine
//!
//! [`TiffSaver`] writes planes of pixel data into a TIFF or BigTIFF file,
//! one directory per plane, and edits directories already on disk.
//!
//! A plane write runs in two phases. The pixel buffer is split into strips
//! or tiles, and every chunk is predicted and compressed on the rayon pool.
//! Only then is the saver's lock taken to place the chunks, fill in their
//! offsets and byte counts and write the directory. Several threads may
//! write planes through one `&TiffSaver` at the same time; the compression
//! work of their calls overlaps.
//!
//! # Example
//!
//! ```no_run
//! use tiff_saver::{tags, PixelType, TiffSaver, IFD};
//!
//! let saver = TiffSaver::create("out.tif")?;
//! let mut ifd = IFD::new();
//! ifd.put_value(tags::IMAGE_WIDTH, 2u32);
//! ifd.put_value(tags::IMAGE_LENGTH, 2u32);
//! saver.write_image(&[0, 64, 128, 255], &mut ifd, 0, PixelType::Uint8, true)?;
//! # Ok::<(), tiff_saver::Error>(())
//! ```

mod chunker;
mod directory;
mod overwrite;
mod placement;

pub use chunker::{encode_chunks, ChunkLayout};
pub use directory::{ifd_size, packed_extent, serialized_len, EncodedEntry, CLASSIC_LIMIT};
pub use placement::PendingPlaneWrite;

use std::fs::{File, OpenOptions};
use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use self::placement::PlaneTarget;
use crate::compression::{Codec, CodecOptions, DefaultCodec};
use crate::config::SaverConfig;
use crate::error::{Error, Result};
use crate::formats::tiff::{tags, Rational, TagValue, IFD};
use crate::io::{ByteOrder, DataSink, OutputSink};
use crate::types::{PixelType, Region};

/// Value written to the Software tag when the caller sets none
pub const SOFTWARE: &str = concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"));

/// State shared by every write on one output
struct SaverState<W> {
    out: DataSink<W>,
    pending: Option<PendingPlaneWrite>,
}

/// Writes planes and directories into one output
pub struct TiffSaver<W: OutputSink> {
    config: SaverConfig,
    codec: Arc<dyn Codec>,
    state: Mutex<SaverState<W>>,
}

impl TiffSaver<File> {
    /// Creates (or truncates) a file for writing
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::create_with_config(path, SaverConfig::default())
    }

    /// Creates (or truncates) a file and writes it with `config`
    pub fn create_with_config<P: AsRef<Path>>(path: P, config: SaverConfig) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self::with_config(file, config))
    }

    /// Opens an existing file for editing
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self::new(file))
    }
}

impl TiffSaver<Cursor<Vec<u8>>> {
    /// Creates a saver writing to memory
    pub fn in_memory() -> Self {
        Self::new(Cursor::new(Vec::new()))
    }
}

impl<W: OutputSink> TiffSaver<W> {
    pub fn new(out: W) -> Self {
        Self::with_config(out, SaverConfig::default())
    }

    pub fn with_config(out: W, config: SaverConfig) -> Self {
        let sink = DataSink::new(out, config.byte_order);
        Self {
            config,
            codec: Arc::new(DefaultCodec),
            state: Mutex::new(SaverState {
                out: sink,
                pending: None,
            }),
        }
    }

    /// Replaces the codec used for prediction and compression
    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn config(&self) -> &SaverConfig {
        &self.config
    }

    pub fn set_little_endian(&mut self, little: bool) {
        self.config.byte_order = if little {
            ByteOrder::LittleEndian
        } else {
            ByteOrder::BigEndian
        };
    }

    pub fn set_big_tiff(&mut self, big_tiff: bool) {
        self.config.big_tiff = big_tiff;
    }

    /// Declares that planes are written once, in order
    ///
    /// Sequential writes never re-read the output, so a plane can not be
    /// rewritten and every plane but the last leaves its next-directory
    /// pointer at the end of the file.
    pub fn set_writing_sequentially(&mut self, sequential: bool) {
        self.config.sequential = sequential;
    }

    pub fn set_codec_options(&mut self, options: CodecOptions) {
        self.config.codec = options;
    }

    pub fn is_little_endian(&self) -> bool {
        self.config.is_little_endian()
    }

    pub fn is_big_tiff(&self) -> bool {
        self.config.big_tiff
    }

    /// The tiled plane currently written region by region, if any
    pub fn pending_plane_write(&self) -> Option<PendingPlaneWrite> {
        self.lock().ok().and_then(|state| state.pending.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, SaverState<W>>> {
        self.state
            .lock()
            .map_err(|_| Error::InvalidFormat("Saver state lock poisoned".to_string()))
    }

    /// Writes the file header at the start of the output
    pub fn write_header(&self) -> Result<()> {
        let mut state = self.lock()?;
        self.write_header_to(&mut state.out)
    }

    fn write_header_to(&self, out: &mut DataSink<W>) -> Result<()> {
        out.set_order(self.config.byte_order);
        out.seek_to(0)?;
        out.write_bytes(&self.config.byte_order.marker())?;
        if self.config.big_tiff {
            out.write_u16(super::BIGTIFF_MAGIC)?;
            out.write_u16(8)?;
            out.write_u16(0)?;
            out.write_u64(16)?;
        } else {
            out.write_u16(super::TIFF_MAGIC)?;
            out.write_u32(8)?;
        }
        Ok(())
    }

    /// Locks the output, writing the header first when it is empty
    fn lock_for_write(&self) -> Result<MutexGuard<'_, SaverState<W>>> {
        let mut state = self.lock()?;
        if state.out.length()? == 0 {
            self.write_header_to(&mut state.out)?;
        }
        state.out.set_order(self.config.byte_order);
        Ok(state)
    }

    /// Writes a whole plane
    ///
    /// `buf` holds the plane's samples in file byte order, interleaved or
    /// one channel after another as the directory's PlanarConfiguration
    /// says. `last` ends the directory chain after this plane.
    pub fn write_image(
        &self,
        buf: &[u8],
        ifd: &mut IFD,
        plane: usize,
        pixel_type: PixelType,
        last: bool,
    ) -> Result<()> {
        let region = Region::full(ifd.dimensions()?);
        self.write_image_region(buf, ifd, plane, pixel_type, region, last)
    }

    /// Writes one rectangle of a plane
    ///
    /// The rectangle must start on a tile (or strip) boundary and end on
    /// one or at the image edge. Strip layouts only take full-width rows.
    /// A tiled plane may be written in several calls; the first must cover
    /// the origin.
    pub fn write_image_region(
        &self,
        buf: &[u8],
        ifd: &mut IFD,
        plane: usize,
        pixel_type: PixelType,
        region: Region,
        last: bool,
    ) -> Result<()> {
        for tag in [tags::IMAGE_WIDTH, tags::IMAGE_LENGTH] {
            if !ifd.contains(tag) {
                return Err(Error::MissingTag(tag));
            }
        }
        let dims = ifd.dimensions()?;
        region.check_within(dims)?;

        let bpp = pixel_type.bytes_per_pixel();
        let channels = match ifd.get_int_value(tags::SAMPLES_PER_PIXEL) {
            Some(n) if n > 0 => n as usize,
            _ => buf.len() / (region.pixel_count() as usize * bpp),
        };
        if channels == 0 {
            return Err(Error::InvalidFormat(format!(
                "Buffer of {} bytes is too small for a {}x{} {} region",
                buf.len(),
                region.width,
                region.height,
                pixel_type.name()
            )));
        }

        make_valid_ifd(ifd, pixel_type, channels)?;
        ifd.set_byte_order(self.config.byte_order);
        ifd.set_big_tiff(self.config.big_tiff);
        check_alignment(ifd, &region)?;

        let layout = ChunkLayout::new(ifd, &region, pixel_type, channels)?;
        if (buf.len() as u64) < layout.expected_len() {
            debug!(
                "Buffer holds {} of {} bytes; the rest is written as zero",
                buf.len(),
                layout.expected_len()
            );
        }
        let chunks = layout.split(buf);

        let mut options = self.config.codec.clone();
        options.width = layout.tile_width;
        options.height = layout.tile_length;
        options.channels = if layout.interleaved { channels as u64 } else { 1 };
        let encoded = encode_chunks(chunks, ifd, self.codec.as_ref(), &options)?;

        let mut state = self.lock_for_write()?;
        let target = PlaneTarget {
            plane,
            region,
            last,
        };
        placement::write_plane(&mut state, &self.config, ifd, &layout, &encoded, target)
    }

    /// Writes a list of planes, ending the chain after the last one
    pub fn write_images(&self, planes: &[&[u8]], ifds: &mut [IFD], pixel_type: PixelType) -> Result<()> {
        if planes.len() != ifds.len() {
            return Err(Error::InvalidFormat(format!(
                "{} planes but {} directories",
                planes.len(),
                ifds.len()
            )));
        }
        let count = planes.len();
        for (plane, (buf, ifd)) in planes.iter().zip(ifds.iter_mut()).enumerate() {
            self.write_image(buf, ifd, plane, pixel_type, plane + 1 == count)?;
        }
        Ok(())
    }

    /// Appends a directory to the end of the output
    ///
    /// Returns the offset it was written at. Linking it into the chain is up
    /// to the caller.
    pub fn write_ifd(&self, ifd: &IFD, next_offset: u64) -> Result<u64> {
        let mut state = self.lock_for_write()?;
        let offset = state.out.seek_end()?;
        directory::write_ifd(&mut state.out, ifd, next_offset, self.config.big_tiff)?;
        Ok(offset)
    }

    /// Consumes the saver and returns the output
    pub fn into_inner(self) -> Result<W> {
        let state = self
            .state
            .into_inner()
            .map_err(|_| Error::InvalidFormat("Saver state lock poisoned".to_string()))?;
        Ok(state.out.into_inner())
    }
}

/// Fills in the tags a plane of `pixel_type` with `channels` samples
/// per pixel needs
///
/// BitsPerSample and SamplesPerPixel always follow the pixel data, and
/// SampleFormat is set for signed and floating-point types. Other tags are
/// only added when missing.
pub fn make_valid_ifd(ifd: &mut IFD, pixel_type: PixelType, channels: usize) -> Result<()> {
    let bits = (pixel_type.bytes_per_pixel() * 8) as u16;
    if let Ok(old) = ifd.bits_per_sample() {
        if old.len() != channels || old.iter().any(|b| *b != bits as u32) {
            debug!(
                "BitsPerSample {:?} replaced by {} x {} for {}",
                old,
                channels,
                bits,
                pixel_type.name()
            );
        }
    }
    ifd.put_value(tags::BITS_PER_SAMPLE, TagValue::Shorts(vec![bits; channels]));
    let format = pixel_type.sample_format();
    if format != 1 {
        ifd.put_value(tags::SAMPLE_FORMAT, TagValue::Short(format));
    }

    if !ifd.contains(tags::COMPRESSION) {
        ifd.put_value(tags::COMPRESSION, TagValue::Short(1));
    }

    let photometric = if channels == 1 && ifd.contains(tags::COLOR_MAP) {
        3
    } else if channels == 1 {
        1
    } else {
        2
    };
    ifd.put_value(tags::PHOTOMETRIC_INTERPRETATION, TagValue::Short(photometric));
    ifd.put_value(tags::SAMPLES_PER_PIXEL, TagValue::Short(channels as u16));

    if !ifd.contains(tags::X_RESOLUTION) {
        ifd.put_value(tags::X_RESOLUTION, Rational::new(1, 1));
    }
    if !ifd.contains(tags::Y_RESOLUTION) {
        ifd.put_value(tags::Y_RESOLUTION, Rational::new(1, 1));
    }
    if !ifd.contains(tags::SOFTWARE) {
        ifd.put_value(tags::SOFTWARE, SOFTWARE);
    }
    let described = [tags::ROWS_PER_STRIP, tags::TILE_WIDTH, tags::TILE_LENGTH]
        .iter()
        .any(|t| ifd.contains(*t));
    if !described {
        ifd.put_value(tags::ROWS_PER_STRIP, TagValue::Longs(vec![1]));
    }
    if !ifd.contains(tags::IMAGE_DESCRIPTION) {
        ifd.put_value(tags::IMAGE_DESCRIPTION, "");
    }
    Ok(())
}

/// Fails unless `region` covers whole chunks of the plane's grid
fn check_alignment(ifd: &IFD, region: &Region) -> Result<()> {
    let dims = ifd.dimensions()?;
    let tile_width = ifd.tile_width()?;
    let tile_length = ifd.tile_length()?;
    if tile_width == 0 || tile_length == 0 {
        return Err(Error::InvalidFormat(format!(
            "Invalid chunk size {} x {}",
            tile_width, tile_length
        )));
    }

    let ends_on_grid = |start: u64, len: u64, chunk: u64, edge: u64| {
        start % chunk == 0 && (start + len == edge || len % chunk == 0)
    };
    let aligned = if ifd.is_tiled() {
        ends_on_grid(region.x, region.width, tile_width, dims.width)
            && ends_on_grid(region.y, region.height, tile_length, dims.height)
    } else {
        region.x == 0
            && region.width == dims.width
            && ends_on_grid(region.y, region.height, tile_length, dims.height)
    };
    if !aligned {
        return Err(Error::InvalidFormat(format!(
            "Region ({}, {}) {}x{} is not aligned to {}x{} chunks",
            region.x, region.y, region.width, region.height, tile_width, tile_length
        )));
    }
    Ok(())
}
