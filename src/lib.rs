//! tiff-saver - a TIFF and BigTIFF writer and in-place editor
//!
//! tiff-saver writes planes of pixel data into classic TIFF or BigTIFF
//! files, splitting them into strips or tiles and compressing every chunk in
//! parallel. Files already on disk can be edited in place: a plane can be
//! rewritten without growing the file, and single tag values can be replaced
//! without moving unrelated bytes.
//!
//! # Examples
//!
//! ## Writing a plane
//!
//! ```no_run
//! use tiff_saver::{tags, PixelType, TiffSaver, IFD};
//!
//! let mut saver = TiffSaver::create("gray.tif")?;
//! saver.set_big_tiff(true);
//!
//! let mut ifd = IFD::new();
//! ifd.put_value(tags::IMAGE_WIDTH, 256u32);
//! ifd.put_value(tags::IMAGE_LENGTH, 256u32);
//! ifd.put_value(tags::COMPRESSION, 8u16);
//!
//! let pixels = vec![0u8; 256 * 256];
//! saver.write_image(&pixels, &mut ifd, 0, PixelType::Uint8, true)?;
//! # Ok::<(), tiff_saver::Error>(())
//! ```
//!
//! ## Editing a tag in place
//!
//! ```no_run
//! use tiff_saver::{TiffParser, TiffSaver};
//!
//! let saver = TiffSaver::open("gray.tif")?;
//! saver.overwrite_comment("calibrated")?;
//!
//! let parser = TiffParser::open("gray.tif")?;
//! if let Some(ifd) = parser.first_ifd()? {
//!     println!("{:?}", ifd.comment());
//! }
//! # Ok::<(), tiff_saver::Error>(())
//! ```

pub mod io;
pub mod error;
pub mod types;
pub mod formats;
pub mod compression;
pub mod config;

pub use compression::{Codec, CodecOptions, Compression, DefaultCodec};
pub use config::SaverConfig;
pub use error::{Error, Result};
pub use formats::tiff::{
    make_valid_ifd, tags, IFDEntry, PendingPlaneWrite, Rational, TagValue, Tiff, TiffHeader,
    TiffParser, TiffSaver, BIGTIFF_MAGIC, IFD, TIFF_MAGIC,
};
pub use io::{ByteOrder, DataSink, OutputSink, SeekableReader};
pub use types::{Dimensions, PixelType, Region};
