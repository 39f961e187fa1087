//! TIFF and BigTIFF format support

pub mod tags;
pub mod rational;
pub mod value;
pub mod entry;
pub mod ifd;
pub mod on_demand;
pub mod types;
pub mod parser;
pub mod saver;

pub use entry::IFDEntry;
pub use ifd::{PhotoInterp, IFD};
pub use on_demand::OnDemandOffsetArray;
pub use parser::{DirectoryReader, TiffParser};
pub use rational::Rational;
pub use saver::{make_valid_ifd, PendingPlaneWrite, TiffSaver};
pub use tags::FieldType;
pub use types::{Tiff, TiffHeader};
pub use value::{TagValue, ValueKind};

/// TIFF magic number (42)
pub const TIFF_MAGIC: u16 = 42;

/// BigTIFF magic number (43)
pub const BIGTIFF_MAGIC: u16 = 43;
