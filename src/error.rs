//! Error types for tiff-saver

use std::io;
use thiserror::Error;

use crate::formats::tiff::tags;

/// Result type for tiff-saver operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while writing, parsing or editing TIFF files
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the underlying sink or source
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed geometry or directory contents
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Invalid byte order marker
    #[error("Invalid byte order: 0x{0:04X}")]
    InvalidByteOrder(u16),

    /// Invalid TIFF magic number
    #[error("Invalid TIFF magic number: {0}")]
    InvalidMagic(u16),

    /// Required tag is absent and no default rule applies
    #[error("Missing required tag: {0}")]
    MissingTag(u16),

    /// Targeted overwrite found no entry for the tag
    #[error("Tag not found ({name}, {tag})")]
    TagNotFound { tag: u16, name: &'static str },

    /// A stored value cannot be coerced into the requested shape
    #[error("{name} directory entry is the wrong type (got {found}, expected {expected})")]
    TypeMismatch {
        name: &'static str,
        found: &'static str,
        expected: &'static str,
    },

    /// The serializer cannot classify a value into a field type
    #[error("Unknown IFD value type: {0}")]
    UnsupportedValue(String),

    /// Unsupported feature
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Invalid IFD or payload offset
    #[error("Invalid offset: {0}")]
    InvalidOffset(u64),

    /// Out of bounds access
    #[error("Out of bounds: {0}")]
    OutOfBounds(String),

    /// Directory index past the end of the chain
    #[error("No such IFD ({index} of {count})")]
    NoSuchIfd { index: usize, count: usize },
}

impl Error {
    /// Builds a [`Error::TagNotFound`] carrying the tag's display name
    pub fn tag_not_found(tag: u16) -> Self {
        Error::TagNotFound {
            tag,
            name: tags::tag_name(tag),
        }
    }

    /// Builds a [`Error::TypeMismatch`] for the given tag
    pub fn type_mismatch(tag: u16, found: &'static str, expected: &'static str) -> Self {
        Error::TypeMismatch {
            name: tags::tag_name(tag),
            found,
            expected,
        }
    }
}
