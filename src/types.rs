//! Core data types for tiff-saver

use crate::error::{Error, Result};

/// Canonical pixel sample types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelType {
    /// Signed 8-bit integer
    Int8,
    /// Unsigned 8-bit integer
    Uint8,
    /// Signed 16-bit integer
    Int16,
    /// Unsigned 16-bit integer
    Uint16,
    /// Signed 32-bit integer
    Int32,
    /// Unsigned 32-bit integer
    Uint32,
    /// 32-bit floating point
    Float,
    /// 64-bit floating point
    Double,
}

impl PixelType {
    /// Returns the size in bytes of one sample of this type
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelType::Int8 | PixelType::Uint8 => 1,
            PixelType::Int16 | PixelType::Uint16 => 2,
            PixelType::Int32 | PixelType::Uint32 | PixelType::Float => 4,
            PixelType::Double => 8,
        }
    }

    /// Returns whether this is a floating point type
    pub fn is_floating_point(&self) -> bool {
        matches!(self, PixelType::Float | PixelType::Double)
    }

    /// Returns whether this is a signed integer or floating point type
    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            PixelType::Int8 | PixelType::Int16 | PixelType::Int32 | PixelType::Float | PixelType::Double
        )
    }

    /// Returns the SampleFormat tag value for this type (1=unsigned, 2=signed, 3=float)
    pub fn sample_format(&self) -> u16 {
        if self.is_floating_point() {
            3
        } else if self.is_signed() {
            2
        } else {
            1
        }
    }

    /// Returns the name of this pixel type
    pub fn name(&self) -> &'static str {
        match self {
            PixelType::Int8 => "int8",
            PixelType::Uint8 => "uint8",
            PixelType::Int16 => "int16",
            PixelType::Uint16 => "uint16",
            PixelType::Int32 => "int32",
            PixelType::Uint32 => "uint32",
            PixelType::Float => "float",
            PixelType::Double => "double",
        }
    }
}

/// Represents image dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    /// Width in pixels
    pub width: u64,
    /// Height in pixels
    pub height: u64,
}

impl Dimensions {
    /// Creates new dimensions
    pub fn new(width: u64, height: u64) -> Self {
        Self { width, height }
    }

    /// Returns the total number of pixels
    pub fn pixel_count(&self) -> u64 {
        self.width * self.height
    }
}

/// A rectangle of a plane, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u64,
    pub y: u64,
    pub width: u64,
    pub height: u64,
}

impl Region {
    /// Creates a new region
    pub fn new(x: u64, y: u64, width: u64, height: u64) -> Self {
        Self { x, y, width, height }
    }

    /// Region covering a whole plane of the given dimensions
    pub fn full(dims: Dimensions) -> Self {
        Self::new(0, 0, dims.width, dims.height)
    }

    /// Returns the total number of pixels
    pub fn pixel_count(&self) -> u64 {
        self.width * self.height
    }

    /// Validates that this region lies within a plane of the given dimensions
    pub fn check_within(&self, dims: Dimensions) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidFormat(format!(
                "Region {}x{} is empty",
                self.width, self.height
            )));
        }
        if self.x + self.width > dims.width || self.y + self.height > dims.height {
            return Err(Error::OutOfBounds(format!(
                "Region ({}, {}) {}x{} outside image bounds ({}, {})",
                self.x, self.y, self.width, self.height, dims.width, dims.height
            )));
        }
        Ok(())
    }
}
