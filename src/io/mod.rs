//! I/O utilities for tiff-saver
//!
//! Provides the byte-order aware primitives shared by the parser and the
//! writer.

pub mod traits;
pub mod byte_order;
pub mod sink;

pub use traits::{shared, with_position, OutputSink, SeekableReader, SharedReader};
pub use byte_order::ByteOrder;
pub use sink::DataSink;
