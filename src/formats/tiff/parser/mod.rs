//! Read-side directory parser
//!
//! [`TiffParser`] owns a shared stream and resolves directories from it.
//! The decoding itself lives in [`DirectoryReader`], which works over any
//! borrowed `Read + Seek` and is what the saver uses on its own output.

mod values;

pub use values::{read_header, DirectoryReader};

use std::fs::File;
use std::path::Path;
use std::sync::MutexGuard;

use crate::error::{Error, Result};
use crate::formats::tiff::on_demand::OnDemandOffsetArray;
use crate::formats::tiff::tags::FieldType;
use crate::formats::tiff::types::{Tiff, TiffHeader};
use crate::formats::tiff::value::TagValue;
use crate::formats::tiff::{IFDEntry, IFD};
use crate::io::{shared, SeekableReader, SharedReader};

/// BigTIFF offset tables with more values than this are read on demand
pub const DEFAULT_ON_DEMAND_THRESHOLD: usize = 1024;

/// TIFF file parser over a shared stream
pub struct TiffParser {
    stream: SharedReader,
    header: TiffHeader,
    on_demand_threshold: Option<usize>,
}

impl TiffParser {
    /// Opens a file and reads its header
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(File::open(path)?)
    }

    pub fn new<R: SeekableReader + 'static>(reader: R) -> Result<Self> {
        Self::from_shared(shared(reader))
    }

    /// Wraps an already shared stream; the header is read immediately
    pub fn from_shared(stream: SharedReader) -> Result<Self> {
        let header = {
            let mut guard = lock(&stream)?;
            read_header(&mut *guard)?
        };
        Ok(Self {
            stream,
            header,
            on_demand_threshold: Some(DEFAULT_ON_DEMAND_THRESHOLD),
        })
    }

    pub fn header(&self) -> TiffHeader {
        self.header
    }

    pub fn is_big_tiff(&self) -> bool {
        self.header.big_tiff
    }

    /// Sets the table size above which BigTIFF offset tables stay on disk
    ///
    /// `None` reads every table eagerly.
    pub fn set_on_demand_threshold(&mut self, threshold: Option<usize>) {
        self.on_demand_threshold = threshold;
    }

    fn with_reader<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut DirectoryReader<'_, dyn SeekableReader>) -> Result<T>,
    {
        let mut guard = lock(&self.stream)?;
        let mut reader = DirectoryReader::new(&mut *guard, self.header);
        f(&mut reader)
    }

    /// Offsets of every directory in file order
    pub fn ifd_offsets(&self) -> Result<Vec<u64>> {
        self.with_reader(|r| r.ifd_offsets())
    }

    /// Raw entries of the directory at `offset`
    pub fn entries(&self, offset: u64) -> Result<Vec<IFDEntry>> {
        self.with_reader(|r| r.entries(offset))
    }

    /// Decodes one entry's payload
    pub fn read_value(&self, entry: &IFDEntry) -> Result<TagValue> {
        self.with_reader(|r| r.read_value(entry))
    }

    fn defers(&self, entry: &IFDEntry) -> bool {
        self.header.big_tiff
            && matches!(entry.field_type(), Some(FieldType::Long8 | FieldType::Ifd8))
            && self
                .on_demand_threshold
                .is_some_and(|limit| entry.count > limit as u64)
    }

    /// Resolves the directory at `offset`
    pub fn ifd(&self, offset: u64) -> Result<IFD> {
        let order = self.header.byte_order;
        self.with_reader(|r| {
            let entries = r.entries(offset)?;
            let mut ifd = r.empty_ifd(offset);
            for entry in &entries {
                let value = if self.defers(entry) {
                    r.check_payload(entry)?;
                    TagValue::OnDemand(OnDemandOffsetArray::new(
                        self.stream.clone(),
                        entry.value_offset,
                        entry.count as usize,
                        order,
                    ))
                } else {
                    r.read_value(entry)?
                };
                ifd.put_value(entry.tag, value);
            }
            Ok(ifd)
        })
    }

    /// Resolves every directory
    pub fn ifds(&self) -> Result<Vec<IFD>> {
        self.ifd_offsets()?
            .into_iter()
            .map(|offset| self.ifd(offset))
            .collect()
    }

    pub fn first_ifd(&self) -> Result<Option<IFD>> {
        match self.ifd_offsets()?.first() {
            Some(&offset) => Ok(Some(self.ifd(offset)?)),
            None => Ok(None),
        }
    }

    /// Reads the header and all directories
    pub fn read(&self) -> Result<Tiff> {
        let mut tiff = Tiff::new(self.header);
        for ifd in self.ifds()? {
            tiff.add_ifd(ifd);
        }
        Ok(tiff)
    }
}

fn lock(stream: &SharedReader) -> Result<MutexGuard<'_, dyn SeekableReader + 'static>> {
    stream
        .lock()
        .map_err(|_| Error::InvalidFormat("Parser stream lock poisoned".to_string()))
}
