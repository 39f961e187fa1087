//! In-place edits of directories that are already on disk
//!
//! An edit never moves unrelated bytes. A new value that no longer fits
//! where the old one was is appended to the end of the file and the old
//! payload is left behind unreferenced.

use tracing::debug;

use super::directory::{check_classic, EncodedEntry};
use super::TiffSaver;
use crate::error::{Error, Result};
use crate::formats::tiff::parser::{read_header, DirectoryReader};
use crate::formats::tiff::{tags, TagValue};
use crate::io::OutputSink;

/// Where an overwritten value's payload goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Policy {
    /// Fits the entry's value slot
    Inline,
    /// The old payload ends the file and is simply overwritten
    AtEndOfFile,
    /// Fits in the old payload's bytes
    InPlace,
    /// Appended; the old payload is orphaned
    Append,
}

impl<W: OutputSink> TiffSaver<W> {
    /// Replaces the value of `tag` in directory `ifd_index`
    ///
    /// The tag must already be present. The header's byte order and width
    /// mode are used for the new value, whatever the saver is configured
    /// with.
    pub fn overwrite_ifd_value<V: Into<TagValue>>(&self, ifd_index: usize, tag: u16, value: V) -> Result<()> {
        let value = value.into();
        let mut state = self.lock()?;
        let out = &mut state.out;

        let header = read_header(out.get_mut())?;
        out.set_order(header.byte_order);
        let big = header.big_tiff;

        let (offset, position, old) = {
            let mut reader = DirectoryReader::new(out.get_mut(), header);
            let offsets = reader.ifd_offsets()?;
            let Some(&offset) = offsets.get(ifd_index) else {
                return Err(Error::NoSuchIfd {
                    index: ifd_index,
                    count: offsets.len(),
                });
            };
            let entries = reader.entries(offset)?;
            let Some(index) = entries.iter().position(|e| e.tag == tag) else {
                return Err(Error::tag_not_found(tag));
            };
            let position = offset + header.count_size() + index as u64 * header.entry_size();
            (offset, position, entries[index].clone())
        };

        let encoded = EncodedEntry::encode(tag, &value, header.byte_order, big)?;
        let file_len = out.length()?;
        let payload_len = encoded.payload.len() as u64;
        let old_external = !old.is_inline(big);

        let policy = if encoded.inline {
            Policy::Inline
        } else if old_external && old.value_offset + old.payload_len() == file_len {
            Policy::AtEndOfFile
        } else if old_external && payload_len <= old.payload_len() {
            Policy::InPlace
        } else {
            Policy::Append
        };
        let value_offset = match policy {
            Policy::Inline => 0,
            Policy::AtEndOfFile | Policy::InPlace => old.value_offset,
            Policy::Append => file_len,
        };
        check_classic(value_offset + payload_len, big, "File size")?;
        debug!(
            "Overwriting {} in IFD {} at {}: {:?}, {} bytes at {}",
            tags::tag_name(tag),
            ifd_index,
            offset,
            policy,
            payload_len,
            value_offset
        );

        // the tag itself is unchanged
        out.seek_to(position + 2)?;
        encoded.write_type_count_value(out, value_offset, big)?;
        if !encoded.inline {
            out.seek_to(value_offset)?;
            out.write_bytes(&encoded.payload)?;
        }
        Ok(())
    }

    /// Replaces the ImageDescription of the first directory
    pub fn overwrite_comment<S: Into<String>>(&self, comment: S) -> Result<()> {
        self.overwrite_ifd_value(0, tags::IMAGE_DESCRIPTION, TagValue::Text(comment.into()))
    }

    /// Zeroes the next-directory pointer of the last directory
    ///
    /// Closes a chain left open by sequential writes that never flagged a
    /// plane as the last one.
    pub fn overwrite_last_ifd_offset(&self) -> Result<()> {
        let mut state = self.lock()?;
        let out = &mut state.out;
        let header = read_header(out.get_mut())?;
        out.set_order(header.byte_order);

        let position = {
            let mut reader = DirectoryReader::new(out.get_mut(), header);
            let offsets = reader.ifd_offsets()?;
            let Some(&last) = offsets.last() else {
                return Ok(());
            };
            reader.next_pointer_position(last)?
        };
        out.seek_to(position)?;
        out.write_offset(0, header.big_tiff)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::formats::tiff::{tags, TagValue, TiffParser, TiffSaver, IFD};
    use crate::types::PixelType;
    use std::io::Cursor;

    /// A finalized one-plane file described as "short"
    fn saved_file(big_tiff: bool) -> Vec<u8> {
        let mut saver = TiffSaver::in_memory();
        saver.set_big_tiff(big_tiff);
        let mut ifd = IFD::new();
        ifd.put_value(tags::IMAGE_WIDTH, 2u32);
        ifd.put_value(tags::IMAGE_LENGTH, 2u32);
        ifd.put_value(tags::IMAGE_DESCRIPTION, "short");
        saver.write_image(&[1, 2, 3, 4], &mut ifd, 0, PixelType::Uint8, true).unwrap();
        saver.into_inner().unwrap().into_inner()
    }

    fn reopen(data: Vec<u8>) -> TiffSaver<Cursor<Vec<u8>>> {
        TiffSaver::new(Cursor::new(data))
    }

    fn comment_of(data: &[u8], index: usize) -> Option<String> {
        let parser = TiffParser::new(Cursor::new(data.to_vec())).unwrap();
        parser.ifds().unwrap()[index].comment()
    }

    #[test]
    fn test_longer_text_is_appended_and_old_bytes_orphaned() {
        let data = saved_file(false);
        let len = data.len();
        let saver = reopen(data);
        saver.overwrite_comment("a much longer description").unwrap();
        let data = saver.into_inner().unwrap().into_inner();

        assert!(data.len() > len);
        assert_eq!(comment_of(&data, 0).as_deref(), Some("a much longer description"));
        assert!(data.windows(6).any(|w| w == b"short\0"));

        let ifd = TiffParser::new(Cursor::new(data)).unwrap().first_ifd().unwrap().unwrap();
        assert_eq!(ifd.image_width().unwrap(), 2);
        assert_eq!(ifd.strip_byte_counts().unwrap(), Some(vec![2, 2]));
    }

    #[test]
    fn test_shorter_text_keeps_file_length() {
        let data = saved_file(false);
        let len = data.len();
        let saver = reopen(data);
        saver.overwrite_comment("tiny").unwrap();
        let data = saver.into_inner().unwrap().into_inner();

        assert_eq!(data.len(), len);
        assert_eq!(comment_of(&data, 0).as_deref(), Some("tiny"));
    }

    #[test]
    fn test_same_length_text_keeps_file_length() {
        let data = saved_file(false);
        let len = data.len();
        let saver = reopen(data);
        saver.overwrite_comment("SHORT").unwrap();
        let data = saver.into_inner().unwrap().into_inner();
        assert_eq!(data.len(), len);
        assert_eq!(comment_of(&data, 0).as_deref(), Some("SHORT"));
    }

    #[test]
    fn test_payload_at_end_of_file_grows_in_place() {
        let data = saved_file(false);
        let saver = reopen(data);
        saver.overwrite_comment("a much longer description").unwrap();
        let grown = saver.into_inner().unwrap().into_inner();

        let saver = reopen(grown.clone());
        saver.overwrite_comment("an even longer description than before").unwrap();
        let data = saver.into_inner().unwrap().into_inner();
        assert_eq!(data.len(), grown.len() + 13);
        assert_eq!(
            comment_of(&data, 0).as_deref(),
            Some("an even longer description than before")
        );
    }

    #[test]
    fn test_inline_value_patched_in_entry() {
        let data = saved_file(false);
        let len = data.len();
        let saver = reopen(data);
        saver.overwrite_ifd_value(0, tags::IMAGE_WIDTH, 7u32).unwrap();
        let data = saver.into_inner().unwrap().into_inner();
        assert_eq!(data.len(), len);

        let ifd = TiffParser::new(Cursor::new(data)).unwrap().first_ifd().unwrap().unwrap();
        assert_eq!(ifd.image_width().unwrap(), 7);
        assert_eq!(ifd.comment().as_deref(), Some("short"));
    }

    #[test]
    fn test_overwrite_big_tiff() {
        let data = saved_file(true);
        let saver = reopen(data);
        saver.overwrite_comment("longer than eight bytes").unwrap();
        let data = saver.into_inner().unwrap().into_inner();
        let parser = TiffParser::new(Cursor::new(data.clone())).unwrap();
        assert!(parser.is_big_tiff());
        assert_eq!(comment_of(&data, 0).as_deref(), Some("longer than eight bytes"));
    }

    #[test]
    fn test_missing_tag() {
        let saver = reopen(saved_file(false));
        let err = saver.overwrite_ifd_value(0, tags::ARTIST, "me").unwrap_err();
        assert!(matches!(err, Error::TagNotFound { tag: tags::ARTIST, .. }));
    }

    #[test]
    fn test_missing_ifd() {
        let saver = reopen(saved_file(false));
        let err = saver
            .overwrite_ifd_value(3, tags::IMAGE_DESCRIPTION, TagValue::Text("x".into()))
            .unwrap_err();
        assert!(matches!(err, Error::NoSuchIfd { index: 3, count: 1 }));
    }

    #[test]
    fn test_close_open_chain() {
        let mut saver = TiffSaver::in_memory();
        saver.set_writing_sequentially(true);
        let mut ifd = IFD::new();
        ifd.put_value(tags::IMAGE_WIDTH, 2u32);
        ifd.put_value(tags::IMAGE_LENGTH, 1u32);
        saver.write_image(&[1, 2], &mut ifd, 0, PixelType::Uint8, false).unwrap();
        saver.overwrite_last_ifd_offset().unwrap();

        let data = saver.into_inner().unwrap().into_inner();
        let offset = ifd.offset().unwrap() as usize;
        let count = u16::from_le_bytes([data[offset], data[offset + 1]]) as usize;
        let next_at = offset + 2 + count * 12;
        assert_eq!(&data[next_at..next_at + 4], &[0, 0, 0, 0]);
    }
}
