//! Core I/O traits

use std::io::{Read, Result, Seek, SeekFrom, Write};
use std::sync::{Arc, Mutex};

/// Trait for readers that support both reading and seeking operations
///
/// Automatically implemented for any type that implements [`Read`], [`Seek`]
/// and [`Send`].
pub trait SeekableReader: Read + Seek + Send {}

impl<T: Read + Seek + Send> SeekableReader for T {}

/// Trait for outputs the saver can write to and re-read
///
/// Random-access writes re-parse what is already on disk, so the sink must be
/// readable as well as writable.
pub trait OutputSink: Read + Write + Seek + Send {}

impl<T: Read + Write + Seek + Send> OutputSink for T {}

/// A positional stream shared between several lazy views
pub type SharedReader = Arc<Mutex<dyn SeekableReader>>;

/// Wraps a reader into a [`SharedReader`]
pub fn shared<R: SeekableReader + 'static>(reader: R) -> SharedReader {
    Arc::new(Mutex::new(reader))
}

/// Runs `f` with the stream positioned at `pos`, then restores the previous
/// position
///
/// The previous position is restored even when `f` fails.
pub fn with_position<S, T, F>(stream: &mut S, pos: u64, f: F) -> Result<T>
where
    S: Seek + ?Sized,
    F: FnOnce(&mut S) -> Result<T>,
{
    let saved = stream.stream_position()?;
    stream.seek(SeekFrom::Start(pos))?;
    let result = f(stream);
    stream.seek(SeekFrom::Start(saved))?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_cursor_implements_seekable_reader() {
        fn accepts_seekable<R: SeekableReader>(_r: R) {}
        accepts_seekable(Cursor::new(vec![1u8, 2, 3, 4]));
    }

    #[test]
    fn test_cursor_implements_output_sink() {
        fn accepts_sink<W: OutputSink>(_w: W) {}
        accepts_sink(Cursor::new(Vec::<u8>::new()));
    }

    #[test]
    fn test_seek_operations() {
        let mut reader: Box<dyn SeekableReader> = Box::new(Cursor::new(vec![0x10u8, 0x20, 0x30, 0x40]));
        reader.seek(SeekFrom::Start(2)).unwrap();

        let mut buf = [0u8; 1];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(buf[0], 0x30);
    }

    #[test]
    fn test_with_position_restores() {
        let mut cursor = Cursor::new(vec![0x10u8, 0x20, 0x30, 0x40]);
        cursor.seek(SeekFrom::Start(1)).unwrap();

        let value = with_position(&mut cursor, 3, |c| {
            let mut buf = [0u8; 1];
            c.read_exact(&mut buf)?;
            Ok(buf[0])
        })
        .unwrap();

        assert_eq!(value, 0x40);
        assert_eq!(cursor.position(), 1);
    }

    #[test]
    fn test_with_position_restores_on_error() {
        let mut cursor = Cursor::new(vec![0x10u8, 0x20]);
        let result = with_position(&mut cursor, 1, |c| {
            let mut buf = [0u8; 4];
            c.read_exact(&mut buf)
        });

        assert!(result.is_err());
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_shared_reader_locks() {
        let stream = shared(Cursor::new(vec![1u8, 2, 3]));
        let mut guard = stream.lock().unwrap();
        let mut buf = [0u8; 3];
        guard.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3]);
    }
}
