mod buffered;
mod factory;
mod file;

pub use buffered::BufferedReader;
pub use factory::{ReaderBuilder, ReaderFactory};
pub use file::FileReader;

use crate::Result;

/// A named, seekable byte source.
///
/// Implementations are expected to *fill* on [`Reader::read`]: a call only
/// returns fewer bytes than requested when the end of the stream was reached.
pub trait Reader {
    fn open(&mut self, uri: &str) -> Result<()>;
    fn close(&mut self) -> Result<()>;

    fn content_length(&self) -> Result<u64>;
    fn current_position(&self) -> Result<u64>;
    fn eof(&self) -> bool;
    fn uri(&self) -> &str;
    /// Clear a sticky end-of-stream or error condition so that
    /// following seeks and reads behave normally
    fn clear_errors(&mut self);

    fn seek_absolute(&mut self, position: u64) -> Result<()>;
    fn seek_relative(&mut self, offset: i64) -> Result<()>;
    /// Read up to `buf.len()` bytes, returning how many were copied.
    /// Zero means end of stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    fn read_all_data(&mut self) -> Result<Vec<u8>>;
}

impl<R: Reader + ?Sized> Reader for Box<R> {
    fn open(&mut self, uri: &str) -> Result<()> {
        (**self).open(uri)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn content_length(&self) -> Result<u64> {
        (**self).content_length()
    }

    fn current_position(&self) -> Result<u64> {
        (**self).current_position()
    }

    fn eof(&self) -> bool {
        (**self).eof()
    }

    fn uri(&self) -> &str {
        (**self).uri()
    }

    fn clear_errors(&mut self) {
        (**self).clear_errors()
    }

    fn seek_absolute(&mut self, position: u64) -> Result<()> {
        (**self).seek_absolute(position)
    }

    fn seek_relative(&mut self, offset: i64) -> Result<()> {
        (**self).seek_relative(offset)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn read_all_data(&mut self) -> Result<Vec<u8>> {
        (**self).read_all_data()
    }
}

/// Keep reading from `reader` until `buf` is full or the reader reports
/// the end of the stream.
pub(crate) fn read_fully<R: Reader + ?Sized>(
    reader: &mut R,
    buf: &mut [u8],
) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let read = reader.read(&mut buf[filled..])?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    Ok(filled)
}
