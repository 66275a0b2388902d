use std::io::{self, SeekFrom};

use super::{read_fully, Reader};
use crate::{Result, UtilsError};

/// Decorator over a [`Reader`] that serves small reads from a single
/// fixed-size lookahead buffer.
///
/// The buffer holds the stream bytes `[buffer_start, buffer_start +
/// buffer_len)`. While `buffer_filled` is set, `position` lies inside that
/// window and `buffer_offset == position - buffer_start`. Seeking never
/// performs I/O: it moves the offset when the target stays inside the
/// window and invalidates the buffer otherwise.
///
/// Not thread-safe; meant for one consumer walking through one stream.
pub struct BufferedReader<R> {
    reader: R,
    buffer: Vec<u8>,
    buffer_len: usize,
    buffer_start: u64,
    buffer_offset: usize,
    position: u64,
    content_length: u64,
    buffer_filled: bool,
}

impl<R: Reader> BufferedReader<R> {
    /// Wrap `reader`, which is owned (and closed) by the buffered reader
    /// from now on. `capacity` is the lookahead buffer size in bytes.
    pub fn new(reader: R, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(UtilsError::InvalidArgument(
                "buffer capacity must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            reader,
            buffer: vec![0; capacity],
            buffer_len: 0,
            buffer_start: 0,
            buffer_offset: 0,
            position: 0,
            content_length: 0,
            buffer_filled: false,
        })
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    fn update_offsets_after_seek(&mut self, new_position: u64) {
        let window_end = self.buffer_start + self.buffer_len as u64;
        if self.buffer_filled
            && new_position >= self.buffer_start
            && new_position < window_end
        {
            self.buffer_offset = (new_position - self.buffer_start) as usize;
        } else {
            self.buffer_filled = false;
        }

        self.position = new_position;
    }

    /// Load the buffer with the bytes starting at the current position.
    /// The buffer bookkeeping is left to the caller.
    fn refill(&mut self) -> Result<usize> {
        self.reader.seek_absolute(self.position)?;
        let read = read_fully(&mut self.reader, &mut self.buffer)?;
        self.buffer_len = read;
        log::trace!(
            "{}: buffered {} bytes at offset {}",
            self.reader.uri(),
            read,
            self.position
        );
        Ok(read)
    }

    /// Copy the first `count` bytes of a freshly loaded buffer into `dest`
    /// and make the buffer current at `start + count`.
    fn consume_refill(&mut self, dest: &mut [u8], start: u64, count: usize) {
        dest[..count].copy_from_slice(&self.buffer[..count]);
        self.buffer_start = start;
        self.buffer_offset = count;
        self.position = start + count as u64;
        // a refill that was consumed completely is as good as no buffer
        self.buffer_filled = count < self.buffer_len;
    }

    /// Bypass the buffer for requests at least as large as the buffer
    fn read_direct(&mut self, dest: &mut [u8]) -> Result<usize> {
        self.reader.seek_absolute(self.position)?;
        let read = read_fully(&mut self.reader, dest)?;
        self.position += read as u64;
        Ok(read)
    }
}

impl<R: Reader> Reader for BufferedReader<R> {
    fn open(&mut self, uri: &str) -> Result<()> {
        self.reader.open(uri)?;
        self.content_length = self.reader.content_length()?;
        self.buffer_len = 0;
        self.buffer_start = 0;
        self.buffer_offset = 0;
        self.position = 0;
        self.buffer_filled = false;

        log::debug!(
            "{}: opened with a {} byte buffer ({} bytes of content)",
            uri,
            self.buffer.len(),
            self.content_length
        );
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.buffer_filled = false;
        self.reader.close()
    }

    fn content_length(&self) -> Result<u64> {
        Ok(self.content_length)
    }

    fn current_position(&self) -> Result<u64> {
        Ok(self.position)
    }

    fn eof(&self) -> bool {
        self.position >= self.content_length
    }

    fn uri(&self) -> &str {
        self.reader.uri()
    }

    fn clear_errors(&mut self) {
        self.reader.clear_errors();
    }

    fn seek_absolute(&mut self, position: u64) -> Result<()> {
        self.update_offsets_after_seek(position);
        Ok(())
    }

    fn seek_relative(&mut self, offset: i64) -> Result<()> {
        let position =
            self.position
                .checked_add_signed(offset)
                .ok_or_else(|| UtilsError::SeekFailure {
                    uri: self.reader.uri().to_owned(),
                    reason: format!(
                        "offset {} from {} is out of range",
                        offset, self.position
                    ),
                })?;
        self.update_offsets_after_seek(position);
        Ok(())
    }

    fn read(&mut self, dest: &mut [u8]) -> Result<usize> {
        if self.eof() {
            return Ok(0);
        }

        let size = dest.len();
        let capacity = self.buffer.len();

        if !self.buffer_filled {
            if size >= capacity {
                return self.read_direct(dest);
            }

            let start = self.position;
            let read = self.refill()?;
            if read == 0 {
                return Ok(0);
            }

            let count = read.min(size);
            self.consume_refill(dest, start, count);
            return Ok(count);
        }

        let available = self.buffer_len - self.buffer_offset;
        if size < available {
            let from = self.buffer_offset;
            dest.copy_from_slice(&self.buffer[from..from + size]);
            self.position += size as u64;
            self.buffer_offset += size;
            return Ok(size);
        }

        // hand out what is left in the buffer before touching the reader
        let from = self.buffer_offset;
        dest[..available].copy_from_slice(&self.buffer[from..self.buffer_len]);
        self.position += available as u64;
        self.buffer_filled = false;

        let remainder = size - available;
        if remainder == 0 {
            return Ok(available);
        }

        if remainder < capacity {
            let start = self.position;
            let read = self.refill()?;
            let count = read.min(remainder);
            if count > 0 {
                self.consume_refill(&mut dest[available..], start, count);
            }
            return Ok(available + count);
        }

        let read = self.read_direct(&mut dest[available..])?;
        Ok(available + read)
    }

    fn read_all_data(&mut self) -> Result<Vec<u8>> {
        let data = self.reader.read_all_data()?;
        let end = self.content_length;
        self.update_offsets_after_seek(end);
        Ok(data)
    }
}

impl<R: Reader> io::Read for BufferedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Reader::read(self, buf)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}

impl<R: Reader> io::Seek for BufferedReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(position) => Some(position),
            SeekFrom::Current(offset) => self.position.checked_add_signed(offset),
            SeekFrom::End(offset) => {
                self.content_length.checked_add_signed(offset)
            }
        }
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )
        })?;

        self.update_offsets_after_seek(target);
        Ok(target)
    }
}
