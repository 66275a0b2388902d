use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};

use super::Reader;
use crate::{Result, UtilsError};

/// [`Reader`] over a file on the local filesystem.
///
/// The end-of-stream flag is sticky in the same way as for C++ streams:
/// it is raised by a read that hit the end of the file and stays raised
/// until [`Reader::clear_errors`] is called or the reader seeks.
#[derive(Debug, Default)]
pub struct FileReader {
    uri: String,
    file: Option<File>,
    eof: bool,
}

impl FileReader {
    pub fn new() -> Self {
        Self::default()
    }

    fn file(&self) -> Result<&File> {
        self.file.as_ref().ok_or(UtilsError::NotOpen)
    }

    fn read_failure(&self, reason: impl ToString) -> UtilsError {
        UtilsError::ReadFailure {
            uri: self.uri.clone(),
            reason: reason.to_string(),
        }
    }

    fn seek_failure(&self, reason: impl ToString) -> UtilsError {
        UtilsError::SeekFailure {
            uri: self.uri.clone(),
            reason: reason.to_string(),
        }
    }
}

impl Reader for FileReader {
    fn open(&mut self, uri: &str) -> Result<()> {
        let file =
            File::open(uri).map_err(|source| UtilsError::OpenFailure {
                uri: uri.to_owned(),
                source,
            })?;
        log::debug!("opened {} for reading", uri);

        self.uri = uri.to_owned();
        self.file = Some(file);
        self.eof = false;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.file.take().is_some() {
            log::debug!("closed {}", self.uri);
        }
        self.eof = false;
        Ok(())
    }

    fn content_length(&self) -> Result<u64> {
        Ok(self.file()?.metadata()?.len())
    }

    fn current_position(&self) -> Result<u64> {
        let mut file = self.file()?;
        file.stream_position()
            .map_err(|e| self.seek_failure(e))
    }

    fn eof(&self) -> bool {
        self.eof
    }

    fn uri(&self) -> &str {
        &self.uri
    }

    fn clear_errors(&mut self) {
        self.eof = false;
    }

    fn seek_absolute(&mut self, position: u64) -> Result<()> {
        self.clear_errors();
        let mut file = self.file()?;
        file.seek(SeekFrom::Start(position))
            .map_err(|e| self.seek_failure(e))?;
        Ok(())
    }

    fn seek_relative(&mut self, offset: i64) -> Result<()> {
        self.clear_errors();
        let mut file = self.file()?;
        file.seek(SeekFrom::Current(offset))
            .map_err(|e| self.seek_failure(e))?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut file = self.file()?;
        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(read) => filled += read,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.read_failure(e)),
            }
        }

        if filled < buf.len() {
            self.eof = true;
        }
        Ok(filled)
    }

    fn read_all_data(&mut self) -> Result<Vec<u8>> {
        let length = usize::try_from(self.content_length()?)
            .map_err(|e| self.read_failure(e))?;

        self.seek_absolute(0)?;
        let mut data = vec![0; length];
        if self.read(&mut data)? != length {
            return Err(self.read_failure("failed to read all file data"));
        }

        Ok(data)
    }
}
