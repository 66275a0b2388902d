use super::{BufferedReader, FileReader, Reader};
use crate::Result;

/// Creates readers for the uris it recognises, e.g. a scheme prefix.
pub trait ReaderBuilder: Send + Sync {
    fn supports_uri(&self, uri: &str) -> bool;
    fn build(&self, uri: &str) -> Box<dyn Reader>;
}

/// Picks a [`Reader`] implementation for a uri.
///
/// Builders are consulted in registration order; a uri none of them
/// supports is read from the local filesystem.
#[derive(Default)]
pub struct ReaderFactory {
    builders: Vec<Box<dyn ReaderBuilder>>,
}

impl ReaderFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_builder(&mut self, builder: Box<dyn ReaderBuilder>) {
        self.builders.push(builder);
    }

    /// The returned reader is not opened yet
    pub fn create(&self, uri: &str) -> Box<dyn Reader> {
        match self
            .builders
            .iter()
            .find(|builder| builder.supports_uri(uri))
        {
            Some(builder) => {
                log::trace!("{}: using a registered reader builder", uri);
                builder.build(uri)
            }
            None => Box::new(FileReader::new()),
        }
    }

    pub fn create_buffered(
        &self,
        uri: &str,
        buffer_size: usize,
    ) -> Result<BufferedReader<Box<dyn Reader>>> {
        BufferedReader::new(self.create(uri), buffer_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UtilsError;
    use tempdir::TempDir;

    /// Serves a fixed payload for `mem://` uris
    struct MemoryBuilder;

    struct MemoryReader {
        uri: String,
        data: Vec<u8>,
        position: usize,
    }

    impl Reader for MemoryReader {
        fn open(&mut self, uri: &str) -> Result<()> {
            self.uri = uri.to_owned();
            self.position = 0;
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            Ok(())
        }

        fn content_length(&self) -> Result<u64> {
            Ok(self.data.len() as u64)
        }

        fn current_position(&self) -> Result<u64> {
            Ok(self.position as u64)
        }

        fn eof(&self) -> bool {
            self.position >= self.data.len()
        }

        fn uri(&self) -> &str {
            &self.uri
        }

        fn clear_errors(&mut self) {}

        fn seek_absolute(&mut self, position: u64) -> Result<()> {
            self.position = position as usize;
            Ok(())
        }

        fn seek_relative(&mut self, offset: i64) -> Result<()> {
            self.position = (self.position as i64 + offset) as usize;
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            let start = self.position.min(self.data.len());
            let count = buf.len().min(self.data.len() - start);
            buf[..count].copy_from_slice(&self.data[start..start + count]);
            self.position += count;
            Ok(count)
        }

        fn read_all_data(&mut self) -> Result<Vec<u8>> {
            Ok(self.data.clone())
        }
    }

    impl ReaderBuilder for MemoryBuilder {
        fn supports_uri(&self, uri: &str) -> bool {
            uri.starts_with("mem://")
        }

        fn build(&self, _uri: &str) -> Box<dyn Reader> {
            Box::new(MemoryReader {
                uri: String::new(),
                data: b"in memory".to_vec(),
                position: 0,
            })
        }
    }

    #[test]
    fn unknown_uri_falls_back_to_file_reader() {
        let dir = TempDir::new("reader_factory").unwrap();
        let path = dir.path().join("plain.txt");
        std::fs::write(&path, b"on disk").unwrap();

        let mut factory = ReaderFactory::new();
        factory.register_builder(Box::new(MemoryBuilder));

        let mut reader = factory.create(path.to_str().unwrap());
        reader.open(path.to_str().unwrap()).unwrap();
        assert_eq!(reader.read_all_data().unwrap(), b"on disk");
    }

    #[test]
    fn registered_builder_is_used_for_supported_uri() {
        let mut factory = ReaderFactory::new();
        factory.register_builder(Box::new(MemoryBuilder));

        let mut reader = factory.create("mem://payload");
        reader.open("mem://payload").unwrap();
        assert_eq!(reader.content_length().unwrap(), 9);
        assert_eq!(reader.read_all_data().unwrap(), b"in memory");
    }

    #[test]
    fn buffered_reader_from_factory() {
        let mut factory = ReaderFactory::new();
        factory.register_builder(Box::new(MemoryBuilder));

        let mut reader = factory.create_buffered("mem://payload", 4).unwrap();
        reader.open("mem://payload").unwrap();

        let mut buf = [0u8; 2];
        reader.seek_absolute(3).unwrap();
        assert_eq!(reader.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf, b"me");
        assert_eq!(reader.capacity(), 4);
    }

    #[test]
    fn buffered_reader_needs_capacity() {
        let factory = ReaderFactory::new();
        let result = factory.create_buffered("anything", 0);
        assert!(matches!(result, Err(UtilsError::InvalidArgument(_))));
    }

    #[test]
    fn missing_file_fails_on_open() {
        let factory = ReaderFactory::new();
        let mut reader = factory.create("/definitely/not/here.bin");
        assert!(matches!(
            reader.open("/definitely/not/here.bin"),
            Err(UtilsError::OpenFailure { .. })
        ));
    }
}
