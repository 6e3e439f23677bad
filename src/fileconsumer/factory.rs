// SPDX-License-Identifier: Apache-2.0

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::fileconsumer::clock::{Clock, SystemClock};
use crate::fileconsumer::config::{FileConsumerConfig, StartAt};
use crate::fileconsumer::error::{Error, Result};
use crate::fileconsumer::fingerprint::Fingerprint;
use crate::fileconsumer::metadata::Metadata;
use crate::fileconsumer::reader::{Reader, ReaderContext};
use crate::fileconsumer::sink::{self, Sink, TokenReceiver};

/// Builds fingerprints and readers that all share one configuration, sink
/// and clock.
#[derive(Clone)]
pub struct Factory {
    ctx: ReaderContext,
}

impl Factory {
    /// Create a factory that emits into `sink`
    pub fn new(config: FileConsumerConfig, sink: Arc<dyn Sink>) -> Result<Self> {
        config.validate().map_err(Error::Config)?;

        debug!(
            fingerprint_size = config.fingerprint_size,
            flush_period_ms = config.flush_period_ms,
            max_log_size = config.max_log_size,
            start_at = ?config.start_at,
            "File consumer factory created"
        );

        Ok(Self {
            ctx: ReaderContext {
                config: Arc::new(config),
                sink,
                clock: Arc::new(SystemClock),
            },
        })
    }

    /// Create a factory together with a bounded token channel of
    /// `sink_buffer_capacity` entries
    pub fn with_channel(config: FileConsumerConfig) -> Result<(Self, TokenReceiver)> {
        config.validate().map_err(Error::Config)?;

        let (tx, rx) = sink::channel(config.sink_buffer_capacity);
        let factory = Self::new(config, Arc::new(tx))?;
        Ok((factory, rx))
    }

    /// Use `clock` for flush-period decisions of every reader created afterwards
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.ctx.clock = clock;
        self
    }

    pub fn config(&self) -> &FileConsumerConfig {
        &self.ctx.config
    }

    /// Fingerprint of the file as it currently stands, independent of any
    /// reader's progress
    pub fn new_fingerprint(&self, file: &mut File) -> Result<Fingerprint> {
        Ok(Fingerprint::from_file(file, self.ctx.config.fingerprint_size)?)
    }

    /// Start a reader on a file nobody has read yet
    pub fn new_reader(
        &self,
        file: File,
        path: impl Into<PathBuf>,
        fingerprint: Fingerprint,
    ) -> Result<Reader> {
        let path = path.into();
        let mut metadata = Metadata::new(fingerprint);

        if self.ctx.config.start_at == StartAt::End {
            metadata.offset = file.metadata()?.len();
        }

        Ok(Reader::new(file, path, metadata, self.ctx.clone()))
    }

    /// Rebuild a reader from the state a previous reader closed with.
    ///
    /// Offset, pending bytes and fingerprint carry over. The fingerprint is
    /// brought to this factory's `fingerprint_size` on the next read.
    pub fn new_reader_from_metadata(
        &self,
        file: File,
        path: impl Into<PathBuf>,
        metadata: Metadata,
    ) -> Result<Reader> {
        let path = path.into();
        let len = file.metadata()?.len();

        if len < metadata.offset {
            warn!(
                path = ?path,
                offset = metadata.offset,
                len,
                "File is shorter than the restored offset"
            );
        }

        Ok(Reader::new(file, path, metadata, self.ctx.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fileconsumer::clock::ManualClock;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn test_factory_rejects_invalid_config() {
        let config = FileConsumerConfig::default().with_fingerprint_size(0);
        let err = Factory::with_channel(config).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_new_fingerprint_bounded_by_size() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[b'x'; 100]).unwrap();
        file.flush().unwrap();

        let (f, _rx) =
            Factory::with_channel(FileConsumerConfig::default().with_fingerprint_size(64)).unwrap();
        let fp = f.new_fingerprint(&mut file.reopen().unwrap()).unwrap();
        assert_eq!(fp.len(), 64);

        let (f, _rx) = Factory::with_channel(FileConsumerConfig::default()).unwrap();
        let fp = f.new_fingerprint(&mut file.reopen().unwrap()).unwrap();
        assert_eq!(fp.len(), 100);
    }

    #[test]
    fn test_new_fingerprint_io_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"testlog1\n").unwrap();
        file.flush().unwrap();

        let (f, _rx) = Factory::with_channel(FileConsumerConfig::default()).unwrap();
        let mut write_only = std::fs::OpenOptions::new()
            .write(true)
            .open(file.path())
            .unwrap();

        let err = f.new_fingerprint(&mut write_only).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_new_reader_from_metadata_past_eof() {
        let file = NamedTempFile::new().unwrap();
        let (f, rx) = Factory::with_channel(FileConsumerConfig::default()).unwrap();

        let metadata = Metadata {
            offset: 100,
            ..Metadata::new(Fingerprint::new(b"gone".to_vec()))
        };
        let mut reader = f
            .new_reader_from_metadata(file.reopen().unwrap(), file.path(), metadata)
            .unwrap();

        reader.read_to_end(&CancellationToken::new()).unwrap();
        assert_eq!(reader.offset(), 100);
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn test_new_reader_starts_at_beginning() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "existing content").unwrap();
        file.flush().unwrap();

        let (f, _rx) = Factory::with_channel(FileConsumerConfig::default()).unwrap();
        let fp = f.new_fingerprint(&mut file.reopen().unwrap()).unwrap();
        let reader = f
            .new_reader(file.reopen().unwrap(), file.path(), fp.clone())
            .unwrap();

        assert_eq!(reader.offset(), 0);
        assert_eq!(reader.pending_len(), 0);
        assert_eq!(reader.fingerprint(), &fp);
        assert_eq!(reader.path(), file.path());
    }

    #[test]
    fn test_new_reader_start_at_end() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "existing content").unwrap();
        file.flush().unwrap();

        let (f, rx) = Factory::with_channel(
            FileConsumerConfig::default()
                .with_start_at(StartAt::End)
                .with_fingerprint_size(1000),
        )
        .unwrap();
        let fp = f.new_fingerprint(&mut file.reopen().unwrap()).unwrap();
        let mut reader = f
            .new_reader(file.reopen().unwrap(), file.path(), fp)
            .unwrap();
        assert_eq!(reader.offset(), 17);

        // Should not read existing content
        reader.read_to_end(&CancellationToken::new()).unwrap();
        assert!(rx.try_recv().is_none());

        writeln!(file, "new line").unwrap();
        file.flush().unwrap();
        reader.read_to_end(&CancellationToken::new()).unwrap();
        assert_eq!(&rx.try_recv().unwrap().body[..], b"new line");
        assert_eq!(reader.offset(), 26);
    }

    #[test]
    fn test_new_reader_from_metadata_keeps_state() {
        let file = NamedTempFile::new().unwrap();
        let clock = Arc::new(ManualClock::default());
        let since = clock.now();

        let (f, _rx) = Factory::with_channel(
            FileConsumerConfig::default().with_flush_period(Duration::from_millis(5)),
        )
        .unwrap();
        let f = f.with_clock(clock);

        let metadata = Metadata {
            offset: 0,
            fingerprint: Fingerprint::new(b"abc".to_vec()),
            pending: b"abc".to_vec(),
            pending_since: Some(since),
            record_num: 7,
        };

        let reader = f
            .new_reader_from_metadata(file.reopen().unwrap(), file.path(), metadata.clone())
            .unwrap();

        assert_eq!(reader.offset(), 0);
        assert_eq!(reader.pending_len(), 3);
        assert_eq!(reader.record_num(), 7);
        assert_eq!(reader.metadata(), metadata);
    }
}
