// SPDX-License-Identifier: Apache-2.0

//! Incremental reader for a single growing file.
//!
//! Each call to [`Reader::read_to_end`] picks up at the reader's offset, emits
//! every newline-terminated token appended since the last call, and keeps any
//! unterminated tail as a pending fragment. A pending fragment that has gone
//! `flush_period` without receiving its newline is emitted as is.
//!
//! Offsets only move past bytes that reached the sink. Pending bytes sit in
//! memory between `offset` and the read position and travel with
//! [`Metadata`] so a rebuilt reader continues exactly where this one stopped.

use bytes::{Buf, Bytes, BytesMut};
use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::fileconsumer::clock::Clock;
use crate::fileconsumer::config::FileConsumerConfig;
use crate::fileconsumer::error::{Error, Result};
use crate::fileconsumer::fingerprint::Fingerprint;
use crate::fileconsumer::metadata::Metadata;
use crate::fileconsumer::sink::{EmitError, Sink};
use crate::fileconsumer::split::{self, Split};
use crate::fileconsumer::token::{FileAttributes, LineOffset, Token};

/// Shared reader context (immutable, cloned to each reader)
#[derive(Clone)]
pub(crate) struct ReaderContext {
    pub(crate) config: Arc<FileConsumerConfig>,
    pub(crate) sink: Arc<dyn Sink>,
    pub(crate) clock: Arc<dyn Clock>,
}

/// State at the start of a read, used to undo unconfirmed progress
struct ReadStart {
    offset: u64,
    pending_len: usize,
    pending_since: Option<DateTime<Utc>>,
}

/// How the scan of a single read ended
enum Scan {
    /// Reached end of file
    Eof,
    /// Stopped at a token boundary because the read was cancelled
    Cancelled,
}

/// Reader manages reading from a single file
pub struct Reader {
    /// Path to the file, for diagnostics and attributes
    path: PathBuf,
    /// The open file handle; None once closed
    file: Option<File>,
    ctx: ReaderContext,
    attributes: Arc<FileAttributes>,
    /// Current fingerprint
    fingerprint: Fingerprint,
    /// Bytes consumed (emitted or skipped) from the start of the file
    offset: u64,
    /// Unterminated bytes read past `offset`
    pending: BytesMut,
    /// When the current pending bytes were first seen without a terminator
    pending_since: Option<DateTime<Utc>>,
    /// Records emitted from this file so far
    record_num: u64,
}

impl Reader {
    pub(crate) fn new(file: File, path: PathBuf, metadata: Metadata, ctx: ReaderContext) -> Self {
        let attributes = Arc::new(FileAttributes::resolve(
            &path,
            ctx.config.include_file_name,
            ctx.config.include_file_path,
        ));

        debug!(
            path = ?path,
            offset = metadata.offset,
            pending = metadata.pending.len(),
            attributes = ?attributes.pairs(),
            "Opened file reader"
        );

        Self {
            path,
            file: Some(file),
            ctx,
            attributes,
            fingerprint: metadata.fingerprint,
            offset: metadata.offset,
            pending_since: if metadata.pending.is_empty() {
                None
            } else {
                metadata.pending_since
            },
            pending: BytesMut::from(&metadata.pending[..]),
            record_num: metadata.record_num,
        }
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the file name
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    /// Get the current fingerprint
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Get the current offset
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Number of unterminated bytes waiting for a newline or the flush period
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn record_num(&self) -> u64 {
        self.record_num
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    /// Snapshot of the reader's resumable state
    pub fn metadata(&self) -> Metadata {
        Metadata {
            offset: self.offset,
            fingerprint: self.fingerprint.clone(),
            pending: self.pending.to_vec(),
            pending_since: self.pending_since,
            record_num: self.record_num,
        }
    }

    /// Read everything appended since the last call and emit complete tokens.
    ///
    /// `cancel` is checked before every emission. A cancelled read returns
    /// `Ok(())` with offset and fingerprint at the last emitted token.
    pub fn read_to_end(&mut self, cancel: &CancellationToken) -> Result<()> {
        if self.file.is_none() {
            return Err(Error::Closed);
        }

        if cancel.is_cancelled() {
            debug!(path = ?self.path, "Read cancelled before start");
            return Ok(());
        }

        let start = ReadStart {
            offset: self.offset,
            pending_len: self.pending.len(),
            pending_since: self.pending_since,
        };

        match self.scan(&start, cancel) {
            Ok(Scan::Eof) => {}
            Ok(Scan::Cancelled) => {
                self.restore_pending(&start);
                debug!(
                    path = ?self.path,
                    start_offset = start.offset,
                    offset = self.offset,
                    "Read cancelled, keeping progress up to last emitted token"
                );
            }
            Err(e) => {
                self.restore_pending(&start);
                if self.offset != start.offset {
                    self.sync_fingerprint();
                }
                return Err(e);
            }
        }

        self.sync_fingerprint();
        Ok(())
    }

    /// Release the file handle and return the reader's final state.
    ///
    /// Closing twice is harmless; the second call returns the same snapshot.
    pub fn close(&mut self) -> Metadata {
        if self.file.take().is_some() {
            debug!(path = ?self.path, offset = self.offset, "Closed file reader");
        } else {
            debug!(path = ?self.path, "File reader already closed");
        }
        self.metadata()
    }

    fn scan(&mut self, start: &ReadStart, cancel: &CancellationToken) -> Result<Scan> {
        let max_log_size = self.ctx.config.max_log_size;
        let mut chunk = vec![0u8; self.ctx.config.initial_buffer_size];

        loop {
            while let Split::Token { advance, body_len } =
                split::next_token(&self.pending, max_log_size)
            {
                if body_len > 0 {
                    let body = Bytes::copy_from_slice(&self.pending[..body_len]);
                    if !self.emit(body, advance, cancel)? {
                        return Ok(Scan::Cancelled);
                    }
                } else {
                    // Empty line
                    self.offset += advance as u64;
                }
                self.pending.advance(advance);
            }

            let n = self.read_chunk(&mut chunk)?;
            if n == 0 {
                break;
            }
            self.pending.extend_from_slice(&chunk[..n]);
        }

        // A fragment is new unless it was already pending and no boundary was
        // crossed since.
        if self.pending.is_empty() {
            self.pending_since = None;
        } else if self.pending_since.is_none() || self.offset != start.offset {
            self.pending_since = Some(self.ctx.clock.now());
        }

        if let Some(since) = self.pending_since {
            let flush_period = self.ctx.config.flush_period();
            if !flush_period.is_zero() && self.ctx.clock.since(since) >= flush_period {
                let body = Bytes::copy_from_slice(&self.pending);
                let advance = self.pending.len();
                if !self.emit(body, advance, cancel)? {
                    return Ok(Scan::Cancelled);
                }
                debug!(
                    path = ?self.path,
                    len = advance,
                    "Flushed unterminated token after flush period"
                );
                self.pending.clear();
                self.pending_since = None;
            }
        }

        Ok(Scan::Eof)
    }

    /// Send one token to the sink and move the offset past it. Returns false
    /// if the read was cancelled before the sink accepted it.
    fn emit(&mut self, body: Bytes, advance: usize, cancel: &CancellationToken) -> Result<bool> {
        if cancel.is_cancelled() {
            return Ok(false);
        }

        // max_log_size is validated to fit a u32 with its terminator
        let line = LineOffset::new(self.offset, advance as u32);
        let token = Token {
            body,
            offset: line,
            record_num: self.record_num + 1,
            attributes: self.attributes.clone(),
        };

        match self.ctx.sink.emit(token, cancel) {
            Ok(()) => {
                self.record_num += 1;
                self.offset = line.end_offset();
                Ok(true)
            }
            Err(EmitError::Cancelled) => Ok(false),
            Err(EmitError::ChannelClosed) => {
                debug!(path = ?self.path, "Sink closed, stopping read");
                Err(Error::ChannelSend)
            }
        }
    }

    /// Read the next chunk following the pending bytes
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let pos = self.offset + self.pending.len() as u64;
        let Some(file) = self.file.as_mut() else {
            return Ok(0);
        };

        file.seek(SeekFrom::Start(pos))?;
        loop {
            match file.read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Drop bytes read during an aborted call that never reached the sink
    fn restore_pending(&mut self, start: &ReadStart) {
        if self.offset != start.offset {
            // Everything pending at the start went out with the first token
            self.pending.clear();
            self.pending_since = None;
        } else {
            self.pending.truncate(start.pending_len);
            self.pending_since = start.pending_since;
        }
    }

    /// Bring the fingerprint in line with the configured size and the bytes
    /// consumed so far.
    fn sync_fingerprint(&mut self) {
        let max_size = self.ctx.config.fingerprint_size;
        let current = self.fingerprint.len();

        if current > max_size {
            self.fingerprint = self.fingerprint.truncated(max_size);
            debug!(
                path = ?self.path,
                from = current,
                to = max_size,
                "Fingerprint truncated to configured size"
            );
            return;
        }

        let target = current.max(self.offset.min(max_size as u64) as usize);
        if target == current {
            return;
        }

        let Some(file) = self.file.as_mut() else {
            return;
        };

        match Fingerprint::from_file(file, target) {
            Ok(refreshed) => {
                if refreshed.len() > current
                    && (self.fingerprint.is_empty() || refreshed.starts_with(&self.fingerprint))
                {
                    self.fingerprint = refreshed;
                } else if refreshed.len() > current {
                    warn!(
                        path = ?self.path,
                        "File prefix no longer matches fingerprint, keeping previous fingerprint"
                    );
                } else {
                    debug!(
                        path = ?self.path,
                        available = refreshed.len(),
                        wanted = target,
                        "File shorter than fingerprint target"
                    );
                }
            }
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Failed to refresh fingerprint");
            }
        }
    }
}
