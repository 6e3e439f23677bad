// SPDX-License-Identifier: Apache-2.0

use serde::Deserialize;
use std::time::Duration;

/// Smallest fingerprint that still identifies a file with any confidence
pub const MIN_FINGERPRINT_SIZE: usize = 16;

/// Largest token a reader may emit; a token's length, CRLF included, is
/// carried as a u32
pub const MAX_LOG_SIZE_LIMIT: usize = u32::MAX as usize - 2;

/// Where a fresh reader starts consuming a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartAt {
    /// Start reading from the beginning of the file
    #[default]
    Beginning,
    /// Start reading from the end of the file (only new content)
    End,
}

/// Configuration shared by every reader a factory creates
#[derive(Debug, Clone, Deserialize)]
pub struct FileConsumerConfig {
    /// Size of fingerprint to use for file identification (in bytes)
    #[serde(default = "default_fingerprint_size")]
    pub fingerprint_size: usize,

    /// How long an unterminated trailing fragment may wait for its newline
    /// before it is emitted as is (in milliseconds, 0 disables)
    #[serde(default = "default_flush_period_ms")]
    pub flush_period_ms: u64,

    /// Maximum size of a single log entry (in bytes)
    #[serde(default = "default_max_log_size")]
    pub max_log_size: usize,

    /// Size of each read from the file (in bytes)
    #[serde(default = "default_initial_buffer_size")]
    pub initial_buffer_size: usize,

    /// Number of emitted tokens the sink may hold before readers block
    #[serde(default = "default_sink_buffer_capacity")]
    pub sink_buffer_capacity: usize,

    /// Where to start reading new files from
    #[serde(default)]
    pub start_at: StartAt,

    /// Whether to include the file name as a label
    #[serde(default = "default_true")]
    pub include_file_name: bool,

    /// Whether to include the file path as a label
    #[serde(default)]
    pub include_file_path: bool,
}

fn default_fingerprint_size() -> usize {
    1000
}

fn default_flush_period_ms() -> u64 {
    500
}

fn default_max_log_size() -> usize {
    1024 * 1024 // 1MB
}

fn default_initial_buffer_size() -> usize {
    16 * 1024
}

fn default_sink_buffer_capacity() -> usize {
    100
}

fn default_true() -> bool {
    true
}

impl Default for FileConsumerConfig {
    fn default() -> Self {
        Self {
            fingerprint_size: default_fingerprint_size(),
            flush_period_ms: default_flush_period_ms(),
            max_log_size: default_max_log_size(),
            initial_buffer_size: default_initial_buffer_size(),
            sink_buffer_capacity: default_sink_buffer_capacity(),
            start_at: StartAt::default(),
            include_file_name: true,
            include_file_path: false,
        }
    }
}

impl FileConsumerConfig {
    /// Get the flush period as a Duration
    pub fn flush_period(&self) -> Duration {
        Duration::from_millis(self.flush_period_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.fingerprint_size < MIN_FINGERPRINT_SIZE {
            return Err(format!(
                "fingerprint_size must be at least {} bytes, got {}",
                MIN_FINGERPRINT_SIZE, self.fingerprint_size
            ));
        }

        if self.max_log_size == 0 {
            return Err("max_log_size must be positive".to_string());
        }

        if self.max_log_size > MAX_LOG_SIZE_LIMIT {
            return Err(format!(
                "max_log_size must be at most {} bytes, got {}",
                MAX_LOG_SIZE_LIMIT, self.max_log_size
            ));
        }

        if self.initial_buffer_size == 0 {
            return Err("initial_buffer_size must be positive".to_string());
        }

        if self.sink_buffer_capacity == 0 {
            return Err("sink_buffer_capacity must be at least 1, got 0".to_string());
        }

        Ok(())
    }

    /// Set the fingerprint size
    pub fn with_fingerprint_size(mut self, fingerprint_size: usize) -> Self {
        self.fingerprint_size = fingerprint_size;
        self
    }

    /// Set the flush period, rounded up to whole milliseconds so that a
    /// non-zero period never becomes 0 (disabled)
    pub fn with_flush_period(mut self, flush_period: Duration) -> Self {
        let ms = flush_period.as_nanos().div_ceil(1_000_000);
        self.flush_period_ms = u64::try_from(ms).unwrap_or(u64::MAX);
        self
    }

    /// Set the maximum log entry size
    pub fn with_max_log_size(mut self, max_log_size: usize) -> Self {
        self.max_log_size = max_log_size;
        self
    }

    /// Set the read chunk size
    pub fn with_initial_buffer_size(mut self, initial_buffer_size: usize) -> Self {
        self.initial_buffer_size = initial_buffer_size;
        self
    }

    /// Set the sink channel capacity
    pub fn with_sink_buffer_capacity(mut self, sink_buffer_capacity: usize) -> Self {
        self.sink_buffer_capacity = sink_buffer_capacity;
        self
    }

    /// Set where fresh readers start
    pub fn with_start_at(mut self, start_at: StartAt) -> Self {
        self.start_at = start_at;
        self
    }
}
