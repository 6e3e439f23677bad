// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fileconsumer::error::Result;
use crate::fileconsumer::fingerprint::Fingerprint;

/// Everything needed to rebuild a reader where a previous one stopped.
///
/// Produced by [`Reader::close`](crate::fileconsumer::Reader::close) and
/// consumed by
/// [`Factory::new_reader_from_metadata`](crate::fileconsumer::Factory::new_reader_from_metadata).
/// The caller decides where, and whether, to persist it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Bytes consumed from the start of the file
    pub offset: u64,
    /// Identity of the file as last observed
    pub fingerprint: Fingerprint,
    /// Unterminated bytes read past `offset` and not yet emitted
    #[serde(with = "super::base64_bytes", default)]
    pub pending: Vec<u8>,
    /// When the pending bytes were first seen without a terminator
    #[serde(default)]
    pub pending_since: Option<DateTime<Utc>>,
    /// Number of records emitted from this file so far
    #[serde(default)]
    pub record_num: u64,
}

impl Metadata {
    /// Metadata for a file nobody has read yet
    pub fn new(fingerprint: Fingerprint) -> Self {
        Self {
            offset: 0,
            fingerprint,
            pending: Vec::new(),
            pending_since: None,
            record_num: 0,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
