// SPDX-License-Identifier: Apache-2.0

//! File consumer core for tailing log files.
//!
//! A [`Factory`] holds the shared configuration and creates one [`Reader`]
//! per tracked file. Readers emit newline-delimited [`Token`]s to a bounded
//! [`Sink`] and keep a [`Fingerprint`] of the file's first bytes so the caller
//! can recognise the file after renames and rotations.
//!
//! Features:
//! - Partial-line buffering with a flush period for unterminated tails
//! - Fingerprints that grow with the file up to a configured size
//! - Resumable [`Metadata`] snapshots, including across fingerprint size changes
//! - Cooperative cancellation and sink backpressure

mod base64_bytes;
pub mod clock;
pub mod config;
pub mod error;
pub mod factory;
pub mod fingerprint;
pub mod metadata;
pub mod reader;
pub mod sink;
pub mod split;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{FileConsumerConfig, StartAt};
pub use error::{Error, Result};
pub use factory::Factory;
pub use fingerprint::Fingerprint;
pub use metadata::Metadata;
pub use reader::Reader;
pub use sink::{EmitError, Sink, TokenReceiver, TokenSender};
pub use token::{FileAttributes, LineOffset, Token};
