// SPDX-License-Identifier: Apache-2.0

//! Destination for tokens emitted by readers.
//!
//! The sink is shared by every reader a factory creates. The channel-backed
//! implementation is bounded: once `capacity` tokens are queued, an emitting
//! reader blocks until the consumer catches up or the read is cancelled.

use std::fmt;
use tokio_util::sync::CancellationToken;

use crate::bounded_channel::{self, BoundedReceiver, BoundedSender, SendError};
use crate::fileconsumer::token::Token;

/// Why a token could not be handed to the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitError {
    /// The operation was cancelled via the cancellation token.
    Cancelled,
    /// The consumer side is gone.
    ChannelClosed,
}

impl fmt::Display for EmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmitError::Cancelled => write!(f, "emit cancelled"),
            EmitError::ChannelClosed => write!(f, "sink channel closed"),
        }
    }
}

impl std::error::Error for EmitError {}

pub trait Sink: Send + Sync {
    /// Hand one token to the consumer, blocking while the sink is full.
    fn emit(&self, token: Token, cancel: &CancellationToken) -> Result<(), EmitError>;
}

pub type TokenSender = BoundedSender<Token>;
pub type TokenReceiver = BoundedReceiver<Token>;

impl Sink for TokenSender {
    fn emit(&self, token: Token, cancel: &CancellationToken) -> Result<(), EmitError> {
        self.send_blocking_cancellable(token, cancel)
            .map_err(|e| match e {
                SendError::Cancelled => EmitError::Cancelled,
                SendError::Disconnected => EmitError::ChannelClosed,
            })
    }
}

/// Create a bounded token channel holding at most `capacity` tokens
pub fn channel(capacity: usize) -> (TokenSender, TokenReceiver) {
    bounded_channel::bounded(capacity)
}
