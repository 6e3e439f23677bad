// SPDX-License-Identifier: Apache-2.0

//! Newline tokenizer for appended file content.

/// Outcome of looking for the next token at the front of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    /// The first `body_len` bytes form a token; `advance` bytes are consumed
    /// (body plus any terminator).
    Token { advance: usize, body_len: usize },
    /// The buffer holds no complete token yet
    NeedMore,
}

/// Find the next newline-delimited token at the start of `buf`.
///
/// A `\r` directly before the `\n` is treated as part of the terminator.
/// Lines longer than `max_log_size` are cut into `max_log_size` pieces, so an
/// unterminated run longer than that is returned as a token as well.
pub fn next_token(buf: &[u8], max_log_size: usize) -> Split {
    // Room for a full-size body followed by "\r\n"
    let limit = buf.len().min(max_log_size.saturating_add(2));

    if let Some(i) = buf[..limit].iter().position(|&b| b == b'\n') {
        let body_len = if i > 0 && buf[i - 1] == b'\r' { i - 1 } else { i };
        if body_len <= max_log_size {
            return Split::Token {
                advance: i + 1,
                body_len,
            };
        }
    }

    if buf.len() > max_log_size {
        return Split::Token {
            advance: max_log_size,
            body_len: max_log_size,
        };
    }

    Split::NeedMore
}
