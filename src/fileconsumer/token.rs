// SPDX-License-Identifier: Apache-2.0

use bytes::Bytes;
use std::path::Path;
use std::sync::Arc;

/// Attribute key for the file name
pub const ATTR_LOG_FILE_NAME: &str = "log.file.name";
/// Attribute key for the file path
pub const ATTR_LOG_FILE_PATH: &str = "log.file.path";

/// Represents a token's position in a file.
///
/// The offset is the byte position where the token BEGINS, and len is the
/// total bytes consumed for it, including a stripped line terminator. The
/// reader's offset after the token is `offset + len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineOffset {
    /// Byte position where the token begins
    pub offset: u64,
    /// Length of the token in bytes (including newline)
    pub len: u32,
}

impl LineOffset {
    pub fn new(offset: u64, len: u32) -> Self {
        Self { offset, len }
    }

    /// Get the ending byte position (offset + len)
    pub fn end_offset(&self) -> u64 {
        self.offset + self.len as u64
    }
}

/// File-level attributes attached to every token of a reader
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileAttributes {
    pub name: Option<String>,
    pub path: Option<String>,
}

impl FileAttributes {
    pub fn resolve(path: &Path, include_file_name: bool, include_file_path: bool) -> Self {
        Self {
            name: if include_file_name {
                path.file_name().map(|n| n.to_string_lossy().into_owned())
            } else {
                None
            },
            path: if include_file_path {
                Some(path.display().to_string())
            } else {
                None
            },
        }
    }

    /// Key/value pairs for the attributes that are set
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = Vec::with_capacity(2);
        if let Some(ref name) = self.name {
            pairs.push((ATTR_LOG_FILE_NAME, name.as_str()));
        }
        if let Some(ref path) = self.path {
            pairs.push((ATTR_LOG_FILE_PATH, path.as_str()));
        }
        pairs
    }
}

/// One log record read from a file
#[derive(Debug, Clone)]
pub struct Token {
    /// Record bytes, without the line terminator
    pub body: Bytes,
    /// Where the record sits in the file
    pub offset: LineOffset,
    /// 1-based position of the record among all records read from the file
    pub record_num: u64,
    pub attributes: Arc<FileAttributes>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_line_offset_end() {
        let lo = LineOffset::new(100, 9);
        assert_eq!(lo.end_offset(), 109);
    }

    #[test]
    fn test_file_attributes_resolve() {
        let path = PathBuf::from("/var/log/app/server.log");

        let attrs = FileAttributes::resolve(&path, true, false);
        assert_eq!(attrs.name.as_deref(), Some("server.log"));
        assert_eq!(attrs.path, None);
        assert_eq!(attrs.pairs(), vec![(ATTR_LOG_FILE_NAME, "server.log")]);

        let attrs = FileAttributes::resolve(&path, true, true);
        assert_eq!(
            attrs.pairs(),
            vec![
                (ATTR_LOG_FILE_NAME, "server.log"),
                (ATTR_LOG_FILE_PATH, "/var/log/app/server.log"),
            ]
        );

        let attrs = FileAttributes::resolve(&path, false, false);
        assert!(attrs.pairs().is_empty());
    }
}
