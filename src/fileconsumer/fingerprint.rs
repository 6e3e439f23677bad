// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};

/// A fingerprint identifies a file by the first N bytes of its content.
/// This allows tracking files even if they are renamed or moved.
///
/// Fingerprints are values: a reader replaces its fingerprint with a new one
/// as it consumes more of the file, it never edits one in place.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    /// The first N bytes of the file
    #[serde(with = "super::base64_bytes")]
    first_bytes: Vec<u8>,
}

impl Fingerprint {
    /// Create a fingerprint from raw bytes, taken verbatim
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            first_bytes: bytes.into(),
        }
    }

    /// Read up to `size` bytes from the start of `file`.
    ///
    /// Returns fewer bytes when the file is shorter. The file cursor is left
    /// wherever the read stopped.
    pub fn from_file(file: &mut File, size: usize) -> io::Result<Self> {
        file.seek(SeekFrom::Start(0))?;

        let mut buf = Vec::with_capacity(size);
        file.by_ref().take(size as u64).read_to_end(&mut buf)?;

        Ok(Self { first_bytes: buf })
    }

    /// Get the fingerprint bytes
    pub fn bytes(&self) -> &[u8] {
        &self.first_bytes
    }

    pub fn len(&self) -> usize {
        self.first_bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.first_bytes.is_empty()
    }

    /// Check if this fingerprint starts with another fingerprint.
    /// A grown file keeps its old fingerprint as a prefix, so this is how a
    /// longer fingerprint is matched against an earlier snapshot.
    pub fn starts_with(&self, other: &Fingerprint) -> bool {
        let other_len = other.first_bytes.len();

        // Empty fingerprints never match
        if other_len == 0 {
            return false;
        }

        if other_len > self.first_bytes.len() {
            return false;
        }

        self.first_bytes[..other_len] == other.first_bytes[..other_len]
    }

    /// A copy of this fingerprint cut down to at most `max_size` bytes
    pub fn truncated(&self, max_size: usize) -> Self {
        let len = self.first_bytes.len().min(max_size);
        Self {
            first_bytes: self.first_bytes[..len].to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_fingerprint_new_is_verbatim() {
        let fp = Fingerprint::new(b"testlog1\n".to_vec());
        assert_eq!(fp.bytes(), b"testlog1\n");
        assert_eq!(fp.len(), 9);
        assert!(!fp.is_empty());

        assert!(Fingerprint::new(Vec::new()).is_empty());
    }

    #[test]
    fn test_fingerprint_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"hello world").unwrap();
        file.flush().unwrap();

        let mut f = file.reopen().unwrap();
        let fp = Fingerprint::from_file(&mut f, 1000).unwrap();

        assert_eq!(fp.bytes(), b"hello world");
        assert_eq!(fp.len(), 11);
    }

    #[test]
    fn test_fingerprint_truncates_to_size() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"hello world this is a longer message")
            .unwrap();
        file.flush().unwrap();

        let mut f = file.reopen().unwrap();
        let fp = Fingerprint::from_file(&mut f, 5).unwrap();

        assert_eq!(fp.bytes(), b"hello");
        assert_eq!(fp.len(), 5);
    }

    #[test]
    fn test_fingerprint_from_file_ignores_cursor() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"hello world").unwrap();
        file.flush().unwrap();

        let mut f = file.reopen().unwrap();
        f.seek(SeekFrom::Start(6)).unwrap();
        let fp = Fingerprint::from_file(&mut f, 5).unwrap();

        assert_eq!(fp.bytes(), b"hello");
    }

    #[test]
    fn test_fingerprint_from_empty_file() {
        let file = NamedTempFile::new().unwrap();
        let mut f = file.reopen().unwrap();
        let fp = Fingerprint::from_file(&mut f, 1000).unwrap();

        assert_eq!(fp, Fingerprint::new(Vec::new()));
    }

    #[test]
    fn test_fingerprint_starts_with() {
        let fp1 = Fingerprint::new(b"hello world".to_vec());
        let fp2 = Fingerprint::new(b"hello".to_vec());
        let fp3 = Fingerprint::new(b"world".to_vec());
        let fp_empty = Fingerprint::new(vec![]);

        assert!(fp1.starts_with(&fp2));
        assert!(fp1.starts_with(&fp1));
        assert!(!fp2.starts_with(&fp1));
        assert!(!fp1.starts_with(&fp3));

        // Empty fingerprints never match
        assert!(!fp1.starts_with(&fp_empty));
        assert!(!fp_empty.starts_with(&fp1));
    }

    #[test]
    fn test_fingerprint_truncated() {
        let fp = Fingerprint::new(b"hello world".to_vec());

        assert_eq!(fp.truncated(5).bytes(), b"hello");
        assert_eq!(fp.truncated(100), fp);
        assert!(fp.truncated(0).is_empty());
        // original untouched
        assert_eq!(fp.len(), 11);
    }

    #[test]
    fn test_fingerprint_serde() {
        let fp = Fingerprint::new(b"hello world".to_vec());
        let json = serde_json::to_string(&fp).unwrap();
        assert_eq!(json, r#"{"first_bytes":"aGVsbG8gd29ybGQ="}"#);

        let fp2: Fingerprint = serde_json::from_str(&json).unwrap();
        assert_eq!(fp, fp2);
    }
}
