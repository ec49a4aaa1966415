//! MD5 digest calculation for base-file verification.
//!
//! The provisioning manifests publish MD5 digests for every base file; this
//! module provides the streaming calculation and comparison used by the
//! existence-plus-checksum guard.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use md5::{Digest, Md5};

use super::{ProvisionError, ProvisionResult};

/// Buffer size for reading files during digest calculation (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Calculate the MD5 digest of a file as lowercase hex.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn file_digest(path: &Path) -> ProvisionResult<String> {
    let mut file = File::open(path).map_err(|e| ProvisionError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| ProvisionError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Verify that a file matches an expected digest (case-insensitive hex).
///
/// # Errors
///
/// [`ProvisionError::ChecksumMismatch`] when the digests differ, or a read
/// error if the file cannot be hashed.
pub fn verify_digest(path: &Path, expected: &str) -> ProvisionResult<()> {
    let actual = file_digest(path)?;
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(ProvisionError::ChecksumMismatch {
            filename: path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string(),
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_file_digest() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("test.txt");

        let mut file = File::create(&file_path).unwrap();
        file.write_all(b"hello world").unwrap();

        let digest = file_digest(&file_path).unwrap();

        // MD5 of "hello world"
        assert_eq!(digest, "5eb63bbbe01eeed093cb22bb8f5acdc3");
    }

    #[test]
    fn test_file_digest_missing_file() {
        let result = file_digest(Path::new("/nonexistent/file.txt"));
        assert!(result.is_err());
    }

    #[test]
    fn test_verify_digest_is_case_insensitive() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("test.txt");

        let mut file = File::create(&file_path).unwrap();
        file.write_all(b"hello world").unwrap();

        verify_digest(&file_path, "5EB63BBBE01EEED093CB22BB8F5ACDC3").unwrap();
    }

    #[test]
    fn test_verify_digest_mismatch() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("test.txt");

        let mut file = File::create(&file_path).unwrap();
        file.write_all(b"hello world").unwrap();

        let result = verify_digest(&file_path, "00000000000000000000000000000000");
        match result {
            Err(ProvisionError::ChecksumMismatch { filename, .. }) => {
                assert_eq!(filename, "test.txt");
            }
            other => panic!("expected ChecksumMismatch, got {:?}", other),
        }
    }
}
