//! BLAKE3 content fingerprinting with a head/tail shortcut for large files.
//!
//! # Overview
//!
//! Files up to the policy's `large_file_threshold` are streamed through the
//! hasher in full. Larger files contribute only their first and last
//! `partial_hash_size` bytes, fed into the same hasher in that order.
//!
//! Two large files that agree on both ends but differ in the middle therefore
//! get the same digest. That is expected: the fingerprint is a reconciliation
//! proxy, not an integrity check.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use super::{HashError, HashingPolicy};

/// Hex-encoded content digest.
pub type Digest = String;

/// Read buffer for streaming file content into the hasher.
const BUFFER_SIZE: usize = 64 * 1024;

/// Computes content fingerprints according to a [`HashingPolicy`].
#[derive(Debug, Clone, Copy)]
pub struct Hasher {
    large_file_threshold: u64,
    partial_hash_size: u64,
}

impl Hasher {
    /// Create a hasher with explicit thresholds.
    ///
    /// # Arguments
    ///
    /// * `large_file_threshold` - Files strictly larger than this are hashed head+tail
    /// * `partial_hash_size` - Bytes taken from each end of a large file
    #[must_use]
    pub fn new(large_file_threshold: u64, partial_hash_size: u64) -> Self {
        Self {
            large_file_threshold,
            partial_hash_size,
        }
    }

    /// Create a hasher using the thresholds of `policy`.
    #[must_use]
    pub fn from_policy(policy: &HashingPolicy) -> Self {
        Self::new(policy.large_file_threshold, policy.partial_hash_size)
    }

    /// Fingerprint the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened, read or seeked,
    /// or if the partial window is zero or larger than the file.
    pub fn fingerprint(&self, path: &Path) -> Result<Digest, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let size = file
            .metadata()
            .map_err(|e| HashError::from_io(path, e))?
            .len();

        let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
        let mut hasher = blake3::Hasher::new();

        if size > self.large_file_threshold {
            self.hash_head_and_tail(path, size, &mut reader, &mut hasher)?;
        } else {
            io::copy(&mut reader, &mut hasher).map_err(|e| HashError::from_io(path, e))?;
        }

        Ok(hasher.finalize().to_hex().to_string())
    }

    fn hash_head_and_tail(
        &self,
        path: &Path,
        size: u64,
        reader: &mut BufReader<File>,
        hasher: &mut blake3::Hasher,
    ) -> Result<(), HashError> {
        let partial = self.partial_hash_size;
        let invalid = || HashError::InvalidPartialRange {
            path: path.to_path_buf(),
            size,
            partial,
        };
        if partial == 0 || partial > size {
            return Err(invalid());
        }
        let tail_offset = i64::try_from(partial).map_err(|_| invalid())?;

        let head = io::copy(&mut reader.by_ref().take(partial), hasher)
            .map_err(|e| HashError::from_io(path, e))?;
        if head != partial {
            // File shrank between stat and read
            return Err(HashError::from_io(
                path,
                io::Error::new(io::ErrorKind::UnexpectedEof, "short read of file head"),
            ));
        }

        reader
            .seek(SeekFrom::End(-tail_offset))
            .map_err(|e| HashError::from_io(path, e))?;
        io::copy(reader, hasher).map_err(|e| HashError::from_io(path, e))?;

        log::trace!(
            "Partial fingerprint ({} + {} of {} bytes): {}",
            partial,
            partial,
            size,
            path.display()
        );
        Ok(())
    }
}
