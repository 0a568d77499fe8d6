//! Content checksums used to deduplicate pipeline files
//!
//! A checksum is the SHA-256 digest of the content truncated to its first
//! 16 bytes and hex encoded, giving a 32 character key.

use crate::error::{Result, UsageError};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Number of digest bytes kept in a checksum
pub const CHECKSUM_BYTES: usize = 16;

/// Compute the checksum of any readable source
pub fn checksum<R: Read>(reader: &mut R) -> Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    let digest = hasher.finalize();
    Ok(hex::encode(&digest[..CHECKSUM_BYTES]))
}

/// Compute the checksum of the file at `path`
pub fn file_checksum(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let mut file = std::fs::File::open(path).map_err(|e| UsageError::from_io(e, path))?;
    checksum(&mut file)
}
