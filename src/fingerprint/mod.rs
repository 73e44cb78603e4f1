//! Content fingerprinting for change detection
//!
//! Digests here gate cache rebuilds and derive the manifest identity; they
//! are change detectors, not a security boundary.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

const BLOCK_SIZE: usize = 64 * 1024;

/// Stream a file through SHA-256 in fixed-size blocks and return the hex
/// digest. Fails when the file cannot be opened or read.
pub fn fingerprint_file(path: &Path) -> Result<String, std::io::Error> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; BLOCK_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Hex digest of a serializable record. `serde_json` writes struct fields in
/// declaration order, so the serialization is deterministic.
pub fn fingerprint_record<T: Serialize>(record: &T) -> Result<String, serde_json::Error> {
    let bytes = serde_json::to_vec(record)?;
    Ok(fingerprint_bytes(&bytes))
}

/// Hex digest of a byte slice.
pub fn fingerprint_bytes(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}
