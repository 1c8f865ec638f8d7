use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of the raw bytes.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
