use sha2::{Digest, Sha256};

/// Integrity-checked wrapper for cached lookup results
///
/// Address lookups are cached as JSON strings. Each entry is stored with a
/// SHA-256 digest of its payload; an entry whose digest no longer matches is
/// treated as a cache miss and the address is fetched again.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ValidatedCacheEntry {
    /// Cached payload (JSON string)
    pub data: String,
    /// Hex-encoded SHA-256 of `data`
    pub checksum: String,
}

impl ValidatedCacheEntry {
    pub fn new(data: String) -> Self {
        let checksum = Self::compute_checksum(&data);
        Self { data, checksum }
    }

    fn compute_checksum(data: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn is_valid(&self) -> bool {
        Self::compute_checksum(&self.data) == self.checksum
    }

    /// Serializes the entry (payload + checksum) for storage in the cache.
    pub fn serialize(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Returns the payload of a stored entry, or `None` if it is not valid
    /// JSON or its checksum does not match.
    pub fn deserialize_and_validate(serialized: &str) -> Option<String> {
        let entry: ValidatedCacheEntry = serde_json::from_str(serialized).ok()?;

        if entry.is_valid() {
            Some(entry.data)
        } else {
            tracing::warn!(
                "Cache entry checksum mismatch (expected {}, payload {} bytes)",
                entry.checksum,
                entry.data.len()
            );
            None
        }
    }
}
