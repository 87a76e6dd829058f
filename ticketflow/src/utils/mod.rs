//! Utility functions for timestamps, run ids and content digests.

pub mod timestamps;

pub use timestamps::{elapsed_ms, format_timestamp, iso_timestamp, positive_duration, Timestamp};

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Generates a new random (v4) run id.
#[must_use]
pub fn generate_run_id() -> Uuid {
    Uuid::new_v4()
}

/// Hex-encoded SHA-256 of `content`.
#[must_use]
pub fn content_digest(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_run_id_is_v4() {
        let id = generate_run_id();
        assert_eq!(id.get_version_num(), 4);
        assert_ne!(id, generate_run_id());
    }

    #[test]
    fn test_content_digest() {
        assert_eq!(
            content_digest(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(content_digest("a,b\n1,2"), content_digest("a,b\n1,2"));
        assert_ne!(content_digest("a"), content_digest("b"));
    }
}
