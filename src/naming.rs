//! Content-addressed filenames for recoded assets.
//!
//! A recoded asset is named by the SHA-256 of its *encoded* bytes, hex,
//! plus the target codec's extension: `3a7bd3…e2f1.webp`. Three things
//! hang off this being deterministic:
//!
//! - identical re-encoded assets collapse into a single archive entry;
//! - replacement names can never partially re-match each other during
//!   manifest substitution (64 hex chars of digest don't occur in other
//!   digests' names);
//! - converting the same archive twice yields the same output, which the
//!   reproducibility tests rely on.

use sha2::{Digest, Sha256};

/// Extension of the target codec.
pub const WEBP_EXTENSION: &str = "webp";

/// Deterministic content-addressed name for an encoded asset.
pub fn content_address(bytes: &[u8]) -> String {
    format!("{:x}.{}", Sha256::digest(bytes), WEBP_EXTENSION)
}
