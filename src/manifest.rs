//! Manifest rewriting and integrity-token recomputation.
//!
//! The room manifest (`__data.json`) references assets by filename from
//! two places: a `resources` section mapping filename → descriptor, and
//! arbitrary string values anywhere else in the document (chat log
//! entries, scene definitions, freeform notes). The rewrite therefore
//! runs in two passes:
//!
//! 1. **Raw-text substitution** over the serialized manifest — every
//!    occurrence of every renamed filename, structured or not. Blunt on
//!    purpose: it also catches references buried in freeform strings that
//!    no schema-aware walk would find. Safe because replacement names are
//!    content-addressed 64-hex-char digests, so no pair's output can ever
//!    be re-matched by another pair, whatever the substitution order.
//! 2. **Parse and patch** — the substituted text must be valid JSON, and
//!    every `resources` key that is now a recoded name gets the minimal
//!    descriptor declaring the WebP media type.
//!
//! The `.token` value is `"0."` + hex SHA-256 of the final manifest bytes
//! and is always recomputed — copying the input token through would leave
//! the archive self-inconsistent the moment the manifest changes.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Declared media type for recoded resources.
pub const RECODED_MEDIA_TYPE: &str = "image/webp";

/// Fixed tag preceding the hex digest in the token entry.
const TOKEN_PREFIX: &str = "0.";

#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("manifest is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
    #[error("manifest is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The minimal descriptor written for a recoded resource.
#[derive(Serialize)]
struct ResourceDescriptor<'a> {
    #[serde(rename = "type")]
    media_type: &'a str,
}

/// Rewrite the manifest for a completed rename map and derive the new
/// token entry. Returns `(manifest_bytes, token_bytes)`.
pub fn rewrite(
    manifest: &[u8],
    renames: &BTreeMap<String, String>,
) -> Result<(Vec<u8>, Vec<u8>), RewriteError> {
    let mut text = std::str::from_utf8(manifest)?.to_string();
    // BTreeMap iteration fixes the pair order per run; see module docs for
    // why order cannot change the outcome anyway.
    for (old, new) in renames {
        text = text.replace(old.as_str(), new.as_str());
    }

    let mut document: Value = serde_json::from_str(&text)?;
    patch_resources(&mut document, renames)?;

    let bytes = serde_json::to_vec(&document)?;
    let token = derive_token(&bytes);
    Ok((bytes, token.into_bytes()))
}

/// Replace descriptors of renamed resources with the minimal WebP
/// descriptor. A manifest without a `resources` object is left alone.
fn patch_resources(
    document: &mut Value,
    renames: &BTreeMap<String, String>,
) -> Result<(), RewriteError> {
    let Some(resources) = document
        .get_mut("resources")
        .and_then(Value::as_object_mut)
    else {
        return Ok(());
    };

    let recoded_names: HashSet<&str> = renames.values().map(String::as_str).collect();
    for (name, descriptor) in resources.iter_mut() {
        if recoded_names.contains(name.as_str()) {
            *descriptor = serde_json::to_value(ResourceDescriptor {
                media_type: RECODED_MEDIA_TYPE,
            })?;
        }
    }
    Ok(())
}

/// Integrity token for the given manifest bytes: `0.<sha256-hex>`.
pub fn derive_token(manifest: &[u8]) -> String {
    format!("{TOKEN_PREFIX}{:x}", Sha256::digest(manifest))
}
