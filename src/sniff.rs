//! Per-entry format classification: which archive entries are worth
//! recoding, and which of those are animated and must be left alone.
//!
//! Eligibility is extension-based — a deliberate simplification, since
//! room exports name their assets honestly and a mislabeled file will
//! surface as a decode error later anyway. Animation detection is the
//! opposite: it inspects the PNG container structure directly, because the
//! decoder we hand eligible images to cannot tell an APNG from its first
//! frame.
//!
//! ## Chunk scanning
//!
//! A PNG is an 8-byte signature followed by chunks of the form
//! `length (4 BE) | type (4) | data (length) | crc (4)`. Animated PNGs
//! declare an `acTL` (animation control) chunk before the first frame.
//! The scan walks chunk headers only — it never reads chunk payloads, so
//! it is cheap even for multi-megabyte images.
//!
//! A bad signature is a hard error (the entry claims to be a PNG and is
//! not), but truncation *after* a valid signature just ends the scan:
//! real-world exports contain PNGs with garbage trailing data, and an
//! image the decoder can still open should not be rejected here.

use thiserror::Error;

/// Extensions with a mature lossy re-encode path.
const ELIGIBLE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

const PNG_SIGNATURE: &[u8; 8] = b"\x89PNG\r\n\x1a\n";

/// APNG animation-control chunk tag.
const ANIMATION_CONTROL: &[u8; 4] = b"acTL";

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("invalid PNG image")]
    BadSignature,
}

/// True iff the lowercase filename extension is in the recode allow-list.
pub fn is_eligible_image(name: &str) -> bool {
    match extension(name) {
        Some(ext) => ELIGIBLE_EXTENSIONS.contains(&ext.as_str()),
        None => false,
    }
}

/// Lowercase extension of a filename, if it has one.
fn extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.contains('/') {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Detect whether an eligible image is animated.
///
/// Only PNG can be animated among the supported formats; everything else
/// is `Ok(false)` without looking at the bytes.
pub fn is_animated(bytes: &[u8], name: &str) -> Result<bool, FormatError> {
    match extension(name).as_deref() {
        Some("png") => is_animated_png(bytes),
        _ => Ok(false),
    }
}

/// Chunk-scan state machine.
///
/// `Chunk` carries the byte offset of the next chunk header. Terminal
/// states: `Found` / `EndOfStream` (success), `Malformed` (error).
enum ScanState {
    Signature,
    Chunk(usize),
    Found,
    EndOfStream,
    Malformed,
}

fn is_animated_png(bytes: &[u8]) -> Result<bool, FormatError> {
    let mut state = ScanState::Signature;
    loop {
        state = match state {
            ScanState::Signature => match bytes.get(..PNG_SIGNATURE.len()) {
                Some(sig) if sig == PNG_SIGNATURE => ScanState::Chunk(PNG_SIGNATURE.len()),
                _ => ScanState::Malformed,
            },
            ScanState::Chunk(offset) => next_chunk(bytes, offset),
            ScanState::Found => return Ok(true),
            ScanState::EndOfStream => return Ok(false),
            ScanState::Malformed => return Err(FormatError::BadSignature),
        };
    }
}

/// Read one chunk header at `offset` and transition.
fn next_chunk(bytes: &[u8], offset: usize) -> ScanState {
    let Some(header) = bytes.get(offset..offset + 8) else {
        // Truncated header: tolerated, the stream is simply over.
        return ScanState::EndOfStream;
    };
    if &header[4..8] == ANIMATION_CONTROL {
        return ScanState::Found;
    }
    let length = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
    // Skip data + CRC to the next header. Overflow means a length field
    // that cannot be real — treat like truncation and stop.
    match (offset + 8).checked_add(length + 4) {
        Some(next) => ScanState::Chunk(next),
        None => ScanState::EndOfStream,
    }
}
