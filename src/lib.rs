//! # Room Minify
//!
//! Shrinks tabletop-session export archives (ccfolia-style room zips) by
//! recoding embedded raster images to lossy WebP, renaming them to
//! content-addressed filenames, and rewriting every reference inside the
//! room manifest so the archive stays internally consistent.
//!
//! # Architecture: One Pass, Three Phases
//!
//! A conversion run is a pure function from archive bytes to archive bytes:
//!
//! ```text
//! 1. Unpack    zip → { name: bytes }             (flat entry collection)
//! 2. Recode    eligible images → WebP, renamed   (bounded parallel fan-out)
//! 3. Rewrite   manifest + token, repack          (single-threaded finish)
//! ```
//!
//! The manifest (`__data.json`) references assets by filename, and the
//! `.token` entry is a digest of the manifest bytes — so the rename map
//! built during phase 2 must be complete before phase 3 touches either.
//! Phase 2 workers never mutate shared state; a single aggregating step
//! merges their results, which is what keeps the rename map and the entry
//! collection consistent without locks.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`sniff`] | Extension allow-list + animated-PNG detection via chunk scanning |
//! | [`recode`] | Decode → optional palette quantization → lossy WebP encode |
//! | [`palette`] | NeuQuant palette reduction with error-diffusion dithering |
//! | [`naming`] | Content-addressed filenames (`<sha256-hex>.webp`) |
//! | [`pipeline`] | Orchestration: partition, parallel fan-out, failure policy |
//! | [`manifest`] | Reference rewriting and integrity-token recomputation |
//! | [`archive`] | Zip container read-all / write-all |
//! | [`output`] | CLI progress and summary formatting |
//!
//! # Design Decisions
//!
//! ## WebP-Only Output
//!
//! Every recoded image becomes lossy WebP at quality 70 with maximum
//! compression effort. Room exports are dominated by PNG map tiles and
//! character art where WebP routinely cuts size by 60–90% with no visible
//! loss at table-display resolutions. A single target format also keeps the
//! manifest patch trivial: renamed resources declare `image/webp`, nothing
//! else changes.
//!
//! ## Content-Addressed Renames
//!
//! Recoded assets are named by the SHA-256 of their encoded bytes. This is
//! not cosmetic: identical assets collapse into one entry (duplicated tiles
//! and tokens are common in room exports), replacement names can never
//! collide with each other or re-match during manifest substitution, and
//! runs are reproducible byte-for-byte.
//!
//! ## Animated Images Pass Through
//!
//! APNG animations would be flattened to their first frame by a re-encode,
//! so they are detected by scanning PNG chunk headers for `acTL` — pure
//! container inspection, no pixel decode — and copied through unchanged.
//!
//! ## All-or-Nothing
//!
//! The first failing asset aborts the whole run and no output is written.
//! A session archive with a silently dropped or corrupted asset is worse
//! than the original, so there is no best-effort mode.
//!
//! # Embedding
//!
//! [`minify`] is the filesystem-free entry point: archive bytes in, archive
//! bytes out, errors as strings. A wasm or other host adapter only needs to
//! marshal byte buffers across the boundary. The CLI in `main.rs` is a thin
//! wrapper over the same [`pipeline::minify_archive`] call with progress
//! reporting attached.

pub mod archive;
pub mod manifest;
pub mod naming;
pub mod output;
pub mod palette;
pub mod pipeline;
pub mod recode;
pub mod sniff;

pub use pipeline::{MinifyConfig, PipelineError, ProgressEvent};
pub use recode::Quality;

/// Convert a session export archive with default settings.
///
/// The host-embedding surface: no filesystem access, no progress channel,
/// errors flattened to a displayable string. Native callers that want
/// progress events or non-default quality should use
/// [`pipeline::minify_archive`] directly.
pub fn minify(input: &[u8]) -> Result<Vec<u8>, String> {
    pipeline::minify_archive(input, &MinifyConfig::default(), None).map_err(|e| e.to_string())
}
