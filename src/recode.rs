//! Image recoding — decode anything we ingest, encode lossy WebP.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (PNG, JPEG) | `image::load_from_memory` (pure Rust decoders) |
//! | Palette reduction | [`crate::palette`] (NeuQuant + error diffusion) |
//! | Encode → WebP | `webp` / libwebp, `encode_advanced` |
//!
//! The `image` crate only ships a *lossless* WebP encoder, so encoding
//! goes through libwebp with the picture hint and method 6 (maximum
//! compression effort) — the same knobs the upstream Go tool set.
//!
//! [`recode`] is a pure function of its inputs: no shared state, safe to
//! call from any number of workers on distinct images.

use crate::palette::{self, PaletteSize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecodeError {
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("WebP encode failed: {0}")]
    Encode(String),
}

/// Quality setting for lossy WebP encoding (0–100). Clamped on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.min(100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    /// Production default. 70 is the sweet spot for table-display assets:
    /// chosen over 80 after side-by-side comparison showed no visible
    /// difference at roughly two-thirds the size.
    fn default() -> Self {
        Self(70)
    }
}

/// How to re-encode a single image.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecodeConfig {
    pub quality: Quality,
    /// When set, reduce to a bounded palette (with dithering) before
    /// encoding. Off by default — a size/quality trade, not required.
    pub palette: Option<PaletteSize>,
}

/// Decode `bytes`, optionally quantize, and re-encode as lossy WebP.
///
/// Output is expected — not guaranteed — to be smaller than the input;
/// size is reported upstream, never enforced here.
pub fn recode(bytes: &[u8], config: &RecodeConfig) -> Result<Vec<u8>, RecodeError> {
    let decoded = image::load_from_memory(bytes)?;
    let mut pixels = decoded.to_rgba8();
    if let Some(size) = config.palette {
        palette::quantize_with_dither(&mut pixels, size);
    }
    encode_webp(&pixels, config.quality)
}

fn encode_webp(pixels: &image::RgbaImage, quality: Quality) -> Result<Vec<u8>, RecodeError> {
    let mut config = libwebp_sys::WebPConfig::new()
        .map_err(|_| RecodeError::Encode("config init failed".to_string()))?;
    config.quality = quality.value() as f32;
    config.method = 6; // maximum compression effort
    config.image_hint = libwebp_sys::WebPImageHint::WEBP_HINT_PICTURE;

    let encoder = webp::Encoder::from_rgba(pixels.as_raw(), pixels.width(), pixels.height());
    let encoded = encoder
        .encode_advanced(&config)
        .map_err(|e| RecodeError::Encode(format!("{e:?}")))?;
    Ok(encoded.to_vec())
}
