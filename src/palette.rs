//! Optional palette reduction before WebP encoding.
//!
//! Collapsing an image to a bounded palette before the lossy encode trades
//! a little color fidelity for noticeably smaller output on flat-shaded
//! art (maps, tokens, UI frames). It is a size/quality knob, not a
//! correctness feature — the pipeline default leaves it off.
//!
//! The palette is learned per-image with NeuQuant ([`color_quant`], the
//! same quantizer the `image` ecosystem uses for GIF output). Banding from
//! the reduced palette is broken up with error-diffusion dithering using
//! the Jarvis–Judice–Ninke kernel: each pixel's quantization residual is
//! spread over twelve forward neighbors in a 3×5 window.

use color_quant::NeuQuant;
use image::{Rgba, RgbaImage};

/// Error-diffusion weights, row by row. The current pixel sits at the
/// center of the first row; zero entries are already-visited positions.
const DIFFUSION_KERNEL: [[f32; 5]; 3] = [
    [0.0, 0.0, 0.0, 7.0 / 48.0, 5.0 / 48.0],
    [3.0 / 48.0, 5.0 / 48.0, 7.0 / 48.0, 5.0 / 48.0, 3.0 / 48.0],
    [1.0 / 48.0, 3.0 / 48.0, 5.0 / 48.0, 3.0 / 48.0, 1.0 / 48.0],
];

/// NeuQuant sampling factor: 1 = every pixel, 30 = sparsest. 10 is the
/// conventional speed/quality middle ground.
const SAMPLE_FACTOR: i32 = 10;

/// Bounded palette size, clamped to what NeuQuant supports (16–256 colors).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteSize(usize);

impl PaletteSize {
    pub fn new(colors: usize) -> Self {
        Self(colors.clamp(16, 256))
    }

    pub fn colors(self) -> usize {
        self.0
    }
}

impl Default for PaletteSize {
    fn default() -> Self {
        Self(256)
    }
}

/// Quantize `img` in place to at most `size` colors, dithering with the
/// Jarvis–Judice–Ninke kernel.
pub fn quantize_with_dither(img: &mut RgbaImage, size: PaletteSize) {
    let quantizer = NeuQuant::new(SAMPLE_FACTOR, size.colors(), img.as_raw());

    let width = img.width() as usize;
    let height = img.height() as usize;
    // Pending diffused error per pixel, RGBA.
    let mut errors = vec![[0.0f32; 4]; width * height];

    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            let original = img.get_pixel(x as u32, y as u32).0;

            let mut wanted = [0.0f32; 4];
            let mut carried = [0u8; 4];
            for c in 0..4 {
                wanted[c] = original[c] as f32 + errors[idx][c];
                carried[c] = wanted[c].clamp(0.0, 255.0) as u8;
            }

            let mut mapped = carried;
            quantizer.map_pixel(&mut mapped);
            img.put_pixel(x as u32, y as u32, Rgba(mapped));

            for c in 0..4 {
                let residual = wanted[c] - mapped[c] as f32;
                if residual == 0.0 {
                    continue;
                }
                diffuse(&mut errors, width, height, x, y, c, residual);
            }
        }
    }
}

/// Spread one channel's residual over the kernel's forward neighbors.
fn diffuse(
    errors: &mut [[f32; 4]],
    width: usize,
    height: usize,
    x: usize,
    y: usize,
    channel: usize,
    residual: f32,
) {
    for (dy, row) in DIFFUSION_KERNEL.iter().enumerate() {
        let ny = y + dy;
        if ny >= height {
            break;
        }
        for (i, &weight) in row.iter().enumerate() {
            if weight == 0.0 {
                continue;
            }
            let nx = x as isize + (i as isize - 2);
            if nx < 0 || nx as usize >= width {
                continue;
            }
            errors[ny * width + nx as usize][channel] += residual * weight;
        }
    }
}
