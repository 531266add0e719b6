//! # Bayer 8x8 Ordered Dithering
//!
//! Converts a grayscale image into the packed 1-bit [`Bitmap`] a thermal
//! head prints. Each pixel is compared against a position-dependent
//! threshold taken from the Bayer matrix, so flat grays become an even dot
//! screen and the output is identical for identical input.
//!
//! ```text
//! Grayscale:    White    Light    Medium    Dark    Black
//!               ░░░░░░   ░░▒░░░   ░▒░▒░▒   ▒▓▒▓▒▓   ██████
//! ```
//!
//! ## Threshold
//!
//! `threshold(x, y) = (BAYER8[y mod 8][x mod 8] + 0.5) / 64`
//!
//! The half-step offset keeps thresholds strictly inside (0, 1): pure black
//! always prints and pure white never does.

use image::GrayImage;

use crate::ir::Bitmap;

/// Bayer 8x8 threshold matrix, values 0-63.
pub const BAYER8: [[u8; 8]; 8] = [
    [0, 32, 8, 40, 2, 34, 10, 42],
    [48, 16, 56, 24, 50, 18, 58, 26],
    [12, 44, 4, 36, 14, 46, 6, 38],
    [60, 28, 52, 20, 62, 30, 54, 22],
    [3, 35, 11, 43, 1, 33, 9, 41],
    [51, 19, 59, 27, 49, 17, 57, 25],
    [15, 47, 7, 39, 13, 45, 5, 37],
    [63, 31, 55, 23, 61, 29, 53, 21],
];

/// Dithering threshold for a pixel position, in (0, 1).
#[inline]
pub fn threshold(x: u32, y: u32) -> f32 {
    let matrix_value = BAYER8[(y & 7) as usize][(x & 7) as usize];
    (matrix_value as f32 + 0.5) / 64.0
}

/// Whether to print a dot. `intensity` is 0.0 for white, 1.0 for black.
///
/// ```
/// use posprinter::render::dither::should_print;
///
/// assert!(should_print(0, 0, 1.0));
/// assert!(!should_print(0, 0, 0.0));
/// ```
#[inline]
pub fn should_print(x: u32, y: u32, intensity: f32) -> bool {
    intensity > threshold(x, y)
}

/// Dither a luma image (0 = black, 255 = white) into a packed bitmap.
///
/// ```
/// use image::{GrayImage, Luma};
/// use posprinter::render::dither::dither_luma;
///
/// let img = GrayImage::from_pixel(12, 2, Luma([0]));
/// let bitmap = dither_luma(&img);
/// assert_eq!(bitmap.data, vec![0xFF, 0xF0, 0xFF, 0xF0]);
/// ```
pub fn dither_luma(img: &GrayImage) -> Bitmap {
    let (width, height) = img.dimensions();
    let width_bytes = (width as usize).div_ceil(8);
    let mut data = vec![0u8; width_bytes * height as usize];

    for (x, y, pixel) in img.enumerate_pixels() {
        let intensity = 1.0 - pixel.0[0] as f32 / 255.0;
        if should_print(x, y, intensity) {
            let idx = y as usize * width_bytes + x as usize / 8;
            data[idx] |= 0x80 >> (x % 8);
        }
    }

    Bitmap {
        width,
        height,
        data,
    }
}

// ============================================================================
// TESTS
// ============================================================================
