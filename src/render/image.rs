//! # Image Pipeline
//!
//! Base64 payload → decoded image → proportional resize to the profile's
//! dot width → grayscale → Bayer dithered [`Bitmap`].
//!
//! Transparent pixels are composited onto white, since unprinted paper is
//! the only background a thermal head has.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Luma};
use tracing::debug;

use crate::error::RenderError;
use crate::ir::{Bitmap, Op, Program};
use crate::printer::Profile;
use crate::task::ImageTask;

use super::dither;

/// Widest raster the `GS v 0` header can describe, in dots.
const MAX_RASTER_WIDTH: u32 = u16::MAX as u32;

/// Tallest bitmap accepted after scaling, in dots (about 2.5 m of paper).
pub const MAX_BITMAP_HEIGHT: u32 = 20_000;

/// Largest scaled bitmap accepted, in dots.
pub const MAX_BITMAP_PIXELS: u64 = 16_000_000;

/// Render an image task into a single bitmap op.
pub fn render(task: &ImageTask, profile: &Profile) -> Result<Program, RenderError> {
    let source = decode(&task.data)?;
    let bitmap = to_bitmap(&source, profile.image_width_px)?;
    debug!(
        width = bitmap.width,
        height = bitmap.height,
        "image rendered"
    );

    let mut program = Program::new();
    program.push(Op::Bitmap {
        align: task.align,
        image: bitmap,
    });
    Ok(program)
}

/// Decode a base64 (optionally `data:` URL) payload into an image.
pub fn decode(payload: &str) -> Result<DynamicImage, RenderError> {
    let encoded = strip_data_url(payload);
    let cleaned: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();

    let bytes = STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|e| RenderError::DecodeError(format!("invalid base64: {e}")))?;

    image::load_from_memory(&bytes)
        .map_err(|e| RenderError::DecodeError(format!("unsupported image data: {e}")))
}

/// Resize `source` to `target_width` dots, keeping the aspect ratio, and dither.
pub fn to_bitmap(source: &DynamicImage, target_width: u32) -> Result<Bitmap, RenderError> {
    if source.width() == 0 || source.height() == 0 {
        return Err(RenderError::DecodeError("image has no pixels".into()));
    }
    if target_width > MAX_RASTER_WIDTH {
        return Err(RenderError::EncodeError(format!(
            "target width {target_width} exceeds {MAX_RASTER_WIDTH} dots"
        )));
    }

    let target_height = scaled_height(source.width(), source.height(), target_width);
    let pixels = target_width as u64 * target_height as u64;
    if target_height > MAX_BITMAP_HEIGHT || pixels > MAX_BITMAP_PIXELS {
        return Err(RenderError::DecodeError(format!(
            "scaled image {target_width}x{target_height} exceeds the \
             {MAX_BITMAP_HEIGHT} dot height or {MAX_BITMAP_PIXELS} dot limit"
        )));
    }
    let resized = source
        .resize_exact(target_width, target_height, FilterType::Lanczos3)
        .to_rgba8();

    let gray = GrayImage::from_fn(target_width, target_height, |x, y| {
        let [r, g, b, a] = resized.get_pixel(x, y).0;
        if a < 128 {
            return Luma([255]);
        }
        let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        Luma([luma.round().clamp(0.0, 255.0) as u8])
    });

    Ok(dither::dither_luma(&gray))
}

/// Height after scaling `width × height` to `target_width`, at least 1.
///
/// Saturates at `u32::MAX`; [`to_bitmap`] rejects anything that tall.
///
/// ```
/// use posprinter::render::image::scaled_height;
///
/// assert_eq!(scaled_height(200, 100, 384), 192);
/// assert_eq!(scaled_height(1000, 1, 10), 1);
/// assert_eq!(scaled_height(3, 2, 4), 3); // 2.67 rounds to 3
/// ```
pub fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    let scaled = height as f64 * target_width as f64 / width as f64;
    (scaled.round() as u32).max(1)
}

fn strip_data_url(payload: &str) -> &str {
    let trimmed = payload.trim_start();
    if trimmed.starts_with("data:")
        && let Some((_, data)) = trimmed.split_once(',')
    {
        return data;
    }
    trimmed
}
