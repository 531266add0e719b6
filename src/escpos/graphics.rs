//! # ESC/POS Raster Graphics
//!
//! Builds `GS v 0` raster bit-image commands from packed monochrome rows.
//!
//! ## Data Format
//!
//! Each row is `ceil(width / 8)` bytes, MSB = leftmost dot, 1 = black.
//!
//! ```text
//! Row 0:    d[0]      d[1]       ... d[wb-1]
//! Row 1:    d[wb]     d[wb+1]    ... d[2*wb-1]
//! ```
//!
//! ## Chunking
//!
//! Tall images are split into bands of at most [`MAX_CHUNK_ROWS`] rows so
//! small receive buffers do not overflow mid-image.

use super::commands::{GS, u16_le};

/// Maximum rows sent in one `GS v 0` command.
pub const MAX_CHUNK_ROWS: usize = 256;

/// # Print Raster Bit Image (GS v 0 m xL xH yL yH d1...dk)
///
/// | Field | Value |
/// |-------|-------|
/// | m | 0 (normal density) |
/// | xL xH | bytes per row |
/// | yL yH | rows |
///
/// ```
/// use posprinter::escpos::graphics;
///
/// let data = vec![0xFF; 2 * 3];
/// let cmd = graphics::raster(16, 3, &data);
/// assert_eq!(&cmd[..8], &[0x1D, 0x76, 0x30, 0x00, 2, 0, 3, 0]);
/// assert_eq!(cmd.len(), 8 + 6);
/// ```
pub fn raster(width_dots: u16, height: u16, data: &[u8]) -> Vec<u8> {
    let width_bytes = width_dots.div_ceil(8);

    debug_assert!(
        data.len() == width_bytes as usize * height as usize,
        "Raster data length mismatch. Expected {} bytes × {} rows, got {}",
        width_bytes,
        height,
        data.len()
    );

    let [xl, xh] = u16_le(width_bytes);
    let [yl, yh] = u16_le(height);

    let mut cmd = Vec::with_capacity(8 + data.len());
    cmd.extend_from_slice(&[GS, b'v', b'0', 0, xl, xh, yl, yh]);
    cmd.extend_from_slice(data);
    cmd
}

/// Split a full image into `GS v 0` commands of at most [`MAX_CHUNK_ROWS`] rows.
///
/// ```
/// use posprinter::escpos::graphics;
///
/// let data = vec![0u8; 1 * 600];
/// let cmd = graphics::raster_chunked(8, 600, &data);
/// // 256 + 256 + 88 rows, 8-byte header each
/// assert_eq!(cmd.len(), 600 + 3 * 8);
/// ```
pub fn raster_chunked(width_dots: u16, height: usize, data: &[u8]) -> Vec<u8> {
    let width_bytes = width_dots.div_ceil(8) as usize;
    let mut out = Vec::with_capacity(data.len() + 8 * height.div_ceil(MAX_CHUNK_ROWS));

    let mut row_offset = 0;
    while row_offset < height {
        let chunk_height = (height - row_offset).min(MAX_CHUNK_ROWS);
        let byte_start = row_offset * width_bytes;
        let byte_end = (row_offset + chunk_height) * width_bytes;
        out.extend(raster(
            width_dots,
            chunk_height as u16,
            &data[byte_start..byte_end],
        ));
        row_offset += chunk_height;
    }

    out
}
