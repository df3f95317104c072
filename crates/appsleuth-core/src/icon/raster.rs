//! Pixel helpers for rendered icons: BGRA to RGBA conversion, alpha
//! reconstruction from a 1-bpp AND mask, and PNG encoding.

use crate::error::{CoreError, CoreResult};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Convert top-down BGRA pixels to RGBA. The flag reports whether any pixel
/// carried a non-zero alpha.
pub fn bgra_to_rgba(bgra: &[u8]) -> (Vec<u8>, bool) {
    let mut rgba = Vec::with_capacity(bgra.len());
    let mut has_alpha = false;
    for px in bgra.chunks_exact(4) {
        rgba.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
        has_alpha |= px[3] != 0;
    }
    (rgba, has_alpha)
}

/// Bytes per row of a 1-bpp bitmap `width` pixels wide (DWORD-aligned).
pub fn mask_stride(width: u32) -> usize {
    width.div_ceil(32) as usize * 4
}

/// Set alpha from a top-down 1-bpp AND mask: a set bit is transparent,
/// a clear bit opaque. Rows missing from a short mask become opaque.
pub fn apply_mask_alpha(rgba: &mut [u8], width: u32, height: u32, mask: &[u8]) {
    let stride = mask_stride(width);
    for y in 0..height as usize {
        for x in 0..width as usize {
            let pixel = (y * width as usize + x) * 4;
            if pixel + 3 >= rgba.len() {
                return;
            }
            let transparent = mask
                .get(y * stride + x / 8)
                .is_some_and(|byte| byte & (0x80 >> (x % 8)) != 0);
            rgba[pixel + 3] = if transparent { 0 } else { 255 };
        }
    }
}

pub fn make_opaque(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        px[3] = 255;
    }
}

/// Encode RGBA pixels as PNG at `dest`, flushed to disk.
pub fn write_png(dest: &Path, width: u32, height: u32, rgba: &[u8]) -> CoreResult<()> {
    let file = File::create(dest).map_err(|e| CoreError::io("creating icon", dest, e))?;
    let mut writer = BufWriter::new(file);
    PngEncoder::new(&mut writer)
        .write_image(rgba, width, height, ExtendedColorType::Rgba8)
        .map_err(|e| CoreError::Failed(format!("encoding PNG {}: {e}", dest.display())))?;
    writer
        .flush()
        .map_err(|e| CoreError::io("writing icon", dest, e))?;
    let file = writer
        .into_inner()
        .map_err(|e| CoreError::io("writing icon", dest, e.into_error()))?;
    file.sync_all()
        .map_err(|e| CoreError::io("syncing icon", dest, e))
}
