use std::io::Cursor;

use anyhow::{bail, Context, Result};
use image::{imageops::FilterType, DynamicImage, ImageFormat};

/// Grayscale and optionally upscale a PNG screenshot before recognition.
/// Small UI digits recognise noticeably better at 2x.
pub fn prepare_for_ocr(png_bytes: &[u8], upscale: u32, min_bytes: usize) -> Result<Vec<u8>> {
    if png_bytes.len() < min_bytes {
        bail!(
            "screenshot looks blank ({} bytes, expected at least {})",
            png_bytes.len(),
            min_bytes
        );
    }

    let img = image::load_from_memory_with_format(png_bytes, ImageFormat::Png)
        .context("screenshot is not a valid PNG")?;
    let mut gray = img.to_luma8();

    let factor = upscale.clamp(1, 4);
    if factor > 1 {
        gray = image::imageops::resize(
            &gray,
            gray.width() * factor,
            gray.height() * factor,
            FilterType::Triangle,
        );
    }

    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(gray)
        .write_to(&mut out, ImageFormat::Png)
        .context("failed to encode prepared screenshot")?;
    Ok(out.into_inner())
}

#[cfg(test)]
pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 7 % 255) as u8, (y * 13 % 255) as u8, 90])
    });
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}
