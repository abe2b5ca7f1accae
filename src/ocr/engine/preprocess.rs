use anyhow::{Context, Result};
use image::{DynamicImage, GenericImageView};
use std::io::Write;
use std::path::Path;

use super::EngineInput;

const MIN_SIDE_PX: u32 = 1000;
const MAX_UPSCALED_PIXELS: u64 = 40_000_000;

pub(super) fn prepare_input(path: &Path, optimize: bool) -> Result<EngineInput> {
    if !optimize {
        return Ok(EngineInput::Original(path.to_path_buf()));
    }
    let image = image::open(path)
        .with_context(|| format!("failed to decode image for OCR: {}", path.display()))?;
    let optimized = optimize_for_ocr(image);
    let mut tmp = tempfile::Builder::new()
        .prefix("arabic-ocr-")
        .suffix(".png")
        .tempfile()
        .with_context(|| "failed to create temp file for OCR")?;
    optimized
        .write_to(&mut tmp, image::ImageFormat::Png)
        .with_context(|| "failed to write temp image for OCR")?;
    tmp.flush().ok();
    Ok(EngineInput::Prepared(tmp))
}

/// RGB copy of `image`, upscaled so that neither side is below 1000 px.
/// Images whose upscaled size would exceed 40 megapixels keep their size.
pub(super) fn optimize_for_ocr(image: DynamicImage) -> DynamicImage {
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    let (width, height) = rgb.dimensions();
    match upscaled_size(width, height) {
        Some((new_width, new_height)) => {
            rgb.resize_exact(new_width, new_height, image::imageops::FilterType::Lanczos3)
        }
        None => rgb,
    }
}

fn upscaled_size(width: u32, height: u32) -> Option<(u32, u32)> {
    if width == 0 || height == 0 {
        return None;
    }
    if width >= MIN_SIDE_PX && height >= MIN_SIDE_PX {
        return None;
    }
    let scale = (MIN_SIDE_PX as f64 / width as f64).max(MIN_SIDE_PX as f64 / height as f64);
    let new_width = (width as f64 * scale) as u64;
    let new_height = (height as f64 * scale) as u64;
    if new_width.saturating_mul(new_height) > MAX_UPSCALED_PIXELS {
        tracing::debug!(width, height, "skipping upscale of extreme aspect ratio image");
        return None;
    }
    Some((new_width as u32, new_height as u32))
}
