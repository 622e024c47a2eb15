//! Decode/resize/encode for diagram previews.

use std::path::Path;

/// Default preview bound.
pub const PREVIEW_MAX_DIMS: (u32, u32) = (1024, 1024);

/// Preview image encoded as PNG bytes, with preview and source dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramImage {
    pub png_bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub source_width: u32,
    pub source_height: u32,
}

impl DiagramImage {
    pub fn was_downscaled(&self) -> bool {
        self.width != self.source_width || self.height != self.source_height
    }
}

/// Decodes an image file and returns PNG bytes, downscaled to fit within
/// `max_dims` with the aspect ratio kept.
///
/// A PNG that already fits is returned as-is.
///
/// # Errors
/// Returns an error string if file I/O, format detection/decoding, resizing,
/// or PNG encoding fails.
pub fn load_preview(image_path: &Path, max_dims: (u32, u32)) -> Result<DiagramImage, String> {
    let data = std::fs::read(image_path).map_err(|e| format!("{}: {e}", image_path.display()))?;
    let is_png = data.len() >= 8 && data[..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    let reader = image::ImageReader::new(std::io::Cursor::new(&data))
        .with_guessed_format()
        .map_err(|e| format!("decode: {e}"))?;
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| format!("dimensions: {e}"))?;

    let (dst_w, dst_h) = fit_within(width, height, max_dims);
    let needs_resize = (dst_w, dst_h) != (width, height);

    let png_bytes = if is_png && !needs_resize {
        data
    } else {
        let dyn_img = image::load_from_memory(&data).map_err(|e| format!("decode: {e}"))?;
        let resized = if needs_resize {
            resize_image(&dyn_img, dst_w, dst_h)?
        } else {
            dyn_img
        };
        encode_png(&resized)?
    };

    Ok(DiagramImage {
        png_bytes,
        width: dst_w,
        height: dst_h,
        source_width: width,
        source_height: height,
    })
}

/// Largest size with the source aspect ratio that fits `max_dims`.
fn fit_within(width: u32, height: u32, max_dims: (u32, u32)) -> (u32, u32) {
    let (max_w, max_h) = (max_dims.0.max(1), max_dims.1.max(1));
    if width <= max_w && height <= max_h {
        return (width, height);
    }
    let scale = (f64::from(max_w) / f64::from(width)).min(f64::from(max_h) / f64::from(height));
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let scaled = |v: u32| ((f64::from(v) * scale).round() as u32).max(1);
    (scaled(width).min(max_w), scaled(height).min(max_h))
}

fn resize_image(
    src: &image::DynamicImage,
    dst_w: u32,
    dst_h: u32,
) -> Result<image::DynamicImage, String> {
    use fast_image_resize as fir;

    let src_rgba = src.to_rgba8();
    let (src_w, src_h) = src_rgba.dimensions();
    let src_image =
        fir::images::Image::from_vec_u8(src_w, src_h, src_rgba.into_raw(), fir::PixelType::U8x4)
            .map_err(|e| format!("resize: {e}"))?;

    let mut dst_image = fir::images::Image::new(dst_w, dst_h, fir::PixelType::U8x4);
    let mut resizer = fir::Resizer::new();
    let options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Bilinear));
    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| format!("resize: {e}"))?;

    let rgba = image::RgbaImage::from_raw(dst_w, dst_h, dst_image.into_vec())
        .ok_or_else(|| "resize: invalid output buffer".to_string())?;
    Ok(image::DynamicImage::ImageRgba8(rgba))
}

fn encode_png(img: &image::DynamicImage) -> Result<Vec<u8>, String> {
    use image::ImageEncoder as _;
    use image::codecs::png::{CompressionType, FilterType, PngEncoder};

    let mut buf = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut buf, CompressionType::Fast, FilterType::Adaptive);

    if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        let (w, h) = rgba.dimensions();
        encoder
            .write_image(rgba.as_raw(), w, h, image::ExtendedColorType::Rgba8)
            .map_err(|e| format!("encode: {e}"))?;
    } else {
        let rgb = img.to_rgb8();
        let (w, h) = rgb.dimensions();
        encoder
            .write_image(rgb.as_raw(), w, h, image::ExtendedColorType::Rgb8)
            .map_err(|e| format!("encode: {e}"))?;
    }

    Ok(buf)
}
