use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use std::path::Path;

use super::Renderer;
use crate::config::SizePolicy;
use crate::error::{Error, Result};
use crate::utils::write_atomic;

/// In-process renderer built on `image` and `webp`
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRenderer;

impl Renderer for NativeRenderer {
    fn name(&self) -> &str {
        "native"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn render_primary(
        &self,
        source: &Path,
        dest: &Path,
        policy: SizePolicy,
        quality: f32,
    ) -> Result<()> {
        let img = image::open(source)?;
        let img = match policy {
            SizePolicy::Original => img,
            SizePolicy::Fit { width, height } => fit_and_pad(&img, width, height),
        };
        write_atomic(dest, &encode_webp(&img, quality)?)?;
        Ok(())
    }

    fn render_thumbnail(&self, source: &Path, dest: &Path, size: u32, quality: f32) -> Result<()> {
        let img = image::open(source)?;
        let thumb = img.resize_to_fill(size, size, FilterType::Lanczos3);
        write_atomic(dest, &encode_webp(&thumb, quality)?)?;
        Ok(())
    }
}

/// Shrink `img` to fit inside `width`x`height`, then center it on a white canvas
/// of exactly that size. Images already inside the box are not enlarged.
pub fn fit_and_pad(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    let fitted = if img.width() > width || img.height() > height {
        img.resize(width, height, FilterType::Lanczos3)
    } else {
        img.clone()
    };

    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
    let x = width.saturating_sub(fitted.width()) / 2;
    let y = height.saturating_sub(fitted.height()) / 2;
    imageops::overlay(&mut canvas, &fitted.to_rgba8(), x as i64, y as i64);

    DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8())
}

/// Lossy WebP encoding; the encoder only accepts 8-bit RGB(A)
fn encode_webp(img: &DynamicImage, quality: f32) -> Result<Vec<u8>> {
    let img = if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    };
    let encoder = webp::Encoder::from_image(&img).map_err(|e| Error::Render(e.to_string()))?;
    Ok(encoder.encode(quality).to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};
    use tempfile::tempdir;

    fn write_png(path: &Path, width: u32, height: u32) {
        RgbImage::from_pixel(width, height, Rgb([200, 20, 20]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_fit_and_pad_produces_exact_box() {
        let wide = DynamicImage::ImageRgb8(RgbImage::from_pixel(400, 100, Rgb([0, 0, 0])));
        let padded = fit_and_pad(&wide, 250, 150);
        assert_eq!(padded.dimensions(), (250, 150));

        // Letterboxed: the top-left corner is padding, the center is image
        let rgb = padded.to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(rgb.get_pixel(125, 75), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_fit_and_pad_does_not_upscale() {
        let small = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, Rgb([0, 0, 0])));
        let padded = fit_and_pad(&small, 100, 100).to_rgb8();

        assert_eq!(padded.dimensions(), (100, 100));
        assert_eq!(padded.get_pixel(30, 30), &Rgb([255, 255, 255]));
        assert_eq!(padded.get_pixel(50, 50), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_render_primary_writes_webp_in_box() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("Civic_2016.png");
        let dest = dir.path().join("out.webp");
        write_png(&source, 400, 200);

        NativeRenderer
            .render_primary(&source, &dest, SizePolicy::Fit { width: 250, height: 150 }, 80.0)
            .unwrap();

        let bytes = std::fs::read(&dest).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WEBP");
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (250, 150));
    }

    #[test]
    fn test_render_primary_original_keeps_dimensions() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.png");
        let dest = dir.path().join("a.webp");
        write_png(&source, 64, 48);

        NativeRenderer
            .render_primary(&source, &dest, SizePolicy::Original, 80.0)
            .unwrap();

        let decoded = image::open(&dest).unwrap();
        assert_eq!(decoded.dimensions(), (64, 48));
    }

    #[test]
    fn test_render_thumbnail_is_square() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.png");
        let dest = dir.path().join("thumb.webp");
        write_png(&source, 120, 60);

        NativeRenderer.render_thumbnail(&source, &dest, 32, 70.0).unwrap();

        let decoded = image::open(&dest).unwrap();
        assert_eq!(decoded.dimensions(), (32, 32));
    }

    #[test]
    fn test_render_rejects_undecodable_source() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("broken.jpg");
        std::fs::write(&source, b"DUMMY IMAGE DATA").unwrap();

        let result = NativeRenderer.render_primary(
            &source,
            &dir.path().join("out.webp"),
            SizePolicy::Original,
            80.0,
        );
        assert!(result.is_err());
    }
}
