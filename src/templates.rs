//! Template Rasterization - Vector or Raster to Base Image
//!
//! A `.svg` template is rendered over a white background; anything else is
//! passed through untouched and decoded downstream.

use image::RgbaImage;
use log::{debug, info};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template file not found: {0}")]
    TemplateNotFound(String),

    #[error("SVG templates require the `svg` feature; rebuild with --features svg")]
    ConversionUnavailable,

    #[error("SVG conversion failed: {0}")]
    ConversionFailed(String),

    #[error("Failed to decode template as an image: {0}")]
    DecodeFailed(String),

    #[error("Failed to read template file: {0}")]
    Io(#[from] std::io::Error),
}

/// Rasterize the template at `path` into PNG-or-raster bytes.
///
/// Raster assets are returned byte-for-byte; SVG assets are rendered onto a
/// white-filled pixmap, honoring the optional width/height overrides.
pub fn rasterize_template(
    path: &Path,
    width: Option<u32>,
    height: Option<u32>,
) -> Result<Vec<u8>, TemplateError> {
    if !path.exists() {
        return Err(TemplateError::TemplateNotFound(path.display().to_string()));
    }

    let is_svg = path
        .extension()
        .map_or(false, |e| e.eq_ignore_ascii_case("svg"));

    if is_svg {
        let data = std::fs::read(path)?;
        render_svg(&data, width, height)
    } else {
        debug!("raster template, passing bytes through: {}", path.display());
        Ok(std::fs::read(path)?)
    }
}

#[cfg(feature = "svg")]
fn render_svg(data: &[u8], width: Option<u32>, height: Option<u32>) -> Result<Vec<u8>, TemplateError> {
    use resvg::tiny_skia;
    use resvg::usvg;

    let tree = usvg::Tree::from_data(data, &usvg::Options::default())
        .map_err(|e| TemplateError::ConversionFailed(e.to_string()))?;

    let size = tree.size();
    let out_w = width.filter(|&w| w > 0).unwrap_or(size.width().ceil() as u32);
    let out_h = height.filter(|&h| h > 0).unwrap_or(size.height().ceil() as u32);
    info!("rendering SVG template at {}x{}", out_w, out_h);

    let mut pixmap = tiny_skia::Pixmap::new(out_w, out_h)
        .ok_or_else(|| TemplateError::ConversionFailed(format!("invalid output size {}x{}", out_w, out_h)))?;
    pixmap.fill(tiny_skia::Color::WHITE);

    let transform = tiny_skia::Transform::from_scale(
        out_w as f32 / size.width(),
        out_h as f32 / size.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    pixmap
        .encode_png()
        .map_err(|e| TemplateError::ConversionFailed(e.to_string()))
}

#[cfg(not(feature = "svg"))]
fn render_svg(_data: &[u8], _width: Option<u32>, _height: Option<u32>) -> Result<Vec<u8>, TemplateError> {
    Err(TemplateError::ConversionUnavailable)
}

/// Decode rasterized template bytes into the RGBA base image every render
/// composites onto.
pub fn decode_base_image(bytes: &[u8]) -> Result<RgbaImage, TemplateError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| TemplateError::DecodeFailed(e.to_string()))?;
    Ok(img.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(w, h, Rgba([10, 20, 30, 255]));
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageOutputFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_missing_template_is_not_found() {
        let err = rasterize_template(Path::new("no/such/template.png"), None, None).unwrap_err();
        assert!(matches!(err, TemplateError::TemplateNotFound(_)));
    }

    #[test]
    fn test_raster_passthrough() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.png");
        let bytes = png_bytes(4, 3);
        std::fs::write(&path, &bytes).unwrap();

        let out = rasterize_template(&path, Some(100), Some(100)).unwrap();
        // size overrides do not apply to raster templates
        assert_eq!(out, bytes);
    }

    #[test]
    fn test_decode_base_image_has_alpha() {
        let base = decode_base_image(&png_bytes(4, 3)).unwrap();
        assert_eq!((base.width(), base.height()), (4, 3));
        assert_eq!(base.get_pixel(0, 0).0[3], 255);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(
            decode_base_image(b"not an image"),
            Err(TemplateError::DecodeFailed(_))
        ));
    }

    #[cfg(feature = "svg")]
    #[test]
    fn test_svg_renders_with_white_background() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.svg");
        std::fs::write(
            &path,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="8"></svg>"#,
        )
        .unwrap();

        let out = rasterize_template(&path, None, None).unwrap();
        let img = decode_base_image(&out).unwrap();
        assert_eq!((img.width(), img.height()), (10, 8));
        assert_eq!(img.get_pixel(5, 4).0, [255, 255, 255, 255]);
    }

    #[cfg(feature = "svg")]
    #[test]
    fn test_svg_honors_size_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.svg");
        std::fs::write(
            &path,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="8"></svg>"#,
        )
        .unwrap();

        let out = rasterize_template(&path, Some(20), Some(16)).unwrap();
        let img = decode_base_image(&out).unwrap();
        assert_eq!((img.width(), img.height()), (20, 16));
    }
}
