//! Text Layout Engine - Measurement, Placement, Glyph Rendering
//!
//! Measurement is an ordered strategy list; placement is pure coordinate
//! math; rendering alpha-blends glyph coverage onto the certificate copy.

use image::{Rgba, RgbaImage};
use log::warn;
use rusttype::{point, Font, PositionedGlyph, Scale};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// How one name is drawn: size in pixels, fill color, alignment around the
/// anchor, and an optional black outline of the given stroke width.
#[derive(Debug, Clone)]
pub struct TextSpec {
    pub size: f32,
    pub color: Rgba<u8>,
    pub align: Align,
    pub outline_width: u32,
}

/// Result of drawing one name. `Failed` leaves the image untouched rather
/// than aborting the batch item from inside the drawing code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawOutcome {
    Drawn,
    /// Name was empty after trimming; nothing to do.
    Skipped,
    /// The font covers none of the name's characters.
    Failed(String),
}

/// Text measurement strategies, tried in order. Later entries trade
/// precision for totality; the last one cannot fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureStrategy {
    /// Tight union of rasterized glyph bounding boxes. Precise.
    GlyphBounds,
    /// Sum of advance widths x line height from font v-metrics. Overestimates
    /// height and ignores kerning overhang.
    AdvanceWidth,
    /// `chars x size/2` wide, `size` tall. Crude, but total.
    Heuristic,
}

pub const MEASURE_STRATEGIES: [MeasureStrategy; 3] = [
    MeasureStrategy::GlyphBounds,
    MeasureStrategy::AdvanceWidth,
    MeasureStrategy::Heuristic,
];

/// Measure the rendered size of `text` under `font` at `size` pixels.
/// Never fails: the heuristic strategy always produces an answer.
pub fn measure_text(font: &Font<'_>, size: f32, text: &str) -> (u32, u32) {
    for strategy in MEASURE_STRATEGIES {
        if let Some(dims) = try_measure(strategy, font, size, text) {
            return dims;
        }
    }
    heuristic_dims(size, text)
}

/// Tight bounding box `(min_x, min_y, max_x, max_y)` of the rasterized
/// glyphs, or `None` when nothing would be inked.
fn glyph_bounds(font: &Font<'_>, size: f32, text: &str) -> Option<(i32, i32, i32, i32)> {
    let scale = Scale::uniform(size);
    let v = font.v_metrics(scale);
    let mut bounds: Option<(i32, i32, i32, i32)> = None;
    for glyph in font.layout(text, scale, point(0.0, v.ascent)) {
        if let Some(bb) = glyph.pixel_bounding_box() {
            bounds = Some(match bounds {
                None => (bb.min.x, bb.min.y, bb.max.x, bb.max.y),
                Some((x0, y0, x1, y1)) => (
                    x0.min(bb.min.x),
                    y0.min(bb.min.y),
                    x1.max(bb.max.x),
                    y1.max(bb.max.y),
                ),
            });
        }
    }
    bounds
}

fn try_measure(
    strategy: MeasureStrategy,
    font: &Font<'_>,
    size: f32,
    text: &str,
) -> Option<(u32, u32)> {
    match strategy {
        MeasureStrategy::GlyphBounds => {
            let bounds = glyph_bounds(font, size, text)?;
            Some((
                (bounds.2 - bounds.0).max(1) as u32,
                (bounds.3 - bounds.1).max(1) as u32,
            ))
        }
        MeasureStrategy::AdvanceWidth => {
            if !font_covers(font, text) {
                return None;
            }
            let scale = Scale::uniform(size);
            let v = font.v_metrics(scale);
            let width: f32 = text
                .chars()
                .map(|c| font.glyph(c).scaled(scale).h_metrics().advance_width)
                .sum();
            Some((
                width.ceil().max(1.0) as u32,
                (v.ascent - v.descent).ceil().max(1.0) as u32,
            ))
        }
        MeasureStrategy::Heuristic => Some(heuristic_dims(size, text)),
    }
}

fn heuristic_dims(size: f32, text: &str) -> (u32, u32) {
    (
        ((text.chars().count() as f32) * size / 2.0).ceil().max(1.0) as u32,
        size.ceil().max(1.0) as u32,
    )
}

/// Top-left corner for a text box of `text_dims` aligned on `anchor` inside
/// `image_dims`. Horizontal placement follows `align`; vertically the box
/// is centered on the anchor. The result is hard-clamped so the box stays
/// fully inside the image (origin pinned to 0 when the text is larger).
pub fn placement(
    anchor: (i64, i64),
    text_dims: (u32, u32),
    image_dims: (u32, u32),
    align: Align,
) -> (i64, i64) {
    let (w, h) = (text_dims.0 as i64, text_dims.1 as i64);
    let tx = match align {
        Align::Center => anchor.0 - w / 2,
        Align::Right => anchor.0 - w,
        Align::Left => anchor.0,
    };
    let ty = anchor.1 - h / 2;
    (
        clamp_axis(tx, w, image_dims.0 as i64),
        clamp_axis(ty, h, image_dims.1 as i64),
    )
}

fn clamp_axis(pos: i64, size: i64, limit: i64) -> i64 {
    pos.min(limit - size).max(0)
}

/// Draw `name` onto `img`, aligned on `anchor`.
///
/// The optional outline is best-effort: every offset stroke in
/// `[-k, k]^2 \ {(0,0)}` is attempted in black and individual stroke
/// failures are swallowed. Only then is the fill color drawn at the
/// unmodified position. A failing primary draw is reported in the outcome
/// but never panics or errors out.
pub fn draw_name(
    img: &mut RgbaImage,
    name: &str,
    anchor: (i64, i64),
    font: &Font<'static>,
    spec: &TextSpec,
) -> DrawOutcome {
    let name = name.trim();
    if name.is_empty() {
        return DrawOutcome::Skipped;
    }

    let dims = measure_text(font, spec.size, name);
    let origin = placement(anchor, dims, (img.width(), img.height()), spec.align);

    if spec.outline_width > 0 {
        let k = spec.outline_width as i64;
        for ox in -k..=k {
            for oy in -k..=k {
                if ox == 0 && oy == 0 {
                    continue;
                }
                // best-effort stroke, failure cannot abort the main glyph
                let _ = draw_pass(
                    img,
                    name,
                    (origin.0 + ox, origin.1 + oy),
                    font,
                    spec.size,
                    Rgba([0, 0, 0, 255]),
                );
            }
        }
    }

    match draw_pass(img, name, origin, font, spec.size, spec.color) {
        Ok(()) => DrawOutcome::Drawn,
        Err(reason) => {
            warn!("failed to draw text '{}': {}", name, reason);
            DrawOutcome::Failed(reason)
        }
    }
}

/// One rendering pass of `text` with its tight bounding box anchored at
/// `origin`. Fails only when the font covers none of the characters.
fn draw_pass(
    img: &mut RgbaImage,
    text: &str,
    origin: (i64, i64),
    font: &Font<'_>,
    size: f32,
    color: Rgba<u8>,
) -> Result<(), String> {
    if !font_covers(font, text) {
        return Err("font has no glyphs for any character".to_string());
    }

    let scale = Scale::uniform(size);
    let v = font.v_metrics(scale);
    let glyphs: Vec<PositionedGlyph<'_>> = font.layout(text, scale, point(0.0, v.ascent)).collect();

    // shift so the tight bbox lands exactly at origin
    let (min_x, min_y) = glyphs
        .iter()
        .filter_map(|g| g.pixel_bounding_box())
        .fold((i32::MAX, i32::MAX), |(mx, my), bb| {
            (mx.min(bb.min.x), my.min(bb.min.y))
        });
    if min_x == i32::MAX {
        // glyphs exist but rasterize to nothing (e.g. all spaces)
        return Ok(());
    }

    for glyph in &glyphs {
        if let Some(bb) = glyph.pixel_bounding_box() {
            glyph.draw(|gx, gy, coverage| {
                let px = origin.0 + (gx as i32 + bb.min.x - min_x) as i64;
                let py = origin.1 + (gy as i32 + bb.min.y - min_y) as i64;
                blend_pixel(img, px, py, color, coverage);
            });
        }
    }
    Ok(())
}

/// Source-over blend of one coverage sample; out-of-bounds samples are
/// dropped silently.
fn blend_pixel(img: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>, coverage: f32) {
    if x < 0 || y < 0 || x >= img.width() as i64 || y >= img.height() as i64 {
        return;
    }
    let a = coverage.clamp(0.0, 1.0);
    if a <= 0.0 {
        return;
    }
    let dst = img.get_pixel_mut(x as u32, y as u32);
    let inv = 1.0 - a;
    dst.0[0] = (color.0[0] as f32 * a + dst.0[0] as f32 * inv) as u8;
    dst.0[1] = (color.0[1] as f32 * a + dst.0[1] as f32 * inv) as u8;
    dst.0[2] = (color.0[2] as f32 * a + dst.0[2] as f32 * inv) as u8;
    dst.0[3] = 255;
}

fn font_covers(font: &Font<'_>, text: &str) -> bool {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .any(|c| font.glyph(c).id().0 != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placement_center() {
        assert_eq!(placement((50, 50), (20, 10), (100, 100), Align::Center), (40, 45));
    }

    #[test]
    fn test_placement_right_and_left() {
        assert_eq!(placement((50, 50), (20, 10), (100, 100), Align::Right), (30, 45));
        assert_eq!(placement((50, 50), (20, 10), (100, 100), Align::Left), (50, 45));
    }

    #[test]
    fn test_placement_clamps_into_bounds() {
        // anchor near the right edge: box pushed back inside
        assert_eq!(placement((99, 50), (20, 10), (100, 100), Align::Left), (80, 45));
        // anchor before the left edge
        assert_eq!(placement((-30, 50), (20, 10), (100, 100), Align::Left), (0, 45));
    }

    #[test]
    fn test_placement_oversized_text_pins_to_zero() {
        let (x, y) = placement((50, 50), (200, 300), (100, 100), Align::Center);
        assert_eq!((x, y), (0, 0));
    }

    #[test]
    fn test_heuristic_measure_is_total() {
        assert_eq!(heuristic_dims(90.0, "Alice"), (225, 90));
    }

    #[test]
    fn test_heuristic_measure_never_zero() {
        assert_eq!(heuristic_dims(0.4, "x"), (1, 1));
    }
}
