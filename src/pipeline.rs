//! Render Pipeline - Single Entry Point
//!
//! Orchestrates name loading, template rasterization, per-name rendering,
//! and deterministic ZIP packaging. One bad item never aborts the batch;
//! a batch with zero successes is a hard failure.

use chrono::{DateTime, Utc};
use image::{Rgba, RgbaImage};
use log::{info, warn};
use rusttype::Font;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::fonts::{self, FontError};
use crate::layout::{draw_name, Align, TextSpec};
use crate::sanitize::sanitize_filename;
use crate::templates::{decode_base_image, rasterize_template, TemplateError};
use crate::ENGINE_VERSION;

#[cfg(feature = "test-hooks")]
use std::collections::HashSet;

/// Fixed DEFLATE level so identical inputs produce identical archives.
const DEFLATE_LEVEL: i32 = 6;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Names file not found: {0}")]
    NamesNotFound(String),

    #[error("Font file not found: {0}")]
    FontNotFound(String),

    #[error("No valid names found in the names file")]
    NoNames,

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Font(#[from] FontError),

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No certificates were generated successfully")]
    EmptyBatch,
}

/// Path-level request for a full generation run. All fields beyond the
/// three input assets carry the original tool's defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub template: PathBuf,
    pub names: PathBuf,
    pub font: PathBuf,
    #[serde(default)]
    pub x: Option<i64>,
    #[serde(default)]
    pub y: Option<i64>,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_align")]
    pub align: Align,
    #[serde(default)]
    pub outline: bool,
    #[serde(default = "default_outline_width")]
    pub outline_width: u32,
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    #[serde(default = "default_entry_format")]
    pub entry_format: String,
    /// Raster size overrides, honored for vector templates only.
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

fn default_font_size() -> f32 { 90.0 }
fn default_color() -> String { "#000000".to_string() }
fn default_align() -> Align { Align::Center }
fn default_outline_width() -> u32 { 2 }
fn default_dpi() -> u32 { 600 }
fn default_entry_format() -> String { "{name}.png".to_string() }

/// Resolved per-run rendering options. Anchor axes left unset default to
/// the image center.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub anchor_x: Option<i64>,
    pub anchor_y: Option<i64>,
    pub font_size: f32,
    pub color: Rgba<u8>,
    pub align: Align,
    /// 0 disables the outline.
    pub outline_width: u32,
    pub dpi: u32,
    pub entry_format: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            anchor_x: None,
            anchor_y: None,
            font_size: default_font_size(),
            color: Rgba([0, 0, 0, 255]),
            align: default_align(),
            outline_width: 0,
            dpi: default_dpi(),
            entry_format: default_entry_format(),
        }
    }
}

/// Per-name outcome. `Written` carries the archive entry name and encoded
/// byte count; `Failed` carries the reason and the batch moves on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    Written { name: String, entry: String, bytes: u64 },
    Failed { name: String, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: String,
    pub engine_version: String,
    pub created_at: DateTime<Utc>,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub outcomes: Vec<ItemOutcome>,
}

#[derive(Debug, Clone)]
pub struct GeneratedBatch {
    pub archive: Vec<u8>,
    pub summary: RunSummary,
}

/// The render pipeline - single entry point for batch certificate runs.
pub struct RenderPipeline {
    base: RgbaImage,
    font: Font<'static>,
    options: RenderOptions,
    #[cfg(feature = "test-hooks")]
    forced_failures: HashSet<String>,
}

impl RenderPipeline {
    pub fn new(base: RgbaImage, font: Font<'static>, options: RenderOptions) -> Self {
        Self {
            base,
            font,
            options,
            #[cfg(feature = "test-hooks")]
            forced_failures: HashSet::new(),
        }
    }

    /// Force the items with these sanitized keys to fail, to exercise
    /// partial-batch bookkeeping.
    #[cfg(feature = "test-hooks")]
    pub fn force_failures<I: IntoIterator<Item = String>>(&mut self, keys: I) {
        self.forced_failures.extend(keys);
    }

    /// Render every name onto a fresh copy of the base image and pack the
    /// results into an in-memory ZIP archive.
    ///
    /// Entries appear in input order, DEFLATE-compressed at a fixed level
    /// with fixed timestamps. Per-item errors are recorded in the summary;
    /// only a run with zero successes errors out as [`PipelineError::EmptyBatch`].
    pub fn run(&self, names: &[String]) -> Result<(Vec<u8>, RunSummary), PipelineError> {
        let anchor = (
            self.options
                .anchor_x
                .unwrap_or(self.base.width() as i64 / 2),
            self.options
                .anchor_y
                .unwrap_or(self.base.height() as i64 / 2),
        );
        if anchor.0 < 0
            || anchor.0 >= self.base.width() as i64
            || anchor.1 < 0
            || anchor.1 >= self.base.height() as i64
        {
            warn!(
                "anchor ({}, {}) may be outside image bounds {}x{}",
                anchor.0,
                anchor.1,
                self.base.width(),
                self.base.height()
            );
        }

        let entry_opts: FileOptions = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(DEFLATE_LEVEL))
            .last_modified_time(zip::DateTime::default());

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let mut key_counts: HashMap<String, u32> = HashMap::new();
        let mut outcomes = Vec::with_capacity(names.len());

        for (idx, name) in names.iter().enumerate() {
            match self.render_one(name, anchor, &mut key_counts, &mut zip, entry_opts) {
                Ok((entry, bytes)) => {
                    info!("[{}/{}] wrote {} (name: {})", idx + 1, names.len(), entry, name);
                    outcomes.push(ItemOutcome::Written {
                        name: name.clone(),
                        entry,
                        bytes,
                    });
                }
                Err(reason) => {
                    warn!("[{}/{}] failed for '{}': {}", idx + 1, names.len(), name, reason);
                    outcomes.push(ItemOutcome::Failed {
                        name: name.clone(),
                        reason,
                    });
                }
            }
        }

        let archive = zip.finish()?.into_inner();

        let succeeded = outcomes
            .iter()
            .filter(|o| matches!(o, ItemOutcome::Written { .. }))
            .count();
        let summary = RunSummary {
            id: Uuid::new_v4().to_string(),
            engine_version: ENGINE_VERSION.to_string(),
            created_at: Utc::now(),
            total: names.len(),
            succeeded,
            failed: names.len() - succeeded,
            outcomes,
        };

        if summary.succeeded == 0 {
            return Err(PipelineError::EmptyBatch);
        }
        Ok((archive, summary))
    }

    fn render_one(
        &self,
        name: &str,
        anchor: (i64, i64),
        key_counts: &mut HashMap<String, u32>,
        zip: &mut ZipWriter<Cursor<Vec<u8>>>,
        entry_opts: FileOptions,
    ) -> Result<(String, u64), String> {
        let key = sanitize_filename(name);

        #[cfg(feature = "test-hooks")]
        if self.forced_failures.contains(&key) {
            return Err("forced failure (test hook)".to_string());
        }

        let entry = self
            .options
            .entry_format
            .replace("{name}", &allocate_key(key_counts, &key));

        let mut img = self.base.clone();
        let spec = TextSpec {
            size: self.options.font_size,
            color: self.options.color,
            align: self.options.align,
            outline_width: self.options.outline_width,
        };
        // a failed draw leaves a blank certificate, it is not an item failure
        draw_name(&mut img, name, anchor, &self.font, &spec);

        let png = encode_png(&img, self.options.dpi)?;
        zip.start_file(&entry, entry_opts).map_err(|e| e.to_string())?;
        zip.write_all(&png).map_err(|e| e.to_string())?;
        Ok((entry, png.len() as u64))
    }
}

/// Allocate a collision-free archive key: the first use of a key is taken
/// verbatim, later uses get `_2`, `_3`, ... suffixes instead of silently
/// overwriting the earlier entry.
fn allocate_key(counts: &mut HashMap<String, u32>, key: &str) -> String {
    let n = counts.entry(key.to_string()).or_insert(0);
    *n += 1;
    if *n == 1 {
        key.to_string()
    } else {
        format!("{}_{}", key, n)
    }
}

/// PNG-encode with the requested DPI carried in the pHYs chunk.
fn encode_png(img: &RgbaImage, dpi: u32) -> Result<Vec<u8>, String> {
    let mut buf = Vec::new();
    let mut encoder = png::Encoder::new(&mut buf, img.width(), img.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_compression(png::Compression::Default);
    // dots per inch -> pixels per meter
    let ppu = (dpi as f64 * 1000.0 / 25.4).round() as u32;
    encoder.set_pixel_dims(Some(png::PixelDimensions {
        xppu: ppu,
        yppu: ppu,
        unit: png::Unit::Meter,
    }));
    let mut writer = encoder.write_header().map_err(|e| e.to_string())?;
    writer
        .write_image_data(img.as_raw())
        .map_err(|e| e.to_string())?;
    drop(writer);
    Ok(buf)
}

/// Parse `#RRGGBB`, `#RGB`, or a small set of common color names.
pub fn parse_color(input: &str) -> Result<Rgba<u8>, PipelineError> {
    let s = input.trim();
    let named = match s.to_ascii_lowercase().as_str() {
        "black" => Some([0, 0, 0]),
        "white" => Some([255, 255, 255]),
        "red" => Some([255, 0, 0]),
        "green" => Some([0, 128, 0]),
        "blue" => Some([0, 0, 255]),
        "yellow" => Some([255, 255, 0]),
        "gray" | "grey" => Some([128, 128, 128]),
        _ => None,
    };
    if let Some([r, g, b]) = named {
        return Ok(Rgba([r, g, b, 255]));
    }

    let hex_part = s.strip_prefix('#').unwrap_or(s);
    let expanded = match hex_part.len() {
        3 => hex_part.chars().flat_map(|c| [c, c]).collect::<String>(),
        6 => hex_part.to_string(),
        _ => return Err(PipelineError::InvalidColor(input.to_string())),
    };
    let bytes = hex::decode(&expanded).map_err(|_| PipelineError::InvalidColor(input.to_string()))?;
    Ok(Rgba([bytes[0], bytes[1], bytes[2], 255]))
}

/// Full path-level generation run: load names, rasterize the template,
/// load the font, render, and pack. Missing input files abort before any
/// rendering starts.
pub fn generate(request: &GenerateRequest) -> Result<GeneratedBatch, PipelineError> {
    if !request.names.exists() {
        return Err(PipelineError::NamesNotFound(
            request.names.display().to_string(),
        ));
    }
    if !request.font.exists() {
        return Err(PipelineError::FontNotFound(
            request.font.display().to_string(),
        ));
    }

    let names = crate::names::load_names(&request.names)?;
    if names.is_empty() {
        return Err(PipelineError::NoNames);
    }
    info!("loaded {} names", names.len());

    let raster = rasterize_template(&request.template, request.width, request.height)?;
    let base = decode_base_image(&raster)?;
    info!("template size: {} x {} pixels", base.width(), base.height());

    let font = fonts::load_font(&request.font, &fonts::default_fallbacks())?;
    let color = parse_color(&request.color)?;

    let options = RenderOptions {
        anchor_x: request.x,
        anchor_y: request.y,
        font_size: request.font_size,
        color,
        align: request.align,
        outline_width: if request.outline { request.outline_width } else { 0 },
        dpi: request.dpi,
        entry_format: request.entry_format.clone(),
    };

    let pipeline = RenderPipeline::new(base, font, options);
    let (archive, summary) = pipeline.run(&names)?;
    info!(
        "done, generated {}/{} certificates",
        summary.succeeded, summary.total
    );
    Ok(GeneratedBatch { archive, summary })
}
