//! Certbatch Core - Certificate Batch Renderer
//!
//! # The Pipeline Guarantees (Non-Negotiable)
//! 1. The template is read-only; every render works on a fresh copy
//! 2. Sanitized keys are a pure function of the input name
//! 3. One bad name never aborts the batch
//! 4. An all-failed batch is a failure, not a silent success
//! 5. Identical inputs produce a byte-identical archive

pub mod fonts;
pub mod layout;
pub mod names;
pub mod pipeline;
pub mod sanitize;
pub mod templates;

pub use fonts::{load_font, FontError};
pub use layout::{Align, DrawOutcome, TextSpec};
pub use names::load_names;
pub use pipeline::{
    generate, GenerateRequest, GeneratedBatch, ItemOutcome, PipelineError, RenderOptions,
    RenderPipeline, RunSummary,
};
pub use sanitize::sanitize_filename;
pub use templates::{decode_base_image, rasterize_template, TemplateError};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
