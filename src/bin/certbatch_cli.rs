//! Certbatch CLI - Batch Certificate Generation
//!
//! Commands: generate, names
//! Outputs JSON to stdout
//! Returns non-zero on batch failure

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use certbatch_core::{
    generate, load_names,
    pipeline::{GenerateRequest, PipelineError},
    Align,
};

#[derive(Parser)]
#[command(name = "certbatch-cli")]
#[command(about = "Certbatch CLI - Certificate Batch Renderer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render certificates for every name and pack them into a ZIP archive
    Generate {
        /// Path to template image (PNG or SVG)
        #[arg(short, long, default_value = "template.png")]
        template: PathBuf,

        /// Path to names file (CSV or TXT)
        #[arg(short, long, default_value = "participants.csv")]
        names: PathBuf,

        /// Path to a .ttf/.otf font that supports your language
        #[arg(short, long, default_value = "GoogleSans-Regular.ttf")]
        font: PathBuf,

        /// X coordinate (pixels) for the name anchor; template center if omitted
        #[arg(short, long)]
        x: Option<i64>,

        /// Y coordinate (pixels) for the name anchor; template center if omitted
        #[arg(short, long)]
        y: Option<i64>,

        /// Font size in pixels
        #[arg(long, default_value_t = 90.0)]
        fontsize: f32,

        /// Text color (#RRGGBB, #RGB, or a common color name)
        #[arg(long, default_value = "#000000")]
        color: String,

        /// Text horizontal alignment
        #[arg(long, default_value = "center", value_parser = ["left", "center", "right"])]
        align: String,

        /// Output zip filename
        #[arg(short, long, default_value = "certificates.zip")]
        out: PathBuf,

        /// Format string for entries inside the zip; use {name}
        #[arg(long, default_value = "{name}.png")]
        entry_format: String,

        /// Draw a black outline behind the text to improve readability
        #[arg(long)]
        outline: bool,

        /// Outline stroke width in pixels
        #[arg(long, default_value_t = 2)]
        outline_width: u32,

        /// DPI metadata for the output PNGs (also affects SVG quality targets)
        #[arg(long, default_value_t = 600)]
        dpi: u32,

        /// Raster width override for SVG templates
        #[arg(long)]
        width: Option<u32>,

        /// Raster height override for SVG templates
        #[arg(long)]
        height: Option<u32>,
    },

    /// Parse and print the deduplicated name list
    Names {
        /// Path to names file (CSV or TXT)
        #[arg(short, long, default_value = "participants.csv")]
        input: PathBuf,
    },
}

fn parse_align(s: &str) -> Align {
    match s {
        "left" => Align::Left,
        "right" => Align::Right,
        _ => Align::Center,
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            template,
            names,
            font,
            x,
            y,
            fontsize,
            color,
            align,
            out,
            entry_format,
            outline,
            outline_width,
            dpi,
            width,
            height,
        } => {
            let request = GenerateRequest {
                template,
                names,
                font,
                x,
                y,
                font_size: fontsize,
                color,
                align: parse_align(&align),
                outline,
                outline_width,
                dpi,
                entry_format,
                width,
                height,
            };

            match generate(&request) {
                Ok(batch) => {
                    if let Err(e) = std::fs::write(&out, &batch.archive) {
                        eprintln!(r#"{{"success": false, "error": "Failed to write {}: {}"}}"#, out.display(), e);
                        return ExitCode::FAILURE;
                    }
                    let output = serde_json::json!({
                        "success": true,
                        "archive": out,
                        "summary": batch.summary,
                    });
                    println!("{}", serde_json::to_string_pretty(&output).unwrap());
                    ExitCode::SUCCESS
                }
                Err(e @ PipelineError::EmptyBatch) => {
                    let output = serde_json::json!({
                        "success": false,
                        "error": e.to_string(),
                    });
                    println!("{}", serde_json::to_string(&output).unwrap());
                    ExitCode::from(2) // batch failure
                }
                Err(e) => {
                    let output = serde_json::json!({
                        "success": false,
                        "error": e.to_string(),
                    });
                    println!("{}", serde_json::to_string(&output).unwrap());
                    ExitCode::FAILURE
                }
            }
        }

        Commands::Names { input } => match load_names(&input) {
            Ok(names) => {
                println!("{}", serde_json::to_string_pretty(&names).unwrap());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!(r#"{{"error": "Failed to load names: {}"}}"#, e);
                ExitCode::FAILURE
            }
        },
    }
}
