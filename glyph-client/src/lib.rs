//! # Glyphpad Client
//!
//! Remote side of Glyphpad: the HTTP client for the classifier service, the
//! async controller that runs a session's prediction cycles, and the
//! `glyphpad` command-line front end.
//!
//! ## Usage
//!
//! ```bash
//! glyphpad check
//! glyphpad infer --model cnn --strokes drawing.json --verdict correct
//! glyphpad preview --image scan.png --invert --output preview.png
//! ```
//!
//! ## Architecture
//!
//! - `CliArgs` - Command-line arguments parsed with clap
//! - `PadConfig` - Service address, timeout and surface settings
//! - `HttpClient` - `Transport` over HTTP/JSON
//! - `SessionController` - Drives capture and feedback against a `Transport`

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod client;
mod controller;
mod drawing;

pub use client::{
    ClientConfig, ClientError, ClientResult, HealthStatus, HttpClient, Transport,
    DEFAULT_API_BASE,
};
pub use controller::{CycleError, SessionController};
pub use drawing::{
    load_image, load_strokes, save_preview, session_from_image, session_from_strokes, InputError,
};

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use glyph_core::{ModelKind, Session, Verdict, DEFAULT_BRUSH_WIDTH, DEFAULT_CANVAS_SIDE};

/// Command-line arguments for glyphpad.
#[derive(Debug, Clone, Parser)]
#[command(name = "glyphpad")]
#[command(about = "Hand-drawn character classification client")]
#[command(version)]
pub struct CliArgs {
    /// Classifier service base URL
    #[arg(long, env = "GLYPHPAD_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Per-request timeout in seconds (no limit when unset)
    #[arg(long, env = "GLYPHPAD_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Side length of the drawing surface in pixels
    #[arg(long, default_value_t = DEFAULT_CANVAS_SIDE)]
    pub canvas_size: u32,

    /// Brush width in surface pixels
    #[arg(long, default_value_t = DEFAULT_BRUSH_WIDTH)]
    pub brush_width: f32,

    /// What to do
    #[command(subcommand)]
    pub command: Command,
}

/// Glyphpad subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Check that the classifier service is reachable
    Check,
    /// Classify a drawing and optionally report a verdict
    Infer {
        /// Model to query: cnn, rnn or lr
        #[arg(long, default_value = "cnn")]
        model: ModelKind,

        /// Drawing to classify
        #[command(flatten)]
        source: DrawingSource,

        /// Write the normalized 28×28 input as a PNG
        #[arg(long)]
        save_preview: Option<PathBuf>,

        /// Report this verdict on the prediction: correct or incorrect
        #[arg(long)]
        verdict: Option<Verdict>,
    },
    /// Write the normalized 28×28 input as a PNG without contacting the service
    Preview {
        /// Drawing to normalize
        #[command(flatten)]
        source: DrawingSource,

        /// Output PNG path
        #[arg(long, short)]
        output: PathBuf,
    },
}

/// Where a drawing comes from.
#[derive(Debug, Clone, Args)]
pub struct DrawingSource {
    /// Recorded strokes as JSON: `[[{"x":..,"y":..}, ..], ..]` in surface pixels
    #[arg(long, required_unless_present = "image", conflicts_with = "image")]
    pub strokes: Option<PathBuf>,

    /// Image to place on the surface (white ink on black)
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Treat the image as dark ink on a light background
    #[arg(long, requires = "image")]
    pub invert: bool,
}

impl DrawingSource {
    /// Build a session holding this drawing.
    ///
    /// # Errors
    ///
    /// Returns an error if the drawing cannot be loaded.
    pub fn load(&self, config: &PadConfig) -> Result<Session, InputError> {
        match (&self.strokes, &self.image) {
            (Some(path), _) => {
                let strokes = load_strokes(path)?;
                session_from_strokes(&strokes, config.canvas_size, config.brush_width)
            }
            (None, Some(path)) => {
                session_from_image(path, config.canvas_size, config.brush_width, self.invert)
            }
            // clap requires one source; an empty session is rejected on capture.
            (None, None) => Ok(Session::new(config.canvas_size, config.brush_width)),
        }
    }
}

/// Glyphpad configuration.
#[derive(Debug, Clone)]
pub struct PadConfig {
    /// Classifier service base URL.
    pub api_base: String,
    /// Per-request timeout.
    pub timeout: Option<Duration>,
    /// Side length of the drawing surface in pixels.
    pub canvas_size: u32,
    /// Brush width in surface pixels.
    pub brush_width: f32,
}

impl Default for PadConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PadConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: None,
            canvas_size: DEFAULT_CANVAS_SIDE,
            brush_width: DEFAULT_BRUSH_WIDTH,
        }
    }

    /// Client settings derived from this configuration.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            api_base: self.api_base.clone(),
            timeout: self.timeout,
        }
    }
}

impl From<&CliArgs> for PadConfig {
    fn from(args: &CliArgs) -> Self {
        Self {
            api_base: args.api_base.clone(),
            timeout: args.timeout_secs.map(Duration::from_secs),
            canvas_size: args.canvas_size,
            brush_width: args.brush_width,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_config_default() {
        let config = PadConfig::default();
        assert_eq!(config.api_base, "http://localhost:8000");
        assert_eq!(config.canvas_size, 280);
        assert!(config.timeout.is_none());
    }

    #[test]
    fn test_cli_args_infer() {
        let args = CliArgs::try_parse_from([
            "glyphpad",
            "--api-base",
            "http://10.0.0.2:9000",
            "--timeout-secs",
            "3",
            "infer",
            "--model",
            "lr",
            "--strokes",
            "d.json",
            "--verdict",
            "incorrect",
        ])
        .expect("parse");

        let config = PadConfig::from(&args);
        assert_eq!(config.api_base, "http://10.0.0.2:9000");
        assert_eq!(config.timeout, Some(Duration::from_secs(3)));
        assert_eq!(config.client_config().api_base, "http://10.0.0.2:9000");

        match args.command {
            Command::Infer {
                model,
                source,
                verdict,
                save_preview,
            } => {
                assert_eq!(model, ModelKind::LogisticRegression);
                assert_eq!(source.strokes, Some(PathBuf::from("d.json")));
                assert_eq!(verdict, Some(Verdict::Incorrect));
                assert!(save_preview.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_args_require_one_source() {
        assert!(CliArgs::try_parse_from(["glyphpad", "infer"]).is_err());
        assert!(CliArgs::try_parse_from([
            "glyphpad", "preview", "--strokes", "a.json", "--image", "b.png", "-o", "p.png"
        ])
        .is_err());
        assert!(
            CliArgs::try_parse_from(["glyphpad", "preview", "--image", "b.png", "-o", "p.png"])
                .is_ok()
        );
    }

    #[test]
    fn test_unknown_model_is_rejected() {
        assert!(CliArgs::try_parse_from([
            "glyphpad", "infer", "--model", "svm", "--strokes", "a.json"
        ])
        .is_err());
    }
}
