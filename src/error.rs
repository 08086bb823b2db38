use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::ocr::FieldFormat;

/// A specialized `Result` type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors raised while loading or validating a game configuration.
///
/// All of these are fatal at startup: a config defect is never discovered
/// mid-session.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path:?}")]
    NotFound { path: PathBuf },

    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yml::Error,
    },

    #[error("failed to load asset image {path:?}: {source}")]
    AssetImage {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("asset '{name}' is not configured")]
    MissingAsset { name: String },

    #[error("overlay '{overlay}' references unknown asset '{asset}'")]
    UnknownOverlayAsset { overlay: String, asset: String },

    #[error("asset '{name}' has threshold {threshold}, expected a value in (0, 1]")]
    BadThreshold { name: String, threshold: f32 },

    #[error("region for '{name}' has zero width or height")]
    EmptyRegion { name: String },

    #[error("game kind '{kind}' requires a '{section}' config section")]
    MissingSection {
        kind: &'static str,
        section: &'static str,
    },

    #[error("wheel config must define at least one bet segment")]
    NoSegments,
}

/// Errors from the screen capture backend.
///
/// An unresponsive capture source is fatal, not retryable.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no monitors available for capture")]
    NoMonitor,

    #[error("screen capture failed: {source}")]
    Backend {
        #[from]
        source: xcap::XCapError,
    },
}

/// Errors from the synthetic input backend.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to initialise the input backend: {source}")]
    Init {
        #[from]
        source: enigo::NewConError,
    },

    #[error("pointer dispatch failed: {source}")]
    Dispatch {
        #[from]
        source: enigo::InputError,
    },
}

/// Failures while reading a text field off the screen.
///
/// `Parse` and `Empty` mean "value unknown this cycle" — the calling state
/// machine decides whether to retry, carry the previous value, or count the
/// miss against its stall budget. `Engine` is a fault in the OCR backend
/// itself.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("ocr engine failed: {0}")]
    Engine(String),

    #[error("ocr region produced no text")]
    Empty,

    #[error("could not parse '{raw}' as {format:?}")]
    Parse { raw: String, format: FieldFormat },
}

/// The error type for a running session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("input error: {0}")]
    Input(#[from] InputError),

    #[error("{game} stalled in state '{state}': {expecting} did not appear within {waited:?}")]
    Stalled {
        game: String,
        state: String,
        expecting: String,
        waited: Duration,
    },
}
