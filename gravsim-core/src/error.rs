//! Error types for the gravsim engine
//!
//! Every fault is either prevented up front (configuration validation,
//! distance floor in the force law) or fatal to the run. Nothing here is
//! retried.

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// A configuration value rejected at startup, before any simulation work
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("worker count must be at least 1")]
    NoWorkers,

    #[error("body count must be at least 1")]
    NoBodies,

    #[error("step count must be at least 1")]
    NoSteps,

    #[error("step duration must be finite and positive, got {0}")]
    BadStepDuration(f64),

    #[error("gravitational constant must be finite, got {0}")]
    BadGravity(f64),

    #[error("minimum distance must be finite and non-negative, got {0}")]
    BadMinDist(f64),

    #[error("disc radius must be finite and positive, got {0}")]
    BadRadius(f64),

    #[error("scene parameter '{name}' must be finite, got {value}")]
    NonFiniteScene { name: &'static str, value: f64 },

    #[error("double disc scene needs an even body count, got {0}")]
    OddBodyCount(usize),

    #[error("grid scene needs at least one column")]
    NoColumns,

    #[error("explicit scene lists {listed} bodies but body count is {expected}")]
    BodyCountMismatch { listed: usize, expected: usize },

    #[error("body {index} has invalid mass {mass}; masses must be finite and positive")]
    BadMass { index: usize, mass: f64 },

    #[error("body {index} has a non-finite position or velocity")]
    NonFiniteBody { index: usize },

    #[error("degenerate view bounds: x [{x_start}, {x_end}], y [{y_start}, {y_end}]")]
    BadViewBounds {
        x_start: f64,
        x_end: f64,
        y_start: f64,
        y_end: f64,
    },

    #[error("image dimensions must be non-zero, got {width}x{height}")]
    BadImageSize { width: u32, height: u32 },

    #[error("snapshot queue depth must be at least 1")]
    NoQueueDepth,

    #[error("snapshot writer thread count must be at least 1")]
    NoWriterThreads,
}

/// Top-level engine error
///
/// Cloning shares the underlying source, so a latched failure can be
/// reported to every caller that asks for it.
#[derive(Error, Debug, Clone)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("JSON error on {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: Arc<serde_json::Error>,
    },

    #[error("corrupt snapshot {}: {reason}", .path.display())]
    CorruptSnapshot { path: PathBuf, reason: String },

    #[error("step {step} incomplete: {computed} of {expected} bodies computed")]
    IncompleteStep {
        step: u64,
        expected: usize,
        computed: usize,
    },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[source] Arc<rayon::ThreadPoolBuildError>),

    #[error("snapshot writer stopped before the run finished")]
    WriterStopped,
}

impl SimError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SimError::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        SimError::Json {
            path: path.into(),
            source: Arc::new(source),
        }
    }
}

impl From<rayon::ThreadPoolBuildError> for SimError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        SimError::ThreadPool(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
