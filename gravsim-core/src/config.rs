//! Run configuration
//!
//! A thin, `serde`-deserializable description of one simulation run.
//! Every field has a default, so a partial YAML/JSON document is enough:
//!
//! ```yaml
//! worker_count: 8
//! body_count: 2000
//! step_count: 100
//! step_duration: 0.2
//! gravity: 1.3e-5
//! min_dist: 0.01
//! scene:
//!   kind: rotating_disc
//!   radius: 5.0
//!   center: [400.0, 1500.0]
//!   angular_velocity: 0.0471
//!   seed: 42
//! snapshot:
//!   directory: output/steps
//!   format: binary
//! ```
//!
//! [`SimConfig::validate`] must pass before any simulation work starts.

use crate::error::ConfigError;
use crate::integrator::Physics;
use crate::snapshot::SnapshotFormat;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::path::PathBuf;

/// Parameters of one uniformly filled, rigidly rotating disc
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscParams {
    pub radius: f64,
    pub center: [f64; 2],
    pub translation: [f64; 2], // uniform velocity added to every body
    pub angular_velocity: f64, // rad per time unit
    pub seed: u64,
}

impl Default for DiscParams {
    fn default() -> Self {
        Self {
            radius: 5.0,
            center: [400.0, 1500.0],
            translation: [0.0, 0.0],
            angular_velocity: 0.015 * PI,
            seed: 42,
        }
    }
}

/// Row-major grid of unit masses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridParams {
    pub columns: usize,
    pub spacing: f64,
    pub origin: [f64; 2],
    pub velocity: [f64; 2],
}

impl Default for GridParams {
    fn default() -> Self {
        Self {
            columns: 20,
            spacing: 5.0,
            origin: [320.0, 20.0],
            velocity: [1.0, 0.0],
        }
    }
}

/// One hand-placed body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodySpec {
    pub pos: [f64; 2],
    #[serde(default)]
    pub vel: [f64; 2],
    pub mass: f64,
}

/// Initial population of the run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SceneConfig {
    RotatingDisc(DiscParams),
    /// Two discs of `body_count / 2` bodies each
    DoubleDisc { first: DiscParams, second: DiscParams },
    Grid(GridParams),
    Explicit { bodies: Vec<BodySpec> },
}

impl Default for SceneConfig {
    fn default() -> Self {
        SceneConfig::RotatingDisc(DiscParams::default())
    }
}

/// Snapshot output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub directory: PathBuf,
    pub format: SnapshotFormat,
    pub queue_depth: usize,    // snapshots allowed in flight before back-pressure
    pub writer_threads: usize,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output/steps"),
            format: SnapshotFormat::Binary,
            queue_depth: 16,
            writer_threads: 2,
        }
    }
}

/// Axis bounds and pixel size handed to the renderer through the manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub x: [f64; 2],
    pub y: [f64; 2],
    pub width: u32,
    pub height: u32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            x: [380.0, 420.0],
            y: [1480.0, 1520.0],
            width: 900,
            height: 900,
        }
    }
}

/// Top-level run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub worker_count: usize,
    pub body_count: usize,
    pub step_count: u64,
    pub step_duration: f64,
    pub gravity: f64,
    pub min_dist: f64,
    pub log_every: u64, // 0 disables per-step progress logs
    pub scene: SceneConfig,
    pub snapshot: SnapshotConfig,
    pub view: ViewConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            worker_count: 16,
            body_count: 10_000,
            step_count: 40,
            step_duration: 0.2,
            gravity: 0.000013,
            min_dist: 0.01,
            log_every: 1,
            scene: SceneConfig::default(),
            snapshot: SnapshotConfig::default(),
            view: ViewConfig::default(),
        }
    }
}

impl SimConfig {
    pub fn physics(&self) -> Physics {
        Physics {
            g: self.gravity,
            min_dist: self.min_dist,
            dt: self.step_duration,
        }
    }

    /// Reject the configuration before any work begins
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_run()?;
        self.validate_scene()
    }

    /// Checks everything except the scene description
    pub fn validate_run(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.body_count == 0 {
            return Err(ConfigError::NoBodies);
        }
        if self.step_count == 0 {
            return Err(ConfigError::NoSteps);
        }
        if !(self.step_duration.is_finite() && self.step_duration > 0.0) {
            return Err(ConfigError::BadStepDuration(self.step_duration));
        }
        if !self.gravity.is_finite() {
            return Err(ConfigError::BadGravity(self.gravity));
        }
        if !(self.min_dist.is_finite() && self.min_dist >= 0.0) {
            return Err(ConfigError::BadMinDist(self.min_dist));
        }

        let v = &self.view;
        if !(v.x[0] < v.x[1] && v.y[0] < v.y[1]) {
            return Err(ConfigError::BadViewBounds {
                x_start: v.x[0],
                x_end: v.x[1],
                y_start: v.y[0],
                y_end: v.y[1],
            });
        }
        if v.width == 0 || v.height == 0 {
            return Err(ConfigError::BadImageSize {
                width: v.width,
                height: v.height,
            });
        }

        if self.snapshot.queue_depth == 0 {
            return Err(ConfigError::NoQueueDepth);
        }
        if self.snapshot.writer_threads == 0 {
            return Err(ConfigError::NoWriterThreads);
        }

        Ok(())
    }

    fn validate_scene(&self) -> Result<(), ConfigError> {
        match &self.scene {
            SceneConfig::RotatingDisc(disc) => check_disc(disc),
            SceneConfig::DoubleDisc { first, second } => {
                if self.body_count % 2 != 0 {
                    return Err(ConfigError::OddBodyCount(self.body_count));
                }
                check_disc(first)?;
                check_disc(second)
            }
            SceneConfig::Grid(grid) => {
                if grid.columns == 0 {
                    return Err(ConfigError::NoColumns);
                }
                check_finite("spacing", grid.spacing)?;
                check_finite_pair("origin", grid.origin)?;
                check_finite_pair("velocity", grid.velocity)
            }
            SceneConfig::Explicit { bodies } => {
                if bodies.len() != self.body_count {
                    return Err(ConfigError::BodyCountMismatch {
                        listed: bodies.len(),
                        expected: self.body_count,
                    });
                }
                for (index, b) in bodies.iter().enumerate() {
                    if !(b.mass.is_finite() && b.mass > 0.0) {
                        return Err(ConfigError::BadMass {
                            index,
                            mass: b.mass,
                        });
                    }
                    if !b.pos.iter().chain(b.vel.iter()).all(|c| c.is_finite()) {
                        return Err(ConfigError::NonFiniteBody { index });
                    }
                }
                Ok(())
            }
        }
    }
}

fn check_disc(disc: &DiscParams) -> Result<(), ConfigError> {
    if !(disc.radius.is_finite() && disc.radius > 0.0) {
        return Err(ConfigError::BadRadius(disc.radius));
    }
    check_finite_pair("center", disc.center)?;
    check_finite_pair("translation", disc.translation)?;
    check_finite("angular_velocity", disc.angular_velocity)
}

fn check_finite(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonFiniteScene { name, value })
    }
}

fn check_finite_pair(name: &'static str, pair: [f64; 2]) -> Result<(), ConfigError> {
    check_finite(name, pair[0])?;
    check_finite(name, pair[1])
}
