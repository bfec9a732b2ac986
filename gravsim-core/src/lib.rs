pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod integrator;
pub mod runtime;
pub mod scene;
pub mod scheduler;
pub mod snapshot;

pub use config::{BodySpec, DiscParams, GridParams, SceneConfig, SimConfig, SnapshotConfig, ViewConfig};
pub use diagnostics::StepDiagnostics;
pub use engine::{Body, BodyStore};
pub use error::{ConfigError, Result, SimError};
pub use integrator::{advance_body, net_force, Physics};
pub use runtime::{run_simulation, RunSummary, Simulation};
pub use scene::{build_scene, generate_rotating_disc};
pub use scheduler::{IndexSupply, StepScheduler};
pub use snapshot::{
    read_snapshot, snapshot_path, SnapshotFormat, SnapshotManifest, SnapshotRecord,
    SnapshotWriter,
};
