use crate::config::SimConfig;
use crate::diagnostics::StepDiagnostics;
use crate::engine::{Body, BodyStore};
use crate::error::Result;
use crate::scene::build_scene;
use crate::scheduler::StepScheduler;
use crate::snapshot::{SnapshotManifest, SnapshotWriter};

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub steps: u64,
    pub bodies: usize,
    pub snapshots: u64,
    pub last: StepDiagnostics,
}

/// A configured simulation: body store, worker pool and snapshot writer
pub struct Simulation {
    config: SimConfig,
    store: BodyStore,
    scheduler: StepScheduler,
    writer: SnapshotWriter,
}

impl Simulation {
    /// Validate `config`, generate its scene and start the writer
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        let bodies = build_scene(&config.scene, config.body_count);
        Self::with_bodies(config, bodies)
    }

    /// Like [`Simulation::new`] but starting from a caller-supplied population
    ///
    /// `config.body_count` is taken from `bodies` and `config.scene` is
    /// ignored.
    pub fn with_bodies(mut config: SimConfig, bodies: Vec<Body>) -> Result<Self> {
        config.body_count = bodies.len();
        config.validate_run()?;

        let store = BodyStore::new(bodies)?;
        let scheduler = StepScheduler::new(config.worker_count, config.physics())?;
        let writer = SnapshotWriter::spawn(&config.snapshot)?;

        SnapshotManifest::new(
            config.snapshot.format,
            store.len(),
            config.step_count,
            config.step_duration,
            config.view.clone(),
        )
        .write(writer.directory())?;

        log::info!(
            "simulation ready: {} bodies, {} steps, {} workers, snapshots in {}",
            store.len(),
            config.step_count,
            scheduler.worker_count(),
            writer.directory().display()
        );

        Ok(Self {
            config,
            store,
            scheduler,
            writer,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn bodies(&self) -> &[Body] {
        self.store.current()
    }

    /// Index of the next step to run
    pub fn step_index(&self) -> u64 {
        self.store.step()
    }

    pub fn is_finished(&self) -> bool {
        self.store.step() >= self.config.step_count
    }

    /// Run one full step
    ///
    /// The snapshot of the current state is queued first, then every body
    /// is advanced and the buffers are swapped.
    pub fn step(&mut self) -> Result<()> {
        let step = self.store.step();
        let log_every = self.config.log_every;
        if log_every > 0 && step % log_every == 0 {
            log::info!("{}", StepDiagnostics::measure(step, self.store.current()));
        }

        self.writer.write_snapshot(step, self.store.current())?;
        self.scheduler.advance(&mut self.store)
    }

    /// Run the remaining steps and wait for every snapshot to land
    pub fn run(mut self) -> Result<RunSummary> {
        log::info!("simulating {} steps", self.config.step_count);
        while !self.is_finished() {
            self.step()?;
        }

        let Simulation { store, writer, .. } = self;
        let snapshots = writer.finish()?;
        let summary = RunSummary {
            steps: store.step(),
            bodies: store.len(),
            snapshots,
            last: StepDiagnostics::measure(store.step(), store.current()),
        };
        log::info!(
            "simulation finished: {} steps, {} snapshots",
            summary.steps,
            summary.snapshots
        );
        Ok(summary)
    }
}

/// Build and run a simulation in one call
pub fn run_simulation(config: SimConfig) -> Result<RunSummary> {
    Simulation::new(config)?.run()
}
