//! Per-step snapshot persistence
//!
//! A snapshot is the body array as it stood at the start of a step, one
//! record per body in index order. Files are named by the zero-padded step
//! index (`000000042.bin`) and come in two encodings:
//!
//! - `binary`: 7 little-endian `f64` per record, in [`RECORD_FIELDS`]
//!   order, no header ([`RECORD_BYTES`] bytes per body)
//! - `json`: an array of `{x, y, vx, vy, ax, ay, mass}` objects
//!
//! [`SnapshotManifest`] records which encoding a run used, together with
//! the body count and view bounds the renderer needs.

use crate::config::{SnapshotConfig, ViewConfig};
use crate::engine::Body;
use crate::error::{Result, SimError};
use glam::DVec2;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

pub const RECORD_FIELDS: [&str; 7] = ["x", "y", "vx", "vy", "ax", "ay", "mass"];
pub const RECORD_BYTES: usize = RECORD_FIELDS.len() * 8;
pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotFormat {
    Binary,
    Json,
}

impl SnapshotFormat {
    pub fn extension(self) -> &'static str {
        match self {
            SnapshotFormat::Binary => "bin",
            SnapshotFormat::Json => "json",
        }
    }
}

/// One body as persisted
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub ax: f64,
    pub ay: f64,
    pub mass: f64,
}

impl SnapshotRecord {
    fn to_array(self) -> [f64; 7] {
        [self.x, self.y, self.vx, self.vy, self.ax, self.ay, self.mass]
    }

    fn from_array(v: [f64; 7]) -> Self {
        Self {
            x: v[0],
            y: v[1],
            vx: v[2],
            vy: v[3],
            ax: v[4],
            ay: v[5],
            mass: v[6],
        }
    }
}

impl From<&Body> for SnapshotRecord {
    fn from(b: &Body) -> Self {
        Self {
            x: b.pos.x,
            y: b.pos.y,
            vx: b.vel.x,
            vy: b.vel.y,
            ax: b.acc.x,
            ay: b.acc.y,
            mass: b.mass,
        }
    }
}

impl From<&SnapshotRecord> for Body {
    fn from(r: &SnapshotRecord) -> Self {
        Body {
            pos: DVec2::new(r.x, r.y),
            vel: DVec2::new(r.vx, r.vy),
            acc: DVec2::new(r.ax, r.ay),
            mass: r.mass,
        }
    }
}

/// File holding the snapshot of `step`
pub fn snapshot_path(dir: &Path, step: u64, format: SnapshotFormat) -> PathBuf {
    dir.join(format!("{:09}.{}", step, format.extension()))
}

/// Encode `records` into `path`, replacing any existing file
pub fn write_records(path: &Path, records: &[SnapshotRecord], format: SnapshotFormat) -> Result<()> {
    let file = File::create(path).map_err(|e| SimError::io(path, e))?;
    let mut w = BufWriter::new(file);

    match format {
        SnapshotFormat::Binary => {
            for rec in records {
                for v in rec.to_array() {
                    w.write_all(&v.to_le_bytes())
                        .map_err(|e| SimError::io(path, e))?;
                }
            }
        }
        SnapshotFormat::Json => {
            serde_json::to_writer(&mut w, records).map_err(|e| SimError::json(path, e))?;
        }
    }

    w.flush().map_err(|e| SimError::io(path, e))
}

/// Decode a snapshot file written by [`write_records`]
pub fn read_snapshot(path: &Path, format: SnapshotFormat) -> Result<Vec<SnapshotRecord>> {
    let file = File::open(path).map_err(|e| SimError::io(path, e))?;
    let mut reader = BufReader::new(file);

    match format {
        SnapshotFormat::Binary => {
            let mut bytes = Vec::new();
            reader
                .read_to_end(&mut bytes)
                .map_err(|e| SimError::io(path, e))?;
            if bytes.len() % RECORD_BYTES != 0 {
                return Err(SimError::CorruptSnapshot {
                    path: path.to_path_buf(),
                    reason: format!(
                        "{} bytes is not a multiple of the {}-byte record",
                        bytes.len(),
                        RECORD_BYTES
                    ),
                });
            }

            let records = bytes
                .chunks_exact(RECORD_BYTES)
                .map(|chunk| {
                    let mut values = [0.0; 7];
                    for (v, field) in values.iter_mut().zip(chunk.chunks_exact(8)) {
                        let mut raw = [0u8; 8];
                        raw.copy_from_slice(field);
                        *v = f64::from_le_bytes(raw);
                    }
                    SnapshotRecord::from_array(values)
                })
                .collect();
            Ok(records)
        }
        SnapshotFormat::Json => {
            serde_json::from_reader(reader).map_err(|e| SimError::json(path, e))
        }
    }
}

/// Decoding contract for one run's snapshot directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotManifest {
    pub format: SnapshotFormat,
    pub extension: String,
    pub fields: Vec<String>,
    pub record_bytes: Option<usize>, // binary only
    pub body_count: usize,
    pub step_count: u64,
    pub step_duration: f64,
    pub view: ViewConfig,
}

impl SnapshotManifest {
    pub fn new(
        format: SnapshotFormat,
        body_count: usize,
        step_count: u64,
        step_duration: f64,
        view: ViewConfig,
    ) -> Self {
        Self {
            format,
            extension: format.extension().to_string(),
            fields: RECORD_FIELDS.iter().map(|f| f.to_string()).collect(),
            record_bytes: (format == SnapshotFormat::Binary).then_some(RECORD_BYTES),
            body_count,
            step_count,
            step_duration,
            view,
        }
    }

    pub fn write(&self, dir: &Path) -> Result<()> {
        let path = dir.join(MANIFEST_FILE);
        let file = File::create(&path).map_err(|e| SimError::io(&path, e))?;
        let mut w = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut w, self).map_err(|e| SimError::json(&path, e))?;
        w.flush().map_err(|e| SimError::io(&path, e))
    }

    pub fn read(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        let file = File::open(&path).map_err(|e| SimError::io(&path, e))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| SimError::json(&path, e))
    }
}

struct Job {
    step: u64,
    records: Vec<SnapshotRecord>,
}

#[derive(Default)]
struct Shared {
    failed: AtomicBool,
    failure: Mutex<Option<SimError>>,
    written: AtomicU64,
}

impl Shared {
    fn fail(&self, err: SimError) {
        if let Ok(mut slot) = self.failure.lock() {
            slot.get_or_insert(err);
        }
        // set after the slot so a reader that sees the flag finds the error
        self.failed.store(true, Ordering::SeqCst);
    }

    /// The latched failure, handed out to every caller
    fn failure(&self) -> SimError {
        self.failure
            .lock()
            .ok()
            .and_then(|slot| slot.clone())
            .unwrap_or(SimError::WriterStopped)
    }
}

/// Background snapshot writer
///
/// Jobs go through a bounded queue of `queue_depth` snapshots drained by
/// `writer_threads` threads. Submitting copies the bodies, so the caller may
/// reuse its buffer as soon as [`write_snapshot`](Self::write_snapshot)
/// returns. Submission only blocks when the writers are a full queue
/// behind. The first failed write is latched: every later submission and
/// [`finish`](Self::finish) report that same error. Dropping the writer
/// still drains and joins it.
pub struct SnapshotWriter {
    sender: Option<SyncSender<Job>>,
    handles: Vec<JoinHandle<()>>,
    shared: Arc<Shared>,
    directory: PathBuf,
    format: SnapshotFormat,
}

impl SnapshotWriter {
    pub fn spawn(config: &SnapshotConfig) -> Result<Self> {
        let directory = config.directory.clone();
        fs::create_dir_all(&directory).map_err(|e| SimError::io(&directory, e))?;

        let (sender, receiver) = mpsc::sync_channel::<Job>(config.queue_depth);
        let receiver = Arc::new(Mutex::new(receiver));
        let shared = Arc::new(Shared::default());

        let mut writer = Self {
            sender: Some(sender),
            handles: Vec::with_capacity(config.writer_threads),
            shared,
            directory,
            format: config.format,
        };

        for i in 0..config.writer_threads {
            let receiver = Arc::clone(&receiver);
            let shared = Arc::clone(&writer.shared);
            let directory = writer.directory.clone();
            let format = writer.format;
            let handle = std::thread::Builder::new()
                .name(format!("gravsim-snapshot-{i}"))
                .spawn(move || writer_loop(&receiver, &shared, &directory, format))
                .map_err(|e| SimError::io(&writer.directory, e))?;
            writer.handles.push(handle);
        }

        Ok(writer)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn format(&self) -> SnapshotFormat {
        self.format
    }

    /// Snapshots written to disk so far
    pub fn written(&self) -> u64 {
        self.shared.written.load(Ordering::SeqCst)
    }

    /// Queue a copy of `bodies` as the snapshot of `step`
    pub fn write_snapshot(&self, step: u64, bodies: &[Body]) -> Result<()> {
        if self.shared.failed.load(Ordering::SeqCst) {
            return Err(self.shared.failure());
        }
        let sender = self.sender.as_ref().ok_or(SimError::WriterStopped)?;

        let job = Job {
            step,
            records: bodies.iter().map(SnapshotRecord::from).collect(),
        };

        match sender.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(job)) => {
                log::warn!("snapshot queue full at step {step}, waiting for writers");
                sender.send(job).map_err(|_| self.shared.failure())
            }
            Err(TrySendError::Disconnected(_)) => Err(self.shared.failure()),
        }
    }

    /// Close the queue, wait for every pending write and report the outcome
    ///
    /// Returns the number of snapshots written.
    pub fn finish(mut self) -> Result<u64> {
        let clean = self.close();
        if self.shared.failed.load(Ordering::SeqCst) {
            return Err(self.shared.failure());
        }
        if !clean {
            return Err(SimError::WriterStopped);
        }
        Ok(self.written())
    }

    fn close(&mut self) -> bool {
        self.sender.take();
        let mut clean = true;
        for handle in self.handles.drain(..) {
            clean &= handle.join().is_ok();
        }
        clean
    }
}

impl Drop for SnapshotWriter {
    fn drop(&mut self) {
        self.close();
    }
}

fn writer_loop(
    receiver: &Mutex<Receiver<Job>>,
    shared: &Shared,
    directory: &Path,
    format: SnapshotFormat,
) {
    loop {
        let job = {
            let Ok(rx) = receiver.lock() else { return };
            match rx.recv() {
                Ok(job) => job,
                Err(_) => return, // queue closed and drained
            }
        };

        // keep draining after a failure so the submitter never blocks forever
        if shared.failed.load(Ordering::SeqCst) {
            continue;
        }

        let path = snapshot_path(directory, job.step, format);
        match write_records(&path, &job.records, format) {
            Ok(()) => {
                shared.written.fetch_add(1, Ordering::SeqCst);
                log::debug!("wrote snapshot {} ({} bodies)", path.display(), job.records.len());
            }
            Err(e) => {
                log::error!("snapshot for step {} failed: {e}", job.step);
                shared.fail(e);
            }
        }
    }
}
