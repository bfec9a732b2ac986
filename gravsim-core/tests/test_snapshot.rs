//! Snapshot encoding and background writer tests

use glam::DVec2;
use gravsim_core::config::{SnapshotConfig, ViewConfig};
use gravsim_core::engine::Body;
use gravsim_core::error::SimError;
use gravsim_core::snapshot::{
    read_snapshot, snapshot_path, write_records, SnapshotFormat, SnapshotManifest,
    SnapshotRecord, SnapshotWriter, RECORD_BYTES,
};
use gravsim_core::tests::test_helpers::{
    count_files_with_extension, remove_scratch_dir, scratch_dir,
};
use std::fs;
use std::path::Path;
use std::time::Duration;

fn sample_bodies() -> Vec<Body> {
    vec![
        Body {
            pos: DVec2::new(1.0, 2.0),
            vel: DVec2::new(3.0, 4.0),
            acc: DVec2::new(5.0, 6.0),
            mass: 7.0,
        },
        Body {
            pos: DVec2::new(-0.5, 1e-12),
            vel: DVec2::new(0.25, -8.0),
            acc: DVec2::new(0.0, -0.125),
            mass: 1.0,
        },
    ]
}

fn records(bodies: &[Body]) -> Vec<SnapshotRecord> {
    bodies.iter().map(SnapshotRecord::from).collect()
}

fn writer_config(dir: &Path, format: SnapshotFormat) -> SnapshotConfig {
    SnapshotConfig {
        directory: dir.to_path_buf(),
        format,
        queue_depth: 2,
        writer_threads: 2,
    }
}

#[test]
fn test_snapshot_names_are_zero_padded() {
    let dir = Path::new("out");
    assert_eq!(
        snapshot_path(dir, 42, SnapshotFormat::Binary),
        dir.join("000000042.bin")
    );
    assert_eq!(
        snapshot_path(dir, 0, SnapshotFormat::Json),
        dir.join("000000000.json")
    );
}

#[test]
fn test_binary_layout_is_seven_le_f64_per_body() {
    let dir = scratch_dir("layout");
    let path = dir.join("layout.bin");
    write_records(&path, &records(&sample_bodies()), SnapshotFormat::Binary).unwrap();

    let bytes = fs::read(&path).unwrap();
    assert_eq!(RECORD_BYTES, 56);
    assert_eq!(bytes.len(), 2 * RECORD_BYTES);
    assert_eq!(&bytes[0..8], &1.0f64.to_le_bytes());
    assert_eq!(&bytes[48..56], &7.0f64.to_le_bytes());
    assert_eq!(&bytes[56..64], &(-0.5f64).to_le_bytes());

    remove_scratch_dir(&dir);
}

#[test]
fn test_read_back_both_formats() {
    let dir = scratch_dir("readback");
    let expected = records(&sample_bodies());

    for format in [SnapshotFormat::Binary, SnapshotFormat::Json] {
        let path = snapshot_path(&dir, 1, format);
        write_records(&path, &expected, format).unwrap();
        let decoded = read_snapshot(&path, format).unwrap();
        assert_eq!(decoded, expected, "{:?} did not read back", format);
    }

    remove_scratch_dir(&dir);
}

#[test]
fn test_truncated_binary_is_corrupt() {
    let dir = scratch_dir("corrupt");
    let path = dir.join("000000000.bin");
    fs::write(&path, vec![0u8; RECORD_BYTES + 1]).unwrap();

    let err = read_snapshot(&path, SnapshotFormat::Binary).unwrap_err();
    assert!(matches!(err, SimError::CorruptSnapshot { .. }));

    remove_scratch_dir(&dir);
}

#[test]
fn test_manifest_round_trip() {
    let dir = scratch_dir("manifest");
    let manifest = SnapshotManifest::new(SnapshotFormat::Binary, 10_000, 40, 0.2, ViewConfig::default());
    manifest.write(&dir).unwrap();

    let loaded = SnapshotManifest::read(&dir).unwrap();
    assert_eq!(loaded, manifest);
    assert_eq!(loaded.record_bytes, Some(56));
    assert_eq!(loaded.fields, vec!["x", "y", "vx", "vy", "ax", "ay", "mass"]);

    let json = SnapshotManifest::new(SnapshotFormat::Json, 1, 1, 0.1, ViewConfig::default());
    assert_eq!(json.record_bytes, None);
    assert_eq!(json.extension, "json");

    remove_scratch_dir(&dir);
}

#[test]
fn test_writer_persists_every_step() {
    let dir = scratch_dir("writer");
    let writer = SnapshotWriter::spawn(&writer_config(&dir, SnapshotFormat::Binary)).unwrap();
    let bodies = sample_bodies();

    for step in 0..10 {
        writer.write_snapshot(step, &bodies).unwrap();
    }
    assert_eq!(writer.finish().unwrap(), 10);

    assert_eq!(count_files_with_extension(&dir, "bin"), 10);
    for step in 0..10 {
        let decoded = read_snapshot(&snapshot_path(&dir, step, SnapshotFormat::Binary), SnapshotFormat::Binary).unwrap();
        assert_eq!(decoded, records(&bodies));
    }

    remove_scratch_dir(&dir);
}

#[test]
fn test_writer_owns_its_copy() {
    let dir = scratch_dir("copy");
    let writer = SnapshotWriter::spawn(&writer_config(&dir, SnapshotFormat::Json)).unwrap();
    let mut bodies = sample_bodies();
    let before = records(&bodies);

    writer.write_snapshot(0, &bodies).unwrap();
    // reuse the buffer immediately, as the step loop does
    for b in bodies.iter_mut() {
        b.pos = DVec2::splat(-99.0);
    }
    writer.finish().unwrap();

    let decoded = read_snapshot(&snapshot_path(&dir, 0, SnapshotFormat::Json), SnapshotFormat::Json).unwrap();
    assert_eq!(decoded, before);

    remove_scratch_dir(&dir);
}

#[test]
fn test_writer_failure_is_latched() {
    let dir = scratch_dir("failure");
    let config = SnapshotConfig {
        queue_depth: 1,
        writer_threads: 1,
        ..writer_config(&dir, SnapshotFormat::Binary)
    };
    let writer = SnapshotWriter::spawn(&config).unwrap();
    assert_eq!(writer.format(), SnapshotFormat::Binary);
    remove_scratch_dir(&dir);

    // keep submitting until the failed write of step 0 surfaces
    let bodies = sample_bodies();
    let mut first = None;
    for step in 0..1000 {
        if let Err(e) = writer.write_snapshot(step, &bodies) {
            first = Some(e);
            break;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    let first = first.expect("write failure never surfaced");
    assert!(matches!(first, SimError::Io { .. }), "unexpected error {first}");

    let expected = first.to_string();
    let again = writer.write_snapshot(1000, &bodies).unwrap_err();
    assert!(matches!(again, SimError::Io { .. }));
    assert_eq!(again.to_string(), expected);

    let at_finish = writer.finish().unwrap_err();
    assert!(matches!(at_finish, SimError::Io { .. }));
    assert_eq!(at_finish.to_string(), expected);
}

#[test]
fn test_writer_failure_reported_by_finish() {
    let dir = scratch_dir("failure-finish");
    let writer = SnapshotWriter::spawn(&writer_config(&dir, SnapshotFormat::Json)).unwrap();
    assert_eq!(writer.format(), SnapshotFormat::Json);
    remove_scratch_dir(&dir);

    // queuing may still succeed; the failure surfaces by `finish` at the latest
    let _ = writer.write_snapshot(0, &sample_bodies());
    let err = writer.finish().unwrap_err();
    match err {
        SimError::Io { path, source } => {
            assert_eq!(path, snapshot_path(&dir, 0, SnapshotFormat::Json));
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn test_writer_rejects_file_as_directory() {
    let dir = scratch_dir("notadir");
    let file = dir.join("occupied");
    fs::write(&file, b"x").unwrap();

    let result = SnapshotWriter::spawn(&writer_config(&file, SnapshotFormat::Binary));
    assert!(matches!(result, Err(SimError::Io { .. })));

    remove_scratch_dir(&dir);
}
