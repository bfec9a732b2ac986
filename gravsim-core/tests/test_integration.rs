//! End-to-end simulation runs: determinism, snapshot completeness and
//! long-run sanity

use gravsim_core::config::SimConfig;
use gravsim_core::engine::Body;
use gravsim_core::error::{ConfigError, SimError};
use gravsim_core::runtime::{run_simulation, Simulation};
use gravsim_core::scene::build_scene;
use gravsim_core::snapshot::{
    read_snapshot, snapshot_path, SnapshotFormat, SnapshotManifest, RECORD_BYTES,
};
use gravsim_core::tests::test_helpers::{
    bodies_identical, count_files_with_extension, heavy_light_pair, remove_scratch_dir,
    scratch_dir, small_disc_config,
};
use std::fs;

#[test]
fn test_snapshot_sequence_is_complete() {
    let dir = scratch_dir("complete");
    let cfg = small_disc_config(&dir, 64, 12, 4);

    let summary = run_simulation(cfg).unwrap();
    assert_eq!(summary.steps, 12);
    assert_eq!(summary.bodies, 64);
    assert_eq!(summary.snapshots, 12);

    assert_eq!(count_files_with_extension(&dir, "bin"), 12);
    for step in 0..12 {
        let path = snapshot_path(&dir, step, SnapshotFormat::Binary);
        let len = fs::metadata(&path).unwrap().len() as usize;
        assert_eq!(len, 64 * RECORD_BYTES, "step {} has the wrong size", step);
    }
    assert!(!snapshot_path(&dir, 12, SnapshotFormat::Binary).exists());

    let manifest = SnapshotManifest::read(&dir).unwrap();
    assert_eq!(manifest.body_count, 64);
    assert_eq!(manifest.step_count, 12);

    remove_scratch_dir(&dir);
}

#[test]
fn test_first_snapshot_is_initial_scene() {
    let dir = scratch_dir("initial");
    let cfg = small_disc_config(&dir, 32, 3, 2);
    let initial = build_scene(&cfg.scene, cfg.body_count);

    run_simulation(cfg).unwrap();

    let first = read_snapshot(&snapshot_path(&dir, 0, SnapshotFormat::Binary), SnapshotFormat::Binary).unwrap();
    assert_eq!(first.len(), initial.len());
    for (rec, body) in first.iter().zip(&initial) {
        assert_eq!((rec.x, rec.y), (body.pos.x, body.pos.y));
        assert_eq!((rec.vx, rec.vy), (body.vel.x, body.vel.y));
        assert_eq!((rec.ax, rec.ay), (0.0, 0.0));
    }

    remove_scratch_dir(&dir);
}

#[test]
fn test_same_config_same_snapshots() {
    let dir_a = scratch_dir("det-a");
    let dir_b = scratch_dir("det-b");

    run_simulation(small_disc_config(&dir_a, 100, 8, 4)).unwrap();
    run_simulation(small_disc_config(&dir_b, 100, 8, 4)).unwrap();

    for step in 0..8 {
        let a = fs::read(snapshot_path(&dir_a, step, SnapshotFormat::Binary)).unwrap();
        let b = fs::read(snapshot_path(&dir_b, step, SnapshotFormat::Binary)).unwrap();
        assert_eq!(a, b, "snapshot {} differs between runs", step);
    }

    remove_scratch_dir(&dir_a);
    remove_scratch_dir(&dir_b);
}

#[test]
fn test_worker_count_does_not_change_result() {
    let dir_a = scratch_dir("workers-1");
    let dir_b = scratch_dir("workers-7");

    let mut one = Simulation::new(small_disc_config(&dir_a, 150, 10, 1)).unwrap();
    let mut seven = Simulation::new(small_disc_config(&dir_b, 150, 10, 7)).unwrap();
    while !one.is_finished() {
        one.step().unwrap();
        seven.step().unwrap();
    }
    assert!(bodies_identical(one.bodies(), seven.bodies()));

    let a = one.run().unwrap();
    let b = seven.run().unwrap();
    assert_eq!(a.snapshots, b.snapshots);

    remove_scratch_dir(&dir_a);
    remove_scratch_dir(&dir_b);
}

#[test]
fn test_mass_is_invariant_across_run() {
    let dir = scratch_dir("mass");
    let cfg = small_disc_config(&dir, 40, 6, 3);
    run_simulation(cfg).unwrap();

    for step in 0..6 {
        let records = read_snapshot(&snapshot_path(&dir, step, SnapshotFormat::Binary), SnapshotFormat::Binary).unwrap();
        assert!(records.iter().all(|r| r.mass == 1.0));
    }

    remove_scratch_dir(&dir);
}

#[test]
fn test_rotating_disc_stays_bounded() {
    let dir = scratch_dir("bounded");
    let mut cfg = small_disc_config(&dir, 300, 40, 4);
    cfg.log_every = 10;

    let summary = run_simulation(cfg).unwrap();
    assert!(summary.last.max_radius.is_finite());
    assert!(
        summary.last.max_radius < 3.0 * 5.0,
        "disc spread to {}",
        summary.last.max_radius
    );
    assert_eq!(summary.last.total_mass, 300.0);

    remove_scratch_dir(&dir);
}

#[test]
fn test_two_body_scenario_through_simulation() {
    let dir = scratch_dir("two-body");
    let mut cfg = small_disc_config(&dir, 2, 1, 2);
    cfg.gravity = 1.0;
    cfg.min_dist = 0.0;
    cfg.step_duration = 1.0;

    let mut sim = Simulation::with_bodies(cfg, heavy_light_pair()).unwrap();
    sim.step().unwrap();
    assert!(sim.is_finished());
    assert_eq!(sim.step_index(), 1);

    let light: &Body = &sim.bodies()[1];
    assert!(light.pos.x < 10.0);
    assert_eq!(light.pos.x, 9.0);

    let summary = sim.run().unwrap();
    assert_eq!(summary.snapshots, 1);

    remove_scratch_dir(&dir);
}

#[test]
fn test_json_snapshots_decode() {
    let dir = scratch_dir("json");
    let mut cfg = small_disc_config(&dir, 20, 3, 2);
    cfg.snapshot.format = SnapshotFormat::Json;

    run_simulation(cfg).unwrap();

    assert_eq!(count_files_with_extension(&dir, "json"), 4); // 3 steps + manifest
    let last = read_snapshot(&snapshot_path(&dir, 2, SnapshotFormat::Json), SnapshotFormat::Json).unwrap();
    assert_eq!(last.len(), 20);
    // bodies have been accelerated by step 2
    assert!(last.iter().any(|r| r.ax != 0.0 || r.ay != 0.0));

    remove_scratch_dir(&dir);
}

#[test]
fn test_invalid_config_does_no_work() {
    let dir = scratch_dir("invalid");
    remove_scratch_dir(&dir);

    let cfg = SimConfig {
        worker_count: 0,
        ..small_disc_config(&dir, 10, 2, 1)
    };
    let err = run_simulation(cfg).err().unwrap();
    assert!(matches!(err, SimError::Config(ConfigError::NoWorkers)));
    assert!(!dir.exists(), "snapshot directory created for an invalid run");
}

#[test]
fn test_lost_snapshot_directory_halts_run() {
    let dir = scratch_dir("lost-dir");
    let sim = Simulation::new(small_disc_config(&dir, 16, 20, 2)).unwrap();
    assert_eq!(sim.config().body_count, 16);
    assert_eq!(sim.config().snapshot.directory, dir);
    remove_scratch_dir(&dir);

    let err = sim.run().unwrap_err();
    match err {
        SimError::Io { path, .. } => assert!(path.starts_with(&dir), "{}", path.display()),
        other => panic!("unexpected error {other}"),
    }
    assert!(!dir.exists());
}
