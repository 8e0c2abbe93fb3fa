//! The directory-backed baseline store and mismatch artifacts.

use snapkit_capture::{BaselineStore, DirectoryBaselines, SnapshotKey};
use snapkit_harness::{CaseState, Harness, HarnessConfig};

use crate::support::scenarios::{delete_block_suite, regressed_suite, Observed, SUITE};
use crate::support::{assert_case_state, assert_suite_passed, test_config, InlineRenderer};

/// A harness using the default on-disk store at `config.baseline_dir`.
fn disk_harness(config: HarnessConfig) -> Harness {
    snapkit_harness::logging::init();
    Harness::builder()
        .config(config)
        .renderer(InlineRenderer::new())
        .build()
        .expect("harness should build")
}

#[tokio::test]
async fn test_baselines_written_per_crossing() {
    let dir = tempfile::tempdir().unwrap();
    let config = HarnessConfig {
        baseline_dir: dir.path().to_path_buf(),
        ..test_config()
    };

    let report = disk_harness(config).run(&delete_block_suite(&Observed::default())).await;
    assert_suite_passed(&report);

    let store = DirectoryBaselines::new(dir.path());
    for case in ["beginning-001", "middle-001", "end-001"] {
        for index in [1, 2] {
            let key = SnapshotKey::new(SUITE, case, index);
            assert!(store.frame_path(&key).exists(), "missing {key}");
            let metadata = store.metadata(&key).unwrap().expect("metadata sidecar");
            assert_eq!((metadata.width, metadata.height), (64, 8));
            assert!(store.load(&key).unwrap().is_some());
        }
    }
    assert!(store.load(&SnapshotKey::new(SUITE, "beginning-001", 3)).unwrap().is_none());
}

#[tokio::test]
async fn test_mismatch_writes_artifacts() {
    let baselines = tempfile::tempdir().unwrap();
    let artifacts = tempfile::tempdir().unwrap();
    let config = HarnessConfig {
        baseline_dir: baselines.path().to_path_buf(),
        artifact_dir: Some(artifacts.path().to_path_buf()),
        ..test_config()
    };
    let harness = disk_harness(config);

    assert_suite_passed(&harness.run(&delete_block_suite(&Observed::default())).await);
    let report = harness.run(&regressed_suite(&Observed::default())).await;
    assert_case_state(&report, "beginning-001", CaseState::Failed);

    let key = SnapshotKey::new(SUITE, "beginning-001", 2);
    assert!(artifacts.path().join(key.relative_path("actual.ppm")).exists());
    assert!(artifacts.path().join(key.relative_path("diff.ppm")).exists());
    // The first crossing matched, so it left nothing behind.
    let first = SnapshotKey::new(SUITE, "beginning-001", 1);
    assert!(!artifacts.path().join(first.relative_path("actual.ppm")).exists());
}

#[tokio::test]
async fn test_update_mode_accepts_new_rendering() {
    let dir = tempfile::tempdir().unwrap();
    let config = HarnessConfig {
        baseline_dir: dir.path().to_path_buf(),
        ..test_config()
    };
    assert_suite_passed(&disk_harness(config.clone()).run(&delete_block_suite(&Observed::default())).await);

    let store = DirectoryBaselines::new(dir.path());
    let key = SnapshotKey::new(SUITE, "beginning-001", 2);
    let before = store.load(&key).unwrap().unwrap();

    let updating = HarnessConfig {
        update_baselines: true,
        ..config.clone()
    };
    let report = disk_harness(updating).run(&regressed_suite(&Observed::default())).await;
    assert_suite_passed(&report);
    let after = store.load(&key).unwrap().unwrap();
    assert_ne!(before, after);

    // With the new baseline in place, the regressed build passes normally.
    let report = disk_harness(config).run(&regressed_suite(&Observed::default())).await;
    assert_suite_passed(&report);
}
