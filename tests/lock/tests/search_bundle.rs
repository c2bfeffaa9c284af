//! Search bundles end to end: a real run is packaged, persisted, read back
//! and verified; tampering on disk or in the report/log binding fails closed.

use recon_harness::bundle::{
    build_bundle, verify_bundle, BundleVerifyError, CONFIG_ARTIFACT, LOG_ARTIFACT,
    REPORT_ARTIFACT,
};
use recon_harness::bundle_dir::{
    load_verified_bundle, read_bundle_dir, write_bundle_dir, BundleDirError,
};
use recon_harness::digest::{canonical_hash, HashDomain};
use recon_harness::runner::{run_search, SearchRunV1};
use recon_harness::worlds::partition_lattice::{PartitionLatticeConfig, PartitionLatticeEngine};
use recon_search::search_type::StructuralFilter;
use recon_search::{SearchConfigV1, SortDirection};

fn search(width: u32) -> SearchRunV1 {
    let mut engine =
        PartitionLatticeEngine::new(PartitionLatticeConfig::neutral(&["A", "B", "C", "D"]));
    let config = SearchConfigV1 {
        width,
        filter: StructuralFilter::Disjoint,
        sort_attribute: "information".into(),
        sort_direction: SortDirection::Descending,
        ..SearchConfigV1::default()
    };
    run_search(&mut engine, config).unwrap()
}

fn artifact_bytes(run: &SearchRunV1, name: &str) -> Vec<u8> {
    run.bundle.artifact(name).unwrap().content.clone()
}

// ---------------------------------------------------------------------------
// ACCEPTANCE: a persisted search bundle reads back byte-identical and verifies
// ---------------------------------------------------------------------------

#[test]
fn search_bundle_survives_the_filesystem() {
    let run = search(2);
    verify_bundle(&run.bundle).unwrap();

    let dir = tempfile::tempdir().unwrap();
    write_bundle_dir(&run.bundle, dir.path()).unwrap();

    let loaded = load_verified_bundle(dir.path()).unwrap();
    assert_eq!(loaded.digest, run.bundle.digest);
    assert_eq!(loaded.manifest, run.bundle.manifest);
    assert_eq!(loaded.artifacts, run.bundle.artifacts);
}

#[test]
fn report_binds_the_log_it_was_built_from() {
    let run = search(2);
    let report: serde_json::Value =
        serde_json::from_slice(&artifact_bytes(&run, REPORT_ARTIFACT)).unwrap();
    let log_digest = canonical_hash(HashDomain::SearchLog, &artifact_bytes(&run, LOG_ARTIFACT));
    assert_eq!(report["search_log_digest"], log_digest.as_str());
    assert_eq!(report["schema_version"], "search_report.v1");
    assert_eq!(report["best_model"], "ABCD");
    assert_eq!(report["termination_reason"], "frontier_exhausted");
}

#[test]
fn bundle_digest_depends_on_the_configuration() {
    assert_eq!(search(2).bundle.digest, search(2).bundle.digest);
    assert_ne!(search(2).bundle.digest, search(3).bundle.digest);
}

// ---------------------------------------------------------------------------
// ACCEPTANCE: fail closed on disk tampering
// ---------------------------------------------------------------------------

#[test]
fn missing_log_file_fails_read() {
    let dir = tempfile::tempdir().unwrap();
    write_bundle_dir(&search(2).bundle, dir.path()).unwrap();
    std::fs::remove_file(dir.path().join(LOG_ARTIFACT)).unwrap();

    assert!(matches!(
        read_bundle_dir(dir.path()).unwrap_err(),
        BundleDirError::MissingFile { name } if name == LOG_ARTIFACT
    ));
}

#[test]
fn stray_file_fails_read() {
    let dir = tempfile::tempdir().unwrap();
    write_bundle_dir(&search(2).bundle, dir.path()).unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"scratch").unwrap();

    assert!(matches!(
        read_bundle_dir(dir.path()).unwrap_err(),
        BundleDirError::UndeclaredFile { name } if name == "notes.txt"
    ));
}

#[test]
fn edited_report_fails_verification() {
    let run = search(2);
    let dir = tempfile::tempdir().unwrap();
    write_bundle_dir(&run.bundle, dir.path()).unwrap();

    let mut report: serde_json::Value =
        serde_json::from_slice(&artifact_bytes(&run, REPORT_ARTIFACT)).unwrap();
    report["schema_version"] = serde_json::json!("tampered");
    std::fs::write(
        dir.path().join(REPORT_ARTIFACT),
        serde_json::to_vec(&report).unwrap(),
    )
    .unwrap();

    match load_verified_bundle(dir.path()).unwrap_err() {
        BundleDirError::Integrity(BundleVerifyError::ContentHashMismatch {
            artifact,
            ..
        }) => assert_eq!(artifact, REPORT_ARTIFACT),
        other => panic!("expected ContentHashMismatch, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// ACCEPTANCE: a report paired with a different log is rejected
// ---------------------------------------------------------------------------

#[test]
fn swapped_log_is_a_binding_mismatch() {
    let original = search(2);
    let other = search(1);
    assert_ne!(
        artifact_bytes(&original, LOG_ARTIFACT),
        artifact_bytes(&other, LOG_ARTIFACT)
    );

    // Rebuilding keeps every hash self-consistent; only the binding breaks.
    let forged = build_bundle(vec![
        (
            CONFIG_ARTIFACT.into(),
            artifact_bytes(&original, CONFIG_ARTIFACT),
            true,
        ),
        (LOG_ARTIFACT.into(), artifact_bytes(&other, LOG_ARTIFACT), true),
        (
            REPORT_ARTIFACT.into(),
            artifact_bytes(&original, REPORT_ARTIFACT),
            true,
        ),
    ])
    .unwrap();

    assert!(matches!(
        verify_bundle(&forged).unwrap_err(),
        BundleVerifyError::SearchLogDigestMismatch { .. }
    ));
}
