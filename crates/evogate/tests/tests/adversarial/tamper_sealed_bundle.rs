//! Adversarial: sealed bundles cannot be altered without detection.

use evogate_evidence::{EvidenceStore, SimulatedEvaluator, StoreError, FAILURE_REPORT_FILE, MANIFEST_FILE};
use evogate_tests::Fixture;
use evogate_types::{BundleId, Drift};
use std::fs;
use std::path::Path;

fn make_writable(path: &Path) {
    let mut perms = fs::metadata(path).unwrap().permissions();
    #[allow(clippy::permissions_set_readonly_false)]
    perms.set_readonly(false);
    fs::set_permissions(path, perms).unwrap();
}

fn sealed(fx: &Fixture) -> (EvidenceStore, BundleId) {
    let store = fx.store();
    let id = store.create_bundle(&SimulatedEvaluator::passing(16, 0.1)).unwrap();
    (store, id)
}

#[test]
fn sealed_files_are_read_only() {
    let fx = Fixture::new();
    let (store, id) = sealed(&fx);
    for entry in fs::read_dir(store.bundle_dir(&id)).unwrap() {
        let meta = entry.unwrap().metadata().unwrap();
        assert!(meta.permissions().readonly());
    }
}

#[test]
fn forged_artifact_detected() {
    let fx = Fixture::new();
    let (store, id) = sealed(&fx);
    let artifact = store.bundle_dir(&id).join("evaluation.prom");
    make_writable(&artifact);
    let forged = fs::read_to_string(&artifact).unwrap().replace("0.1", "0.0001");
    fs::write(&artifact, forged).unwrap();

    match store.verify(&id) {
        Err(StoreError::Tampered { drift, .. }) => {
            assert_eq!(drift.len(), 1);
            assert!(matches!(&drift[0], Drift::Modified { path, .. } if path == "evaluation.prom"));
        }
        other => panic!("expected tamper detection, got {:?}", other),
    }
}

#[test]
fn planted_and_deleted_files_detected() {
    let fx = Fixture::new();
    let (store, id) = sealed(&fx);
    let dir = store.bundle_dir(&id);
    fs::write(dir.join("planted.json"), "{}").unwrap();
    let events = dir.join("events.jsonl");
    make_writable(&events);
    fs::remove_file(&events).unwrap();

    match store.verify(&id) {
        Err(StoreError::Tampered { drift, .. }) => {
            assert!(drift.contains(&Drift::Missing("events.jsonl".into())));
            assert!(drift.contains(&Drift::Unexpected("planted.json".into())));
        }
        other => panic!("expected tamper detection, got {:?}", other),
    }
}

#[test]
fn resealing_a_tampered_bundle_does_not_launder_it() {
    let fx = Fixture::new();
    let (store, id) = sealed(&fx);
    let before = fs::read(store.bundle_dir(&id).join(MANIFEST_FILE)).unwrap();
    fs::write(store.bundle_dir(&id).join("planted.json"), "{}").unwrap();

    assert!(matches!(store.seal(&id), Err(StoreError::Tampered { .. })));
    assert_eq!(fs::read(store.bundle_dir(&id).join(MANIFEST_FILE)).unwrap(), before);
}

#[test]
fn sealed_bundle_rejects_writes() {
    let fx = Fixture::new();
    let (store, id) = sealed(&fx);
    assert!(matches!(
        store.write_bundle_file(&id, "evaluation.prom", b"x 1"),
        Err(StoreError::Sealed(_))
    ));
    assert!(matches!(
        store.write_post_seal(&id, "MANIFEST.sha256", b"x"),
        Err(StoreError::InvalidFileName(_))
    ));
    store.write_post_seal(&id, FAILURE_REPORT_FILE, b"{}").unwrap();
    assert!(store.write_post_seal(&id, FAILURE_REPORT_FILE, b"{}").is_err());
    store.verify(&id).unwrap();
}

#[test]
fn idempotent_seal_is_byte_identical() {
    let fx = Fixture::new();
    let (store, id) = sealed(&fx);
    let first = fs::read(store.bundle_dir(&id).join(MANIFEST_FILE)).unwrap();
    let d1 = store.seal(&id).unwrap();
    let d2 = store.seal(&id).unwrap();
    assert_eq!(d1, d2);
    assert_eq!(fs::read(store.bundle_dir(&id).join(MANIFEST_FILE)).unwrap(), first);
}
