//! End-to-end: overlapping cycles never corrupt the store.

use evogate_evidence::{SimulatedEvaluator, MANIFEST_FILE};
use evogate_tests::Fixture;
use evogate_types::BundleId;
use std::collections::HashSet;
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const WRITERS: usize = 8;

#[test]
fn concurrent_creates_yield_distinct_sealed_bundles() {
    let fx = Fixture::new();
    let store = fx.store();
    let done = AtomicBool::new(false);

    let ids: Vec<BundleId> = std::thread::scope(|s| {
        // A reader following `latest` must only ever see sealed, intact bundles.
        let reader = s.spawn(|| {
            let mut observed = 0usize;
            while !done.load(Ordering::SeqCst) {
                if let Some(id) = store.latest().unwrap() {
                    store.verify(&id).unwrap();
                    store.read_artifact(&id).unwrap();
                    observed += 1;
                }
            }
            observed
        });

        let writers: Vec<_> = (0..WRITERS)
            .map(|_| {
                let store = store.clone();
                s.spawn(move || store.create_bundle(&SimulatedEvaluator::passing(16, 0.2)).unwrap())
            })
            .collect();
        let ids = writers.into_iter().map(|h| h.join().unwrap()).collect();
        done.store(true, Ordering::SeqCst);
        reader.join().unwrap();
        ids
    });

    let distinct: HashSet<&BundleId> = ids.iter().collect();
    assert_eq!(distinct.len(), WRITERS);
    for id in &ids {
        assert!(store.is_sealed(id));
        store.verify(id).unwrap();
    }
    // `latest` is the bundle sealed last: no manifest is newer than its own.
    let latest = store.latest().unwrap().unwrap();
    assert!(ids.contains(&latest));
    let sealed_at = |id: &BundleId| {
        fs::metadata(store.bundle_dir(id).join(MANIFEST_FILE))
            .unwrap()
            .modified()
            .unwrap()
    };
    let latest_sealed = sealed_at(&latest);
    for id in &ids {
        assert!(sealed_at(id) <= latest_sealed, "{} sealed after latest {}", id, latest);
    }

    let mut listed = store.list().unwrap();
    listed.sort();
    let mut expected = ids.clone();
    expected.sort();
    assert_eq!(listed, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_async_creates() {
    let fx = Fixture::new();
    let store = fx.store();
    let mut tasks = Vec::new();
    for _ in 0..WRITERS {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            store
                .create_bundle_async(Arc::new(SimulatedEvaluator::passing(8, 0.4)))
                .await
                .unwrap()
        }));
    }
    let mut ids = HashSet::new();
    for t in tasks {
        ids.insert(t.await.unwrap());
    }
    assert_eq!(ids.len(), WRITERS);
    assert!(ids.contains(&store.latest().unwrap().unwrap()));
}
