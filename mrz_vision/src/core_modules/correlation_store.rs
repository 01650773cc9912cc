// THEORY:
// The `FrameCorrelationStore` reassembles per-frame results that arrive from
// independent asynchronous stages. Each stage tags its artifact with the frame
// hash; the store merges artifacts into one bundle per hash and answers the
// dependent query (the portrait zone) once every constituent has arrived.
//
// Key architectural principles:
// 1.  **Strict Isolation**: a query for hash H reads only the bundle recorded
//     under H. There is no fallback to "the last bundle" and no sharing between
//     keys.
// 2.  **Bounded Lifetime**: bundles live for one frame's processing window. With
//     one frame in flight the pipeline calls `clear()` before each frame; with
//     more it evicts each hash when its frame is consumed. The map never grows
//     beyond the in-flight bound.
// 3.  **One Lock**: a single `Mutex` serializes record, query and clear.
//     Contention is one writer per in-flight frame, so finer locking buys
//     nothing.

use crate::core_modules::artifacts::{Artifact, ArtifactBundle};
use crate::core_modules::frame::FrameHash;
use crate::core_modules::geometry::Quad;
use crate::core_modules::portrait::PortraitLocator;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct FrameCorrelationStore {
    bundles: Mutex<HashMap<FrameHash, ArtifactBundle>>,
}

impl FrameCorrelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn bundles(&self) -> MutexGuard<'_, HashMap<FrameHash, ArtifactBundle>> {
        // A panic while holding the lock cannot leave a bundle half-merged.
        self.bundles.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Merges `artifact` into the bundle for `hash`, creating it if needed.
    pub fn record(&self, hash: &FrameHash, artifact: Artifact) {
        let kind = artifact.kind();
        self.bundles().entry(hash.clone()).or_default().merge(artifact);
        log::trace!("[STORE] recorded {kind:?} for {hash}");
    }

    /// Resolves the portrait zone for `hash`. `None` when the bundle is missing,
    /// incomplete, or the locator finds nothing.
    pub fn query(&self, hash: &FrameHash, locator: &dyn PortraitLocator) -> Option<Quad> {
        let bundles = self.bundles();
        let Some(complete) = bundles.get(hash).and_then(ArtifactBundle::complete) else {
            log::debug!("[STORE] correlation miss for {hash}");
            return None;
        };
        locator.locate(&complete)
    }

    /// Drops every bundle.
    pub fn clear(&self) {
        self.bundles().clear();
    }

    /// Removes and returns the bundle for `hash`.
    pub fn evict(&self, hash: &FrameHash) -> Option<ArtifactBundle> {
        self.bundles().remove(hash)
    }

    /// Evicts the bundle for `hash` when the returned guard is dropped, however
    /// the holder exits.
    pub fn evict_on_drop<'a>(&'a self, hash: &'a FrameHash) -> EvictGuard<'a> {
        EvictGuard { store: self, hash }
    }

    pub fn contains(&self, hash: &FrameHash) -> bool {
        self.bundles().contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.bundles().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles().is_empty()
    }
}

/// Returned by [`FrameCorrelationStore::evict_on_drop`].
#[must_use = "the bundle is evicted as soon as the guard is dropped"]
pub struct EvictGuard<'a> {
    store: &'a FrameCorrelationStore,
    hash: &'a FrameHash,
}

impl Drop for EvictGuard<'_> {
    fn drop(&mut self) {
        self.store.evict(self.hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::artifacts::{DeskewedImage, ScaledColourImage};
    use crate::core_modules::portrait::GeometricPortraitLocator;
    use std::sync::Arc;

    fn record_full_frame(store: &FrameCorrelationStore, hash: &FrameHash) {
        store.record(hash, Artifact::LocalizedLines(vec![Quad::rect(20, 500, 900, 40)]));
        store.record(
            hash,
            Artifact::DeskewedImage(DeskewedImage {
                width: 880,
                height: 80,
                source_quad: Quad::rect(0, 0, 1000, 700),
            }),
        );
        store.record(
            hash,
            Artifact::ScaledColourImage(ScaledColourImage { width: 500, height: 350, scale: 0.5 }),
        );
        store.record(hash, Artifact::DetectedQuads(vec![Quad::rect(0, 0, 500, 350)]));
        store.record(hash, Artifact::RecognizedLines(vec![]));
    }

    #[test]
    fn query_needs_every_artifact() {
        let store = FrameCorrelationStore::new();
        let hash = FrameHash::from("sha256:01");
        let locator = GeometricPortraitLocator::default();
        store.record(&hash, Artifact::LocalizedLines(vec![Quad::rect(20, 500, 900, 40)]));
        assert_eq!(store.query(&hash, &locator), None);
        record_full_frame(&store, &hash);
        assert!(store.query(&hash, &locator).is_some());
    }

    #[test]
    fn query_never_reads_another_hash() {
        let store = FrameCorrelationStore::new();
        let a = FrameHash::from("sha256:aa");
        let b = FrameHash::from("sha256:bb");
        let locator = GeometricPortraitLocator::default();
        record_full_frame(&store, &a);
        assert!(store.query(&a, &locator).is_some());
        assert_eq!(store.query(&b, &locator), None);
        assert!(!store.contains(&b));
    }

    #[test]
    fn clear_and_evict_bound_the_store() {
        let store = FrameCorrelationStore::new();
        let a = FrameHash::from("sha256:aa");
        let b = FrameHash::from("sha256:bb");
        record_full_frame(&store, &a);
        record_full_frame(&store, &b);
        assert_eq!(store.len(), 2);
        assert!(store.evict(&a).is_some_and(|bundle| bundle.is_complete()));
        assert_eq!(store.len(), 1);
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.query(&b, &GeometricPortraitLocator::default()), None);
    }

    #[test]
    fn guard_evicts_even_when_the_holder_panics() {
        let store = FrameCorrelationStore::new();
        let kept = FrameHash::from("sha256:01");
        let doomed = FrameHash::from("sha256:02");
        record_full_frame(&store, &kept);

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = store.evict_on_drop(&doomed);
            store.record(&doomed, Artifact::DetectedQuads(vec![Quad::rect(0, 0, 4, 4)]));
            panic!("recognizer blew up");
        }));
        assert!(outcome.is_err());
        assert!(!store.contains(&doomed));
        assert!(store.contains(&kept));
    }

    #[test]
    fn concurrent_records_merge() {
        let store = Arc::new(FrameCorrelationStore::new());
        let hash = FrameHash::from("sha256:cc");
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                let hash = hash.clone();
                std::thread::spawn(move || {
                    store.record(&hash, Artifact::DetectedQuads(vec![Quad::rect(i, i, 1, 1)]));
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("recording thread");
        }
        let bundle = store.evict(&hash).expect("bundle");
        assert_eq!(bundle.detected_quads().map(<[Quad]>::len), Some(8));
        assert!(!bundle.is_complete());
    }
}
