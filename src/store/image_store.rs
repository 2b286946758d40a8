//! Shared image store
//!
//! Holds the currently active image artifact plus an optional analysis
//! result. The store owns the artifact exclusively; consumers get
//! [`ArtifactView`] snapshots or borrowed access through [`SharedImageStore::with_image`].
//!
//! Invariants:
//! - at most one artifact and one analysis result are held at a time
//! - replacing or clearing an artifact revokes its display URL exactly once
//! - setting a new artifact clears any analysis result of the previous one
//! - subscribers have the change event queued before the mutating call returns,
//!   in the same order as the changes themselves

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, RwLock};

use log::{debug, info, trace};
use serde_json::Value;

use super::artifact::{ArtifactView, DisplayUrl, ImageArtifact};

/// Change notification sent to store subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// A new artifact became current; `released` is the revoked predecessor URL
    ImageSet {
        image: ArtifactView,
        released: Option<DisplayUrl>,
    },
    /// The store was emptied
    ImageCleared { released: DisplayUrl },
    /// An analysis result was attached to the current generation
    AnalysisSet { generation: Option<u64> },
    /// The analysis slot was emptied without an image change
    AnalysisCleared,
}

/// Tracks the live display URL and how many have been revoked
#[derive(Debug, Default)]
struct DisplayUrlRegistry {
    outstanding: Option<DisplayUrl>,
    minted: u64,
    revoked: u64,
}

impl DisplayUrlRegistry {
    fn mint(&mut self, generation: u64) -> DisplayUrl {
        let url = DisplayUrl::for_generation(generation);
        self.minted = self.minted.max(generation);
        self.outstanding = Some(url.clone());
        url
    }

    fn revoke(&mut self, url: &DisplayUrl) {
        if self.outstanding.as_ref() == Some(url) {
            self.outstanding = None;
            self.revoked += 1;
            trace!("Revoked display URL {}", url);
        }
    }

    fn is_revoked(&self, url: &DisplayUrl) -> bool {
        url.generation() <= self.minted && self.outstanding.as_ref() != Some(url)
    }
}

struct CurrentImage {
    artifact: ImageArtifact,
    generation: u64,
    display_url: DisplayUrl,
}

impl CurrentImage {
    fn view(&self) -> ArtifactView {
        ArtifactView::of(&self.artifact, self.generation, &self.display_url)
    }
}

#[derive(Default)]
struct StoreState {
    image: Option<CurrentImage>,
    analysis: Option<Value>,
    next_generation: u64,
    urls: DisplayUrlRegistry,
}

impl StoreState {
    fn release_image(&mut self) -> Option<DisplayUrl> {
        let previous = self.image.take()?;
        self.urls.revoke(&previous.display_url);
        Some(previous.display_url)
    }
}

/// Process-wide holder of the active image and its analysis result
///
/// Every mutation notifies subscribers while it still holds the state lock,
/// so concurrent writers cannot deliver their events out of order.
#[derive(Default)]
pub struct SharedImageStore {
    state: RwLock<StoreState>,
    subscribers: Mutex<Vec<Sender<StoreEvent>>>,
}

impl SharedImageStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current image
    ///
    /// Revokes the previous artifact's display URL before dropping it and
    /// clears any analysis result, which belonged to the previous image.
    pub fn set_image(&self, artifact: ImageArtifact) -> ArtifactView {
        let mut state = self.state.write().unwrap();

        let released = state.release_image();
        if state.analysis.take().is_some() {
            debug!("Discarded analysis result of replaced image");
        }

        state.next_generation += 1;
        let generation = state.next_generation;
        let display_url = state.urls.mint(generation);
        let current = CurrentImage {
            artifact,
            generation,
            display_url,
        };
        let view = current.view();
        state.image = Some(current);

        info!(
            "Image set: {} ({}, {} bytes)",
            view.original_name, view.origin, view.size
        );
        self.notify(StoreEvent::ImageSet {
            image: view.clone(),
            released,
        });
        view
    }

    /// Release the current image and any analysis result
    ///
    /// Calling this on an empty store is a no-op.
    pub fn clear_image(&self) {
        let mut state = self.state.write().unwrap();
        let released = state.release_image();
        let had_analysis = state.analysis.take().is_some();

        match released {
            Some(released) => {
                info!("Image cleared");
                self.notify(StoreEvent::ImageCleared { released });
            }
            None if had_analysis => {
                debug!("Discarded analysis result without an image");
                self.notify(StoreEvent::AnalysisCleared);
            }
            None => {}
        }
    }

    /// Snapshot of the current image
    pub fn get_image(&self) -> Option<ArtifactView> {
        self.state.read().unwrap().image.as_ref().map(CurrentImage::view)
    }

    /// Borrow the current artifact, e.g. to read its bytes
    ///
    /// `f` runs under the store's read lock: calling a mutating store method
    /// from inside it deadlocks.
    pub fn with_image<R>(&self, f: impl FnOnce(&ImageArtifact) -> R) -> Option<R> {
        self.state
            .read()
            .unwrap()
            .image
            .as_ref()
            .map(|current| f(&current.artifact))
    }

    pub fn has_image(&self) -> bool {
        self.state.read().unwrap().image.is_some()
    }

    /// Attach an opaque analysis payload to the current image generation
    pub fn set_analysis_result(&self, value: Value) {
        let mut state = self.state.write().unwrap();
        state.analysis = Some(value);
        let generation = state.image.as_ref().map(|current| current.generation);
        self.notify(StoreEvent::AnalysisSet { generation });
    }

    pub fn analysis_result(&self) -> Option<Value> {
        self.state.read().unwrap().analysis.clone()
    }

    /// Empty the analysis slot, keeping the image
    pub fn clear_analysis_result(&self) {
        let mut state = self.state.write().unwrap();
        if state.analysis.take().is_some() {
            self.notify(StoreEvent::AnalysisCleared);
        }
    }

    /// Receive every subsequent change event
    pub fn subscribe(&self) -> Receiver<StoreEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }

    /// Display URL of the current image, if one is live
    pub fn outstanding_display_url(&self) -> Option<DisplayUrl> {
        self.state.read().unwrap().urls.outstanding.clone()
    }

    /// Whether a URL minted by this store has been revoked
    pub fn is_revoked(&self, url: &DisplayUrl) -> bool {
        self.state.read().unwrap().urls.is_revoked(url)
    }

    /// Total number of display URLs revoked so far
    pub fn revoked_count(&self) -> u64 {
        self.state.read().unwrap().urls.revoked
    }

    // Callers hold the state write lock; lock order is state, then subscribers.
    fn notify(&self, event: StoreEvent) {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ArtifactOrigin;
    use serde_json::json;
    use std::sync::Arc;
    use std::thread;

    fn artifact(name: &str) -> ImageArtifact {
        ImageArtifact::new(vec![1, 2, 3, 4], "image/jpeg", name, ArtifactOrigin::Upload)
    }

    fn released_urls(rx: &Receiver<StoreEvent>) -> Vec<DisplayUrl> {
        rx.try_iter()
            .filter_map(|event| match event {
                StoreEvent::ImageSet { released, .. } => released,
                StoreEvent::ImageCleared { released } => Some(released),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_empty_store() {
        let store = SharedImageStore::new();
        assert!(store.get_image().is_none());
        assert!(store.analysis_result().is_none());
        assert!(store.outstanding_display_url().is_none());
        assert_eq!(store.revoked_count(), 0);
        assert!(!store.has_image());
    }

    #[test]
    fn test_replace_releases_previous_once() {
        let store = SharedImageStore::new();
        let rx = store.subscribe();
        let a = store.set_image(artifact("a.jpg"));
        let b = store.set_image(artifact("b.jpg"));

        assert!(store.is_revoked(&a.display_url));
        assert!(!store.is_revoked(&b.display_url));
        assert_eq!(store.revoked_count(), 1);
        assert_ne!(a.display_url, b.display_url);

        let current = store.get_image().unwrap();
        assert_eq!(current.original_name, "b.jpg");
        assert_eq!(current.display_url, b.display_url);
        assert_eq!(store.outstanding_display_url(), Some(b.display_url.clone()));

        store.clear_image();
        store.clear_image();
        assert!(store.is_revoked(&b.display_url));
        assert_eq!(store.revoked_count(), 2);
        assert_eq!(released_urls(&rx), vec![a.display_url, b.display_url]);
    }

    #[test]
    fn test_revocation_bookkeeping_is_bounded() {
        let store = SharedImageStore::new();
        let first = store.set_image(artifact("first.jpg"));
        for i in 0..1000 {
            store.set_image(artifact(&format!("{}.jpg", i)));
        }

        let state = store.state.read().unwrap();
        assert_eq!(state.urls.revoked, 1000);
        assert!(state.urls.outstanding.is_some());
        drop(state);
        assert!(store.is_revoked(&first.display_url));
        assert!(!store.is_revoked(&DisplayUrl::for_generation(5000)));
    }

    #[test]
    fn test_new_image_invalidates_analysis() {
        let store = SharedImageStore::new();
        store.set_image(artifact("a.jpg"));
        store.set_analysis_result(json!({ "atc_score": 82 }));
        assert!(store.analysis_result().is_some());

        store.set_image(artifact("b.jpg"));
        assert!(store.analysis_result().is_none());
    }

    #[test]
    fn test_clear_drops_analysis_without_image() {
        let store = SharedImageStore::new();
        let rx = store.subscribe();
        store.set_analysis_result(json!({ "atc": 1 }));
        assert!(matches!(
            rx.try_recv().unwrap(),
            StoreEvent::AnalysisSet { generation: None }
        ));

        store.clear_image();

        assert!(store.analysis_result().is_none());
        assert_eq!(rx.try_recv().unwrap(), StoreEvent::AnalysisCleared);
        assert_eq!(store.revoked_count(), 0);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let store = SharedImageStore::new();
        store.clear_image();
        assert!(store.get_image().is_none());

        let a = store.set_image(artifact("a.jpg"));
        store.set_analysis_result(json!("done"));
        store.clear_image();
        store.clear_image();

        assert!(store.get_image().is_none());
        assert!(store.analysis_result().is_none());
        assert!(store.is_revoked(&a.display_url));
        assert_eq!(store.revoked_count(), 1);
        assert!(store.outstanding_display_url().is_none());
    }

    #[test]
    fn test_generations_increase() {
        let store = SharedImageStore::new();
        let a = store.set_image(artifact("a.jpg"));
        store.clear_image();
        let b = store.set_image(artifact("b.jpg"));
        assert!(b.generation > a.generation);
    }

    #[test]
    fn test_with_image_borrows_bytes() {
        let store = SharedImageStore::new();
        assert!(store.with_image(|a| a.size()).is_none());

        store.set_image(artifact("a.jpg"));
        assert_eq!(store.with_image(|a| a.bytes().to_vec()), Some(vec![1, 2, 3, 4]));
    }

    #[test]
    fn test_subscribers_see_events_before_return() {
        let store = SharedImageStore::new();
        let rx = store.subscribe();

        let a = store.set_image(artifact("a.jpg"));
        match rx.try_recv().unwrap() {
            StoreEvent::ImageSet { image, released } => {
                assert_eq!(image.original_name, "a.jpg");
                assert!(released.is_none());
            }
            other => panic!("unexpected event: {:?}", other),
        }

        store.set_image(artifact("b.jpg"));
        match rx.try_recv().unwrap() {
            StoreEvent::ImageSet { released, .. } => assert_eq!(released, Some(a.display_url)),
            other => panic!("unexpected event: {:?}", other),
        }

        store.set_analysis_result(json!(1));
        assert!(matches!(
            rx.try_recv().unwrap(),
            StoreEvent::AnalysisSet { generation: Some(_) }
        ));

        store.clear_analysis_result();
        assert_eq!(rx.try_recv().unwrap(), StoreEvent::AnalysisCleared);

        store.clear_image();
        assert!(matches!(rx.try_recv().unwrap(), StoreEvent::ImageCleared { .. }));

        // No-op clear emits nothing
        store.clear_image();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_concurrent_writers_notify_in_order() {
        for _ in 0..200 {
            let store = Arc::new(SharedImageStore::new());
            let rx = store.subscribe();

            thread::scope(|scope| {
                for i in 0..4 {
                    let store = Arc::clone(&store);
                    scope.spawn(move || {
                        store.set_image(artifact(&format!("{}.jpg", i)));
                    });
                }
            });

            let generations: Vec<u64> = rx
                .try_iter()
                .filter_map(|event| match event {
                    StoreEvent::ImageSet { image, .. } => Some(image.generation),
                    _ => None,
                })
                .collect();

            assert_eq!(generations, vec![1, 2, 3, 4]);
            assert_eq!(store.get_image().unwrap().generation, 4);
        }
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let store = SharedImageStore::new();
        let rx = store.subscribe();
        drop(rx);
        let kept = store.subscribe();

        store.set_image(artifact("a.jpg"));
        assert_eq!(store.subscribers.lock().unwrap().len(), 1);
        assert!(kept.try_recv().is_ok());
    }
}
