//! Scoped access to the shared image store
//!
//! Screens that cannot be handed the store explicitly look it up through the
//! innermost active [`ImageStoreProvider`] scope on the current thread.
//! Looking it up with no scope active is an integration bug: [`use_image_store`]
//! panics, [`try_use_image_store`] reports [`StoreError::Uninitialized`].

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

use log::trace;

use super::image_store::SharedImageStore;
use crate::core::error::StoreError;

thread_local! {
    static ACTIVE_STORES: RefCell<Vec<Arc<SharedImageStore>>> = const { RefCell::new(Vec::new()) };
}

/// Owns a store and makes it reachable from within its scopes
#[derive(Clone, Default)]
pub struct ImageStoreProvider {
    store: Arc<SharedImageStore>,
}

impl ImageStoreProvider {
    /// Provider for a fresh, empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider for an existing store
    pub fn with_store(store: Arc<SharedImageStore>) -> Self {
        Self { store }
    }

    /// The provided store, for explicit dependency injection
    pub fn store(&self) -> Arc<SharedImageStore> {
        Arc::clone(&self.store)
    }

    /// Make the store current on this thread until the returned scope drops
    ///
    /// Scopes nest; the innermost one wins.
    pub fn enter(&self) -> StoreScope {
        ACTIVE_STORES.with(|stores| stores.borrow_mut().push(Arc::clone(&self.store)));
        trace!("Entered image store scope");
        StoreScope {
            _not_send: PhantomData,
        }
    }
}

/// Active provider scope; leaving it makes the outer scope current again
#[must_use = "the store is only reachable while the scope is alive"]
pub struct StoreScope {
    _not_send: PhantomData<*const ()>,
}

impl Drop for StoreScope {
    fn drop(&mut self) {
        ACTIVE_STORES.with(|stores| {
            stores.borrow_mut().pop();
        });
        trace!("Left image store scope");
    }
}

/// Store of the innermost active scope
pub fn try_use_image_store() -> Result<Arc<SharedImageStore>, StoreError> {
    ACTIVE_STORES.with(|stores| stores.borrow().last().cloned().ok_or(StoreError::Uninitialized))
}

/// Store of the innermost active scope
///
/// # Panics
///
/// Panics when called outside of any [`ImageStoreProvider::enter`] scope.
pub fn use_image_store() -> Arc<SharedImageStore> {
    match try_use_image_store() {
        Ok(store) => store,
        Err(err) => panic!("{}: use_image_store must be called inside ImageStoreProvider::enter", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ArtifactOrigin, ImageArtifact};

    #[test]
    fn test_unscoped_access_fails() {
        assert_eq!(try_use_image_store().err(), Some(StoreError::Uninitialized));
    }

    #[test]
    #[should_panic(expected = "outside of an ImageStoreProvider scope")]
    fn test_unscoped_use_panics() {
        let _ = use_image_store();
    }

    #[test]
    fn test_scope_provides_store() {
        let provider = ImageStoreProvider::new();
        {
            let _scope = provider.enter();
            let store = use_image_store();
            store.set_image(ImageArtifact::new(
                vec![1],
                "image/png",
                "a.png",
                ArtifactOrigin::Upload,
            ));
        }

        assert!(provider.store().get_image().is_some());
        assert!(try_use_image_store().is_err());
    }

    #[test]
    fn test_scopes_nest() {
        let outer = ImageStoreProvider::new();
        let inner = ImageStoreProvider::new();

        let _outer_scope = outer.enter();
        {
            let _inner_scope = inner.enter();
            assert!(Arc::ptr_eq(&use_image_store(), &inner.store()));
        }
        assert!(Arc::ptr_eq(&use_image_store(), &outer.store()));
    }
}
