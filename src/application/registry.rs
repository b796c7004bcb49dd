//! Backend Registry
//!
//! Owns every Backend record. Mutations commit through the
//! SchedulerStore first and only then touch the in-memory maps, so a
//! failed write leaves the registry exactly as it was.

use crate::domain::entities::Backend;
use crate::domain::error::{validate_id, validate_weight, SchedulerError, SchedulerResult};
use crate::domain::ports::SchedulerStore;
use crate::domain::services::Selector;
use crate::domain::value_objects::BackendState;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// Concurrency-safe registry of backends.
///
/// Records live in a `DashMap` keyed by id, with a second map from
/// `instance_id` to id enforcing global instance uniqueness. Registration
/// holds the instance slot while persisting; per-record mutations hold
/// the record's entry while persisting. Same-record writers therefore
/// serialize, while writers on other records proceed in parallel.
///
/// Lock order is always instance index before records, and no operation
/// touches the instance index while holding a record entry.
pub struct BackendRegistry {
    store: Arc<dyn SchedulerStore>,
    backends: DashMap<String, Backend>,
    instances: DashMap<String, String>,
}

impl BackendRegistry {
    /// Create an empty registry writing through `store`.
    pub fn new(store: Arc<dyn SchedulerStore>) -> Self {
        Self {
            store,
            backends: DashMap::new(),
            instances: DashMap::new(),
        }
    }

    /// Rebuild the registry from everything `store` holds.
    pub fn load(store: Arc<dyn SchedulerStore>) -> SchedulerResult<Self> {
        let stored = store.load_backends().map_err(SchedulerError::storage)?;
        let registry = Self::new(store);

        for backend in stored {
            registry
                .instances
                .insert(backend.instance_id.clone(), backend.id.clone());
            registry.backends.insert(backend.id.clone(), backend);
        }

        tracing::info!("backend registry loaded, backends={}", registry.backends.len());
        Ok(registry)
    }

    /// Register a new backend.
    ///
    /// Fails with `DuplicateInstance` if `instance_id` is registered under
    /// any app. The returned backend carries its generated id.
    pub fn register(
        &self,
        instance_id: &str,
        app_id: &str,
        weight: i64,
        state: BackendState,
    ) -> SchedulerResult<Backend> {
        validate_id(instance_id)?;
        validate_id(app_id)?;
        let weight = validate_weight(weight)?;

        match self.instances.entry(instance_id.to_string()) {
            Entry::Occupied(_) => {
                tracing::warn!("rejected duplicate instance_id={} app_id={}", instance_id, app_id);
                Err(SchedulerError::DuplicateInstance(instance_id.to_string()))
            }
            Entry::Vacant(slot) => {
                let backend = Backend::new(instance_id.to_string(), app_id.to_string(), weight, state);

                self.store.insert_backend(&backend).map_err(|e| {
                    tracing::warn!("failed to persist backend instance_id={}: {:#}", instance_id, e);
                    SchedulerError::storage(e)
                })?;

                self.backends.insert(backend.id.clone(), backend.clone());
                slot.insert(backend.id.clone());

                tracing::info!(
                    "registered backend id={} instance_id={} app_id={} weight={} state={}",
                    backend.id,
                    backend.instance_id,
                    backend.app_id,
                    backend.weight,
                    backend.state
                );
                Ok(backend)
            }
        }
    }

    /// Get a backend by id, scoped to `app_id`.
    pub fn get(&self, app_id: &str, backend_id: &str) -> SchedulerResult<Backend> {
        self.backends
            .get(backend_id)
            .filter(|b| b.app_id == app_id)
            .map(|b| b.value().clone())
            .ok_or_else(|| SchedulerError::not_found(app_id, backend_id))
    }

    /// Every backend, any app and state, ordered by id.
    pub fn list_all(&self) -> Vec<Backend> {
        self.collect(|_| true)
    }

    /// Backends currently bound to `app_id`, any state, ordered by id.
    pub fn list_for_app(&self, app_id: &str) -> Vec<Backend> {
        self.collect(|b| b.app_id == app_id)
    }

    /// Active backends bound to `app_id`, ordered by id.
    pub fn list_active_for_app(&self, app_id: &str) -> Vec<Backend> {
        self.collect(|b| b.app_id == app_id && b.is_active())
    }

    /// Number of registered backends.
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Hard-delete a backend. A second delete of the same id fails.
    pub fn delete(&self, app_id: &str, backend_id: &str) -> SchedulerResult<Backend> {
        let removed = match self.backends.entry(backend_id.to_string()) {
            Entry::Occupied(entry) if entry.get().app_id == app_id => {
                self.store.delete_backend(backend_id).map_err(|e| {
                    tracing::warn!("failed to delete backend id={}: {:#}", backend_id, e);
                    SchedulerError::storage(e)
                })?;
                entry.remove()
            }
            _ => {
                tracing::warn!("delete: backend id={} not found for app_id={}", backend_id, app_id);
                return Err(SchedulerError::not_found(app_id, backend_id));
            }
        };

        // Record entry is released; the instance slot can be freed now.
        self.instances.remove(&removed.instance_id);

        tracing::info!(
            "deleted backend id={} instance_id={} app_id={}",
            removed.id,
            removed.instance_id,
            removed.app_id
        );
        Ok(removed)
    }

    /// Mark a backend active or down.
    pub fn set_state(
        &self,
        app_id: &str,
        backend_id: &str,
        state: BackendState,
    ) -> SchedulerResult<Backend> {
        let updated = self.update(app_id, backend_id, |b| b.state = state)?;
        tracing::info!("backend id={} app_id={} state={}", backend_id, app_id, state);
        Ok(updated)
    }

    /// Change a backend's weight. Weights below 1 fail with `InvalidWeight`.
    pub fn set_weight(&self, app_id: &str, backend_id: &str, weight: i64) -> SchedulerResult<Backend> {
        let weight = validate_weight(weight)?;
        let updated = self.update(app_id, backend_id, |b| b.weight = weight)?;
        tracing::info!("backend id={} app_id={} weight={}", backend_id, app_id, weight);
        Ok(updated)
    }

    /// Move a backend from `current_app_id` to `new_app_id`.
    ///
    /// The record is rewritten in place under its entry lock, so listings
    /// see it under exactly one of the two apps at any moment.
    pub fn reassign_app(
        &self,
        current_app_id: &str,
        backend_id: &str,
        new_app_id: &str,
    ) -> SchedulerResult<Backend> {
        validate_id(new_app_id)?;
        let updated = self.update(current_app_id, backend_id, |b| b.app_id = new_app_id.to_string())?;
        tracing::info!(
            "backend id={} reassigned app_id={} -> {}",
            backend_id,
            current_app_id,
            new_app_id
        );
        Ok(updated)
    }

    /// Apply `change` to a copy of the record, persist it, then swap it in.
    fn update<F>(&self, app_id: &str, backend_id: &str, change: F) -> SchedulerResult<Backend>
    where
        F: FnOnce(&mut Backend),
    {
        let mut entry = match self.backends.get_mut(backend_id) {
            Some(entry) if entry.app_id == app_id => entry,
            _ => {
                tracing::warn!("backend id={} not found for app_id={}", backend_id, app_id);
                return Err(SchedulerError::not_found(app_id, backend_id));
            }
        };

        let mut updated = entry.clone();
        change(&mut updated);
        if updated == *entry {
            return Ok(updated);
        }

        self.store.update_backend(&updated).map_err(|e| {
            tracing::warn!("failed to persist backend id={}: {:#}", backend_id, e);
            SchedulerError::storage(e)
        })?;

        *entry = updated.clone();
        Ok(updated)
    }

    fn collect<P>(&self, keep: P) -> Vec<Backend>
    where
        P: Fn(&Backend) -> bool,
    {
        let mut backends: Vec<Backend> = self
            .backends
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        Selector::stable_order(&mut backends);
        backends
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::outbound::{FailingStore, MemoryStore};
    use std::collections::HashSet;
    use tracing_test::traced_test;

    // ===== Test Helpers =====

    fn registry() -> BackendRegistry {
        BackendRegistry::new(Arc::new(MemoryStore::new()))
    }

    fn failing_registry() -> (BackendRegistry, Arc<FailingStore>) {
        let store = Arc::new(FailingStore::new());
        (BackendRegistry::new(store.clone()), store)
    }

    fn register(registry: &BackendRegistry, instance_id: &str, app_id: &str) -> Backend {
        registry
            .register(instance_id, app_id, 1, BackendState::Active)
            .unwrap()
    }

    // ===== Register Tests =====

    #[test]
    fn test_register_defaults() {
        let registry = registry();
        let backend = register(&registry, "i-1", "txt2img");

        assert_eq!(backend.instance_id, "i-1");
        assert_eq!(backend.app_id, "txt2img");
        assert_eq!(backend.weight, 1);
        assert_eq!(backend.state, BackendState::Active);
        assert_eq!(registry.get("txt2img", &backend.id).unwrap(), backend);
    }

    #[test]
    #[traced_test]
    fn test_register_duplicate_instance_across_apps() {
        let registry = registry();
        register(&registry, "i-1", "txt2img");

        let result = registry.register("i-1", "img2img", 1, BackendState::Active);

        assert_eq!(result, Err(SchedulerError::DuplicateInstance("i-1".to_string())));
        assert_eq!(registry.len(), 1);
        assert!(logs_contain("rejected duplicate instance_id=i-1"));
    }

    #[test]
    fn test_register_rejects_invalid_input() {
        let registry = registry();

        assert_eq!(
            registry.register("i-1", "txt2img", 0, BackendState::Active),
            Err(SchedulerError::InvalidWeight(0))
        );
        assert_eq!(
            registry.register("", "txt2img", 1, BackendState::Active),
            Err(SchedulerError::InvalidAppId)
        );
        assert_eq!(
            registry.register("i-1", "", 1, BackendState::Active),
            Err(SchedulerError::InvalidAppId)
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_storage_failure_leaves_no_trace() {
        let (registry, store) = failing_registry();
        store.set_failing(true);

        let result = registry.register("i-1", "txt2img", 1, BackendState::Active);
        assert!(matches!(result, Err(SchedulerError::StorageFailure(_))));
        assert!(registry.is_empty());

        // Instance slot must not be left claimed
        store.set_failing(false);
        assert!(registry.register("i-1", "txt2img", 1, BackendState::Active).is_ok());
    }

    #[test]
    fn test_register_concurrent_same_instance() {
        let registry = registry();

        let successes = std::thread::scope(|s| {
            let handles: Vec<_> = (0..16)
                .map(|i| {
                    let registry = &registry;
                    s.spawn(move || {
                        registry
                            .register("shared", &format!("app-{}", i), 1, BackendState::Active)
                            .is_ok()
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|ok| *ok)
                .count()
        });

        assert_eq!(successes, 1);
        assert_eq!(registry.len(), 1);
    }

    // ===== Read Tests =====

    #[test]
    fn test_get_wrong_app_is_not_found() {
        let registry = registry();
        let backend = register(&registry, "i-1", "txt2img");

        assert!(matches!(
            registry.get("img2img", &backend.id),
            Err(SchedulerError::NotFound { .. })
        ));
        assert!(matches!(
            registry.get("txt2img", "missing"),
            Err(SchedulerError::NotFound { .. })
        ));
    }

    #[test]
    fn test_list_filters() {
        let registry = registry();
        let a = register(&registry, "i-1", "txt2img");
        let b = register(&registry, "i-2", "txt2img");
        register(&registry, "i-3", "img2img");
        registry.set_state("txt2img", &b.id, BackendState::Down).unwrap();

        assert_eq!(registry.list_all().len(), 3);
        assert_eq!(registry.list_for_app("txt2img").len(), 2);
        assert_eq!(registry.list_active_for_app("txt2img"), vec![a]);
        assert!(registry.list_for_app("upscale").is_empty());
    }

    #[test]
    fn test_list_is_ordered_by_id() {
        let registry = registry();
        for i in 0..10 {
            register(&registry, &format!("i-{}", i), "txt2img");
        }

        let ids: Vec<String> = registry.list_all().into_iter().map(|b| b.id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    // ===== Delete Tests =====

    #[test]
    fn test_delete_twice_fails() {
        let registry = registry();
        let backend = register(&registry, "i-1", "txt2img");

        assert_eq!(registry.delete("txt2img", &backend.id).unwrap(), backend);
        assert!(matches!(
            registry.delete("txt2img", &backend.id),
            Err(SchedulerError::NotFound { .. })
        ));
    }

    #[test]
    fn test_delete_frees_instance_id() {
        let registry = registry();
        let backend = register(&registry, "i-1", "txt2img");
        registry.delete("txt2img", &backend.id).unwrap();

        let again = register(&registry, "i-1", "img2img");
        assert_ne!(again.id, backend.id);
    }

    #[test]
    fn test_delete_wrong_app_keeps_record() {
        let registry = registry();
        let backend = register(&registry, "i-1", "txt2img");

        assert!(registry.delete("img2img", &backend.id).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_delete_storage_failure_keeps_record() {
        let (registry, store) = failing_registry();
        let backend = register(&registry, "i-1", "txt2img");
        store.set_failing(true);

        assert!(matches!(
            registry.delete("txt2img", &backend.id),
            Err(SchedulerError::StorageFailure(_))
        ));
        assert_eq!(registry.get("txt2img", &backend.id).unwrap(), backend);
        assert!(matches!(
            registry.register("i-1", "other", 1, BackendState::Active),
            Err(SchedulerError::DuplicateInstance(_))
        ));
    }

    // ===== Mutation Tests =====

    #[test]
    fn test_set_state_roundtrip() {
        let registry = registry();
        let backend = register(&registry, "i-1", "txt2img");

        let down = registry.set_state("txt2img", &backend.id, BackendState::Down).unwrap();
        assert_eq!(down.state, BackendState::Down);
        assert!(registry.list_active_for_app("txt2img").is_empty());

        registry.set_state("txt2img", &backend.id, BackendState::Active).unwrap();
        assert_eq!(registry.list_active_for_app("txt2img").len(), 1);
    }

    #[test]
    fn test_set_state_unknown_backend() {
        let registry = registry();
        assert!(matches!(
            registry.set_state("txt2img", "missing", BackendState::Down),
            Err(SchedulerError::NotFound { .. })
        ));
    }

    #[test]
    fn test_set_weight_zero_leaves_record_unchanged() {
        let registry = registry();
        let backend = registry.register("i-1", "txt2img", 4, BackendState::Active).unwrap();

        assert_eq!(
            registry.set_weight("txt2img", &backend.id, 0),
            Err(SchedulerError::InvalidWeight(0))
        );
        assert_eq!(registry.get("txt2img", &backend.id).unwrap(), backend);

        let updated = registry.set_weight("txt2img", &backend.id, 9).unwrap();
        assert_eq!(updated.weight, 9);
    }

    #[test]
    fn test_set_weight_storage_failure_leaves_record_unchanged() {
        let (registry, store) = failing_registry();
        let backend = register(&registry, "i-1", "txt2img");
        store.set_failing(true);

        assert!(matches!(
            registry.set_weight("txt2img", &backend.id, 5),
            Err(SchedulerError::StorageFailure(_))
        ));
        assert_eq!(registry.get("txt2img", &backend.id).unwrap().weight, 1);
    }

    #[test]
    fn test_reassign_app_moves_listing() {
        let registry = registry();
        let backend = register(&registry, "i-1", "txt2img");

        let moved = registry.reassign_app("txt2img", &backend.id, "img2img").unwrap();

        assert_eq!(moved.id, backend.id);
        assert_eq!(moved.app_id, "img2img");
        assert!(registry.list_for_app("txt2img").is_empty());
        assert_eq!(registry.list_for_app("img2img"), vec![moved]);
        assert!(registry.get("txt2img", &backend.id).is_err());
    }

    #[test]
    fn test_reassign_app_wrong_current_app() {
        let registry = registry();
        let backend = register(&registry, "i-1", "txt2img");

        assert!(matches!(
            registry.reassign_app("upscale", &backend.id, "img2img"),
            Err(SchedulerError::NotFound { .. })
        ));
        assert_eq!(
            registry.reassign_app("txt2img", &backend.id, ""),
            Err(SchedulerError::InvalidAppId)
        );
        assert_eq!(registry.list_for_app("txt2img").len(), 1);
    }

    #[test]
    fn test_reassign_app_never_listed_twice_or_missing() {
        let registry = registry();
        let backend = register(&registry, "i-1", "a");

        std::thread::scope(|s| {
            s.spawn(|| {
                for i in 0..200 {
                    let (from, to) = if i % 2 == 0 { ("a", "b") } else { ("b", "a") };
                    registry.reassign_app(from, &backend.id, to).unwrap();
                }
            });

            for _ in 0..200 {
                let in_a = registry.list_for_app("a").iter().any(|b| b.id == backend.id);
                let in_b = registry.list_for_app("b").iter().any(|b| b.id == backend.id);
                assert!(in_a != in_b, "listed under a={} b={}", in_a, in_b);
            }
        });
    }

    #[test]
    fn test_concurrent_set_weight_store_matches_memory() {
        let store = Arc::new(MemoryStore::new());
        let registry = BackendRegistry::new(store.clone());
        let backend = register(&registry, "i-1", "txt2img");

        std::thread::scope(|s| {
            for t in 0..8_i64 {
                let registry = &registry;
                let id = backend.id.clone();
                s.spawn(move || {
                    for i in 0..200_i64 {
                        registry.set_weight("txt2img", &id, t * 1000 + i + 1).unwrap();
                    }
                });
            }
        });

        let stored = store.load_backends().unwrap();
        assert_eq!(stored, vec![registry.get("txt2img", &backend.id).unwrap()]);
    }

    // ===== Load Tests =====

    #[test]
    fn test_load_rebuilds_indexes() {
        let store: Arc<dyn SchedulerStore> = Arc::new(MemoryStore::new());
        let original = BackendRegistry::new(store.clone());
        let a = register(&original, "i-1", "txt2img");
        let b = register(&original, "i-2", "img2img");

        let reloaded = BackendRegistry::load(store).unwrap();

        let ids: HashSet<String> = reloaded.list_all().into_iter().map(|b| b.id).collect();
        assert_eq!(ids, HashSet::from([a.id, b.id]));
        assert!(matches!(
            reloaded.register("i-1", "other", 1, BackendState::Active),
            Err(SchedulerError::DuplicateInstance(_))
        ));
    }
}
