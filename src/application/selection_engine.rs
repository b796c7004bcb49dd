//! Selection Engine
//!
//! Answers "which backend(s) should serve app X right now": resolves the
//! app's policy, reads the active set from the registry and runs the
//! matching algorithm.

use crate::application::policy_store::PolicyStore;
use crate::application::registry::BackendRegistry;
use crate::domain::entities::{Backend, PolicyConfig};
use crate::domain::services::Selector;
use crate::domain::value_objects::PolicyType;
use dashmap::DashMap;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

/// Policy-driven backend selection.
///
/// Owns the only engine-local mutable state: one round-robin cursor per
/// app, held in a `DashMap` and advanced while its entry is locked, so
/// concurrent selections for the same app never observe the same
/// pre-advance cursor. Cursors are not persisted and start at 0.
pub struct SelectionEngine {
    registry: Arc<BackendRegistry>,
    policies: Arc<PolicyStore>,
    cursors: DashMap<String, usize>,
    rng: Mutex<StdRng>,
}

impl SelectionEngine {
    /// Create an engine with an entropy-seeded random source.
    pub fn new(registry: Arc<BackendRegistry>, policies: Arc<PolicyStore>) -> Self {
        Self::with_rng(registry, policies, StdRng::from_entropy())
    }

    /// Create an engine whose weighted/random draws replay from `seed`.
    pub fn with_seed(registry: Arc<BackendRegistry>, policies: Arc<PolicyStore>, seed: u64) -> Self {
        Self::with_rng(registry, policies, StdRng::seed_from_u64(seed))
    }

    fn with_rng(registry: Arc<BackendRegistry>, policies: Arc<PolicyStore>, rng: StdRng) -> Self {
        Self {
            registry,
            policies,
            cursors: DashMap::new(),
            rng: Mutex::new(rng),
        }
    }

    /// Select backends for `app_id` under its configured policy.
    ///
    /// An empty result means no active backend is available; callers
    /// treat it as retryable rather than as an error.
    pub fn select(&self, app_id: &str) -> Vec<Backend> {
        let policy = self.policies.get_policy(app_id);
        self.select_with(app_id, &policy)
    }

    /// Select backends for `app_id` under an explicit policy.
    ///
    /// Round-robin shares the app's cursor with [`SelectionEngine::select`].
    pub fn select_with(&self, app_id: &str, policy: &PolicyConfig) -> Vec<Backend> {
        let picked = match policy.policy_type {
            PolicyType::RoundRobin => {
                let mut cursor = self.cursors.entry(app_id.to_string()).or_insert(0);
                let candidates = self.registry.list_active_for_app(app_id);
                let (picked, next) = Selector::round_robin(&candidates, *cursor, policy.limit);
                *cursor = next;
                picked
            }
            other => {
                let candidates = self.registry.list_active_for_app(app_id);
                if candidates.is_empty() {
                    Vec::new()
                } else {
                    let mut rng = self.rng.lock();
                    let (picked, _) = Selector::select(other, &candidates, policy.limit, 0, &mut *rng);
                    picked
                }
            }
        };

        if picked.is_empty() {
            tracing::debug!("no active backend for app_id={}", app_id);
        } else {
            tracing::debug!(
                "selected {} backend(s) for app_id={} policy={} limit={}",
                picked.len(),
                app_id,
                policy.policy_type,
                policy.limit
            );
        }
        picked
    }

    /// Current round-robin cursor for `app_id` (0 if never used).
    #[cfg(test)]
    fn cursor(&self, app_id: &str) -> usize {
        self.cursors.get(app_id).map(|c| *c.value()).unwrap_or(0)
    }
}
