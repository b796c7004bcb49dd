//! Policy Store
//!
//! Per-app selection policy configuration, written through the
//! SchedulerStore before the in-memory map changes.

use crate::domain::entities::{PolicyConfig, PolicyDescriptor};
use crate::domain::error::{validate_id, validate_limit, SchedulerError, SchedulerResult};
use crate::domain::ports::SchedulerStore;
use crate::domain::value_objects::PolicyType;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// Policy configuration keyed by `app_id`.
///
/// Apps without a stored configuration resolve to `all_active` with the
/// deployment's default limit. Configurations are only ever overwritten,
/// never removed.
pub struct PolicyStore {
    store: Arc<dyn SchedulerStore>,
    policies: DashMap<String, PolicyConfig>,
    default_limit: usize,
}

impl PolicyStore {
    /// Create an empty policy store.
    ///
    /// `default_limit` bounds selection for apps with no configuration
    /// and is clamped to at least 1.
    pub fn new(store: Arc<dyn SchedulerStore>, default_limit: usize) -> Self {
        Self {
            store,
            policies: DashMap::new(),
            default_limit: default_limit.max(1),
        }
    }

    /// Rebuild the policy store from everything `store` holds.
    pub fn load(store: Arc<dyn SchedulerStore>, default_limit: usize) -> SchedulerResult<Self> {
        let stored = store.load_policies().map_err(SchedulerError::storage)?;
        let policies = Self::new(store, default_limit);

        for policy in stored {
            policies.policies.insert(policy.app_id.clone(), policy);
        }

        tracing::info!("policy store loaded, policies={}", policies.policies.len());
        Ok(policies)
    }

    /// Limit applied to apps with no stored configuration.
    pub fn default_limit(&self) -> usize {
        self.default_limit
    }

    /// Configured policy for `app_id`, or the `all_active` default.
    pub fn get_policy(&self, app_id: &str) -> PolicyConfig {
        self.policies
            .get(app_id)
            .map(|p| p.value().clone())
            .unwrap_or_else(|| PolicyConfig::new(app_id, PolicyType::default(), self.default_limit))
    }

    /// Number of apps with a stored configuration.
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Whether `app_id` has an explicitly stored configuration.
    pub fn is_configured(&self, app_id: &str) -> bool {
        self.policies.contains_key(app_id)
    }

    /// Overwrite the policy for `app_id`.
    ///
    /// The app's entry is held while persisting, so concurrent writers for
    /// the same app serialize and the last one to commit wins in both
    /// memory and storage.
    pub fn set_policy(
        &self,
        app_id: &str,
        policy_type: PolicyType,
        limit: i64,
    ) -> SchedulerResult<PolicyConfig> {
        validate_id(app_id)?;
        let limit = validate_limit(limit)?;
        let config = PolicyConfig::new(app_id, policy_type, limit);

        let persist = |config: &PolicyConfig| {
            self.store.upsert_policy(config).map_err(|e| {
                tracing::warn!("failed to persist policy for app_id={}: {:#}", app_id, e);
                SchedulerError::storage(e)
            })
        };

        match self.policies.entry(app_id.to_string()) {
            Entry::Occupied(mut entry) => {
                persist(&config)?;
                entry.insert(config.clone());
            }
            Entry::Vacant(entry) => {
                persist(&config)?;
                entry.insert(config.clone());
            }
        }

        tracing::info!(
            "policy for app_id={} set to {} limit={}",
            app_id,
            config.policy_type,
            config.limit
        );
        Ok(config)
    }

    /// Every supported policy with its description.
    pub fn list_supported_policies() -> Vec<PolicyDescriptor> {
        PolicyType::ALL
            .iter()
            .map(|policy_type| PolicyDescriptor {
                policy_type: *policy_type,
                description: policy_type.description(),
            })
            .collect()
    }
}
