//! Scheduler Service - Main application use case
//!
//! Façade consumed by the networking layer. Wires the registry, the
//! policy store and the selection engine over one SchedulerStore and
//! answers every operation with an [`ApiResponse`] envelope.

use crate::application::policy_store::PolicyStore;
use crate::application::registry::BackendRegistry;
use crate::application::response::ApiResponse;
use crate::application::selection_engine::SelectionEngine;
use crate::domain::entities::{Backend, PolicyConfig, PolicyDescriptor};
use crate::domain::error::{validate_limit, SchedulerError, SchedulerResult};
use crate::domain::ports::SchedulerStore;
use crate::domain::value_objects::{BackendState, PolicyType};
use serde::Deserialize;
use std::sync::Arc;

/// Registration request from the networking layer.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub instance_id: String,
    pub app_id: String,
    #[serde(default = "default_weight")]
    pub weight: i64,
    /// Wire name of the initial state; `active` when omitted
    #[serde(default)]
    pub state: Option<String>,
}

fn default_weight() -> i64 {
    1
}

impl RegisterRequest {
    pub fn new(instance_id: impl Into<String>, app_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            app_id: app_id.into(),
            weight: default_weight(),
            state: None,
        }
    }

    pub fn weight(mut self, weight: i64) -> Self {
        self.weight = weight;
        self
    }

    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }
}

/// Scheduler service - long-lived, constructed once at start-up.
pub struct SchedulerService {
    store: Arc<dyn SchedulerStore>,
    registry: Arc<BackendRegistry>,
    policies: Arc<PolicyStore>,
    engine: SelectionEngine,
}

impl SchedulerService {
    /// Load registry and policy state from `store` and build the engine.
    ///
    /// `rng_seed` fixes the weighted/random sampling sequence.
    pub fn new(
        store: Arc<dyn SchedulerStore>,
        default_limit: usize,
        rng_seed: Option<u64>,
    ) -> SchedulerResult<Self> {
        let registry = Arc::new(BackendRegistry::load(store.clone())?);
        let policies = Arc::new(PolicyStore::load(store.clone(), default_limit)?);
        let engine = match rng_seed {
            Some(seed) => SelectionEngine::with_seed(registry.clone(), policies.clone(), seed),
            None => SelectionEngine::new(registry.clone(), policies.clone()),
        };

        Ok(Self {
            store,
            registry,
            policies,
            engine,
        })
    }

    pub fn registry(&self) -> &Arc<BackendRegistry> {
        &self.registry
    }

    pub fn policies(&self) -> &Arc<PolicyStore> {
        &self.policies
    }

    // ===== Backend Management =====

    pub fn register_backend(&self, req: RegisterRequest) -> ApiResponse<Backend> {
        let result = req
            .state
            .as_deref()
            .map_or(Ok(BackendState::default()), str::parse)
            .and_then(|state| self.registry.register(&req.instance_id, &req.app_id, req.weight, state));

        ApiResponse::from_result(result, "Backend added successfully")
    }

    pub fn get_backend(&self, app_id: &str, backend_id: &str) -> ApiResponse<Backend> {
        ApiResponse::from_result(self.registry.get(app_id, backend_id), "success")
    }

    pub fn list_all_backends(&self) -> ApiResponse<Vec<Backend>> {
        ApiResponse::success(self.registry.list_all(), "success")
    }

    /// Every backend bound to `app_id`, any state, no policy filtering.
    pub fn list_app_backends(&self, app_id: &str) -> ApiResponse<Vec<Backend>> {
        ApiResponse::success(self.registry.list_for_app(app_id), "success")
    }

    pub fn delete_backend(&self, app_id: &str, backend_id: &str) -> ApiResponse<()> {
        match self.registry.delete(app_id, backend_id) {
            Ok(_) => ApiResponse::done("Backend removed successfully"),
            Err(e) => ApiResponse::error(e.to_string()),
        }
    }

    pub fn set_backend_state(&self, app_id: &str, backend_id: &str, state: &str) -> ApiResponse<Backend> {
        let result = state
            .parse::<BackendState>()
            .and_then(|state| self.registry.set_state(app_id, backend_id, state));

        ApiResponse::from_result(result, format!("Backend state updated to {}", state))
    }

    pub fn set_backend_weight(&self, app_id: &str, backend_id: &str, weight: i64) -> ApiResponse<Backend> {
        ApiResponse::from_result(
            self.registry.set_weight(app_id, backend_id, weight),
            format!("Backend weight updated to {}", weight),
        )
    }

    pub fn reassign_backend_app(
        &self,
        app_id: &str,
        backend_id: &str,
        new_app_id: &str,
    ) -> ApiResponse<Backend> {
        ApiResponse::from_result(
            self.registry.reassign_app(app_id, backend_id, new_app_id),
            format!("Backend app_id updated to {}", new_app_id),
        )
    }

    // ===== Selection =====

    /// Backends chosen for `app_id` by its configured policy.
    ///
    /// An empty selection is a success with an empty list.
    pub fn select_backends(&self, app_id: &str) -> ApiResponse<Vec<Backend>> {
        Self::selection_response(app_id, self.engine.select(app_id))
    }

    /// Backends chosen for `app_id` by a one-off policy override.
    pub fn select_backends_with(
        &self,
        app_id: &str,
        policy_type: &str,
        limit: i64,
    ) -> ApiResponse<Vec<Backend>> {
        let override_policy = Self::parse_policy(app_id, policy_type, limit);
        match override_policy {
            Ok(policy) => Self::selection_response(app_id, self.engine.select_with(app_id, &policy)),
            Err(e) => ApiResponse::error(e.to_string()),
        }
    }

    fn selection_response(app_id: &str, picked: Vec<Backend>) -> ApiResponse<Vec<Backend>> {
        let msg = if picked.is_empty() {
            format!("No active backend available for app_id={}", app_id)
        } else {
            "Successfully retrieved backends".to_string()
        };
        ApiResponse::success(picked, msg)
    }

    fn parse_policy(app_id: &str, policy_type: &str, limit: i64) -> SchedulerResult<PolicyConfig> {
        let policy_type = policy_type.parse::<PolicyType>()?;
        let limit = validate_limit(limit)?;
        Ok(PolicyConfig::new(app_id, policy_type, limit))
    }

    // ===== Policy Management =====

    /// Stored policy for `app_id`; unconfigured apps get the default and say so.
    pub fn get_policy(&self, app_id: &str) -> ApiResponse<PolicyConfig> {
        let msg = if self.policies.is_configured(app_id) {
            "success".to_string()
        } else {
            format!("No policy configured for app_id={}, using default", app_id)
        };
        ApiResponse::success(self.policies.get_policy(app_id), msg)
    }

    pub fn set_policy(&self, app_id: &str, policy_type: &str, limit: i64) -> ApiResponse<PolicyConfig> {
        let result = policy_type
            .parse::<PolicyType>()
            .and_then(|policy_type| self.policies.set_policy(app_id, policy_type, limit));

        let msg = match &result {
            Ok(config) => format!(
                "{}'s policy now is {}, limit: {}",
                app_id, config.policy_type, config.limit
            ),
            Err(_) => String::new(),
        };
        ApiResponse::from_result(result, msg)
    }

    pub fn list_supported_policies(&self) -> ApiResponse<Vec<PolicyDescriptor>> {
        ApiResponse::success(PolicyStore::list_supported_policies(), "success")
    }

    // ===== Lifecycle =====

    /// Flush the store; called once on process teardown.
    pub fn shutdown(&self) -> SchedulerResult<()> {
        self.store.flush().map_err(SchedulerError::storage)?;
        tracing::info!(
            "scheduler shut down, backends={}",
            self.registry.len()
        );
        Ok(())
    }
}
