//! Domain Entities - Core business objects
//!
//! These entities represent the core concepts of the scheduler domain.
//! They have no external dependencies beyond serialization.

use crate::domain::value_objects::{BackendState, PolicyType};
use serde::{Deserialize, Serialize};

/// A registered compute instance serving exactly one app.
///
/// `id` is generated at registration and never changes. `instance_id`
/// is the caller's handle for the underlying instance and is unique
/// across the whole registry, not just within an app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backend {
    /// Generated unique identifier (UUID v4)
    pub id: String,
    /// External handle of the compute instance
    pub instance_id: String,
    /// Application type this backend currently serves
    pub app_id: String,
    /// Relative weight for the weighted policy (always >= 1)
    pub weight: u32,
    /// Selection eligibility
    pub state: BackendState,
}

impl Backend {
    /// Create a backend with a freshly generated id.
    pub fn new(instance_id: String, app_id: String, weight: u32, state: BackendState) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            instance_id,
            app_id,
            weight,
            state,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }
}

/// Selection strategy configured for one app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub app_id: String,
    pub policy_type: PolicyType,
    /// Upper bound on backends returned by a single selection
    pub limit: usize,
}

impl PolicyConfig {
    pub fn new(app_id: impl Into<String>, policy_type: PolicyType, limit: usize) -> Self {
        Self {
            app_id: app_id.into(),
            policy_type,
            limit,
        }
    }
}

/// Entry returned when listing supported policies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyDescriptor {
    pub policy_type: PolicyType,
    pub description: &'static str,
}
