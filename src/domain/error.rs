//! Scheduler errors.

use thiserror::Error;

/// Result type alias for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Errors returned by registry, policy and selection operations.
///
/// Validation variants are raised before any state is touched;
/// `StorageFailure` leaves in-memory state at its pre-call value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("backend with instance_id {0} already exists")]
    DuplicateInstance(String),

    #[error("backend {backend_id} not found for app_id={app_id}")]
    NotFound { app_id: String, backend_id: String },

    #[error("state must be either 'active' or 'down', got '{0}'")]
    InvalidState(String),

    #[error("weight must be between 1 and 4294967295, got {0}")]
    InvalidWeight(i64),

    #[error("unsupported policy type '{0}'")]
    InvalidPolicy(String),

    #[error("limit must be between 1 and 4294967295, got {0}")]
    InvalidLimit(i64),

    #[error("app_id and instance_id cannot be empty")]
    InvalidAppId,

    #[error("storage failure: {0}")]
    StorageFailure(String),
}

impl SchedulerError {
    pub(crate) fn not_found(app_id: &str, backend_id: &str) -> Self {
        Self::NotFound {
            app_id: app_id.to_string(),
            backend_id: backend_id.to_string(),
        }
    }

    /// Wrap an adapter error.
    pub(crate) fn storage(err: anyhow::Error) -> Self {
        Self::StorageFailure(format!("{:#}", err))
    }
}

/// Reject weights below 1 or above `u32::MAX`.
pub fn validate_weight(weight: i64) -> SchedulerResult<u32> {
    if weight < 1 || weight > u32::MAX as i64 {
        return Err(SchedulerError::InvalidWeight(weight));
    }
    Ok(weight as u32)
}

/// Reject limits below 1 or above `u32::MAX`.
pub fn validate_limit(limit: i64) -> SchedulerResult<usize> {
    if limit < 1 || limit > u32::MAX as i64 {
        return Err(SchedulerError::InvalidLimit(limit));
    }
    Ok(limit as usize)
}

/// Reject empty identifiers.
pub fn validate_id(value: &str) -> SchedulerResult<()> {
    if value.trim().is_empty() {
        return Err(SchedulerError::InvalidAppId);
    }
    Ok(())
}
