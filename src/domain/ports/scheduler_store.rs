//! Scheduler Store Port
//!
//! Defines the interface for durably storing backends and policies.
//! Implementations may use SQLite or in-memory storage.

use crate::domain::entities::{Backend, PolicyConfig};
use anyhow::Result;

/// Durable storage for registry and policy state.
///
/// This is an outbound port. Every registry and policy mutation commits
/// through it before the in-memory state changes, so a failed write
/// leaves the scheduler untouched. Calls may block on disk I/O but
/// never on the network.
pub trait SchedulerStore: Send + Sync {
    /// Load every stored backend.
    fn load_backends(&self) -> Result<Vec<Backend>>;

    /// Load every stored policy configuration.
    fn load_policies(&self) -> Result<Vec<PolicyConfig>>;

    /// Insert a new backend row. Fails if `id` or `instance_id` is taken.
    fn insert_backend(&self, backend: &Backend) -> Result<()>;

    /// Overwrite the mutable columns of an existing backend.
    fn update_backend(&self, backend: &Backend) -> Result<()>;

    /// Hard-delete a backend by id.
    fn delete_backend(&self, id: &str) -> Result<()>;

    /// Insert or overwrite the policy for `policy.app_id`.
    fn upsert_policy(&self, policy: &PolicyConfig) -> Result<()>;

    /// Make everything written so far durable. Called on teardown.
    fn flush(&self) -> Result<()>;
}
