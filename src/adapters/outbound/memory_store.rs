//! In-Memory Scheduler Store
//!
//! Implements SchedulerStore with plain maps. Nothing survives a restart;
//! used for ephemeral deployments and tests.

use crate::domain::entities::{Backend, PolicyConfig};
use crate::domain::ports::SchedulerStore;
use anyhow::{bail, Result};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Non-durable scheduler store.
///
/// Enforces the same id and instance_id uniqueness as the SQLite schema.
#[derive(Default)]
pub struct MemoryStore {
    backends: RwLock<HashMap<String, Backend>>,
    policies: RwLock<HashMap<String, PolicyConfig>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SchedulerStore for MemoryStore {
    fn load_backends(&self) -> Result<Vec<Backend>> {
        let mut backends: Vec<Backend> = self.backends.read().values().cloned().collect();
        backends.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(backends)
    }

    fn load_policies(&self) -> Result<Vec<PolicyConfig>> {
        let mut policies: Vec<PolicyConfig> = self.policies.read().values().cloned().collect();
        policies.sort_by(|a, b| a.app_id.cmp(&b.app_id));
        Ok(policies)
    }

    fn insert_backend(&self, backend: &Backend) -> Result<()> {
        let mut backends = self.backends.write();
        if backends.contains_key(&backend.id) {
            bail!("backend {} already stored", backend.id);
        }
        if backends.values().any(|b| b.instance_id == backend.instance_id) {
            bail!("instance_id {} already stored", backend.instance_id);
        }
        backends.insert(backend.id.clone(), backend.clone());
        Ok(())
    }

    fn update_backend(&self, backend: &Backend) -> Result<()> {
        match self.backends.write().get_mut(&backend.id) {
            Some(stored) => {
                *stored = backend.clone();
                Ok(())
            }
            None => bail!("backend {} is not stored", backend.id),
        }
    }

    fn delete_backend(&self, id: &str) -> Result<()> {
        if self.backends.write().remove(id).is_none() {
            bail!("backend {} is not stored", id);
        }
        Ok(())
    }

    fn upsert_policy(&self, policy: &PolicyConfig) -> Result<()> {
        self.policies
            .write()
            .insert(policy.app_id.clone(), policy.clone());
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Store wrapper whose writes can be switched to fail.
#[cfg(test)]
pub(crate) struct FailingStore {
    inner: MemoryStore,
    fail: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl FailingStore {
    pub(crate) fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail: std::sync::atomic::AtomicBool::new(false),
        }
    }

    pub(crate) fn set_failing(&self, fail: bool) {
        self.fail.store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            bail!("disk I/O error");
        }
        Ok(())
    }
}

#[cfg(test)]
impl SchedulerStore for FailingStore {
    fn load_backends(&self) -> Result<Vec<Backend>> {
        self.inner.load_backends()
    }

    fn load_policies(&self) -> Result<Vec<PolicyConfig>> {
        self.inner.load_policies()
    }

    fn insert_backend(&self, backend: &Backend) -> Result<()> {
        self.check()?;
        self.inner.insert_backend(backend)
    }

    fn update_backend(&self, backend: &Backend) -> Result<()> {
        self.check()?;
        self.inner.update_backend(backend)
    }

    fn delete_backend(&self, id: &str) -> Result<()> {
        self.check()?;
        self.inner.delete_backend(id)
    }

    fn upsert_policy(&self, policy: &PolicyConfig) -> Result<()> {
        self.check()?;
        self.inner.upsert_policy(policy)
    }

    fn flush(&self) -> Result<()> {
        self.check()
    }
}
