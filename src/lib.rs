//! backend-scheduler Library
//!
//! Backend registry, per-app selection policies and policy-driven backend
//! selection for GPU inference instances, persisted through a pluggable
//! store.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types
pub use adapters::outbound::{MemoryStore, SqliteStore};
pub use application::{
    ApiResponse, BackendRegistry, PolicyStore, RegisterRequest, SchedulerService, SelectionEngine,
};
pub use config::{load_config, Config};
pub use domain::entities::{Backend, PolicyConfig, PolicyDescriptor};
pub use domain::error::{SchedulerError, SchedulerResult};
pub use domain::ports::SchedulerStore;
pub use domain::services::Selector;
pub use domain::value_objects::{BackendState, PolicyType};
