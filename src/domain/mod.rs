//! Domain Layer
//!
//! Entities, value objects, errors, ports and pure selection logic.

pub mod entities;
pub mod error;
pub mod ports;
pub mod services;
pub mod value_objects;

pub use entities::{Backend, PolicyConfig, PolicyDescriptor};
pub use error::{SchedulerError, SchedulerResult};
pub use value_objects::{BackendState, PolicyType};
