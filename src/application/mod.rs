//! Application Layer
//!
//! Long-lived scheduler services built once at start-up and shared by
//! reference with every caller.

mod policy_store;
mod registry;
mod response;
mod scheduler_service;
mod selection_engine;

pub use policy_store::PolicyStore;
pub use registry::BackendRegistry;
pub use response::{ApiResponse, CODE_FAILURE, CODE_SUCCESS};
pub use scheduler_service::{RegisterRequest, SchedulerService};
pub use selection_engine::SelectionEngine;
