mod scheduler_store;

pub use scheduler_store::SchedulerStore;
