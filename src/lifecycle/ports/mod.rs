//! Port contracts for lifecycle persistence.

pub mod repository;

pub use repository::{
    LifecycleChanges, LifecycleRepository, LifecycleRepositoryError, LifecycleRepositoryResult,
    OutboxEntry,
};
