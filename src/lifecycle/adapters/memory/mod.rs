//! In-memory lifecycle adapters.

mod repository;

pub use repository::InMemoryLifecycleRepository;
