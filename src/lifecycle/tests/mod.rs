//! Unit tests for the lifecycle module.
//!
//! State machine tests exercise the aggregates directly; engine tests run
//! messages through [`crate::lifecycle::services::LifecycleEngine`] backed
//! by the in-memory repository.

mod fixtures;
mod pull_request_tests;
