//! Coordinator tests.

mod fixtures;
