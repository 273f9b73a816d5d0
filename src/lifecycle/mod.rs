//! Entity lifecycle engine.
//!
//! Owns the five pipeline state machines and applies decoded messages to
//! them. The module follows the hexagonal layout used across the crate:
//!
//! - Aggregates and state machines in [`domain`]
//! - Persistence contract in [`ports`]
//! - In-memory persistence in [`adapters`]
//! - Message application in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
