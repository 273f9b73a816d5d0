//! Step definitions for lifecycle coordination scenarios.

mod given;
mod then;
mod when;
pub mod world;
