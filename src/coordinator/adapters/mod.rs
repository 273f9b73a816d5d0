//! Publisher adapters.

pub mod memory;
