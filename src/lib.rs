//! Foreman: lifecycle coordinator for an autonomous code-change pipeline.
//!
//! Foreman consumes the messages exchanged by pipeline workers, drives the
//! lifecycles of work items, task executions, pull requests, code reviews
//! and detected issues, and publishes the resulting events and follow-up
//! messages to their queues and topics.
//!
//! # Architecture
//!
//! Stateful modules follow hexagonal architecture principles:
//!
//! - **Domain**: Aggregates and state machines with no infrastructure
//! - **Ports**: Trait interfaces for persistence and publishing
//! - **Adapters**: In-memory and `PostgreSQL` implementations of the ports
//!
//! # Modules
//!
//! - [`envelope`]: Envelope value types and the JSON wire codec
//! - [`contract`]: The closed sets of messages and events
//! - [`lifecycle`]: Entity state machines and the lifecycle engine
//! - [`ledger`]: Idempotency ledger for at-least-once delivery
//! - [`correlation`]: Correlation identity propagation and chain trails
//! - [`retry`]: Retry policy, backoff and exhaustion decisions
//! - [`routing`]: Queue and topic resolution for outbound items
//! - [`coordinator`]: The end-to-end message handling pipeline
//! - [`config`]: Environment-driven configuration
//! - [`telemetry`]: Structured logging initialisation

pub mod config;
pub mod contract;
pub mod coordinator;
pub mod correlation;
pub mod envelope;
pub mod ledger;
pub mod lifecycle;
pub mod retry;
pub mod routing;
pub mod telemetry;
