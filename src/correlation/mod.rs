//! Correlation propagation across a causal chain.
//!
//! Every message and event derived from the same root carries one
//! correlation identity. [`ensure`] keeps a supplied identity or mints a
//! new root; [`span`] attaches it to the tracing context; [`CorrelationTrail`]
//! keeps the events of recent chains for debugging.

mod trail;

pub use trail::{CorrelationTrail, TrailEntry};

use crate::envelope::CorrelationId;
use tracing::Span;

/// Returns `supplied` unchanged, or a freshly minted identity when absent.
#[must_use]
pub fn ensure(supplied: Option<CorrelationId>) -> CorrelationId {
    supplied.unwrap_or_else(CorrelationId::mint)
}

/// Creates a span recording the correlation identity of the work it wraps.
#[must_use]
pub fn span(correlation_id: &CorrelationId) -> Span {
    tracing::info_span!("correlation", correlation_id = %correlation_id)
}
