//! Envelope codec for pipeline messages and events.
//!
//! Every message and event carries a fixed envelope: identity, optional
//! correlation identity, UTC timestamp and producing source. This module
//! owns those value types and the JSON codec that validates them at the
//! boundary, so malformed documents are rejected before they reach any
//! lifecycle.

pub mod codec;
mod error;
mod fields;
mod ids;

pub use codec::{decode_event, decode_message, encode_event, encode_message, validate_message};
pub use error::EnvelopeError;
pub use fields::{EventEnvelope, MessageEnvelope};
pub use ids::{CorrelationId, EventId, MessageId, SourceName};
