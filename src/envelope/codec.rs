//! JSON codec with boundary validation.
//!
//! Decoding checks the envelope field by field before the body is touched,
//! so each malformed document maps to a precise [`EnvelopeError`]. Bodies
//! are then decoded by their declared type; unsupported vocabulary values
//! and cross-field inconsistencies are rejected here rather than inside a
//! lifecycle.

use super::{CorrelationId, EnvelopeError, MessageId, SourceName};
use crate::contract::{LifecycleEvent, Message, MessageKind};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Decodes and validates a message document.
///
/// # Errors
///
/// Returns an [`EnvelopeError`] describing the first defect found.
pub fn decode_message(bytes: &[u8]) -> Result<Message, EnvelopeError> {
    let document = parse_document(bytes)?;
    decode_message_value(&document)
}

/// Decodes and validates an already parsed message document.
///
/// # Errors
///
/// Returns an [`EnvelopeError`] describing the first defect found.
pub fn decode_message_value(document: &Value) -> Result<Message, EnvelopeError> {
    let root = as_object(document, "message")?;
    let envelope = as_object(required(root, "envelope")?, "envelope")?;
    check_message_envelope(envelope)?;

    let body = as_object(required(root, "body")?, "body")?;
    let tag = required(body, "type")?
        .as_str()
        .ok_or_else(|| EnvelopeError::UnknownMessageType(body_type_text(body)))?;
    let kind = MessageKind::from_tag(tag)
        .ok_or_else(|| EnvelopeError::UnknownMessageType(tag.to_owned()))?;
    required(body, "payload")?;

    let message: Message =
        serde_json::from_value(document.clone()).map_err(|err| EnvelopeError::MalformedPayload {
            kind: kind.as_str().to_owned(),
            reason: err.to_string(),
        })?;
    validate_message(&message)?;
    Ok(message)
}

/// Checks the cross-field rules of a message body.
///
/// Decoding runs this check already; callers handing in typed messages
/// use it to apply the same boundary.
///
/// # Errors
///
/// Returns [`EnvelopeError::InconsistentPayload`] naming the violated rule.
pub fn validate_message(message: &Message) -> Result<(), EnvelopeError> {
    let body = message.body();
    body.validate()
        .map_err(|err| EnvelopeError::InconsistentPayload {
            kind: body.kind().as_str(),
            reason: err.to_string(),
        })
}

/// Encodes a message as JSON.
///
/// # Errors
///
/// Returns [`EnvelopeError::Unencodable`] when serialization fails.
pub fn encode_message(message: &Message) -> Result<Vec<u8>, EnvelopeError> {
    serde_json::to_vec(message).map_err(|err| EnvelopeError::Unencodable(err.to_string()))
}

/// Decodes and validates an event document.
///
/// # Errors
///
/// Returns an [`EnvelopeError`] describing the first defect found.
pub fn decode_event(bytes: &[u8]) -> Result<LifecycleEvent, EnvelopeError> {
    let document = parse_document(bytes)?;
    let root = as_object(&document, "event")?;
    let envelope = as_object(required(root, "envelope")?, "envelope")?;
    let event_id = required(envelope, "event_id")?;
    if event_id
        .as_str()
        .and_then(|raw| uuid::Uuid::parse_str(raw).ok())
        .is_none()
    {
        return Err(EnvelopeError::Undecodable(format!(
            "event_id {event_id} is not a UUID"
        )));
    }
    check_timestamp(envelope)?;
    check_correlation(envelope)?;
    check_source(envelope)?;

    let payload = as_object(required(root, "payload")?, "payload")?;
    let entity = required(payload, "entity")?
        .as_str()
        .unwrap_or_default()
        .to_owned();
    serde_json::from_value(document.clone()).map_err(|err| EnvelopeError::MalformedPayload {
        kind: entity,
        reason: err.to_string(),
    })
}

/// Encodes an event as JSON.
///
/// # Errors
///
/// Returns [`EnvelopeError::Unencodable`] when serialization fails.
pub fn encode_event(event: &LifecycleEvent) -> Result<Vec<u8>, EnvelopeError> {
    serde_json::to_vec(event).map_err(|err| EnvelopeError::Unencodable(err.to_string()))
}

fn parse_document(bytes: &[u8]) -> Result<Value, EnvelopeError> {
    serde_json::from_slice(bytes).map_err(|err| EnvelopeError::Undecodable(err.to_string()))
}

fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>, EnvelopeError> {
    value
        .as_object()
        .ok_or_else(|| EnvelopeError::Undecodable(format!("{what} must be a JSON object")))
}

fn required<'a>(
    object: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a Value, EnvelopeError> {
    match object.get(field) {
        None | Some(Value::Null) => Err(EnvelopeError::MissingField(field)),
        Some(value) => Ok(value),
    }
}

fn body_type_text(body: &Map<String, Value>) -> String {
    body.get("type").map(Value::to_string).unwrap_or_default()
}

fn check_message_envelope(envelope: &Map<String, Value>) -> Result<(), EnvelopeError> {
    let message_id = required(envelope, "message_id")?;
    let raw = message_id
        .as_str()
        .ok_or_else(|| EnvelopeError::InvalidMessageId(message_id.to_string()))?;
    MessageId::new(raw)?;
    check_correlation(envelope)?;
    check_timestamp(envelope)?;
    check_source(envelope)
}

fn check_correlation(envelope: &Map<String, Value>) -> Result<(), EnvelopeError> {
    match envelope.get("correlation_id") {
        None | Some(Value::Null) => Ok(()),
        Some(Value::String(raw)) => CorrelationId::new(raw.as_str()).map(|_| ()),
        Some(other) => Err(EnvelopeError::InvalidCorrelationId(other.to_string())),
    }
}

fn check_timestamp(envelope: &Map<String, Value>) -> Result<(), EnvelopeError> {
    let timestamp = required(envelope, "timestamp")?;
    let raw = timestamp
        .as_str()
        .ok_or_else(|| EnvelopeError::InvalidTimestamp(timestamp.to_string()))?;
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map(|_| ())
        .map_err(|_| EnvelopeError::InvalidTimestamp(raw.to_owned()))
}

fn check_source(envelope: &Map<String, Value>) -> Result<(), EnvelopeError> {
    let source = required(envelope, "source")?;
    let raw = source
        .as_str()
        .ok_or_else(|| EnvelopeError::InvalidSource(source.to_string()))?;
    SourceName::new(raw).map(|_| ())
}
