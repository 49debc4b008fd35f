//! JSON wire codec
//!
//! Objects are written with their `kind` and the server's `apiVersion`.
//! Watch events are framed as `{"type": ..., "object": ...}` where `object`
//! is the codec encoding of the event's object.

use crate::object::Object;
use crate::API_VERSION;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::{Map, Value};
use thiserror::Error;
use watch::{Event, EventType};

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON object")]
    NotAnObject,

    #[error("object has no kind")]
    MissingKind,

    #[error("unknown kind {0:?}")]
    UnknownKind(String),

    #[error("expected kind {expected:?}, got {actual:?}")]
    KindMismatch { expected: String, actual: String },

    #[error("unsupported apiVersion {0:?}")]
    UnsupportedVersion(String),
}

/// Converts between [`Object`] values and bytes.
pub trait Codec: Send + Sync {
    fn encode(&self, object: &Object) -> Result<Vec<u8>, CodecError>;

    /// Decodes an object whose kind is given in the payload.
    fn decode(&self, data: &[u8]) -> Result<Object, CodecError>;

    /// Decodes an object that must be of `kind`. A payload without a kind
    /// is taken to be of `kind`.
    fn decode_as(&self, data: &[u8], kind: &str) -> Result<Object, CodecError>;
}

/// The JSON codec used on every endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    fn to_value(object: &Object) -> Result<Value, CodecError> {
        let mut value = serde_json::to_value(object)?;
        if let Value::Object(map) = &mut value {
            map.insert("apiVersion".to_string(), Value::String(API_VERSION.to_string()));
        }
        Ok(value)
    }

    fn from_value(mut map: Map<String, Value>, expected: Option<&str>) -> Result<Object, CodecError> {
        match map.remove("apiVersion") {
            None => {}
            Some(Value::String(version)) if version.is_empty() || version == API_VERSION => {}
            Some(Value::String(version)) => return Err(CodecError::UnsupportedVersion(version)),
            Some(other) => return Err(CodecError::UnsupportedVersion(other.to_string())),
        }

        let kind = match (map.get("kind"), expected) {
            (Some(Value::String(kind)), _) if !kind.is_empty() => kind.clone(),
            (_, Some(expected)) => {
                map.insert("kind".to_string(), Value::String(expected.to_string()));
                expected.to_string()
            }
            (_, None) => return Err(CodecError::MissingKind),
        };

        if !Object::is_known_kind(&kind) {
            return Err(CodecError::UnknownKind(kind));
        }
        if let Some(expected) = expected {
            if kind != expected {
                return Err(CodecError::KindMismatch {
                    expected: expected.to_string(),
                    actual: kind,
                });
            }
        }

        Ok(serde_json::from_value(Value::Object(map))?)
    }
}

impl Codec for JsonCodec {
    fn encode(&self, object: &Object) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(&Self::to_value(object)?)?)
    }

    fn decode(&self, data: &[u8]) -> Result<Object, CodecError> {
        match serde_json::from_slice(data)? {
            Value::Object(map) => Self::from_value(map, None),
            _ => Err(CodecError::NotAnObject),
        }
    }

    fn decode_as(&self, data: &[u8], kind: &str) -> Result<Object, CodecError> {
        match serde_json::from_slice(data)? {
            Value::Object(map) => Self::from_value(map, Some(kind)),
            _ => Err(CodecError::NotAnObject),
        }
    }
}

/// One framed watch event as it appears on the wire.
#[derive(Debug, Serialize, Deserialize)]
pub struct WatchEvent {
    #[serde(rename = "type")]
    pub kind: EventType,
    pub object: Box<RawValue>,
}

/// Frames `event` as a single JSON document.
pub fn encode_watch_event(codec: &dyn Codec, event: &Event<Object>) -> Result<String, CodecError> {
    let encoded = codec.encode(&event.object)?;
    // Codec output is always valid UTF-8 JSON.
    let object = RawValue::from_string(String::from_utf8_lossy(&encoded).into_owned())?;
    Ok(serde_json::to_string(&WatchEvent {
        kind: event.kind,
        object,
    })?)
}

/// Parses a framed watch event and decodes its object.
pub fn decode_watch_event(codec: &dyn Codec, text: &str) -> Result<Event<Object>, CodecError> {
    let frame: WatchEvent = serde_json::from_str(text)?;
    let object = codec.decode(frame.object.get().as_bytes())?;
    Ok(Event::new(frame.kind, object))
}
