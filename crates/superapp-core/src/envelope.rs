// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The `{ type, data? }` envelope shared by every transport.
//
// Wire form:
//   { "type": "<string>", "data": { ... } | null | omitted }
//
// `data` keeps the distinction between an explicit `null` and an omitted
// field, so both survive a round trip.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{DecodeError, Result};

/// One immutable bridge message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    message_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl Envelope {
    /// Build an envelope. The type tag must be non-empty.
    pub fn new(
        message_type: impl Into<String>,
        data: Option<Value>,
    ) -> std::result::Result<Self, DecodeError> {
        let message_type = message_type.into();
        if message_type.is_empty() {
            return Err(DecodeError::MissingType);
        }
        Ok(Self { message_type, data })
    }

    /// Build an envelope from any serializable payload.
    ///
    /// Fails with `BridgeError::Serialization` when the payload cannot be
    /// represented as JSON (e.g. a map with non-string keys).
    pub fn with_payload<T: Serialize + ?Sized>(message_type: &str, payload: &T) -> Result<Self> {
        let data = serde_json::to_value(payload)?;
        Ok(Self::new(message_type, Some(data))?)
    }

    /// Validate an already-deserialized value (an iOS message body, a
    /// structured-clone `postMessage` payload) against the envelope shape.
    pub fn from_value(value: Value) -> std::result::Result<Self, DecodeError> {
        let Value::Object(mut fields) = value else {
            return Err(DecodeError::NotAnObject);
        };
        let message_type = match fields.remove("type") {
            Some(Value::String(tag)) if !tag.is_empty() => tag,
            Some(Value::String(_)) | None => return Err(DecodeError::MissingType),
            Some(_) => return Err(DecodeError::TypeNotString),
        };
        Ok(Self {
            message_type,
            data: fields.remove("data"),
        })
    }

    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Consume the envelope, yielding its parts.
    pub fn into_parts(self) -> (String, Option<Value>) {
        (self.message_type, self.data)
    }

    /// The envelope as a JSON object value.
    pub fn to_value(&self) -> Value {
        let mut fields = Map::new();
        fields.insert("type".into(), Value::String(self.message_type.clone()));
        if let Some(data) = &self.data {
            fields.insert("data".into(), data.clone());
        }
        Value::Object(fields)
    }

    /// Canonical JSON text for the wire.
    pub fn to_wire(&self) -> String {
        // An envelope only ever holds a `String` and a `Value`, neither of
        // which can fail to serialize.
        self.to_value().to_string()
    }
}

impl std::fmt::Display for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message_type)
    }
}

/// Encode a type tag and optional data into a wire string.
pub fn encode(message_type: &str, data: Option<Value>) -> Result<String> {
    Ok(Envelope::new(message_type, data)?.to_wire())
}

/// Decode a wire string. Never panics; malformed input yields a typed error
/// so callers can log and drop.
pub fn decode(wire: &str) -> std::result::Result<Envelope, DecodeError> {
    let value: Value =
        serde_json::from_str(wire).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;
    Envelope::from_value(value)
}

/// Size in bytes an envelope occupies on the wire.
pub fn payload_size(envelope: &Envelope) -> usize {
    envelope.to_wire().len()
}
