//! Core data types shared across the pipeline.
//!
//! A telemetry log is a sequence of [`Frame`]s; the codec turns each frame
//! payload into a [`Message`] whose fields are [`Value`]s. [`FieldKey`]
//! qualifies a field name with its message type and is the key used by the
//! sample-and-hold window.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type name used for undecodable data.
pub const BAD_DATA_TYPE: &str = "BAD_DATA";

/// Reason attached to spans skipped by robust parsing. Messages carrying
/// this reason are always dropped by the filter, never formatted.
pub const BAD_PREFIX_REASON: &str = "Bad prefix";

/// A scalar (or sequence) field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<Value>),
}

impl Value {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(s) => write!(f, "{}", s),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// A `(type name, field name)` pair qualifying a field for the window.
///
/// Stable for the lifetime of a run; renders as `TYPE.field`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldKey {
    pub type_name: String,
    pub field: String,
}

impl FieldKey {
    pub fn new(type_name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            field: field.into(),
        }
    }

    /// Parse a `TYPE.field` string. Returns `None` if either side is empty.
    pub fn parse(s: &str) -> Option<Self> {
        let (type_name, field) = s.split_once('.')?;
        if type_name.is_empty() || field.is_empty() {
            return None;
        }
        Some(Self::new(type_name, field))
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.type_name, self.field)
    }
}

/// One timestamp + payload unit read from the log.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Microseconds since the Unix epoch. Normally non-decreasing across a
    /// log, but regressions must be tolerated.
    pub timestamp_us: u64,
    /// Encoded message bytes, boundaries per the codec's framing rules.
    pub payload: Vec<u8>,
}

/// A successfully decoded protocol message.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    /// Numeric message id from the protocol dictionary.
    pub msg_id: u32,
    /// Message type name, e.g. `IMU`.
    pub type_name: String,
    /// Microseconds since the Unix epoch, taken from the enclosing frame.
    pub timestamp_us: u64,
    /// Field name/value pairs in schema order.
    pub fields: Vec<(String, Value)>,
    /// The original encoded payload, kept for binary passthrough.
    pub raw: Vec<u8>,
}

/// A span of the log that could not be decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct BadData {
    pub reason: String,
    pub timestamp_us: u64,
    pub raw: Vec<u8>,
}

/// A decoded message or a decode-failure placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Decoded(DecodedMessage),
    Bad(BadData),
}

impl Message {
    /// Build a `BAD_DATA` placeholder.
    pub fn bad(reason: impl Into<String>, timestamp_us: u64, raw: Vec<u8>) -> Self {
        Message::Bad(BadData {
            reason: reason.into(),
            timestamp_us,
            raw,
        })
    }

    pub fn type_name(&self) -> &str {
        match self {
            Message::Decoded(m) => &m.type_name,
            Message::Bad(_) => BAD_DATA_TYPE,
        }
    }

    pub fn msg_id(&self) -> u32 {
        match self {
            Message::Decoded(m) => m.msg_id,
            Message::Bad(_) => 0,
        }
    }

    pub fn timestamp_us(&self) -> u64 {
        match self {
            Message::Decoded(m) => m.timestamp_us,
            Message::Bad(b) => b.timestamp_us,
        }
    }

    /// Timestamp as fractional seconds since the Unix epoch.
    pub fn timestamp_secs(&self) -> f64 {
        self.timestamp_us() as f64 / 1_000_000.0
    }

    pub fn set_timestamp(&mut self, timestamp_us: u64) {
        match self {
            Message::Decoded(m) => m.timestamp_us = timestamp_us,
            Message::Bad(b) => b.timestamp_us = timestamp_us,
        }
    }

    /// Field name/value pairs in schema order. Empty for bad data.
    pub fn fields(&self) -> &[(String, Value)] {
        match self {
            Message::Decoded(m) => &m.fields,
            Message::Bad(_) => &[],
        }
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields().iter().find(|(f, _)| f == name).map(|(_, v)| v)
    }

    /// The original encoded bytes (skipped bytes for bad data).
    pub fn raw(&self) -> &[u8] {
        match self {
            Message::Decoded(m) => &m.raw,
            Message::Bad(b) => &b.raw,
        }
    }

    /// Whether this is the recoverable robust-parsing placeholder.
    pub fn is_bad_prefix(&self) -> bool {
        matches!(self, Message::Bad(b) if b.reason == BAD_PREFIX_REASON)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Decoded(m) => {
                write!(f, "{} {{", m.type_name)?;
                for (i, (name, value)) in m.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, " {} : {}", name, value)?;
                }
                write!(f, " }}")
            }
            Message::Bad(b) => {
                write!(
                    f,
                    "{} {{ reason : {}, bytes : {} }}",
                    BAD_DATA_TYPE,
                    b.reason,
                    b.raw.len()
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_key_parse() {
        let key = FieldKey::parse("IMU.roll").unwrap();
        assert_eq!(key.type_name, "IMU");
        assert_eq!(key.field, "roll");
        assert_eq!(key.to_string(), "IMU.roll");

        assert!(FieldKey::parse("no_dot").is_none());
        assert!(FieldKey::parse(".field").is_none());
        assert!(FieldKey::parse("TYPE.").is_none());
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Float(0.5).to_string(), "0.5");
        assert_eq!(Value::Str("ok".into()).to_string(), "ok");
        assert_eq!(
            Value::Array(vec![Value::Int(1), Value::Int(2)]).to_string(),
            "[1, 2]"
        );
    }

    #[test]
    fn test_message_display() {
        let msg = Message::Decoded(DecodedMessage {
            msg_id: 7,
            type_name: "IMU".into(),
            timestamp_us: 0,
            fields: vec![
                ("roll".into(), Value::Int(1)),
                ("pitch".into(), Value::Float(2.5)),
            ],
            raw: Vec::new(),
        });
        assert_eq!(msg.to_string(), "IMU { roll : 1, pitch : 2.5 }");
    }

    #[test]
    fn test_bad_prefix_detection() {
        let bad = Message::bad(BAD_PREFIX_REASON, 0, vec![0xFF]);
        assert!(bad.is_bad_prefix());
        assert_eq!(bad.type_name(), BAD_DATA_TYPE);

        let other = Message::bad("bad CRC", 0, Vec::new());
        assert!(!other.is_bad_prefix());
    }

    #[test]
    fn test_field_lookup() {
        let msg = Message::Decoded(DecodedMessage {
            msg_id: 1,
            type_name: "GPS".into(),
            timestamp_us: 0,
            fields: vec![("lat".into(), Value::Int(52))],
            raw: Vec::new(),
        });
        assert_eq!(msg.field("lat"), Some(&Value::Int(52)));
        assert_eq!(msg.field("lon"), None);
    }
}
