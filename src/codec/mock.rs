//! Mock protocol dialect for testing without a real protocol dictionary.
//!
//! The wire format is deliberately small: a payload is
//! `[0xFE magic][data length: u8][message id: u8][data]`, where `data` is
//! one little-endian `i32` per schema field. Framing therefore needs at
//! most two buffered bytes to answer, which makes corruption tests easy to
//! construct.
//!
//! Condition expressions are whitespace-separated comparisons:
//! `field op literal` or `TYPE.field op literal` with `op` one of
//! `== != < <= > >=`. A missing field (or a type mismatch on a qualified
//! name) evaluates to false.

use crate::codec::{Framing, MessageCodec};
use crate::error::{LogPipeError, Result};
use crate::types::{DecodedMessage, FieldKey, Message, Value};

/// Payload framing magic byte.
pub const MAGIC: u8 = 0xFE;

/// Fixed per-payload overhead: magic, length, message id.
pub const HEADER_LEN: usize = 3;

/// One message type of the mock dialect.
#[derive(Debug, Clone)]
pub struct MockType {
    pub id: u8,
    pub name: String,
    pub fields: Vec<String>,
}

impl MockType {
    pub fn new(id: u8, name: impl Into<String>, fields: &[&str]) -> Self {
        Self {
            id,
            name: name.into(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Codec over a fixed set of [`MockType`]s.
pub struct MockCodec {
    types: Vec<MockType>,
}

impl MockCodec {
    pub fn new(types: Vec<MockType>) -> Self {
        Self { types }
    }

    /// A small general-purpose dialect used by the CLI and the tests.
    pub fn default_dialect() -> Self {
        Self::new(vec![
            MockType::new(1, "IMU", &["time_ms", "ax", "ay", "az"]),
            MockType::new(2, "GPS", &["time_ms", "lat", "lon", "alt"]),
            MockType::new(3, "BATTERY", &["voltage_mv", "current_ma"]),
        ])
    }

    fn type_by_id(&self, id: u8) -> Option<&MockType> {
        self.types.iter().find(|t| t.id == id)
    }

    fn type_by_name(&self, name: &str) -> Option<&MockType> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Encode a payload for `name` with one `i32` per schema field.
    pub fn encode(&self, name: &str, values: &[i32]) -> Result<Vec<u8>> {
        let ty = self.type_by_name(name).ok_or_else(|| {
            LogPipeError::Config(format!("Unknown message type '{}'", name))
        })?;
        if values.len() != ty.fields.len() {
            return Err(LogPipeError::Config(format!(
                "Type '{}' takes {} fields, got {}",
                name,
                ty.fields.len(),
                values.len()
            )));
        }
        let data_len = values.len() * 4;
        let mut payload = Vec::with_capacity(HEADER_LEN + data_len);
        payload.push(MAGIC);
        payload.push(data_len as u8);
        payload.push(ty.id);
        for v in values {
            payload.extend_from_slice(&v.to_le_bytes());
        }
        Ok(payload)
    }

    /// Encode a full log record: 8-byte big-endian microsecond timestamp
    /// followed by the payload. Test helper for building logs.
    pub fn frame(&self, timestamp_us: u64, name: &str, values: &[i32]) -> Result<Vec<u8>> {
        let payload = self.encode(name, values)?;
        let mut record = Vec::with_capacity(8 + payload.len());
        record.extend_from_slice(&timestamp_us.to_be_bytes());
        record.extend_from_slice(&payload);
        Ok(record)
    }
}

impl MessageCodec for MockCodec {
    fn dialect(&self) -> &str {
        "mock"
    }

    fn payload_length(&self, buf: &[u8]) -> Framing {
        if buf.is_empty() {
            return Framing::NeedMore;
        }
        if buf[0] != MAGIC {
            return Framing::BadPrefix;
        }
        if buf.len() < 2 {
            return Framing::NeedMore;
        }
        Framing::Length(HEADER_LEN + buf[1] as usize)
    }

    fn decode(&self, payload: &[u8]) -> Result<Message> {
        if payload.len() < HEADER_LEN || payload[0] != MAGIC {
            return Ok(Message::bad("Invalid header", 0, payload.to_vec()));
        }
        if payload[1] as usize != payload.len() - HEADER_LEN {
            return Ok(Message::bad("Invalid length", 0, payload.to_vec()));
        }
        let id = payload[2];
        let Some(ty) = self.type_by_id(id) else {
            return Ok(Message::bad(
                format!("Unknown message id {}", id),
                0,
                payload.to_vec(),
            ));
        };
        let data = &payload[HEADER_LEN..];
        if data.len() != ty.fields.len() * 4 {
            return Ok(Message::bad(
                format!("Invalid payload length for {}", ty.name),
                0,
                payload.to_vec(),
            ));
        }
        let fields = ty
            .fields
            .iter()
            .zip(data.chunks_exact(4))
            .map(|(name, chunk)| {
                let v = i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                (name.clone(), Value::Int(v as i64))
            })
            .collect();
        Ok(Message::Decoded(DecodedMessage {
            msg_id: id as u32,
            type_name: ty.name.clone(),
            timestamp_us: 0,
            fields,
            raw: payload.to_vec(),
        }))
    }

    fn field_schema(&self, type_name: &str) -> Option<Vec<String>> {
        self.type_by_name(type_name).map(|t| t.fields.clone())
    }

    fn evaluate_condition(&self, expr: &str, msg: &Message) -> bool {
        evaluate(expr, msg).unwrap_or(false)
    }
}

/// Parsed comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Op {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "==" => Some(Op::Eq),
            "!=" => Some(Op::Ne),
            "<" => Some(Op::Lt),
            "<=" => Some(Op::Le),
            ">" => Some(Op::Gt),
            ">=" => Some(Op::Ge),
            _ => None,
        }
    }
}

/// Evaluate `lhs op literal`. `None` means the expression does not apply to
/// this message (missing field, type mismatch, unparseable expression).
fn evaluate(expr: &str, msg: &Message) -> Option<bool> {
    let mut parts = expr.split_whitespace();
    let lhs = parts.next()?;
    let op = Op::parse(parts.next()?)?;
    let rhs = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let value = if let Some(key) = lhs.contains('.').then(|| FieldKey::parse(lhs)).flatten() {
        if key.type_name != msg.type_name() {
            return None;
        }
        msg.field(&key.field)?
    } else {
        msg.field(lhs)?
    };

    if let (Some(left), Ok(right)) = (value.as_f64(), rhs.parse::<f64>()) {
        return Some(match op {
            Op::Eq => left == right,
            Op::Ne => left != right,
            Op::Lt => left < right,
            Op::Le => left <= right,
            Op::Gt => left > right,
            Op::Ge => left >= right,
        });
    }

    // String comparison only supports equality.
    if let Value::Str(s) = value {
        return match op {
            Op::Eq => Some(s == rhs),
            Op::Ne => Some(s != rhs),
            _ => None,
        };
    }

    None
}
