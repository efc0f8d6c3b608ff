//! Protocol codec boundary.
//!
//! The pipeline never performs wire-level decoding itself; it calls into a
//! [`MessageCodec`] that owns the protocol dictionary for one dialect. The
//! codec answers three questions: where the next payload ends (framing),
//! what a payload means (decode), and whether a message satisfies a
//! condition expression. The schema lookup is resolved once at
//! configuration time, never per message.

#[cfg(any(test, feature = "mock-codec"))]
pub mod mock;

use crate::error::{LogPipeError, Result};
use crate::types::Message;

/// Outcome of inspecting buffered bytes for the next payload boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Not enough bytes buffered to decide.
    NeedMore,
    /// The next payload occupies exactly this many bytes.
    Length(usize),
    /// The bytes do not start a valid payload.
    BadPrefix,
}

/// Capability interface over an external protocol dictionary.
pub trait MessageCodec: Send {
    /// Dialect identifier this codec was built for.
    fn dialect(&self) -> &str;

    /// Inspect the start of `buf` (payload bytes, after any timestamp
    /// prefix) and report the next payload boundary.
    fn payload_length(&self, buf: &[u8]) -> Framing;

    /// Decode one complete payload into a message. Undecodable content that
    /// is survivable yields `Message::Bad`; a hard protocol violation is an
    /// error and aborts the run.
    fn decode(&self, payload: &[u8]) -> Result<Message>;

    /// Ordered field names for a message type, if the dialect knows it.
    fn field_schema(&self, type_name: &str) -> Option<Vec<String>>;

    /// Evaluate a condition expression against a message. A condition
    /// referencing a field the message does not carry is false, not an
    /// error.
    fn evaluate_condition(&self, expr: &str, msg: &Message) -> bool;
}

/// Resolve a dialect identifier to a codec.
pub fn resolve_dialect(name: &str) -> Result<Box<dyn MessageCodec>> {
    match name {
        #[cfg(any(test, feature = "mock-codec"))]
        "mock" => Ok(Box::new(mock::MockCodec::default_dialect())),
        other => Err(LogPipeError::Config(format!(
            "Unknown dialect '{}'",
            other
        ))),
    }
}
