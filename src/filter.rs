//! Message filtering.
//!
//! Stateless predicate over decoded messages: a type-set check plus an
//! optional condition expression delegated to the codec. Robust-parsing
//! `Bad prefix` placeholders are always dropped here; other `BAD_DATA`
//! messages bypass the type set so decode problems stay visible downstream.

use crate::codec::MessageCodec;
use crate::config::RunConfig;
use crate::types::Message;

/// Type-set and condition predicate built from a [`RunConfig`].
#[derive(Debug, Clone)]
pub struct MessageFilter {
    /// Accepted type names. Empty accepts all types.
    types: Vec<String>,
    /// Optional condition expression, evaluated by the codec.
    condition: Option<String>,
}

impl MessageFilter {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            types: config.types.clone(),
            condition: config.condition.clone(),
        }
    }

    /// Whether `msg` should continue down the pipeline. Depends only on the
    /// message and the configured predicate, never on prior calls.
    pub fn accept(&self, msg: &Message, codec: &dyn MessageCodec) -> bool {
        if msg.is_bad_prefix() {
            return false;
        }

        let type_ok = matches!(msg, Message::Bad(_))
            || self.types.is_empty()
            || self.types.iter().any(|t| t == msg.type_name());
        if !type_ok {
            return false;
        }

        match &self.condition {
            None => true,
            Some(expr) => codec.evaluate_condition(expr, msg),
        }
    }
}
