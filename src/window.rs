//! Sample-and-hold window.
//!
//! Upstream messages of different types arrive interleaved and at different
//! rates. The window holds the last-seen value of every tracked
//! `(type, field)` key so that one logical tick (a change of the alignment
//! field) can be reported together with the most recent reading of every
//! other tracked signal, instead of emitting an incomplete row per message.
//!
//! Column order is explicit: keys live in a `Vec` populated from the codec
//! schema at construction time, with a side lookup table for updates. The
//! key set never changes after construction, only the values.

use crate::codec::MessageCodec;
use crate::config::RunConfig;
use crate::error::{LogPipeError, Result};
use crate::types::{FieldKey, Message, Value};
use std::collections::HashMap;

/// Immutable copy of the window values, in key order.
#[derive(Debug, Clone, PartialEq)]
pub struct RowSnapshot {
    pub values: Vec<Value>,
}

/// Result of feeding one accepted message into the window.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowUpdate {
    /// The alignment field changed (or alignment is disabled); emit a row.
    RowReady(RowSnapshot),
    /// Values were held; no row boundary was crossed.
    NotReady,
}

/// Last-value-wins state keyed by `(type, field)`.
pub struct SampleHoldWindow {
    /// Tracked keys in output column order.
    keys: Vec<FieldKey>,
    /// Current value per key, parallel to `keys`.
    values: Vec<Value>,
    /// `type name -> field name -> index into keys/values`.
    index: HashMap<String, HashMap<String, usize>>,
    /// Index of the alignment key, when alignment is enabled.
    align_idx: Option<usize>,
    /// Alignment value cached at the previous emission.
    last_emitted: Option<Value>,
}

impl SampleHoldWindow {
    /// Build the window for the configured types, pre-populating every key
    /// with zero. The alignment field, when set, must be a tracked key.
    pub fn from_config(config: &RunConfig, codec: &dyn MessageCodec) -> Result<Self> {
        let mut keys = Vec::new();
        let mut index: HashMap<String, HashMap<String, usize>> = HashMap::new();

        for type_name in &config.types {
            let schema = codec.field_schema(type_name).ok_or_else(|| {
                LogPipeError::Config(format!(
                    "Message type '{}' is not known to the '{}' dialect",
                    type_name,
                    codec.dialect()
                ))
            })?;
            for field in schema {
                let by_field = index.entry(type_name.clone()).or_default();
                if by_field.contains_key(&field) {
                    continue;
                }
                by_field.insert(field.clone(), keys.len());
                keys.push(FieldKey::new(type_name.clone(), field));
            }
        }

        let align_idx = match &config.align {
            None => None,
            Some(key) => Some(
                index
                    .get(&key.type_name)
                    .and_then(|fields| fields.get(&key.field))
                    .copied()
                    .ok_or_else(|| {
                        LogPipeError::Config(format!(
                            "Alignment field '{}' is not a tracked field",
                            key
                        ))
                    })?,
            ),
        };

        let values = vec![Value::Int(0); keys.len()];
        Ok(Self {
            keys,
            values,
            index,
            align_idx,
            last_emitted: None,
        })
    }

    /// Tracked keys in column order.
    pub fn keys(&self) -> &[FieldKey] {
        &self.keys
    }

    /// Current value for a key, if tracked.
    pub fn value(&self, key: &FieldKey) -> Option<&Value> {
        let idx = *self.index.get(&key.type_name)?.get(&key.field)?;
        Some(&self.values[idx])
    }

    /// Overwrite tracked fields with the message's values, then decide
    /// whether a row boundary was crossed.
    pub fn update(&mut self, msg: &Message) -> WindowUpdate {
        if let Some(by_field) = self.index.get(msg.type_name()) {
            for (field, value) in msg.fields() {
                if let Some(&idx) = by_field.get(field) {
                    self.values[idx] = value.clone();
                }
            }
        }

        match self.align_idx {
            None => WindowUpdate::RowReady(self.snapshot()),
            Some(idx) => {
                let current = &self.values[idx];
                if self.last_emitted.as_ref() == Some(current) {
                    WindowUpdate::NotReady
                } else {
                    self.last_emitted = Some(current.clone());
                    WindowUpdate::RowReady(self.snapshot())
                }
            }
        }
    }

    fn snapshot(&self) -> RowSnapshot {
        RowSnapshot {
            values: self.values.clone(),
        }
    }
}
