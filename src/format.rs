//! Output rendering.
//!
//! One formatter instance per run, built before any frame is processed so
//! configuration problems (CSV without a type list) surface up front rather
//! than per row. Text formats render newline-terminated lines; the binary
//! format re-emits the original framed bytes.

use crate::config::{OutputFormat, RunConfig};
use crate::error::{LogPipeError, Result};
use crate::types::{FieldKey, Message};
use crate::window::{RowSnapshot, SampleHoldWindow};
use chrono::{DateTime, Local};

/// Renders accepted messages (or window rows) in the configured format.
#[derive(Debug)]
pub struct OutputFormatter {
    format: OutputFormat,
    separator: String,
    /// CSV value columns after the leading timestamp column.
    columns: Vec<FieldKey>,
    description_section: bool,
}

impl OutputFormatter {
    /// Build the formatter. The CSV column list is taken from the window's
    /// tracked keys, so header columns and snapshot values share one order.
    pub fn from_config(config: &RunConfig, window: &SampleHoldWindow) -> Result<Self> {
        let columns = if config.format == OutputFormat::Csv {
            if config.types.is_empty() {
                return Err(LogPipeError::Config(
                    "CSV output requires a list of message types".to_string(),
                ));
            }
            window.keys().to_vec()
        } else {
            Vec::new()
        };

        Ok(Self {
            format: config.format,
            separator: config.separator(),
            columns,
            description_section: config.description_section,
        })
    }

    /// Header text emitted once before any row, if the format has one.
    pub fn header(&self) -> Option<String> {
        if self.format != OutputFormat::Csv {
            return None;
        }

        let names: Vec<String> = std::iter::once("TIMESTAMP".to_string())
            .chain(self.columns.iter().map(|key| {
                format!(
                    "{}_{}",
                    key.type_name.to_uppercase(),
                    key.field.to_uppercase()
                )
            }))
            .collect();

        let mut out = String::new();
        if self.description_section {
            out.push_str("Description data:\n");
            for (i, name) in names.iter().enumerate() {
                out.push_str(&format!("{} {{{}}}\n", name, i + 1));
            }
            out.push_str("End description data\n\n");
        }
        out.push_str(&names.join(&self.separator));
        out.push('\n');
        Some(out)
    }

    /// Render one accepted message together with its window snapshot.
    pub fn render(&self, msg: &Message, row: &RowSnapshot) -> Result<Vec<u8>> {
        match self.format {
            OutputFormat::Standard => Ok(self.render_standard(msg).into_bytes()),
            OutputFormat::Json => Ok(self.render_json(msg)?.into_bytes()),
            OutputFormat::Csv => Ok(self.render_csv(msg, row).into_bytes()),
            OutputFormat::Binary => Ok(render_binary(msg)),
        }
    }

    fn render_standard(&self, msg: &Message) -> String {
        let secs = (msg.timestamp_us() / 1_000_000) as i64;
        let hundredths = (msg.timestamp_us() / 10_000) % 100;
        let dt = DateTime::from_timestamp(secs, 0)
            .unwrap_or(DateTime::UNIX_EPOCH)
            .with_timezone(&Local);
        format!(
            "{}.{:02}: {}\n",
            dt.format("%Y-%m-%d %H:%M:%S"),
            hundredths,
            msg
        )
    }

    fn render_json(&self, msg: &Message) -> Result<String> {
        let mut data = serde_json::Map::new();
        match msg {
            Message::Decoded(m) => {
                for (name, value) in &m.fields {
                    let v = serde_json::to_value(value)
                        .map_err(|e| LogPipeError::Serialization(e.to_string()))?;
                    data.insert(name.clone(), v);
                }
            }
            Message::Bad(b) => {
                data.insert("reason".to_string(), b.reason.clone().into());
            }
        }
        let data_str = serde_json::to_string(&data)
            .map_err(|e| LogPipeError::Serialization(e.to_string()))?;

        let obj = serde_json::json!({
            "meta": {
                "msgId": msg.msg_id(),
                "type": msg.type_name(),
                "timestamp": msg.timestamp_secs(),
            },
            "data": data_str,
        });
        let line = serde_json::to_string(&obj)
            .map_err(|e| LogPipeError::Serialization(e.to_string()))?;
        Ok(line + "\n")
    }

    fn render_csv(&self, msg: &Message, row: &RowSnapshot) -> String {
        // The timestamp column carries the message's own timestamp; the
        // remaining columns come from the window snapshot, parallel to
        // `self.columns`.
        debug_assert_eq!(row.values.len(), self.columns.len());
        let mut cols = Vec::with_capacity(1 + row.values.len());
        cols.push(format!("{}", msg.timestamp_secs()));
        for value in &row.values {
            cols.push(value.to_string());
        }
        let mut line = cols.join(&self.separator);
        line.push('\n');
        line
    }
}

/// The original 8-byte big-endian microsecond timestamp followed by the raw
/// encoded payload, i.e. the same framed format as the input log.
fn render_binary(msg: &Message) -> Vec<u8> {
    let raw = msg.raw();
    let mut out = Vec::with_capacity(8 + raw.len());
    out.extend_from_slice(&msg.timestamp_us().to_be_bytes());
    out.extend_from_slice(raw);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::mock::{MockCodec, MockType};
    use crate::codec::MessageCodec;
    use crate::types::Value;

    fn test_codec() -> MockCodec {
        MockCodec::new(vec![
            MockType::new(1, "A", &["x"]),
            MockType::new(2, "B", &["y"]),
        ])
    }

    fn csv_config(sep: &str, description: bool) -> RunConfig {
        let mut config = RunConfig::default();
        config.format = OutputFormat::Csv;
        config.types = vec!["A".into(), "B".into()];
        config.csv_sep = sep.to_string();
        config.description_section = description;
        config
    }

    fn formatter_for(config: &RunConfig) -> Result<OutputFormatter> {
        let codec = test_codec();
        let window = SampleHoldWindow::from_config(config, &codec).unwrap();
        OutputFormatter::from_config(config, &window)
    }

    fn message(codec: &MockCodec, name: &str, value: i32, ts_us: u64) -> Message {
        let mut msg = codec.decode(&codec.encode(name, &[value]).unwrap()).unwrap();
        msg.set_timestamp(ts_us);
        msg
    }

    #[test]
    fn test_csv_requires_types() {
        let mut config = RunConfig::default();
        config.format = OutputFormat::Csv;
        let err = formatter_for(&config).unwrap_err();
        assert!(matches!(err, LogPipeError::Config(_)));
    }

    #[test]
    fn test_csv_header_and_description() {
        let formatter = formatter_for(&csv_config(",", true)).unwrap();
        let header = formatter.header().unwrap();
        assert!(header.starts_with("Description data:\n"));
        assert!(header.contains("TIMESTAMP {1}\n"));
        assert!(header.contains("A_X {2}\n"));
        assert!(header.contains("B_Y {3}\n"));
        assert!(header.contains("End description data\n"));
        assert!(header.ends_with("TIMESTAMP,A_X,B_Y\n"));

        let formatter = formatter_for(&csv_config(",", false)).unwrap();
        assert_eq!(formatter.header().unwrap(), "TIMESTAMP,A_X,B_Y\n");
    }

    #[test]
    fn test_csv_columns_follow_window_order() {
        let codec = test_codec();
        let config = csv_config(",", false);
        let window = SampleHoldWindow::from_config(&config, &codec).unwrap();
        let formatter = OutputFormatter::from_config(&config, &window).unwrap();

        // Header columns are the window's tracked keys, in the same order,
        // behind the leading timestamp.
        let expected: Vec<String> = std::iter::once("TIMESTAMP".to_string())
            .chain(window.keys().iter().map(|key| {
                format!(
                    "{}_{}",
                    key.type_name.to_uppercase(),
                    key.field.to_uppercase()
                )
            }))
            .collect();
        assert_eq!(formatter.header().unwrap().trim_end(), expected.join(","));
    }

    #[test]
    fn test_csv_tab_separator_alias() {
        let formatter = formatter_for(&csv_config("tab", false)).unwrap();
        assert_eq!(formatter.header().unwrap(), "TIMESTAMP\tA_X\tB_Y\n");
    }

    #[test]
    fn test_csv_row_round_trip() {
        let codec = test_codec();
        let formatter = formatter_for(&csv_config(",", false)).unwrap();
        let msg = message(&codec, "A", 3, 1_500_000);
        let row = RowSnapshot {
            values: vec![Value::Int(3), Value::Int(9)],
        };

        let line = String::from_utf8(formatter.render(&msg, &row).unwrap()).unwrap();
        let cols: Vec<&str> = line.trim_end().split(',').collect();
        // Timestamp folded into the declared column list.
        assert_eq!(cols.len(), 3);
        assert_eq!(cols[0], "1.5");
        assert_eq!(cols[1], "3");
        assert_eq!(cols[2], "9");
    }

    #[test]
    fn test_standard_line() {
        let codec = test_codec();
        let formatter = formatter_for(&RunConfig::default()).unwrap();
        assert!(formatter.header().is_none());

        let msg = message(&codec, "A", 7, 1_234_050_000);
        let empty = RowSnapshot { values: Vec::new() };
        let line = String::from_utf8(formatter.render(&msg, &empty).unwrap()).unwrap();
        // Hundredths come from the microsecond timestamp: 1234.05 s.
        assert!(line.contains(".05: "), "line: {}", line);
        assert!(line.ends_with("A { x : 7 }\n"), "line: {}", line);
    }

    #[test]
    fn test_json_object_shape() {
        let codec = test_codec();
        let mut config = RunConfig::default();
        config.format = OutputFormat::Json;
        let formatter = formatter_for(&config).unwrap();

        let msg = message(&codec, "B", 4, 2_000_000);
        let empty = RowSnapshot { values: Vec::new() };
        let line = String::from_utf8(formatter.render(&msg, &empty).unwrap()).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["meta"]["type"], "B");
        assert_eq!(parsed["meta"]["msgId"], 2);
        assert_eq!(parsed["meta"]["timestamp"], 2.0);
        // The data section is a JSON string holding the field mapping.
        let data: serde_json::Value =
            serde_json::from_str(parsed["data"].as_str().unwrap()).unwrap();
        assert_eq!(data["y"], 4);
    }

    #[test]
    fn test_binary_passthrough() {
        let codec = test_codec();
        let mut config = RunConfig::default();
        config.format = OutputFormat::Binary;
        let formatter = formatter_for(&config).unwrap();

        let msg = message(&codec, "A", 5, 42);
        let empty = RowSnapshot { values: Vec::new() };
        let out = formatter.render(&msg, &empty).unwrap();
        assert_eq!(&out[..8], &42u64.to_be_bytes());
        assert_eq!(&out[8..], msg.raw());
    }
}
