//! # LogPipe-RS: Streaming Telemetry Log Pipeline
//!
//! Reads a binary telemetry log of framed, timestamped protocol messages,
//! filters and reshapes the stream, and emits it as Standard/JSON/CSV text
//! or as a filtered binary copy of the log.
//!
//! ## Architecture
//!
//! Data flows strictly left to right through the stages:
//!
//! ```text
//! [FrameReader] ──► [MessageCodec] ──► [MessageFilter] ──► [SampleHoldWindow] ──► [OutputFormatter]
//! ```
//!
//! - **Reader**: length-delimited frame extraction with robust
//!   (skip-corruption) and follow (tail) modes
//! - **Codec**: external protocol-dictionary boundary; the pipeline never
//!   decodes wire formats itself
//! - **Window**: last-value-wins state that coalesces interleaved message
//!   types into aligned rows
//! - **Worker**: runs the whole chain on a dedicated thread, publishing
//!   progress and errors over a crossbeam channel
//!
//! ## Example
//!
//! ```ignore
//! use logpipe_rs::{codec, worker, RunConfig};
//! use std::fs::File;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = RunConfig::default();
//!     let codec = codec::resolve_dialect(&config.dialect)?;
//!
//!     let input = File::open("flight.tlog")?;
//!     let total = input.metadata()?.len();
//!     let handle = worker::spawn(
//!         config,
//!         codec,
//!         Box::new(input),
//!         Some(total),
//!         Box::new(std::io::stdout()),
//!     );
//!
//!     for event in handle.events().iter() {
//!         println!("{:?}", event);
//!     }
//!     handle.join();
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod filter;
pub mod format;
pub mod reader;
pub mod types;
pub mod window;
pub mod worker;

// Re-export commonly used types
pub use codec::{Framing, MessageCodec};
pub use config::{OutputFormat, RunConfig};
pub use error::{LogPipeError, Result};
pub use filter::MessageFilter;
pub use format::OutputFormatter;
pub use reader::{FrameEvent, FrameReader};
pub use types::{DecodedMessage, FieldKey, Frame, Message, Value};
pub use window::{RowSnapshot, SampleHoldWindow, WindowUpdate};
pub use worker::{PipelineWorker, ProgressEvent, WorkerHandle, WorkerState};
