//! Frame extraction from a byte source.
//!
//! A log record is an 8-byte big-endian microsecond timestamp followed by
//! one codec payload (the prefix is absent in no-timestamps mode). The
//! reader owns the read cursor and two recovery behaviours:
//!
//! - **robust**: a malformed prefix does not abort the stream. The reader
//!   advances byte-by-byte until the codec reports a plausible payload
//!   boundary and yields the skipped span as a single event.
//! - **follow**: end-of-stream blocks, polling for appended bytes at a
//!   bounded interval. Cancellation is cooperative via the shared stop
//!   flag and is observed within one interval.

use crate::codec::{Framing, MessageCodec};
use crate::config::RunConfig;
use crate::error::{LogPipeError, Result};
use crate::types::Frame;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Read chunk size. Frames are small; 4 KiB keeps latency low in follow mode.
const READ_CHUNK: usize = 4096;

/// One step of the frame stream.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameEvent {
    /// A well-formed frame.
    Frame(Frame),
    /// A corrupted span skipped by robust parsing. Downstream this becomes
    /// a `BAD_DATA { reason: "Bad prefix" }` message.
    Skipped { timestamp_us: u64, bytes: Vec<u8> },
    /// End of the stream. In follow mode this is only returned after
    /// cooperative cancellation.
    Eof,
}

/// Pulls length-delimited, timestamped frames from a byte source.
pub struct FrameReader<R> {
    source: R,
    /// Bytes read from the source but not yet consumed as frames.
    buf: Vec<u8>,
    bytes_consumed: u64,
    total_bytes: Option<u64>,
    /// Timestamp carried forward for no-timestamps mode and skipped spans.
    last_timestamp_us: u64,
    no_timestamps: bool,
    robust: bool,
    follow: bool,
    poll_interval: Duration,
    running: Arc<AtomicBool>,
}

impl<R: Read> FrameReader<R> {
    /// Create a reader over `source`. `total_bytes` (when known, e.g. the
    /// input file length) enables percent-complete estimates.
    pub fn new(
        source: R,
        config: &RunConfig,
        running: Arc<AtomicBool>,
        total_bytes: Option<u64>,
    ) -> Self {
        Self {
            source,
            buf: Vec::new(),
            bytes_consumed: 0,
            total_bytes,
            last_timestamp_us: 0,
            no_timestamps: config.no_timestamps,
            robust: config.robust,
            follow: config.follow,
            poll_interval: config.poll_interval(),
            running,
        }
    }

    /// Bytes consumed so far (frames plus skipped spans).
    pub fn bytes_consumed(&self) -> u64 {
        self.bytes_consumed
    }

    /// Percent-complete estimate in `0..=100`, when the stream length is
    /// known.
    pub fn progress_percent(&self) -> Option<u8> {
        let total = self.total_bytes?;
        if total == 0 {
            return Some(100);
        }
        Some(((self.bytes_consumed * 100 / total).min(100)) as u8)
    }

    /// Pull the next frame, skipped span, or end-of-stream.
    pub fn next(&mut self, codec: &dyn MessageCodec) -> Result<FrameEvent> {
        let header = if self.no_timestamps { 0 } else { 8 };
        let mut skipped: Vec<u8> = Vec::new();

        loop {
            if self.buf.len() < header + 1 {
                if !self.fill()? {
                    return self.finish_stream(skipped);
                }
                continue;
            }

            match codec.payload_length(&self.buf[header..]) {
                Framing::NeedMore => {
                    if !self.fill()? {
                        return self.finish_stream(skipped);
                    }
                }
                Framing::Length(len) => {
                    let total = header + len;
                    if self.buf.len() < total {
                        if !self.fill()? {
                            return self.finish_stream(skipped);
                        }
                        continue;
                    }
                    if !skipped.is_empty() {
                        // A plausible boundary was found; report the bad
                        // span first. The frame stays buffered for the
                        // next call.
                        tracing::warn!(
                            "Skipped {} bytes of corrupted data",
                            skipped.len()
                        );
                        return Ok(FrameEvent::Skipped {
                            timestamp_us: self.last_timestamp_us,
                            bytes: skipped,
                        });
                    }
                    let timestamp_us = if self.no_timestamps {
                        self.last_timestamp_us
                    } else {
                        u64::from_be_bytes(
                            self.buf[..8].try_into().map_err(|_| {
                                LogPipeError::MalformedFrame(
                                    "short timestamp prefix".to_string(),
                                )
                            })?,
                        )
                    };
                    self.last_timestamp_us = timestamp_us;
                    let payload = self.buf[header..total].to_vec();
                    self.consume(total);
                    return Ok(FrameEvent::Frame(Frame {
                        timestamp_us,
                        payload,
                    }));
                }
                Framing::BadPrefix => {
                    if !self.robust {
                        return Err(LogPipeError::MalformedFrame(format!(
                            "bad payload prefix at offset {}",
                            self.bytes_consumed + header as u64
                        )));
                    }
                    // Slide the record boundary forward one byte and retry.
                    skipped.push(self.buf[0]);
                    self.consume(1);
                }
            }
        }
    }

    /// Read more bytes from the source. Returns `false` at end of stream
    /// (or after cancellation in follow mode).
    fn fill(&mut self) -> Result<bool> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let n = self.source.read(&mut chunk)?;
            if n > 0 {
                self.buf.extend_from_slice(&chunk[..n]);
                return Ok(true);
            }
            if !self.follow {
                return Ok(false);
            }
            // Follow mode: wait for appended bytes, checking the stop flag
            // once per interval.
            if !self.running.load(Ordering::SeqCst) {
                return Ok(false);
            }
            std::thread::sleep(self.poll_interval);
        }
    }

    /// Handle end of stream with possibly unconsumed bytes.
    fn finish_stream(&mut self, mut skipped: Vec<u8>) -> Result<FrameEvent> {
        // In follow mode the only way here is cooperative cancellation, and
        // a partially appended trailing frame is expected; hold the bytes
        // instead of treating them as corruption.
        if !self.buf.is_empty() && !self.follow {
            if !self.robust {
                return Err(LogPipeError::MalformedFrame(format!(
                    "truncated frame at end of stream ({} trailing bytes)",
                    self.buf.len()
                )));
            }
            let trailing = self.buf.len();
            skipped.extend_from_slice(&self.buf);
            self.buf.clear();
            self.bytes_consumed += trailing as u64;
        }
        if skipped.is_empty() {
            Ok(FrameEvent::Eof)
        } else {
            tracing::warn!("Skipped {} trailing bytes", skipped.len());
            Ok(FrameEvent::Skipped {
                timestamp_us: self.last_timestamp_us,
                bytes: skipped,
            })
        }
    }

    fn consume(&mut self, n: usize) {
        self.buf.drain(..n);
        self.bytes_consumed += n as u64;
    }
}
