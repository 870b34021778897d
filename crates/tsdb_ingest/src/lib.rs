#![forbid(unsafe_code)]
//! Ingestion front end for the OpenTSDB-style `put` line protocol.
//!
//! This crate does not own a listener or a forwarding path. It provides:
//! - [`PutLineDecoder`], which turns one `put <metric> <timestamp> <value> [k=v ...]`
//!   line into a [`MetricRecord`] with adaptive timestamp resolution and host-tag precedence.
//! - [`HistoryBuffer`], a fixed-capacity ring with FIFO semantics used to stage records
//!   (or any bounded history) for windowed consumers.
//! - A bounded-memory, line-oriented ingestion loop (sync + optional tokio) that feeds
//!   framed lines to any [`LineParser`] and keeps going past malformed lines.

mod buffer;
mod config;
mod decoder;
mod error;
mod ingest;
mod line_parser;
mod reader;
mod record;

pub use buffer::{HistoryBuffer, Iter, OverflowPolicy};
pub use config::{CaptureRaw, DecoderConfig, ErrorDetailCapture, IngestConfig, IngestLimits};
pub use decoder::PutLineDecoder;
pub use error::{
    BufferError, DecodeError, ErrorCode, ErrorDetail, ErrorDetailSink, LineRecord,
    LineRecordError,
};
pub use ingest::{IngestStats, LineIngestor};
pub use line_parser::{ClassifiedParserError, LineParser};
pub use record::{Annotations, MetricRecord, DEFAULT_CUSTOMER};

#[cfg(feature = "tokio")]
pub use ingest::AsyncLineIngestor;
