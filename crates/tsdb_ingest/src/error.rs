use thiserror::Error;

/// Fieldless classification of a rejected line, suitable for per-class counters.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ErrorCode {
    MissingDirective,
    MissingMetricName,
    MissingTimestamp,
    MissingValue,
    InvalidValue,
    InvalidTimestamp,
}

/// Why a single `put` line could not be decoded.
///
/// Every variant is local to the offending line; callers are expected to count it and
/// move on to the next line.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum DecodeError {
    #[error("line does not start with the `put` directive")]
    MissingDirective,
    #[error("metric name is missing")]
    MissingMetricName,
    #[error("timestamp is missing")]
    MissingTimestamp,
    #[error("value is missing")]
    MissingValue,
    #[error("value `{token}` is not a finite number")]
    InvalidValue { token: String },
    #[error("timestamp `{token}` is invalid: {reason}")]
    InvalidTimestamp { token: String, reason: &'static str },
}

impl DecodeError {
    pub fn code(&self) -> ErrorCode {
        match self {
            DecodeError::MissingDirective => ErrorCode::MissingDirective,
            DecodeError::MissingMetricName => ErrorCode::MissingMetricName,
            DecodeError::MissingTimestamp => ErrorCode::MissingTimestamp,
            DecodeError::MissingValue => ErrorCode::MissingValue,
            DecodeError::InvalidValue { .. } => ErrorCode::InvalidValue,
            DecodeError::InvalidTimestamp { .. } => ErrorCode::InvalidTimestamp,
        }
    }
}

#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum BufferError {
    #[error("index {index} out of bounds, expected [0; {len})")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("buffer capacity exceeded: {capacity}")]
    CapacityExceeded { capacity: usize },
    #[error("buffer capacity must be greater than zero")]
    ZeroCapacity,
}

#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum LineRecordError {
    #[error("I/O error while reading metric input")]
    Io,
    #[error("invalid UTF-8 in metric input")]
    InvalidUtf8,
    #[error("line too long (observed_bytes={observed_bytes}, max_line_bytes={max_line_bytes})")]
    LineTooLong {
        observed_bytes: usize,
        max_line_bytes: usize,
    },
    #[error("line rejected ({code:?}): {summary}")]
    Decode { code: ErrorCode, summary: String },
}

#[derive(Debug, Clone)]
pub struct LineRecord<T> {
    /// 1-based line number in the underlying stream.
    pub line_number: usize,
    pub raw_line: Option<String>,
    /// Decoded records for the line, or why it was rejected.
    pub outcome: Result<Vec<T>, LineRecordError>,
}

#[derive(Debug, Clone)]
pub struct ErrorDetail {
    pub line_number: usize,
    pub code: ErrorCode,
    pub source_name: &'static str,
    pub details: String,
}

pub trait ErrorDetailSink: Send + 'static {
    fn on_error(&mut self, detail: ErrorDetail);
}
