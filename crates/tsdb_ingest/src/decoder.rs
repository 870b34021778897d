use std::iter::Peekable;
use std::str::SplitWhitespace;

use crate::config::DecoderConfig;
use crate::error::{DecodeError, ErrorCode};
use crate::line_parser::{ClassifiedParserError, LineParser};
use crate::record::{Annotations, MetricRecord, DEFAULT_CUSTOMER};

const DIRECTIVE: &str = "put";

const SECONDS_DIGITS: usize = 10;
const MILLIS_DIGITS: usize = 13;

/// Decodes `put <metric> <timestamp> <value> [key=value ...]` lines.
///
/// The decoder holds only its configuration, so one instance may be shared across threads
/// as long as every call writes to its own output vector.
#[derive(Debug, Clone, Default)]
pub struct PutLineDecoder {
    config: DecoderConfig,
}

impl PutLineDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decodes one line and appends exactly one record to `out`.
    ///
    /// On error nothing is appended.
    pub fn decode(&self, line: &str, out: &mut Vec<MetricRecord>) -> Result<(), DecodeError> {
        let record = self.decode_record(line)?;
        out.push(record);
        Ok(())
    }

    pub fn decode_record(&self, line: &str) -> Result<MetricRecord, DecodeError> {
        let mut tokens = line.split_whitespace().peekable();
        if tokens.next() != Some(DIRECTIVE) {
            return Err(DecodeError::MissingDirective);
        }

        let metric = tokens.next().ok_or(DecodeError::MissingMetricName)?;
        let raw_timestamp = next_positional(&mut tokens).ok_or(DecodeError::MissingTimestamp)?;
        let raw_value = next_positional(&mut tokens).ok_or(DecodeError::MissingValue)?;

        let timestamp_millis = parse_timestamp_millis(raw_timestamp)?;
        let value = parse_value(raw_value)?;
        let (host, annotations) = self.resolve_host(tokens.filter_map(split_tag));

        Ok(MetricRecord {
            customer: DEFAULT_CUSTOMER.to_string(),
            metric: metric.to_string(),
            timestamp_millis,
            value,
            host,
            annotations,
        })
    }

    fn resolve_host<'a>(
        &self,
        tags: impl Iterator<Item = (&'a str, &'a str)>,
    ) -> (String, Annotations) {
        // First occurrence of each host-tag key, in line order.
        let mut host_tags: Vec<(&str, &str)> = Vec::new();
        let mut annotations = Annotations::new();
        for (key, value) in tags {
            if self.config.is_host_tag(key) {
                if !host_tags.iter().any(|(seen, _)| *seen == key) {
                    host_tags.push((key, value));
                }
            } else {
                annotations.insert(key.to_string(), value.to_string());
            }
        }

        let host = self
            .config
            .host_tag_precedence()
            .find_map(|name| {
                host_tags
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| value.to_string())
            })
            .unwrap_or_else(|| self.config.default_host.clone());
        (host, annotations)
    }
}

impl LineParser for PutLineDecoder {
    type Record = MetricRecord;
    type Error = DecodeError;

    fn decode_line(&self, line: &str, out: &mut Vec<MetricRecord>) -> Result<(), DecodeError> {
        self.decode(line, out)
    }
}

impl ClassifiedParserError for DecodeError {
    fn code(&self) -> ErrorCode {
        DecodeError::code(self)
    }

    fn redacted_summary(&self) -> String {
        match self {
            DecodeError::InvalidValue { .. } => "value is not a finite number".to_string(),
            DecodeError::InvalidTimestamp { reason, .. } => format!("invalid timestamp: {reason}"),
            other => other.to_string(),
        }
    }

    fn full_details(&self) -> String {
        self.to_string()
    }
}

/// Timestamp and value never contain `=`; the first `=` token starts the tag tail.
fn next_positional<'a>(tokens: &mut Peekable<SplitWhitespace<'a>>) -> Option<&'a str> {
    tokens.next_if(|token| !token.contains('='))
}

fn split_tag(token: &str) -> Option<(&str, &str)> {
    let (key, value) = token.split_once('=')?;
    if key.is_empty() || value.is_empty() || value.contains('=') {
        return None;
    }
    Some((key, value))
}

fn parse_value(token: &str) -> Result<f64, DecodeError> {
    match token.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(DecodeError::InvalidValue {
            token: token.to_string(),
        }),
    }
}

/// Fractional or exponent forms are seconds; bare digits are seconds (10) or millis (13).
fn parse_timestamp_millis(token: &str) -> Result<i64, DecodeError> {
    let invalid = |reason: &'static str| DecodeError::InvalidTimestamp {
        token: token.to_string(),
        reason,
    };

    if token.contains(|ch: char| matches!(ch, '.' | 'e' | 'E')) {
        let seconds: f64 = token.parse().map_err(|_| invalid("not a number"))?;
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(invalid("seconds must be finite and non-negative"));
        }
        let millis = (seconds * 1000.0).round();
        if millis >= i64::MAX as f64 {
            return Err(invalid("out of range"));
        }
        return Ok(millis as i64);
    }

    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("not a number"));
    }
    let digits: i64 = token.parse().map_err(|_| invalid("out of range"))?;
    match token.len() {
        SECONDS_DIGITS => Ok(digits * 1000),
        MILLIS_DIGITS => Ok(digits),
        _ => Err(invalid("expected 10 digits (seconds) or 13 digits (milliseconds)")),
    }
}
