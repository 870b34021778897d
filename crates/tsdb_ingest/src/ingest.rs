use std::io::Read;

use tracing::{debug, warn};

use crate::buffer::HistoryBuffer;
use crate::config::{CaptureRaw, ErrorDetailCapture, IngestConfig};
use crate::error::{ErrorDetail, LineRecord, LineRecordError};
use crate::line_parser::{ClassifiedParserError, LineParser};
use crate::reader::{Frame, SyncLineReader};

/// Running totals for one ingestor.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct IngestStats {
    /// Non-blank lines seen, including rejected ones.
    pub lines: usize,
    pub records: usize,
    pub rejected_lines: usize,
    /// Decoded records a `RejectOnFull` buffer refused during staging.
    pub dropped_records: usize,
}

/// Per-line handling shared by the sync and async ingestors.
struct FrameDecoder<P: LineParser> {
    parser: P,
    config: IngestConfig,
    raw_budget: Option<usize>,
    source_name: &'static str,
    stats: IngestStats,
}

impl<P: LineParser> FrameDecoder<P> {
    fn new(parser: P, config: IngestConfig, source_name: &'static str) -> Self {
        Self {
            raw_budget: config.limits.max_raw_bytes_total,
            parser,
            config,
            source_name,
            stats: IngestStats::default(),
        }
    }

    /// Returns `None` for blank lines.
    fn decode_frame(&mut self, frame: Frame) -> Option<LineRecord<P::Record>> {
        match frame {
            Frame::IoError { line_number } => {
                warn!(source = self.source_name, line_number, "read failed; ending ingestion");
                Some(self.reject(line_number, LineRecordError::Io))
            }
            Frame::LineTooLong {
                line_number,
                observed_bytes,
                max_line_bytes,
            } => Some(self.reject(
                line_number,
                LineRecordError::LineTooLong {
                    observed_bytes,
                    max_line_bytes,
                },
            )),
            Frame::Line { line_number, bytes } => {
                let Ok(raw_line) = String::from_utf8(bytes) else {
                    return Some(self.reject(line_number, LineRecordError::InvalidUtf8));
                };
                let line = raw_line.strip_suffix('\r').unwrap_or(&raw_line);
                if line.chars().all(char::is_whitespace) {
                    return None;
                }
                Some(self.decode_line(line_number, line))
            }
        }
    }

    fn decode_line(&mut self, line_number: usize, line: &str) -> LineRecord<P::Record> {
        let raw_line = self.capture_line(line);
        let mut out = Vec::new();
        match self.parser.decode_line(line, &mut out) {
            Ok(()) => {
                self.stats.lines += 1;
                self.stats.records += out.len();
                LineRecord {
                    line_number,
                    raw_line,
                    outcome: Ok(out),
                }
            }
            Err(err) => {
                let code = err.code();
                if self.config.error_detail_capture == ErrorDetailCapture::FullDetails {
                    if let Some(sink) = self.config.error_sink.as_mut() {
                        sink.on_error(ErrorDetail {
                            line_number,
                            code,
                            source_name: self.source_name,
                            details: err.full_details(),
                        });
                    }
                }
                let mut record = self.reject(
                    line_number,
                    LineRecordError::Decode {
                        code,
                        summary: err.redacted_summary(),
                    },
                );
                record.raw_line = raw_line;
                record
            }
        }
    }

    fn reject(&mut self, line_number: usize, err: LineRecordError) -> LineRecord<P::Record> {
        self.stats.lines += 1;
        self.stats.rejected_lines += 1;
        debug!(
            source = self.source_name,
            line_number,
            error = %err,
            "rejected metric line"
        );
        LineRecord {
            line_number,
            raw_line: None,
            outcome: Err(err),
        }
    }

    fn capture_line(&mut self, line: &str) -> Option<String> {
        if self.config.capture_raw != CaptureRaw::Line {
            return None;
        }
        let bytes = line.len();
        match self.raw_budget {
            None => {}
            Some(remaining) if bytes <= remaining => self.raw_budget = Some(remaining - bytes),
            Some(_) => return None,
        }
        Some(line.to_string())
    }

    fn stage(&mut self, record: LineRecord<P::Record>, buffer: &mut HistoryBuffer<P::Record>) {
        let Ok(records) = record.outcome else {
            return;
        };
        for decoded in records {
            if !buffer.append(decoded) {
                self.stats.dropped_records += 1;
                warn!(
                    source = self.source_name,
                    line_number = record.line_number,
                    capacity = buffer.capacity(),
                    "history buffer full; dropping record"
                );
            }
        }
    }
}

/// Reads lines from `R`, decodes each with `P`, and yields one [`LineRecord`] per
/// non-blank line. A rejected line never stops iteration; only a read error does.
pub struct LineIngestor<R: Read, P: LineParser> {
    reader: SyncLineReader<R>,
    decoder: FrameDecoder<P>,
}

impl<R: Read, P: LineParser> LineIngestor<R, P> {
    pub fn new(reader: R, parser: P, config: IngestConfig, source_name: &'static str) -> Self {
        Self {
            reader: SyncLineReader::new(reader, config.limits.max_line_bytes),
            decoder: FrameDecoder::new(parser, config, source_name),
        }
    }

    pub fn stats(&self) -> IngestStats {
        self.decoder.stats
    }

    pub fn into_parser(self) -> P {
        self.decoder.parser
    }

    /// Drains the remaining input into `buffer` and returns the final totals.
    pub fn stage_into(&mut self, buffer: &mut HistoryBuffer<P::Record>) -> IngestStats {
        while let Some(record) = self.next() {
            self.decoder.stage(record, buffer);
        }
        self.decoder.stats
    }
}

impl<R: Read, P: LineParser> Iterator for LineIngestor<R, P> {
    type Item = LineRecord<P::Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.reader.next()?;
            if let Some(record) = self.decoder.decode_frame(frame) {
                return Some(record);
            }
        }
    }
}

#[cfg(feature = "tokio")]
mod tokio_ingest {
    use tokio::io::AsyncRead;

    use super::{FrameDecoder, IngestStats};
    use crate::buffer::HistoryBuffer;
    use crate::config::IngestConfig;
    use crate::error::LineRecord;
    use crate::line_parser::LineParser;
    use crate::reader::AsyncLineReader;

    pub struct AsyncLineIngestor<R: AsyncRead + Unpin, P: LineParser> {
        reader: AsyncLineReader<R>,
        decoder: FrameDecoder<P>,
    }

    impl<R: AsyncRead + Unpin, P: LineParser> AsyncLineIngestor<R, P> {
        pub fn new(reader: R, parser: P, config: IngestConfig, source_name: &'static str) -> Self {
            Self {
                reader: AsyncLineReader::new(reader, config.limits.max_line_bytes),
                decoder: FrameDecoder::new(parser, config, source_name),
            }
        }

        pub fn stats(&self) -> IngestStats {
            self.decoder.stats
        }

        pub async fn next_record(&mut self) -> Option<LineRecord<P::Record>> {
            loop {
                let frame = self.reader.next_frame().await?;
                if let Some(record) = self.decoder.decode_frame(frame) {
                    return Some(record);
                }
            }
        }

        pub async fn stage_into(&mut self, buffer: &mut HistoryBuffer<P::Record>) -> IngestStats {
            while let Some(record) = self.next_record().await {
                self.decoder.stage(record, buffer);
            }
            self.decoder.stats
        }
    }

}

#[cfg(feature = "tokio")]
pub use tokio_ingest::AsyncLineIngestor;

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::error::{DecodeError, ErrorCode};
    use crate::{DecoderConfig, ErrorDetailSink, MetricRecord, OverflowPolicy, PutLineDecoder};

    fn decoder() -> PutLineDecoder {
        PutLineDecoder::new(DecoderConfig::new("localhost", ["fqdn"]))
    }

    #[derive(Clone, Default)]
    struct CollectingSink(Arc<Mutex<Vec<ErrorDetail>>>);

    impl ErrorDetailSink for CollectingSink {
        fn on_error(&mut self, detail: ErrorDetail) {
            self.0.lock().unwrap().push(detail);
        }
    }

    #[test]
    fn malformed_lines_do_not_stop_the_stream() {
        let data = b"put a 1447394143 1\r\n\n   \nget a 1 2\nput b 1447394143 x\nput c 1447394143123 3\n";
        let ingestor = LineIngestor::new(
            std::io::Cursor::new(data),
            decoder(),
            IngestConfig::default(),
            "test",
        );
        let records: Vec<_> = ingestor.collect();

        let line_numbers: Vec<_> = records.iter().map(|r| r.line_number).collect();
        assert_eq!(line_numbers, vec![1, 4, 5, 6]);
        assert!(matches!(
            records[1].outcome,
            Err(LineRecordError::Decode {
                code: ErrorCode::MissingDirective,
                ..
            })
        ));
        assert!(matches!(
            records[2].outcome,
            Err(LineRecordError::Decode {
                code: ErrorCode::InvalidValue,
                ..
            })
        ));
        let last: &Vec<MetricRecord> = records[3].outcome.as_ref().unwrap();
        assert_eq!(last[0].metric, "c");
        assert_eq!(last[0].timestamp_millis, 1447394143123);
    }

    #[test]
    fn full_details_reach_the_sink_and_summary_stays_redacted() {
        let sink = CollectingSink::default();
        let config = IngestConfig {
            capture_raw: CaptureRaw::Line,
            error_detail_capture: ErrorDetailCapture::FullDetails,
            error_sink: Some(Box::new(sink.clone())),
            ..IngestConfig::default()
        };
        let mut ingestor = LineIngestor::new(
            std::io::Cursor::new(b"put m 1447394143 s3cret\n"),
            decoder(),
            config,
            "test",
        );

        let record = ingestor.next().unwrap();
        assert_eq!(record.raw_line.as_deref(), Some("put m 1447394143 s3cret"));
        match record.outcome {
            Err(LineRecordError::Decode { code, summary }) => {
                assert_eq!(code, ErrorCode::InvalidValue);
                assert!(!summary.contains("s3cret"));
            }
            other => panic!("expected decode error, got {other:?}"),
        }

        let details = sink.0.lock().unwrap();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].line_number, 1);
        assert_eq!(details[0].source_name, "test");
        assert!(details[0].details.contains("s3cret"));
    }

    #[test]
    fn raw_capture_respects_budget() {
        let mut config = IngestConfig::default();
        config.capture_raw = CaptureRaw::Line;
        config.limits.max_raw_bytes_total = Some(20);

        let data = b"put a 1447394143 1\nput b 1447394143 2\n";
        let records: Vec<_> =
            LineIngestor::new(std::io::Cursor::new(data), decoder(), config, "test").collect();
        assert_eq!(records[0].raw_line.as_deref(), Some("put a 1447394143 1"));
        assert!(records[1].raw_line.is_none());
        assert!(records[1].outcome.is_ok());
    }

    #[test]
    fn oversized_line_is_reported() {
        let mut config = IngestConfig::default();
        config.limits.max_line_bytes = 24;
        let data = b"put a 1447394143 1 host=a-very-long-host-name\nput b 1447394143 2\n";
        let mut ingestor = LineIngestor::new(std::io::Cursor::new(data), decoder(), config, "test");

        let first = ingestor.next().unwrap();
        assert!(matches!(
            first.outcome,
            Err(LineRecordError::LineTooLong {
                max_line_bytes: 24,
                ..
            })
        ));
        assert!(ingestor.next().unwrap().outcome.is_ok());
        assert_eq!(ingestor.stats().rejected_lines, 1);
    }

    #[test]
    fn invalid_utf8_is_a_line_error() {
        let data: &[u8] = b"put a 1447394143 \xff\n";
        let record = LineIngestor::new(data, decoder(), IngestConfig::default(), "test")
            .next()
            .unwrap();
        assert!(matches!(record.outcome, Err(LineRecordError::InvalidUtf8)));
    }

    #[test]
    fn staging_counts_records_refused_by_full_buffer() {
        let data = b"put a 1447394143 1\nput b 1447394143 2\nput c 1447394143 3\nput\n";
        let mut ingestor =
            LineIngestor::new(std::io::Cursor::new(data), decoder(), IngestConfig::default(), "test");
        let mut window = HistoryBuffer::with_policy(2, OverflowPolicy::RejectOnFull).unwrap();

        let stats = ingestor.stage_into(&mut window);
        assert_eq!(
            stats,
            IngestStats {
                lines: 4,
                records: 3,
                rejected_lines: 1,
                dropped_records: 1,
            }
        );
        let metrics: Vec<_> = window.iter().map(|r| r.metric.as_str()).collect();
        assert_eq!(metrics, vec!["a", "b"]);
    }

    #[test]
    fn custom_parsers_plug_into_the_ingestor() {
        struct Words;

        impl LineParser for Words {
            type Record = String;
            type Error = DecodeError;

            fn decode_line(&self, line: &str, out: &mut Vec<String>) -> Result<(), DecodeError> {
                out.extend(line.split_whitespace().map(str::to_string));
                Ok(())
            }
        }

        let mut ingestor =
            LineIngestor::new(std::io::Cursor::new(b"a b\nc\n"), Words, IngestConfig::default(), "words");
        let mut window = HistoryBuffer::new(2).unwrap();
        let stats = ingestor.stage_into(&mut window);
        assert_eq!(stats.records, 3);
        assert_eq!(window.to_vec(), vec!["b", "c"]);
    }
}
