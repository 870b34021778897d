/// One newline-delimited unit of input.
#[derive(Debug, Eq, PartialEq)]
pub enum Frame {
    Line {
        line_number: usize,
        bytes: Vec<u8>,
    },
    LineTooLong {
        line_number: usize,
        observed_bytes: usize,
        max_line_bytes: usize,
    },
    IoError {
        line_number: usize,
    },
}

/// Splits a byte stream into lines without holding more than `max_line_bytes` of any line.
///
/// Oversized lines are consumed up to their newline and reported as [`Frame::LineTooLong`].
pub(crate) struct LineFramer {
    max_line_bytes: usize,
    current_line: Vec<u8>,
    observed_bytes: usize,
    discarding: bool,
    line_number: usize,
}

impl LineFramer {
    pub(crate) fn new(max_line_bytes: usize) -> Self {
        Self {
            max_line_bytes,
            current_line: Vec::new(),
            observed_bytes: 0,
            discarding: false,
            line_number: 0,
        }
    }

    /// Consumes `chunk` up to and including the next newline.
    ///
    /// Returns how many bytes were consumed and the completed frame, if any.
    pub(crate) fn feed(&mut self, chunk: &[u8]) -> (usize, Option<Frame>) {
        match chunk.iter().position(|b| *b == b'\n') {
            Some(newline_idx) => {
                self.take_bytes(&chunk[..newline_idx]);
                (newline_idx + 1, Some(self.finish_line()))
            }
            None => {
                self.take_bytes(chunk);
                (chunk.len(), None)
            }
        }
    }

    /// Flushes a trailing line that had no newline.
    pub(crate) fn finish(&mut self) -> Option<Frame> {
        if self.discarding || !self.current_line.is_empty() {
            Some(self.finish_line())
        } else {
            None
        }
    }

    pub(crate) fn io_error(&mut self) -> Frame {
        self.line_number += 1;
        self.reset();
        Frame::IoError {
            line_number: self.line_number,
        }
    }

    fn take_bytes(&mut self, bytes: &[u8]) {
        self.observed_bytes = self.observed_bytes.saturating_add(bytes.len());
        if self.discarding {
            return;
        }
        if self.observed_bytes > self.max_line_bytes {
            self.discarding = true;
            self.current_line = Vec::new();
            return;
        }
        self.current_line.extend_from_slice(bytes);
    }

    fn finish_line(&mut self) -> Frame {
        self.line_number += 1;
        let line_number = self.line_number;
        let frame = if self.discarding {
            Frame::LineTooLong {
                line_number,
                observed_bytes: self.observed_bytes,
                max_line_bytes: self.max_line_bytes,
            }
        } else {
            Frame::Line {
                line_number,
                bytes: std::mem::take(&mut self.current_line),
            }
        };
        self.reset();
        frame
    }

    fn reset(&mut self) {
        self.current_line.clear();
        self.observed_bytes = 0;
        self.discarding = false;
    }
}
