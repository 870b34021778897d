use std::error::Error;

use crate::error::ErrorCode;

/// Turns one framed text line into zero or more records.
///
/// Implementations append to `out` only on success; a failed line leaves `out` untouched.
pub trait LineParser {
    type Record;
    type Error: ClassifiedParserError;

    fn decode_line(&self, line: &str, out: &mut Vec<Self::Record>) -> Result<(), Self::Error>;
}

pub trait ClassifiedParserError: Error {
    fn code(&self) -> ErrorCode;
    /// Summary that never echoes line content.
    fn redacted_summary(&self) -> String;
    fn full_details(&self) -> String;
}
