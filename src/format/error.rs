//! Error types for label text encoding and decoding.

use thiserror::Error;

/// Errors from the YOLO row codec.
#[derive(Error, Debug)]
pub enum LabelFormatError {
    /// A single label row failed to parse. Recovered locally: the document
    /// decoder skips the row and continues.
    #[error("Malformed label row: {message}")]
    MalformedRow { message: String },
}

impl LabelFormatError {
    /// Create a malformed-row error with a custom message.
    pub fn malformed_row(message: impl Into<String>) -> Self {
        Self::MalformedRow {
            message: message.into(),
        }
    }
}
