//! Extracted PDF attachments and the records produced when they are saved.

use std::path::PathBuf;

use chrono::{DateTime, FixedOffset};

/// Filename used when a PDF part carries no usable name.
pub const DEFAULT_FILENAME: &str = "attachment.pdf";

/// A decoded PDF waiting to be written.
///
/// Lives only between decoding and writing.
#[derive(Debug, Clone)]
pub struct ExtractedAttachment {
    /// Suggested filename from the part headers (not yet sanitized).
    pub filename: String,

    /// Decoded binary payload.
    pub data: Vec<u8>,

    /// Message file the attachment came from.
    pub source: PathBuf,

    /// Logical name of the mailbox holding the message.
    pub mailbox: String,

    /// Parsed `Date:` of the message, if any.
    pub timestamp: Option<DateTime<FixedOffset>>,
}

/// Record of a PDF written to disk.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SavedPdf {
    /// Final path after sanitizing and collision resolution.
    pub output_path: PathBuf,

    /// Message file the attachment came from.
    pub source_path: PathBuf,

    /// Logical mailbox name.
    pub mailbox: String,

    /// Bytes written.
    pub size: u64,

    /// Timestamp applied to the file, if one was set successfully.
    pub timestamp: Option<DateTime<FixedOffset>>,
}
