//! Centralized error types for maildir2pdf.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the maildir2pdf library.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified message file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// The Maildir root does not exist.
    #[error("Maildir root not found: {0}")]
    RootNotFound(PathBuf),

    /// The Maildir root exists but is not a directory.
    #[error("Maildir root is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Mailbox discovery could not read part of the tree.
    #[error("Failed to discover mailboxes under '{path}': {source}")]
    Discovery {
        path: PathBuf,
        source: walkdir::Error,
    },

    /// A mailbox's message directory could not be walked.
    #[error("Failed to walk '{path}': {source}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },

    /// The file does not parse as a mail message.
    #[error("Parse error in '{path}': {reason}")]
    ParseError { path: PathBuf, reason: String },

    /// The message is larger than the configured limit.
    #[error("Message '{path}' is {size} bytes, over the {limit} byte limit")]
    MessageTooLarge { path: PathBuf, size: u64, limit: u64 },

    /// A MIME structure error (unsplittable multipart, bad nested Content-Type).
    #[error("MIME error: {0}")]
    MimeError(String),

    /// Multipart containers nested beyond the configured depth.
    #[error("Multipart nesting exceeds {0} levels")]
    NestingTooDeep(usize),

    /// The base64 payload of an attachment is invalid.
    #[error("Invalid base64 content: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Convenience alias for `Result<T, ExtractError>`.
pub type Result<T> = std::result::Result<T, ExtractError>;

impl ExtractError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a `ParseError` variant.
    pub fn parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ParseError {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
