//! Events emitted while scanning, consumed by the CLI.

use std::path::PathBuf;

use super::attachment::SavedPdf;
use super::mailbox::Mailbox;

/// How far a recoverable failure reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningScope {
    /// The rest of one mailbox was skipped.
    Mailbox,
    /// One message file was skipped.
    Message,
    /// One branch of a message's MIME tree was skipped.
    Part,
    /// One attachment was skipped, or written without its timestamp.
    Attachment,
}

impl std::fmt::Display for WarningScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Mailbox => "mailbox",
            Self::Message => "message",
            Self::Part => "part",
            Self::Attachment => "attachment",
        };
        f.write_str(s)
    }
}

/// A recoverable failure.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScanWarning {
    pub scope: WarningScope,
    /// Mailbox being processed.
    pub mailbox: String,
    /// File or directory the failure is about.
    pub path: PathBuf,
    /// Human-readable cause.
    pub reason: String,
}

/// One item of the scan's event stream.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScanEvent {
    /// Processing of a mailbox begins.
    MailboxStarted(Mailbox),
    /// A PDF was written.
    Saved(SavedPdf),
    /// Something was skipped.
    Warning(ScanWarning),
}

/// Totals for a finished scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ScanSummary {
    pub mailboxes: usize,
    pub messages: usize,
    pub pdfs_saved: usize,
    pub bytes_written: u64,
    pub warnings: usize,
}
