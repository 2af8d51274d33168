//! Maildir mailbox identity.

use std::path::PathBuf;

/// Name given to the Maildir root when it is itself a mailbox.
pub const INBOX: &str = "INBOX";

/// Subdirectories that mark a directory as a Maildir mailbox.
pub const MESSAGE_DIRS: [&str; 3] = ["cur", "new", "tmp"];

/// A discovered mailbox.
///
/// # Examples
/// - `<root>` → `name = "INBOX"`
/// - `<root>/.Archive.2023` → `name = "Archive.2023"`
/// - `<root>/work/.Invoices` → `name = "work/.Invoices"`
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Mailbox {
    /// Logical name, `/`-separated, with one leading `.` removed.
    pub name: String,
    /// Directory holding the `cur`/`new`/`tmp` subdirectories.
    pub path: PathBuf,
}

impl Mailbox {
    /// The root mailbox.
    pub fn inbox(path: impl Into<PathBuf>) -> Self {
        Self {
            name: INBOX.to_string(),
            path: path.into(),
        }
    }
}
