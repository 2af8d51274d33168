//! Mailbox discovery over a Maildir (or Maildir++) tree.

use std::path::Path;

use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::error::{ExtractError, Result};
use crate::model::mailbox::{Mailbox, INBOX, MESSAGE_DIRS};

/// Find every mailbox under `root`.
///
/// The root comes first as `INBOX` when it is a mailbox itself, followed by
/// qualifying directories in depth-first order (siblings sorted by name).
/// Symbolic links are never followed below the root.
pub fn discover_mailboxes(root: &Path) -> Result<Vec<Mailbox>> {
    let metadata = std::fs::metadata(root).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ExtractError::RootNotFound(root.to_path_buf())
        } else {
            ExtractError::io(root, e)
        }
    })?;
    if !metadata.is_dir() {
        return Err(ExtractError::NotADirectory(root.to_path_buf()));
    }

    let mut mailboxes = Vec::new();
    if is_mailbox(root) {
        mailboxes.push(Mailbox::inbox(root));
    }

    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.map_err(|source| ExtractError::Discovery {
            path: source
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf()),
            source,
        })?;

        if entry.path_is_symlink() {
            trace!(path = %entry.path().display(), "Skipping symlink");
            continue;
        }
        if !entry.file_type().is_dir() || !is_mailbox(entry.path()) {
            continue;
        }

        let name = mailbox_name(root, entry.path());
        debug!(name = %name, path = %entry.path().display(), "Found mailbox");
        mailboxes.push(Mailbox {
            name,
            path: entry.path().to_path_buf(),
        });
    }

    Ok(mailboxes)
}

/// A mailbox directly contains a real `cur`, `new` or `tmp` directory.
pub fn is_mailbox(dir: &Path) -> bool {
    MESSAGE_DIRS.iter().any(|sub| {
        std::fs::symlink_metadata(dir.join(sub))
            .map(|m| m.is_dir())
            .unwrap_or(false)
    })
}

/// Logical name for a mailbox directory.
///
/// `"/mail/.Sent"` under `"/mail"` → `"Sent"`; nested levels are joined with `/`.
pub fn mailbox_name(root: &Path, dir: &Path) -> String {
    let relative = dir.strip_prefix(root).unwrap_or(dir);
    let name = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    if name.is_empty() {
        return INBOX.to_string();
    }
    match name.strip_prefix('.') {
        Some(rest) => rest.to_string(),
        None => name,
    }
}
