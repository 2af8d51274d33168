//! Enumerate message files inside one mailbox.

use std::path::Path;

use tracing::trace;
use walkdir::WalkDir;

use crate::error::{ExtractError, Result};
use crate::model::mailbox::{Mailbox, MESSAGE_DIRS};

/// Call `on_file` for every regular file under the mailbox's `cur`, `new`
/// and `tmp` directories, in that order, sorted by name within each.
///
/// Missing subdirectories are skipped. Symlinked files and directories are
/// never read or entered. A directory that cannot be read ends the walk
/// with an error; files already visited stay visited.
///
/// Returns the number of files visited.
pub fn walk_messages(mailbox: &Mailbox, on_file: &mut dyn FnMut(&Path)) -> Result<usize> {
    let mut visited = 0;

    for sub in MESSAGE_DIRS {
        let dir = mailbox.path.join(sub);
        match std::fs::symlink_metadata(&dir) {
            Ok(m) if m.is_dir() => {}
            _ => {
                trace!(dir = %dir.display(), "No message directory");
                continue;
            }
        }

        for entry in WalkDir::new(&dir).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(|source| ExtractError::Walk {
                path: source
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| dir.clone()),
                source,
            })?;

            // With follow_links(false) a symlink reports its own type
            if entry.file_type().is_file() {
                on_file(entry.path());
                visited += 1;
            }
        }
    }

    Ok(visited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn collect(mailbox: &Mailbox) -> Vec<PathBuf> {
        let mut files = Vec::new();
        walk_messages(mailbox, &mut |p| files.push(p.to_path_buf())).unwrap();
        files
    }

    #[test]
    fn test_walks_cur_new_tmp_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        for sub in ["tmp", "new", "cur"] {
            fs::create_dir(root.join(sub)).unwrap();
        }
        fs::write(root.join("new/b"), b"").unwrap();
        fs::write(root.join("cur/z"), b"").unwrap();
        fs::write(root.join("cur/a"), b"").unwrap();
        fs::write(root.join("tmp/c"), b"").unwrap();
        fs::create_dir(root.join("cur/nested")).unwrap();
        fs::write(root.join("cur/nested/d"), b"").unwrap();

        let files = collect(&Mailbox::inbox(root));
        let rel: Vec<PathBuf> = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            rel,
            vec![
                PathBuf::from("cur/a"),
                PathBuf::from("cur/nested/d"),
                PathBuf::from("cur/z"),
                PathBuf::from("new/b"),
                PathBuf::from("tmp/c"),
            ]
        );
    }

    #[test]
    fn test_missing_subdirectories_are_fine() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("new")).unwrap();
        fs::write(tmp.path().join("new/1"), b"").unwrap();
        assert_eq!(collect(&Mailbox::inbox(tmp.path())).len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("mail");
        let outside = tmp.path().join("outside");
        fs::create_dir_all(root.join("cur")).unwrap();
        fs::create_dir_all(&outside).unwrap();
        fs::write(outside.join("secret"), b"").unwrap();
        fs::write(root.join("cur/real"), b"").unwrap();
        std::os::unix::fs::symlink(outside.join("secret"), root.join("cur/link")).unwrap();
        std::os::unix::fs::symlink(&outside, root.join("cur/dirlink")).unwrap();
        std::os::unix::fs::symlink(&outside, root.join("new")).unwrap();

        let files = collect(&Mailbox::inbox(&root));
        assert_eq!(files, vec![root.join("cur/real")]);
    }
}
