//! Write extracted PDFs to the output directory.
//!
//! Names are sanitized, never overwrite an existing entry, and the file
//! timestamps follow the source message's `Date:` header.

use std::fs::{File, FileTimes, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{ExtractError, Result};
use crate::model::attachment::{ExtractedAttachment, SavedPdf, DEFAULT_FILENAME};

/// Characters that are replaced with `_` in output names.
const UNSAFE_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Result of a successful write.
#[derive(Debug)]
pub struct WriteOutcome {
    pub saved: SavedPdf,
    /// Set when the file was written but its timestamp could not be applied.
    pub timestamp_error: Option<ExtractError>,
}

/// Writes attachments into one output directory.
#[derive(Debug, Clone)]
pub struct PdfWriter {
    output_dir: PathBuf,
}

impl PdfWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Write one attachment under a fresh, collision-free name.
    pub fn save(&self, attachment: &ExtractedAttachment) -> Result<WriteOutcome> {
        let filename = sanitize_filename(&attachment.filename);
        let (path, mut file) = self.create_unique(&filename)?;

        write_or_remove(&path, &mut file, &attachment.data)?;

        let mut timestamp = None;
        let mut timestamp_error = None;
        if let Some(ts) = attachment.timestamp {
            match set_file_times(&file, SystemTime::from(ts)) {
                Ok(()) => timestamp = Some(ts),
                Err(e) => timestamp_error = Some(ExtractError::io(&path, e)),
            }
        }

        tracing::debug!(
            path = %path.display(),
            bytes = attachment.data.len(),
            "Wrote PDF"
        );

        Ok(WriteOutcome {
            saved: SavedPdf {
                output_path: path,
                source_path: attachment.source.clone(),
                mailbox: attachment.mailbox.clone(),
                size: attachment.data.len() as u64,
                timestamp,
            },
            timestamp_error,
        })
    }

    /// Create `name` in the output directory, or the first free
    /// `{stem}_{n}{ext}` variant.
    fn create_unique(&self, name: &str) -> Result<(PathBuf, File)> {
        let (stem, ext) = split_extension(name);
        let mut candidate = self.output_dir.join(name);
        let mut counter: u64 = 1;

        loop {
            // An existing entry of any kind, dangling symlinks included, is taken
            if std::fs::symlink_metadata(&candidate).is_err() {
                match create_new(&candidate) {
                    Ok(file) => return Ok((candidate, file)),
                    Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
                    Err(e) => return Err(ExtractError::io(&candidate, e)),
                }
            }
            candidate = self.output_dir.join(format!("{stem}_{counter}{ext}"));
            counter += 1;
        }
    }
}

fn create_new(path: &Path) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }
    options.open(path)
}

/// Write `data`, deleting the freshly created `path` if the write fails.
fn write_or_remove(path: &Path, mut out: impl Write, data: &[u8]) -> Result<()> {
    if let Err(e) = out.write_all(data) {
        if let Err(remove_err) = std::fs::remove_file(path) {
            tracing::debug!(path = %path.display(), error = %remove_err, "Could not remove partial file");
        }
        return Err(ExtractError::io(path, e));
    }
    Ok(())
}

fn set_file_times(file: &File, time: SystemTime) -> std::io::Result<()> {
    file.set_times(FileTimes::new().set_accessed(time).set_modified(time))
}

/// Replace path and shell-hostile characters with `_`.
///
/// Empty names, `.` and `..` become `attachment.pdf`.
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| if UNSAFE_CHARS.contains(&c) { '_' } else { c })
        .collect();

    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        DEFAULT_FILENAME.to_string()
    } else {
        sanitized
    }
}

/// Split on the last `.`: `"doc.pdf"` → `("doc", ".pdf")`, `"doc"` → `("doc", "")`.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) => (&name[..pos], &name[pos..]),
        None => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn attachment(name: &str, data: &[u8]) -> ExtractedAttachment {
        ExtractedAttachment {
            filename: name.to_string(),
            data: data.to_vec(),
            source: PathBuf::from("/mail/cur/1"),
            mailbox: "INBOX".to_string(),
            timestamp: None,
        }
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("a:b.pdf"), "a_b.pdf");
        assert_eq!(sanitize_filename("../etc/passwd"), ".._etc_passwd");
        assert_eq!(sanitize_filename(r#"a\b*c?d"e<f>g|h.pdf"#), "a_b_c_d_e_f_g_h.pdf");
        assert_eq!(sanitize_filename(""), "attachment.pdf");
        assert_eq!(sanitize_filename(".."), "attachment.pdf");
        assert_eq!(sanitize_filename("Rechnung März.pdf"), "Rechnung März.pdf");
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("doc.pdf"), ("doc", ".pdf"));
        assert_eq!(split_extension("a.b.pdf"), ("a.b", ".pdf"));
        assert_eq!(split_extension("noext"), ("noext", ""));
        assert_eq!(split_extension(".pdf"), ("", ".pdf"));
    }

    #[test]
    fn test_collisions_get_counters() {
        let dir = tempfile::tempdir().unwrap();
        let writer = PdfWriter::new(dir.path());

        let first = writer.save(&attachment("doc.pdf", b"one")).unwrap();
        let second = writer.save(&attachment("doc.pdf", b"two")).unwrap();
        let third = writer.save(&attachment("doc.pdf", b"three")).unwrap();

        assert_eq!(first.saved.output_path, dir.path().join("doc.pdf"));
        assert_eq!(second.saved.output_path, dir.path().join("doc_1.pdf"));
        assert_eq!(third.saved.output_path, dir.path().join("doc_2.pdf"));
        assert_eq!(std::fs::read(dir.path().join("doc.pdf")).unwrap(), b"one");
        assert_eq!(std::fs::read(dir.path().join("doc_1.pdf")).unwrap(), b"two");
    }

    #[test]
    fn test_existing_files_are_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("report.pdf"), b"keep me").unwrap();
        std::fs::create_dir(dir.path().join("report_1.pdf")).unwrap();

        let writer = PdfWriter::new(dir.path());
        let outcome = writer.save(&attachment("report.pdf", b"new")).unwrap();

        assert_eq!(outcome.saved.output_path, dir.path().join("report_2.pdf"));
        assert_eq!(std::fs::read(dir.path().join("report.pdf")).unwrap(), b"keep me");
    }

    #[test]
    fn test_name_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        let writer = PdfWriter::new(dir.path());
        writer.save(&attachment("scan", b"1")).unwrap();
        let second = writer.save(&attachment("scan", b"2")).unwrap();
        assert_eq!(second.saved.output_path, dir.path().join("scan_1"));
    }

    #[test]
    fn test_timestamp_applied() {
        let dir = tempfile::tempdir().unwrap();
        let writer = PdfWriter::new(dir.path());
        let ts = DateTime::parse_from_rfc2822("Mon, 02 Jan 2006 15:04:05 -0700").unwrap();
        let mut att = attachment("dated.pdf", b"%PDF");
        att.timestamp = Some(ts);

        let outcome = writer.save(&att).unwrap();
        assert!(outcome.timestamp_error.is_none());
        assert_eq!(outcome.saved.timestamp, Some(ts));

        let modified = std::fs::metadata(&outcome.saved.output_path)
            .unwrap()
            .modified()
            .unwrap();
        assert_eq!(modified, SystemTime::from(ts));
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_write_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.pdf");
        std::fs::write(&path, b"").unwrap();

        let err = write_or_remove(&path, FailingWriter, b"%PDF").unwrap_err();
        assert!(matches!(err, ExtractError::Io { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_successful_write_keeps_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("whole.pdf");
        let mut file = std::fs::File::create(&path).unwrap();

        write_or_remove(&path, &mut file, b"%PDF").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF");
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let writer = PdfWriter::new(dir.path().join("missing"));
        let err = writer.save(&attachment("doc.pdf", b"x")).unwrap_err();
        assert!(matches!(err, ExtractError::Io { .. }));
    }
}
