//! Scan a Maildir tree and extract every PDF attachment.
//!
//! Only discovery failures are returned as errors. Everything after that
//! degrades to [`ScanEvent::Warning`] at the narrowest scope that contains
//! the failure, so one broken message never stops the rest of the scan.

use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{ExtractError, Result};
use crate::export::pdf::PdfWriter;
use crate::maildir::locator::discover_mailboxes;
use crate::maildir::walker::walk_messages;
use crate::model::attachment::ExtractedAttachment;
use crate::model::event::{ScanEvent, ScanSummary, ScanWarning, WarningScope};
use crate::model::mailbox::Mailbox;
use crate::parser::decode::decode_body;
use crate::parser::message::Message;
use crate::parser::mime::{find_pdf_parts, PdfPart};

/// Knobs for one scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Directory receiving the PDFs.
    pub output_dir: PathBuf,
    pub max_nesting_depth: usize,
    pub max_message_size: u64,
    pub decode_quoted_printable: bool,
}

impl ScanOptions {
    /// Defaults, writing into `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self::from_config(&Config::default(), output_dir)
    }

    pub fn from_config(config: &Config, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            max_nesting_depth: config.performance.max_nesting_depth,
            max_message_size: config.performance.max_message_size,
            decode_quoted_printable: config.decode.quoted_printable,
        }
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::new(".")
    }
}

/// Discover the mailboxes under `root` and extract their PDFs.
///
/// Every written file and every skipped item is reported through
/// `on_event` as it happens.
pub fn scan_maildir(
    root: &Path,
    options: &ScanOptions,
    on_event: &mut dyn FnMut(&ScanEvent),
) -> Result<ScanSummary> {
    let mailboxes = discover_mailboxes(root)?;
    info!(
        root = %root.display(),
        count = mailboxes.len(),
        "Discovered mailboxes"
    );

    let mut scanner = Scanner {
        options,
        writer: PdfWriter::new(&options.output_dir),
        on_event,
        summary: ScanSummary::default(),
    };
    for mailbox in &mailboxes {
        scanner.scan_mailbox(mailbox);
    }

    Ok(scanner.summary)
}

struct Scanner<'a> {
    options: &'a ScanOptions,
    writer: PdfWriter,
    on_event: &'a mut dyn FnMut(&ScanEvent),
    summary: ScanSummary,
}

impl Scanner<'_> {
    fn emit(&mut self, event: ScanEvent) {
        match &event {
            ScanEvent::MailboxStarted(_) => self.summary.mailboxes += 1,
            ScanEvent::Saved(saved) => {
                self.summary.pdfs_saved += 1;
                self.summary.bytes_written += saved.size;
            }
            ScanEvent::Warning(_) => self.summary.warnings += 1,
        }
        (self.on_event)(&event);
    }

    fn warn(&mut self, scope: WarningScope, mailbox: &str, path: &Path, reason: String) {
        debug!(
            scope = %scope,
            mailbox,
            path = %path.display(),
            reason = %reason,
            "Skipped"
        );
        self.emit(ScanEvent::Warning(ScanWarning {
            scope,
            mailbox: mailbox.to_string(),
            path: path.to_path_buf(),
            reason,
        }));
    }

    fn scan_mailbox(&mut self, mailbox: &Mailbox) {
        info!(mailbox = %mailbox.name, path = %mailbox.path.display(), "Scanning mailbox");
        self.emit(ScanEvent::MailboxStarted(mailbox.clone()));

        let result = walk_messages(mailbox, &mut |path| self.handle_file(path, mailbox));
        if let Err(e) = result {
            self.warn(
                WarningScope::Mailbox,
                &mailbox.name,
                &mailbox.path,
                e.to_string(),
            );
        }
    }

    fn handle_file(&mut self, path: &Path, mailbox: &Mailbox) {
        self.summary.messages += 1;
        if let Err(e) = self.process_message(path, mailbox) {
            self.warn(WarningScope::Message, &mailbox.name, path, e.to_string());
        }
    }

    fn process_message(&mut self, path: &Path, mailbox: &Mailbox) -> Result<()> {
        let message = Message::from_file(path, self.options.max_message_size)?;
        let timestamp = message.date();
        debug!(path = %path.display(), has_date = timestamp.is_some(), "Parsed message");

        for found in find_pdf_parts(&message, self.options.max_nesting_depth) {
            match found {
                Ok(part) => self.extract_part(&part, path, mailbox, timestamp),
                Err(e) => self.warn(WarningScope::Part, &mailbox.name, path, e.to_string()),
            }
        }
        Ok(())
    }

    fn extract_part(
        &mut self,
        part: &PdfPart<'_>,
        source: &Path,
        mailbox: &Mailbox,
        timestamp: Option<DateTime<FixedOffset>>,
    ) {
        let data = match decode_body(
            part.body,
            &part.encoding,
            self.options.decode_quoted_printable,
        ) {
            Ok(data) => data,
            Err(e) => {
                self.attachment_warning(mailbox, source, &part.filename, &e);
                return;
            }
        };

        let attachment = ExtractedAttachment {
            filename: part.filename.clone(),
            data,
            source: source.to_path_buf(),
            mailbox: mailbox.name.clone(),
            timestamp,
        };

        match self.writer.save(&attachment) {
            Ok(outcome) => {
                let output_path = outcome.saved.output_path.clone();
                self.emit(ScanEvent::Saved(outcome.saved));
                if let Some(e) = outcome.timestamp_error {
                    self.warn(
                        WarningScope::Attachment,
                        &mailbox.name,
                        &output_path,
                        format!("could not set timestamp: {e}"),
                    );
                }
            }
            Err(e) => self.attachment_warning(mailbox, source, &part.filename, &e),
        }
    }

    fn attachment_warning(
        &mut self,
        mailbox: &Mailbox,
        source: &Path,
        filename: &str,
        error: &ExtractError,
    ) {
        self.warn(
            WarningScope::Attachment,
            &mailbox.name,
            source,
            format!("{filename}: {error}"),
        );
    }
}
