//! Parser for individual Maildir message files (RFC 5322 messages).

use std::path::Path;

use chrono::{DateTime, FixedOffset};

use crate::error::{ExtractError, Result};
use crate::parser::header::{self, Headers};

/// A message file: validated header fields plus the raw bytes.
///
/// The raw bytes start at the first header line; an mbox `From ` envelope
/// line and a UTF-8 BOM are already stripped.
#[derive(Debug, Clone)]
pub struct Message {
    headers: Headers,
    raw: Vec<u8>,
}

impl Message {
    /// Read and parse a message file.
    ///
    /// Files over `max_size` bytes are rejected before being read.
    pub fn from_file(path: impl AsRef<Path>, max_size: u64) -> Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|e| map_open_error(path, e))?;
        if metadata.len() > max_size {
            return Err(ExtractError::MessageTooLarge {
                path: path.to_path_buf(),
                size: metadata.len(),
                limit: max_size,
            });
        }

        let data = std::fs::read(path).map_err(|e| map_open_error(path, e))?;
        Self::parse(&data).map_err(|reason| ExtractError::parse(path, reason))
    }

    /// Parse raw message bytes.
    ///
    /// An empty header block is accepted; an empty file or a header block
    /// with malformed lines is not.
    pub fn parse(data: &[u8]) -> std::result::Result<Self, String> {
        let data = skip_from_line(data);
        if data.is_empty() {
            return Err("empty message".to_string());
        }

        let headers = Headers::parse(header_block(data))?;
        Ok(Self {
            headers,
            raw: data.to_vec(),
        })
    }

    /// The whole message, headers included.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// The `Date:` header as a timestamp, if present and parseable.
    pub fn date(&self) -> Option<DateTime<FixedOffset>> {
        self.headers.get("date").and_then(header::parse_date)
    }
}

fn map_open_error(path: &Path, e: std::io::Error) -> ExtractError {
    if e.kind() == std::io::ErrorKind::NotFound {
        ExtractError::FileNotFound(path.to_path_buf())
    } else {
        ExtractError::io(path, e)
    }
}

/// The header block: everything before the first blank line.
///
/// Without a blank line the whole input is headers.
fn header_block(data: &[u8]) -> &[u8] {
    // A blank first line means an empty header block
    if data.starts_with(b"\r\n") || data.starts_with(b"\n") {
        return &[];
    }

    match find_header_end(data) {
        Some(end) => &data[..end],
        None => data,
    }
}

/// Offset of the line break that terminates the last header line.
fn find_header_end(data: &[u8]) -> Option<usize> {
    // Look for \n\n or \n\r\n
    (0..data.len().saturating_sub(1)).find(|&i| {
        data[i] == b'\n'
            && (data[i + 1] == b'\n' || (data[i + 1] == b'\r' && data.get(i + 2) == Some(&b'\n')))
    })
}

/// Skip an mbox-style `From ` envelope line some delivery agents leave in place.
fn skip_from_line(data: &[u8]) -> &[u8] {
    // Handle BOM
    let data = if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &data[3..]
    } else {
        data
    };

    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_header_end() {
        // "From: a@b.com\n" = 14 bytes, "Subject: Hi\n" = 12 bytes
        let data = b"From: a@b.com\nSubject: Hi\n\nBody\n";
        assert_eq!(find_header_end(data), Some(25));
    }

    #[test]
    fn test_find_header_end_crlf() {
        // "From: a@b.com\r\n" = 15 bytes, "Subject: Hi\r\n" = 13 bytes
        let data = b"From: a@b.com\r\nSubject: Hi\r\n\r\nBody\r\n";
        assert_eq!(find_header_end(data), Some(27));
    }

    #[test]
    fn test_header_block() {
        assert_eq!(header_block(b"A: 1\r\nB: 2\r\n\r\nhello\r\n"), b"A: 1\r\nB: 2\r");
        assert_eq!(header_block(b"A: 1\nB: 2\n"), b"A: 1\nB: 2\n");
        assert!(header_block(b"\r\n%PDF-1.4").is_empty());
    }

    #[test]
    fn test_parse_message() {
        let msg = Message::parse(
            b"From: a@b.com\nDate: Mon, 02 Jan 2006 15:04:05 -0700\nSubject: Hi\n\nBody\n",
        )
        .unwrap();
        assert_eq!(msg.headers.get("subject"), Some("Hi"));
        assert!(msg.raw().ends_with(b"\n\nBody\n"));
        assert_eq!(msg.date().unwrap().timestamp(), 1136239445);
    }

    #[test]
    fn test_parse_message_skips_envelope_line() {
        let msg = Message::parse(b"From sender@example.com Mon Jan  2 15:04:05 2006\nSubject: Hi\n\nx").unwrap();
        assert_eq!(msg.headers.get("subject"), Some("Hi"));
        assert!(msg.raw().starts_with(b"Subject: Hi"));
    }

    #[test]
    fn test_parse_message_without_date() {
        let msg = Message::parse(b"Subject: Hi\n\nBody").unwrap();
        assert!(msg.date().is_none());
    }

    #[test]
    fn test_parse_accepts_empty_header_block() {
        let msg = Message::parse(b"\n\nbody").unwrap();
        assert!(msg.headers.get("content-type").is_none());
        assert!(Message::parse(b"\r\n%PDF-1.4").is_ok());
    }

    #[test]
    fn test_parse_rejects_empty_and_garbage() {
        assert!(Message::parse(b"").is_err());
        assert!(Message::parse(b"%PDF-1.4 binary junk\nmore junk\n").is_err());
        assert!(Message::parse(b"   leading continuation\n\nbody").is_err());
    }
}
