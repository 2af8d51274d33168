//! MIME traversal: walk a message's part tree and collect its PDF leaves.
//!
//! Structure, parameter decoding (RFC 2231 continuations, RFC 2047 words)
//! and multipart splitting come from `mail-parser`. Bodies are sliced from
//! the raw message so they are still transfer-encoded.

use std::collections::BTreeSet;

use mail_parser::{
    ContentType, GetHeader, HeaderName, MessageParser, MessagePart, MimeHeaders,
};
use tracing::{debug, trace};

use crate::error::{ExtractError, Result};
use crate::model::attachment::DEFAULT_FILENAME;
use crate::parser::message::Message;

/// Default maximum depth for nested multipart containers.
pub const MAX_DEPTH: usize = 32;

/// A PDF leaf found in a message.
#[derive(Debug, Clone)]
pub struct PdfPart<'a> {
    /// Suggested filename, RFC 2047/2231 decoded, not yet sanitized.
    pub filename: String,
    /// Declared `Content-Transfer-Encoding` (may be empty).
    pub encoding: String,
    /// Raw, still transfer-encoded body.
    pub body: &'a [u8],
}

/// Find every PDF part of a message, depth first, in physical order.
///
/// The top level must declare exactly `application/pdf` or a well-formed
/// `multipart/*` type with a boundary. Nested parts count as PDF when their
/// declared `Content-Type` contains `application/pdf` as written.
///
/// Each `Err` entry is a branch that could not be split; entries before it
/// are unaffected and siblings of the failed branch still follow.
pub fn find_pdf_parts(message: &Message, max_depth: usize) -> Vec<Result<PdfPart<'_>>> {
    let mut found = Vec::new();
    let raw = message.raw();

    let Some(parsed) = MessageParser::default().parse(raw) else {
        debug!("Message has no parseable structure, nothing to extract");
        return found;
    };
    let root = parsed.root_part();

    let Some(declared) = declared_content_type(raw, root) else {
        debug!("Message has no Content-Type, nothing to extract");
        return found;
    };
    if let Err(reason) = check_media_type(&declared) {
        debug!(content_type = %declared, reason = %reason, "Unparseable Content-Type");
        return found;
    }
    let Some(content_type) = root.content_type() else {
        return found;
    };

    let mime = media_type(content_type);
    if mime.starts_with("multipart/") {
        match boundary(content_type) {
            Some(boundary) => {
                let tree = PartTree {
                    raw,
                    parts: &parsed.parts,
                    max_depth,
                };
                tree.visit_multipart(root, boundary, 1, &mut found);
            }
            None => debug!(content_type = %declared, "Multipart message without boundary"),
        }
    } else if mime == "application/pdf" {
        found.push(Ok(PdfPart {
            filename: DEFAULT_FILENAME.to_string(),
            encoding: transfer_encoding(root),
            body: raw_body(raw, root),
        }));
    }

    found
}

/// The flattened part list of one parsed message.
struct PartTree<'p, 'a> {
    raw: &'a [u8],
    parts: &'p [MessagePart<'a>],
    max_depth: usize,
}

impl<'a> PartTree<'_, 'a> {
    fn visit_multipart(
        &self,
        container: &MessagePart<'_>,
        boundary: &str,
        depth: usize,
        found: &mut Vec<Result<PdfPart<'a>>>,
    ) {
        if depth > self.max_depth {
            found.push(Err(ExtractError::NestingTooDeep(self.max_depth)));
            return;
        }

        let Some(children) = container.sub_parts() else {
            found.push(Err(ExtractError::MimeError(format!(
                "multipart body has no opening boundary {boundary:?}"
            ))));
            return;
        };
        if !has_closing_delimiter(raw_body(self.raw, container), boundary) {
            found.push(Err(ExtractError::MimeError(format!(
                "multipart body has no closing boundary {boundary:?}"
            ))));
            return;
        }

        for &id in children {
            if let Some(part) = self.parts.get(id) {
                self.visit_part(part, depth, found);
            }
        }
    }

    fn visit_part(
        &self,
        part: &MessagePart<'_>,
        depth: usize,
        found: &mut Vec<Result<PdfPart<'a>>>,
    ) {
        let declared = declared_content_type(self.raw, part).unwrap_or_default();

        // Nested parts match on the declared value as written
        if declared.contains("application/pdf") {
            let filename = part
                .attachment_name()
                .filter(|name| !name.is_empty())
                .unwrap_or(DEFAULT_FILENAME)
                .to_string();
            trace!(filename = %filename, depth, "Found PDF part");
            found.push(Ok(PdfPart {
                filename,
                encoding: transfer_encoding(part),
                body: raw_body(self.raw, part),
            }));
        } else if declared.starts_with("multipart/") {
            if let Err(reason) = check_media_type(&declared) {
                found.push(Err(ExtractError::MimeError(format!(
                    "bad nested Content-Type {declared:?}: {reason}"
                ))));
                return;
            }
            if let Some(boundary) = part.content_type().and_then(boundary) {
                self.visit_multipart(part, boundary, depth + 1, found);
            }
        }
    }
}

/// The `Content-Type` value as written in the raw headers, unfolded.
fn declared_content_type(raw: &[u8], part: &MessagePart<'_>) -> Option<String> {
    let header = part.headers.header(HeaderName::ContentType)?;
    let value = raw.get(header.offset_start()..header.offset_end())?;
    Some(
        String::from_utf8_lossy(value)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
    )
}

fn raw_body<'a>(raw: &'a [u8], part: &MessagePart<'_>) -> &'a [u8] {
    raw.get(part.raw_body_offset()..part.raw_end_offset())
        .unwrap_or_default()
}

fn media_type(content_type: &ContentType<'_>) -> String {
    let mime = match content_type.subtype() {
        Some(sub) => format!("{}/{}", content_type.ctype(), sub),
        None => content_type.ctype().to_string(),
    };
    mime.to_ascii_lowercase()
}

fn boundary<'c>(content_type: &'c ContentType<'_>) -> Option<&'c str> {
    content_type
        .attribute("boundary")
        .filter(|boundary| !boundary.is_empty())
}

fn transfer_encoding(part: &MessagePart<'_>) -> String {
    part.content_transfer_encoding().unwrap_or("").to_string()
}

fn has_closing_delimiter(body: &[u8], boundary: &str) -> bool {
    let delimiter = format!("--{boundary}--");
    body.windows(delimiter.len())
        .any(|window| window == delimiter.as_bytes())
}

/// Reject media types that a strict RFC 2045 reader refuses.
///
/// `mail-parser` skips bad parameters silently; a declared type with a
/// parameter lacking `=`, an unterminated quoted value or a repeated
/// parameter name is treated as unparseable instead.
fn check_media_type(value: &str) -> std::result::Result<(), String> {
    let (base, mut rest) = value.split_once(';').unwrap_or((value, ""));
    let base = base.trim();
    let valid = match base.split_once('/') {
        Some((ty, sub)) => is_token(ty) && is_token(sub),
        None => is_token(base),
    };
    if !valid {
        return Err(format!("invalid media type {base:?}"));
    }

    let mut seen = BTreeSet::new();
    loop {
        rest = rest.trim_start();
        // A single trailing semicolon is tolerated
        if rest.is_empty() || rest == ";" {
            return Ok(());
        }

        let Some((name, after)) = rest.split_once('=') else {
            return Err(format!("parameter without value: {rest:?}"));
        };
        let name = name.trim();
        if !is_token(name) {
            return Err(format!("invalid parameter name {name:?}"));
        }

        let after = after.trim_start();
        let tail = match after.strip_prefix('"') {
            Some(quoted) => match closing_quote(quoted) {
                Some(end) => &quoted[end + 1..],
                None => return Err(format!("unterminated quoted value for {name:?}")),
            },
            None => {
                let len = after.find(|c: char| !is_token_char(c)).unwrap_or(after.len());
                if len == 0 {
                    return Err(format!("empty value for {name:?}"));
                }
                &after[len..]
            }
        };

        if !seen.insert(name.to_ascii_lowercase()) {
            return Err(format!("duplicate parameter {name:?}"));
        }

        let tail = tail.trim_start();
        rest = match tail.strip_prefix(';') {
            Some(next) => next,
            None if tail.is_empty() => tail,
            None => return Err(format!("unexpected text after {name:?}: {tail:?}")),
        };
    }
}

/// Byte offset of the `"` closing a quoted string, honoring `\` escapes.
fn closing_quote(s: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some(i),
            _ => {}
        }
    }
    None
}

fn is_token(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_token_char)
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_graphic() && !"()<>@,;:\\\"/[]?=".contains(c)
}
