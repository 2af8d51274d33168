//! Content-Transfer-Encoding handling for extracted parts.

use base64::alphabet;
use base64::engine::{GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use mail_parser::decoders::quoted_printable::quoted_printable_decode;

use crate::error::{ExtractError, Result};

/// Padded standard alphabet that ignores stray bits in the last symbol,
/// as most mail clients do.
const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Transfer encodings the decoder distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    Base64,
    QuotedPrintable,
    /// `7bit`, `8bit`, `binary`, empty, or anything unknown.
    Identity,
}

impl TransferEncoding {
    /// Classify a header value (case-insensitive, surrounding whitespace ignored).
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            _ => Self::Identity,
        }
    }
}

/// Decode a part body according to its transfer-encoding label.
///
/// Quoted-printable content is returned unchanged unless
/// `decode_quoted_printable` is set; PDFs are almost never sent that way
/// and older extractions kept the raw bytes.
pub fn decode_body(raw: &[u8], encoding: &str, decode_quoted_printable: bool) -> Result<Vec<u8>> {
    match TransferEncoding::from_label(encoding) {
        TransferEncoding::Base64 => decode_base64(raw),
        TransferEncoding::QuotedPrintable if decode_quoted_printable => {
            quoted_printable_decode(raw).ok_or_else(|| {
                ExtractError::MimeError("Invalid quoted-printable content".to_string())
            })
        }
        TransferEncoding::QuotedPrintable | TransferEncoding::Identity => Ok(raw.to_vec()),
    }
}

/// Base64 after dropping line breaks and spaces.
fn decode_base64(raw: &[u8]) -> Result<Vec<u8>> {
    let cleaned: Vec<u8> = raw
        .iter()
        .copied()
        .filter(|b| !matches!(b, b'\n' | b'\r' | b' '))
        .collect();
    Ok(BASE64.decode(cleaned)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose;

    const PDF: &[u8] = b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n1 0 obj\n<<>>\nendobj\n%%EOF\n";

    #[test]
    fn test_label_parsing() {
        assert_eq!(TransferEncoding::from_label(" Base64 "), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::from_label("QUOTED-PRINTABLE"),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(TransferEncoding::from_label(""), TransferEncoding::Identity);
        assert_eq!(TransferEncoding::from_label("8bit"), TransferEncoding::Identity);
    }

    #[test]
    fn test_base64_line_breaks_do_not_matter() {
        let flat = general_purpose::STANDARD.encode(PDF);
        let wrapped: String = flat
            .as_bytes()
            .chunks(8)
            .map(|c| std::str::from_utf8(c).unwrap())
            .collect::<Vec<_>>()
            .join("\r\n");
        let spaced = flat.replace("A", " A");

        let a = decode_body(flat.as_bytes(), "base64", false).unwrap();
        let b = decode_body(wrapped.as_bytes(), "BASE64", false).unwrap();
        let c = decode_body(spaced.as_bytes(), "base64", false).unwrap();
        assert_eq!(a, PDF);
        assert_eq!(b, PDF);
        assert_eq!(c, PDF);
    }

    #[test]
    fn test_base64_invalid() {
        let err = decode_body(b"not*valid*base64", "base64", false).unwrap_err();
        assert!(matches!(err, ExtractError::Base64(_)));
    }

    #[test]
    fn test_base64_tabs_are_not_stripped() {
        assert!(decode_body(b"JVBE\tRi0=", "base64", false).is_err());
    }

    #[test]
    fn test_base64_trailing_bits_are_ignored() {
        // "QR==" carries non-zero bits after the single decoded byte
        assert_eq!(decode_body(b"QR==", "base64", false).unwrap(), b"A");
        assert_eq!(decode_body(b"QQ==", "base64", false).unwrap(), b"A");
    }

    #[test]
    fn test_base64_padding_still_required() {
        assert!(decode_body(b"QQ", "base64", false).is_err());
    }

    #[test]
    fn test_identity_passthrough() {
        assert_eq!(decode_body(PDF, "binary", false).unwrap(), PDF);
        assert_eq!(decode_body(PDF, "", false).unwrap(), PDF);
    }

    #[test]
    fn test_quoted_printable_passthrough_by_default() {
        let raw = b"%PDF=2D1.4=\r\nabc";
        assert_eq!(decode_body(raw, "quoted-printable", false).unwrap(), raw);
    }

    #[test]
    fn test_quoted_printable_opt_in() {
        let raw = b"%PDF=2D1.4=\r\nabc  \r\n=E2=e3";
        let decoded = decode_body(raw, "quoted-printable", true).unwrap();
        assert_eq!(decoded, b"%PDF-1.4abc\r\n\xe2\xe3");
    }

    #[test]
    fn test_quoted_printable_bad_escape() {
        let err = decode_body(b"%PDF =ZZ", "quoted-printable", true).unwrap_err();
        assert!(matches!(err, ExtractError::MimeError(_)));
    }
}
