//! Email parsing: message framing, header decoding, MIME traversal, and
//! transfer decoding.

pub mod decode;
pub mod header;
pub mod message;
pub mod mime;
