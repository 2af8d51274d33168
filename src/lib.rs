//! `maildir2pdf`: extract PDF attachments from a Maildir tree.
//!
//! This crate provides the core library: mailbox discovery, message and
//! MIME parsing, transfer decoding, and collision-safe output. The binary
//! is a thin shell around [`scan::scan_maildir`].

pub mod config;
pub mod error;
pub mod export;
pub mod maildir;
pub mod model;
pub mod parser;
pub mod scan;
