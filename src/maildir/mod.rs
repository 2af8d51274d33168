//! Maildir traversal: mailbox discovery and message enumeration.

pub mod locator;
pub mod walker;
