//! Core data model types: mailboxes, extracted attachments, and scan events.

pub mod attachment;
pub mod event;
pub mod mailbox;
