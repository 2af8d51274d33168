//! Export functionality: writing extracted PDFs.

pub mod pdf;
