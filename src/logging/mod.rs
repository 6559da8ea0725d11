//! Structured logging setup and JSON report lines.

mod format;

pub use format::StructuredLogger;
