//! Audit history and notification sink.

pub mod sink;

pub use sink::AuditSink;
