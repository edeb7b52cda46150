//! Errors surfaced by the external ports.
//!
//! Both [`crate::Builder`] and [`crate::Resolver`] are narrow interfaces onto
//! systems the orchestrator does not control; everything that can go wrong on
//! the wire collapses into one of these two enums rather than leaking
//! transport-specific types (XML-RPC faults, HTTP status codes, ...) into the
//! scheduler.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuilderError {
    #[error("buildroot setup failed: {0}")]
    BuildrootSetup(String),
    #[error("task submission rejected: {0}")]
    SubmissionRejected(String),
    #[error("no such task: {0}")]
    NoSuchTask(i64),
    #[error("builder transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("module not found: {name}:{stream}")]
    NotFound { name: String, stream: String },
    #[error("ambiguous stream expansion for {name}:{stream}: {reason}")]
    Ambiguous { name: String, stream: String, reason: String },
    #[error("resolver transport error: {0}")]
    Transport(String),
}
