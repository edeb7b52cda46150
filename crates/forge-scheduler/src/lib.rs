//! The batch scheduler and per-state handlers driving a [`forge_domain::ModuleBuild`]
//! from WAIT through READY or FAILED.
//!
//! [`dispatch::dispatch`] is the single entry point the event loop calls;
//! everything else here is either a handler it routes to, or a helper those
//! handlers share.

pub mod batch;
pub mod cancel;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod publish;
pub mod rebuild;
pub mod submission;

pub use config::SchedulerConfig;
pub use context::HandlerContext;
pub use dispatch::{dispatch, dispatch_table_entry, EventKind};
pub use error::SchedulerError;
pub use submission::{submit_module, SubmissionRequest};
