//! Wiring for the orchestration core: configuration, the explicit
//! [`EngineContext`], the event loop, and the reconciliation poller.
//!
//! This crate has no REST surface — that stays external; it
//! exposes [`submission::submit`] and [`submission::cancel`] as the two
//! entry points a hypothetical HTTP layer would call, and [`EventLoop`] /
//! [`Poller`] as the two long-running workers a binary spawns at startup.

pub mod config;
pub mod context;
pub mod error;
pub mod event_loop;
pub mod poller;
pub mod submission;

pub use config::{ConfigLoader, ForgeConfig};
pub use context::EngineContext;
pub use error::EngineError;
pub use event_loop::EventLoop;
pub use poller::Poller;
pub use submission::{cancel, submit, ModuleSubmission};
