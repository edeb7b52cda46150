use thiserror::Error;

/// Top-level engine failures: configuration loading and submission-path
/// errors that do need to surface to a caller, unlike [`forge_scheduler::SchedulerError`]
/// which the event loop swallows after logging.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Store(#[from] forge_store::StoreError),
    #[error(transparent)]
    Scheduler(#[from] forge_scheduler::SchedulerError),
    #[error(transparent)]
    Expand(#[from] forge_expand::ExpandError),
    #[error(transparent)]
    Bus(#[from] forge_bus::BusError),
}
