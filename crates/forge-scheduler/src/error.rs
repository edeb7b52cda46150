use thiserror::Error;

/// Internal scheduler failures. These never cross the submission boundary —
/// the event loop catches them, rolls the session back, logs, and drops the
/// message; the poller re-derives the needed action on its next tick.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Store(#[from] forge_store::StoreError),
    #[error(transparent)]
    Builder(#[from] forge_external::BuilderError),
    #[error(transparent)]
    Resolver(#[from] forge_external::ResolverError),
    #[error(transparent)]
    Bus(#[from] forge_bus::BusError),
    #[error(transparent)]
    Transition(#[from] forge_domain::module_build::InvalidTransition),
    #[error("event referenced unknown component (task_id={task_id:?}, nvr={nvr:?})")]
    UnknownComponent { task_id: Option<i64>, nvr: Option<String> },
    #[error("event referenced unknown module (tag={tag:?})")]
    UnknownModule { tag: Option<String> },
}
