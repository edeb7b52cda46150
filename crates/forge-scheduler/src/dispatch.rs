//! Exhaustive dispatch from `(event kind, module state)` to a handler. A
//! dynamic dispatch table registered once at boot is never re-checked after
//! that; here the compiler enforces the same exhaustiveness at every build
//! of this crate.

use forge_bus::BusEvent;
use forge_domain::ModuleBuildState;
use forge_store::StoreSession;

use crate::context::HandlerContext;
use crate::error::SchedulerError;
use crate::handlers::{build, failed, wait};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    ComponentStateChanged,
    RepoRegenerated,
    TagChanged,
    ModuleStateChanged,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::ComponentStateChanged,
        EventKind::RepoRegenerated,
        EventKind::TagChanged,
        EventKind::ModuleStateChanged,
    ];
}

impl From<&BusEvent> for EventKind {
    fn from(event: &BusEvent) -> Self {
        match event {
            BusEvent::ComponentStateChanged(_) => EventKind::ComponentStateChanged,
            BusEvent::RepoRegenerated(_) => EventKind::RepoRegenerated,
            BusEvent::TagChanged(_) => EventKind::TagChanged,
            BusEvent::ModuleStateChanged(_) => EventKind::ModuleStateChanged,
        }
    }
}

/// The name of the handler responsible for `(kind, state)`, including
/// documented no-ops. Exhaustive over every `(EventKind, ModuleBuildState)`
/// pair — the match has no wildcard arm, so adding a state or event kind
/// without updating this table fails to compile.
pub fn dispatch_table_entry(kind: EventKind, state: ModuleBuildState) -> &'static str {
    use EventKind::*;
    use ModuleBuildState::*;
    match (kind, state) {
        (ModuleStateChanged, Init) => "noop (submission path drives init->wait directly)",
        (ModuleStateChanged, Wait) => "wait::handle_wait",
        (ModuleStateChanged, Build) => "failed::handle_cancel (manual cancel only)",
        (ModuleStateChanged, Done) => "noop",
        (ModuleStateChanged, Ready) => "noop",
        (ModuleStateChanged, Failed) => "noop",

        (ComponentStateChanged, Build) => "build::handle_component_state_changed",
        (ComponentStateChanged, Init) => "noop",
        (ComponentStateChanged, Wait) => "noop",
        (ComponentStateChanged, Done) => "noop",
        (ComponentStateChanged, Ready) => "noop",
        (ComponentStateChanged, Failed) => "noop",

        (TagChanged, Build) => "build::handle_tag_changed",
        (TagChanged, Init) => "noop",
        (TagChanged, Wait) => "noop",
        (TagChanged, Done) => "noop",
        (TagChanged, Ready) => "noop",
        (TagChanged, Failed) => "noop",

        (RepoRegenerated, Build) => "build::handle_repo_regenerated",
        (RepoRegenerated, Init) => "noop",
        (RepoRegenerated, Wait) => "noop",
        (RepoRegenerated, Done) => "noop",
        (RepoRegenerated, Ready) => "noop",
        (RepoRegenerated, Failed) => "noop",
    }
}

/// Resolves the module the event concerns and routes it to the matching
/// handler. Each handler re-checks the module's current state itself (it may
/// have moved since the lookup), so this function only needs to find the
/// right module, not gate on its state.
pub async fn dispatch(
    ctx: &HandlerContext,
    session: &mut StoreSession,
    event: BusEvent,
) -> Result<Vec<BusEvent>, SchedulerError> {
    match event {
        BusEvent::ModuleStateChanged(e) => {
            let mut module = session
                .get_module_by_nsvc(&e.name, &e.stream, e.version, &e.context)
                .await?
                .ok_or(SchedulerError::UnknownModule { tag: None })?;
            match e.state.as_str() {
                "wait" => wait::handle_wait(ctx, session, &mut module).await,
                "failed" => failed::handle_cancel(ctx, session, &mut module, e.reason).await,
                _ => Ok(vec![]),
            }
        }
        BusEvent::ComponentStateChanged(e) => {
            let component = session
                .component_by_task_id(e.task_id)
                .await?
                .ok_or(SchedulerError::UnknownComponent {
                    task_id: Some(e.task_id),
                    nvr: None,
                })?;
            let mut module = session
                .get_module(component.module_id)
                .await?
                .ok_or(SchedulerError::UnknownModule { tag: None })?;
            build::handle_component_state_changed(ctx, session, &mut module, &e).await
        }
        BusEvent::TagChanged(e) => match session.from_tag(&e.tag).await? {
            Some(mut module) => build::handle_tag_changed(ctx, session, &mut module, &e).await,
            None => Ok(vec![]),
        },
        BusEvent::RepoRegenerated(e) => match session.from_tag(&e.tag).await? {
            Some(mut module) => build::handle_repo_regenerated(ctx, session, &mut module, &e).await,
            None => Ok(vec![]),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_table_covers_every_event_kind_and_module_state() {
        for kind in EventKind::ALL {
            for state in ModuleBuildState::ALL {
                // A panicking match arm would make this unreachable; this
                // assertion is the observable artifact of a dispatch table
                // that is exhaustive over every (event, state) pair.
                assert!(!dispatch_table_entry(kind, state).is_empty());
            }
        }
    }
}
