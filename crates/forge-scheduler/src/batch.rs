//! Batch-ordering and concurrency-ceiling helpers shared by the WAIT and
//! BUILD handlers.

use forge_domain::{ComponentBuild, ComponentBuildState, ModuleBuild};
use forge_external::{BuildSubmission, Builder};
use forge_store::StoreSession;

use crate::error::SchedulerError;

/// The synthesized component every module builds first, occupying batch 1
/// exclusively.
pub const MODULE_BUILD_MACROS: &str = "module-build-macros";

/// Submits as many `awaiting_submission` components of `module`'s current
/// batch as the global concurrency ceiling allows, in declared build-order
/// (ties broken by package name). Called both at batch-start and after every
/// component completion, so freed capacity is always refilled.
pub async fn submit_up_to_ceiling(
    builder: &dyn Builder,
    session: &mut StoreSession,
    module: &ModuleBuild,
    ceiling: u32,
) -> Result<(), SchedulerError> {
    let building_globally = session.components_building_count().await?;
    let available = (ceiling as i64).saturating_sub(building_globally).max(0);
    if available == 0 {
        return Ok(());
    }

    let mut batch = session.current_batch(module, None).await?;
    batch.sort_by(|a, b| a.package.cmp(&b.package));
    let mut submitted = 0i64;
    for component in batch.into_iter().filter(ComponentBuild::awaiting_submission) {
        if submitted >= available {
            break;
        }
        submit_one(builder, session, component).await?;
        submitted += 1;
    }
    Ok(())
}

async fn submit_one(builder: &dyn Builder, session: &mut StoreSession, mut component: ComponentBuild) -> Result<(), SchedulerError> {
    match builder.build(&component.package, &component.scmurl).await {
        Ok(BuildSubmission { task_id, state, reason }) => {
            component.task_id = task_id;
            component.state = Some(state);
            component.state_reason = reason;
        }
        Err(e) => {
            component.state = Some(ComponentBuildState::Failed);
            component.state_reason = Some(e.to_string());
        }
    }
    session.save_component(&component).await?;
    Ok(())
}
