//! Shared failure path: transition a module to FAILED, best-effort cancel
//! every component still in flight, and publish.

use chrono::Utc;
use forge_bus::BusEvent;
use forge_domain::{ComponentBuildState, ModuleBuild, ModuleBuildState};
use forge_store::StoreSession;

use crate::context::HandlerContext;
use crate::error::SchedulerError;
use crate::publish::publish_state_change;

/// Moves `module` to FAILED with `reason`, cancelling every component of its
/// up-to-current batches still reported `BUILDING`. A cancellation that
/// itself errors is logged and otherwise ignored — the builder only promises
/// to eventually stop reporting the task as active, and we are already on
/// the terminal path regardless of whether it cooperates.
pub async fn fail_module(
    ctx: &HandlerContext,
    session: &mut StoreSession,
    module: &mut ModuleBuild,
    reason: String,
) -> Result<Vec<BusEvent>, SchedulerError> {
    let in_flight = session.up_to_current_batch(module, Some(ComponentBuildState::Building)).await?;
    for component in in_flight {
        let Some(task_id) = component.task_id else { continue };
        if let Err(e) = ctx.builder.cancel_build(task_id).await {
            tracing::warn!(package = %component.package, task_id, error = %e, "cancel_build failed, ignoring");
        }
    }

    module.transition(ModuleBuildState::Failed, Some(reason), Utc::now())?;
    session.save_module(module).await?;
    publish_state_change(ctx, module).await?;
    Ok(vec![])
}
