//! The one place a handler talks to the outbound bus: publishing the
//! module's public JSON projection after every transition.

use forge_bus::{BusEvent, ModuleStateChanged};
use forge_domain::ModuleBuild;

use crate::context::HandlerContext;
use crate::error::SchedulerError;

pub async fn publish_state_change(ctx: &HandlerContext, module: &ModuleBuild) -> Result<(), SchedulerError> {
    let event = BusEvent::ModuleStateChanged(ModuleStateChanged {
        msg_id: format!("module-state-{}-{}", module.id, module.state),
        name: module.name.clone(),
        stream: module.stream.clone(),
        version: module.version,
        context: module.context.clone(),
        state: module.state.to_string(),
        reason: module.state_reason.clone(),
    });
    ctx.bus.publish(event).await?;
    Ok(())
}
