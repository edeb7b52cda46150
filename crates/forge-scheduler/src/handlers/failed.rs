//! Manual cancellation: an operator-originated
//! `ModuleStateChanged{state: "failed"}` event reaches a module still in
//! flight and drives it to FAILED exactly like an internal error would.

use forge_bus::BusEvent;
use forge_domain::ModuleBuild;
use forge_store::StoreSession;

use crate::cancel::fail_module;
use crate::context::HandlerContext;
use crate::error::SchedulerError;

pub async fn handle_cancel(
    ctx: &HandlerContext,
    session: &mut StoreSession,
    module: &mut ModuleBuild,
    reason: Option<String>,
) -> Result<Vec<BusEvent>, SchedulerError> {
    if module.state.is_terminal_or_done() {
        return Ok(vec![]);
    }
    let reason = reason.unwrap_or_else(|| "canceled".to_string());
    fail_module(ctx, session, module, reason).await
}
