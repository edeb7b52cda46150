//! The engine's public entry points: turn an abstract submission into one or
//! more running module builds via the expander, and hand manual cancellation
//! off to the event loop rather than touching the store directly.

use forge_bus::{BusEvent, ModuleStateChanged};
use forge_domain::{ModuleBuild, RebuildStrategy};
use forge_expand::{Expander, ExpansionRequest};

use crate::context::EngineContext;
use crate::error::EngineError;

pub struct ModuleSubmission {
    pub expansion: ExpansionRequest,
    pub scmurl: String,
    pub owner: String,
    pub rebuild_strategy: RebuildStrategy,
}

/// Expands `submission` into every pinned manifest the stream resolution
/// permits, then drives each one through the submission path into its own
/// `ModuleBuild` row, already in `WAIT`.
///
/// More than one result means the caller allowed ambiguous expansion
/// (`ExpansionRequest::allow_ambiguous`); a disallowed ambiguity surfaces as
/// [`forge_expand::ExpandError::StreamAmbiguous`] before any row is created.
pub async fn submit(ctx: &EngineContext, submission: ModuleSubmission) -> Result<Vec<ModuleBuild>, EngineError> {
    let expander = Expander::new(ctx.handler_ctx.resolver.clone());
    let manifests = expander.expand(&submission.expansion).await?;

    let mut modules = Vec::with_capacity(manifests.len());
    for manifest in manifests {
        let mut session = ctx.store.begin().await?;
        let module = forge_scheduler::submit_module(
            &ctx.handler_ctx,
            &mut session,
            forge_scheduler::SubmissionRequest {
                manifest,
                scmurl: submission.scmurl.clone(),
                owner: submission.owner.clone(),
                rebuild_strategy: submission.rebuild_strategy,
            },
        )
        .await?;
        session.commit().await?;
        modules.push(module);
    }
    Ok(modules)
}

/// Requests cancellation of an in-flight module build. Publishes the same
/// `ModuleStateChanged{state: "failed"}` event an operator-facing collaborator
/// would, so it is processed by the event loop exactly like any other bus
/// event — including the transactional commit/rollback and the component
/// cancellation fan-out in `forge_scheduler::cancel::fail_module`.
pub async fn cancel(
    ctx: &EngineContext,
    name: &str,
    stream: &str,
    version: i64,
    context: &str,
    reason: Option<String>,
) -> Result<(), EngineError> {
    let event = BusEvent::ModuleStateChanged(ModuleStateChanged {
        msg_id: format!("cancel-{name}-{stream}-{version}-{context}"),
        name: name.to_string(),
        stream: stream.to_string(),
        version,
        context: context.to_string(),
        state: "failed".to_string(),
        reason,
    });
    ctx.bus().publish(event).await?;
    Ok(())
}
