//! The BUILD handlers: component completion and tag-change bookkeeping,
//! batch-completion evaluation, repo-regen requests, and the batch-to-batch
//! advance.

use chrono::Utc;
use forge_bus::{BusEvent, ComponentStateChanged, RepoRegenerated, TagChanged};
use forge_domain::{ComponentBuild, ModuleBuild, ModuleBuildState};
use forge_store::StoreSession;

use crate::batch;
use crate::cancel::fail_module;
use crate::context::HandlerContext;
use crate::error::SchedulerError;
use crate::publish::publish_state_change;

/// A build task (ordinary component or the synthesized macros component)
/// reported a new state.
pub async fn handle_component_state_changed(
    ctx: &HandlerContext,
    session: &mut StoreSession,
    module: &mut ModuleBuild,
    event: &ComponentStateChanged,
) -> Result<Vec<BusEvent>, SchedulerError> {
    if module.state != ModuleBuildState::Build {
        return Ok(vec![]);
    }

    let Some(mut component) = session.component_by_task_id(event.task_id).await? else {
        return Err(SchedulerError::UnknownComponent {
            task_id: Some(event.task_id),
            nvr: None,
        });
    };
    if component.module_id != module.id {
        return Ok(vec![]);
    }

    component.state = Some(event.state);
    component.state_reason = event.state_reason.clone();
    if event.state == forge_domain::ComponentBuildState::Complete {
        component.nvr = event.nvr.clone();
    }
    session.save_component(&component).await?;

    if component.is_dead() {
        return fail_module(
            ctx,
            session,
            module,
            format!("component {} {}", component.package, component.state.unwrap()),
        )
        .await;
    }

    if !component.is_complete() {
        return Ok(vec![]);
    }

    batch::submit_up_to_ceiling(ctx.builder.as_ref(), session, module, ctx.config.max_concurrent_component_builds).await?;
    check_batch_progress(ctx, session, module).await
}

/// A package's tag membership changed; fold it onto the matching component
/// and re-evaluate whether the current batch can move on to repo regen.
pub async fn handle_tag_changed(
    ctx: &HandlerContext,
    session: &mut StoreSession,
    module: &mut ModuleBuild,
    event: &TagChanged,
) -> Result<Vec<BusEvent>, SchedulerError> {
    if module.state != ModuleBuildState::Build {
        return Ok(vec![]);
    }

    let components = session.components_of(module.id).await?;
    let Some(mut component) = components.into_iter().find(|c| c.nvr.as_deref() == Some(event.nvr.as_str())) else {
        return Ok(vec![]);
    };

    component.tagged = event.tagged;
    if !component.build_time_only {
        component.tagged_in_final = event.tagged;
    }
    session.save_component(&component).await?;

    check_batch_progress(ctx, session, module).await
}

/// A buildroot repo this module was waiting on finished regenerating.
pub async fn handle_repo_regenerated(
    ctx: &HandlerContext,
    session: &mut StoreSession,
    module: &mut ModuleBuild,
    event: &RepoRegenerated,
) -> Result<Vec<BusEvent>, SchedulerError> {
    if module.state != ModuleBuildState::Build {
        return Ok(vec![]);
    }
    if module.koji_tag.as_deref() != Some(event.tag.as_str()) {
        return Ok(vec![]);
    }

    module.new_repo_task_id = None;

    let next_batch = module.batch + 1;
    let has_next_batch = session
        .components_of(module.id)
        .await?
        .iter()
        .any(|c| c.batch == next_batch);

    if !has_next_batch {
        return finish_module(ctx, session, module).await;
    }
    advance_to_batch(ctx, session, module, next_batch).await
}

/// DONE and READY are collapsed into one transition here, per the resolved
/// reading of the "final post-build regen triggers readiness" open question
/// (SPEC_FULL.md §9).
async fn finish_module(ctx: &HandlerContext, session: &mut StoreSession, module: &mut ModuleBuild) -> Result<Vec<BusEvent>, SchedulerError> {
    module.transition(ModuleBuildState::Done, None, Utc::now())?;
    session.save_module(module).await?;
    publish_state_change(ctx, module).await?;
    module.transition(ModuleBuildState::Ready, None, Utc::now())?;
    session.save_module(module).await?;
    publish_state_change(ctx, module).await?;
    Ok(vec![])
}

async fn advance_to_batch(
    ctx: &HandlerContext,
    session: &mut StoreSession,
    module: &mut ModuleBuild,
    next_batch: i32,
) -> Result<Vec<BusEvent>, SchedulerError> {
    module.batch = next_batch;
    session.save_module(module).await?;
    batch::submit_up_to_ceiling(ctx.builder.as_ref(), session, module, ctx.config.max_concurrent_component_builds).await?;

    // A batch made entirely of reused components never generates a
    // ComponentStateChanged event to re-drive it, so check right away.
    check_batch_progress(ctx, session, module).await
}

/// Re-evaluates the current batch after any component or tag update:
/// still in flight, failed, or ready for repo regen.
async fn check_batch_progress(
    ctx: &HandlerContext,
    session: &mut StoreSession,
    module: &mut ModuleBuild,
) -> Result<Vec<BusEvent>, SchedulerError> {
    let current = session.current_batch(module, None).await?;

    if current.iter().any(|c| c.is_building() || c.awaiting_submission()) {
        return Ok(vec![]);
    }
    if current.iter().any(ComponentBuild::is_dead) {
        return fail_module(ctx, session, module, "a component in the current batch failed".into()).await;
    }

    maybe_request_repo_regen(ctx, session, module).await
}

/// Once every component up to the current batch is built and tagged, ask the
/// builder to regenerate the buildroot repo — or, if this was the last
/// batch, synthesize the event ourselves rather than waiting on a real one
/// that nothing would trigger.
async fn maybe_request_repo_regen(
    ctx: &HandlerContext,
    session: &mut StoreSession,
    module: &mut ModuleBuild,
) -> Result<Vec<BusEvent>, SchedulerError> {
    if module.new_repo_task_id.is_some() {
        return Ok(vec![]);
    }

    // `build_time_only` components (module-build-macros, and any
    // buildrequire-only package) never land in the module's tag, so no
    // `TagChanged` ever arrives for them; gating on `tagged` for those would
    // wedge the batch forever.
    let up_to = session.up_to_current_batch(module, None).await?;
    let all_tagged = up_to
        .iter()
        .all(|c| c.reused_component_id.is_some() || c.tagged || c.build_time_only);
    if !all_tagged {
        return Ok(vec![]);
    }

    let has_next_batch = session
        .components_of(module.id)
        .await?
        .iter()
        .any(|c| c.batch > module.batch);

    // A batch made entirely of `build_time_only` components (batch 1, which
    // holds only the synthesized macros build) never puts anything in the
    // tag, so a repo regen would have nothing new to pull forward. Advance
    // straight to the next batch instead of round-tripping through the
    // builder for a regen no one needs.
    if up_to.iter().all(|c| c.build_time_only) {
        return if has_next_batch {
            advance_to_batch(ctx, session, module, module.batch + 1).await
        } else {
            finish_module(ctx, session, module).await
        };
    }

    let tag = module.koji_tag.clone().ok_or(SchedulerError::UnknownModule { tag: None })?;
    if !has_next_batch {
        return Ok(vec![BusEvent::RepoRegenerated(RepoRegenerated {
            msg_id: format!("synthetic-final-regen-{}-{}", module.id, module.batch),
            repo_id: -1,
            tag,
        })]);
    }

    let repo_id = ctx.builder.new_repo(&tag).await?;
    module.new_repo_task_id = Some(repo_id);
    session.save_module(module).await?;
    Ok(vec![])
}
