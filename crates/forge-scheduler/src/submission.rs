//! Turns an expanded [`PinnedManifest`] into a module's INIT row plus its
//! component rows, folds in reuse via [`crate::rebuild`], and drives the
//! module straight through to WAIT: nothing external gates INIT -> WAIT, so
//! unlike every later transition it happens inline rather than waiting on a
//! bus round-trip.

use chrono::Utc;
use forge_domain::{
    ComponentBuild, ComponentBuildId, ComponentBuildState, ModuleBuild, ModuleBuildId, ModuleBuildState, PinnedManifest,
    RebuildStrategy,
};
use forge_expand::hash;
use forge_store::StoreSession;

use crate::context::HandlerContext;
use crate::error::SchedulerError;
use crate::publish::publish_state_change;
use crate::rebuild;

pub struct SubmissionRequest {
    pub manifest: PinnedManifest,
    pub scmurl: String,
    pub owner: String,
    pub rebuild_strategy: RebuildStrategy,
}

pub async fn submit_module(
    ctx: &HandlerContext,
    session: &mut StoreSession,
    request: SubmissionRequest,
) -> Result<ModuleBuild, SchedulerError> {
    let now = Utc::now();
    let manifest = request.manifest;

    let refs: Vec<(String, String)> = manifest.buildrequires.values().map(|n| (n.name.clone(), n.stream.clone())).collect();
    let nsvcs: Vec<_> = manifest.buildrequires.values().cloned().collect();
    let ref_build_context = hash::ref_build_context(&refs);
    let build_context = hash::nsvc_context(&nsvcs);
    // `buildrequires` doesn't retain each dependency's build-time-only flag,
    // so the runtime list can't be distinguished from the build list here;
    // the public `context` on the manifest (computed by the expander, which
    // does have that information) is the identity that actually matters.
    let runtime_context = build_context.clone();

    let module = ModuleBuild {
        id: ModuleBuildId(0),
        name: manifest.name.clone(),
        stream: manifest.stream.clone(),
        version: manifest.version,
        context: manifest.context.clone(),
        state: ModuleBuildState::Init,
        state_reason: None,
        manifest: manifest.clone(),
        scmurl: request.scmurl,
        owner: request.owner,
        koji_tag: None,
        batch: 0,
        rebuild_strategy: request.rebuild_strategy,
        new_repo_task_id: None,
        ref_build_context,
        build_context,
        runtime_context,
        submitted: now,
        modified: now,
        completed: None,
    };
    // Looked up before this module's own row is created: once created, a
    // resubmission whose version is bumped past every prior build would
    // otherwise match itself (highest version, non-failed) instead of the
    // build it's actually meant to diff against.
    let prior_components = match session.last_build_in_stream(&module.name, &module.stream).await? {
        Some(prior_module) => session.components_of(prior_module.id).await?,
        None => Vec::new(),
    };

    let mut module = session.create_module(module).await?;
    let reuse = rebuild::plan_reuse(module.rebuild_strategy, &manifest.components, &prior_components);

    for component_ref in &manifest.components {
        let mut component = ComponentBuild {
            id: ComponentBuildId(0),
            module_id: module.id,
            package: component_ref.package.clone(),
            scmurl: component_ref.scmurl.clone(),
            format: component_ref.format.clone(),
            task_id: None,
            state: None,
            state_reason: None,
            nvr: None,
            batch: component_ref.build_order + 2,
            tagged: false,
            tagged_in_final: false,
            build_time_only: component_ref.build_time_only,
            reused_component_id: None,
            weight: 1.0,
        };

        if let Some(prior_component) = reuse.get(&component_ref.package) {
            component.task_id = prior_component.task_id;
            component.state = Some(ComponentBuildState::Complete);
            component.nvr = prior_component.nvr.clone();
            component.tagged = true;
            component.tagged_in_final = !component.build_time_only;
            component.reused_component_id = Some(prior_component.id);
        }

        session.create_component(component).await?;
    }

    module.transition(ModuleBuildState::Wait, None, now)?;
    session.save_module(&module).await?;
    publish_state_change(ctx, &module).await?;

    Ok(module)
}
