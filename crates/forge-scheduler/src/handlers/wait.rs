//! The WAIT handler: resolves build-time dependencies and the target tag,
//! seeds the buildroot, submits the synthesized `module-build-macros`
//! component, and hands off to BUILD.

use chrono::Utc;
use forge_bus::BusEvent;
use forge_domain::{ComponentBuild, ComponentBuildId, ComponentBuildState, ModuleBuild, ModuleBuildId, ModuleBuildState};
use forge_external::ModuleQuery;

use crate::batch::MODULE_BUILD_MACROS;
use crate::cancel::fail_module;
use crate::context::HandlerContext;
use crate::error::SchedulerError;
use crate::publish::publish_state_change;

/// Idempotent: re-running this against a module already past WAIT is a
/// no-op, which is what lets the poller re-issue it freely.
pub async fn handle_wait(
    ctx: &HandlerContext,
    session: &mut forge_store::StoreSession,
    module: &mut ModuleBuild,
) -> Result<Vec<BusEvent>, SchedulerError> {
    if module.state != ModuleBuildState::Wait {
        return Ok(vec![]);
    }

    let query = ModuleQuery::new(&module.name, &module.stream);

    let deps = match retry(ctx, || ctx.resolver.get_module_build_dependencies(&query, true)).await {
        Ok(deps) => deps,
        Err(e) => return fail_module(ctx, session, module, format!("resolver error: {e}")).await,
    };
    let tag = match retry(ctx, || ctx.resolver.get_module_tag(&query, true)).await {
        Ok(tag) => tag,
        Err(e) => return fail_module(ctx, session, module, format!("resolver error: {e}")).await,
    };

    module.koji_tag = Some(tag);

    if let Err(e) = ctx.builder.buildroot_connect(&deps).await {
        return fail_module(ctx, session, module, format!("buildroot setup failed: {e}")).await;
    }

    let macros_component = submit_macros(ctx, module).await;
    let macros_component = session.create_component(macros_component).await?;

    module.batch = 1;
    module.transition(ModuleBuildState::Build, None, Utc::now())?;
    session.save_module(module).await?;

    if macros_component.is_dead() {
        return fail_module(
            ctx,
            session,
            module,
            format!("module-build-macros submission failed: {:?}", macros_component.state_reason),
        )
        .await;
    }

    publish_state_change(ctx, module).await?;
    Ok(vec![])
}

async fn submit_macros(ctx: &HandlerContext, module: &ModuleBuild) -> ComponentBuild {
    let srpm = ctx.builder.get_disttag_srpm(&module.context).await;
    let mut component = ComponentBuild {
        id: ComponentBuildId(0),
        module_id: ModuleBuildId(0),
        package: MODULE_BUILD_MACROS.into(),
        scmurl: String::new(),
        format: "rpms".into(),
        task_id: None,
        state: None,
        state_reason: None,
        nvr: None,
        batch: 1,
        tagged: false,
        tagged_in_final: false,
        build_time_only: true,
        reused_component_id: None,
        weight: 1.0,
    };
    component.module_id = module.id;

    let srpm_path = match srpm {
        Ok(path) => path,
        Err(e) => {
            component.state = Some(ComponentBuildState::Failed);
            component.state_reason = Some(format!("get_disttag_srpm failed: {e}"));
            return component;
        }
    };
    component.scmurl = srpm_path.clone();

    match ctx.builder.build(MODULE_BUILD_MACROS, &srpm_path).await {
        Ok(submission) => {
            component.task_id = submission.task_id;
            component.state = Some(submission.state);
            component.state_reason = submission.reason;
        }
        Err(e) => {
            component.state = Some(ComponentBuildState::Failed);
            component.state_reason = Some(e.to_string());
        }
    }
    component
}

async fn retry<T, E, F, Fut>(ctx: &HandlerContext, mut call: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match call().await {
            Ok(v) => return Ok(v),
            Err(e) if attempt >= ctx.config.resolver_retry_attempts => return Err(e),
            Err(_) => tokio::time::sleep(ctx.config.resolver_retry_interval).await,
        }
    }
}
