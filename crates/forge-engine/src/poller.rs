//! The reconciliation poller: three periodic passes that paper over messages
//! the bus never delivered, plus a per-state summary log. Every pass acts by
//! publishing a synthetic event back onto the bus rather than calling a
//! handler directly, so reconciliation goes through the exact same dispatch
//! path (and the same transactional commit/rollback discipline) as a real
//! one.

use chrono::Utc;
use forge_bus::{BusEvent, ComponentStateChanged, ModuleStateChanged};
use forge_domain::ModuleBuildState;
use tokio::task::JoinHandle;

use crate::context::EngineContext;

pub struct Poller {
    handle: JoinHandle<()>,
}

impl Poller {
    pub fn spawn(ctx: EngineContext) -> Self {
        let handle = tokio::spawn(run(ctx));
        Self { handle }
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}

async fn run(ctx: EngineContext) {
    let mut interval = tokio::time::interval(ctx.config.polling_interval());
    loop {
        interval.tick().await;
        if let Err(e) = tick(&ctx).await {
            tracing::error!(error = %e, "poller tick failed");
        }
    }
}

async fn tick(ctx: &EngineContext) -> Result<(), forge_store::StoreError> {
    reconcile_building_components(ctx).await?;
    reissue_wait(ctx).await?;
    warn_on_quiet_batches(ctx).await?;
    log_state_summary(ctx).await?;
    Ok(())
}

/// Pass 1: poll every globally `BUILDING` component with a `task_id`; if the
/// builder now reports it in a terminal dead state (`CANCELED`, `FAILED`),
/// synthesize the `ComponentStateChanged` that should have arrived on the
/// bus. A task that finished successfully is left for its real `COMPLETE`
/// event, which also carries the `nvr` this synthesized one never has.
async fn reconcile_building_components(ctx: &EngineContext) -> Result<(), forge_store::StoreError> {
    let mut session = ctx.store.begin().await?;
    let building = session.building_components().await?;
    session.rollback().await?;

    for component in building {
        let Some(task_id) = component.task_id else { continue };
        let info = match ctx.handler_ctx.builder.get_task_info(task_id).await {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!(task_id, error = %e, "poller: get_task_info failed, will retry next tick");
                continue;
            }
        };
        if !info.state.is_dead() {
            continue;
        }
        let event = BusEvent::ComponentStateChanged(ComponentStateChanged {
            msg_id: format!("poller-reconcile-{task_id}"),
            task_id,
            state: info.state,
            state_reason: info.reason,
            nvr: None,
        });
        if let Err(e) = ctx.bus().publish(event).await {
            tracing::warn!(task_id, error = %e, "poller: failed to publish reconciled component state");
        }
    }
    Ok(())
}

/// Pass 2: every module still in `WAIT` gets the handler re-run, in case the
/// process restarted between submission and a completed `WAIT` handoff.
/// `wait::handle_wait` is idempotent, so this is safe to run unconditionally.
async fn reissue_wait(ctx: &EngineContext) -> Result<(), forge_store::StoreError> {
    let mut session = ctx.store.begin().await?;
    let waiting = session.by_state(ModuleBuildState::Wait).await?;
    session.rollback().await?;

    for module in waiting {
        let event = BusEvent::ModuleStateChanged(ModuleStateChanged {
            msg_id: format!("poller-reissue-wait-{}", module.id),
            name: module.name,
            stream: module.stream,
            version: module.version,
            context: module.context,
            state: "wait".to_string(),
            reason: None,
        });
        if let Err(e) = ctx.bus().publish(event).await {
            tracing::warn!(error = %e, "poller: failed to republish wait reissue");
        }
    }
    Ok(())
}

/// Pass 3: modules stuck in `BUILD` whose current batch hasn't changed state
/// in longer than `batch_quiet_threshold`. Warn-only: this pass never
/// resubmits anything, only flags it for an operator.
async fn warn_on_quiet_batches(ctx: &EngineContext) -> Result<(), forge_store::StoreError> {
    let mut session = ctx.store.begin().await?;
    let building = session.by_state(ModuleBuildState::Build).await?;
    session.rollback().await?;

    let threshold = ctx.config.batch_quiet_threshold();
    let now = Utc::now();
    for module in building {
        let quiet_for = now.signed_duration_since(module.modified);
        if quiet_for.to_std().unwrap_or_default() > threshold {
            tracing::warn!(
                module = %module.nsvc(),
                batch = module.batch,
                quiet_for_secs = quiet_for.num_seconds(),
                "module's current batch has not changed state in a while"
            );
        }
    }
    Ok(())
}

async fn log_state_summary(ctx: &EngineContext) -> Result<(), forge_store::StoreError> {
    let mut session = ctx.store.begin().await?;
    let mut counts = Vec::with_capacity(ModuleBuildState::ALL.len());
    for state in ModuleBuildState::ALL {
        counts.push((state, session.by_state(state).await?.len()));
    }
    session.rollback().await?;

    tracing::info!(
        init = counts[0].1,
        wait = counts[1].1,
        build = counts[2].1,
        done = counts[3].1,
        ready = counts[4].1,
        failed = counts[5].1,
        "module build state summary"
    );
    Ok(())
}
