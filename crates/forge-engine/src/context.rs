//! Bundles the loaded configuration with the two handles everything else in
//! this crate needs: the store (for opening sessions) and the scheduler's
//! [`forge_scheduler::HandlerContext`] (for calling into it).

use std::sync::Arc;

use forge_bus::BusTransport;
use forge_external::{Builder, Resolver};
use forge_store::Store;

use crate::config::ForgeConfig;

#[derive(Clone)]
pub struct EngineContext {
    pub config: ForgeConfig,
    pub store: Store,
    pub handler_ctx: forge_scheduler::HandlerContext,
}

impl EngineContext {
    pub fn new(
        config: ForgeConfig,
        store: Store,
        bus: Arc<dyn BusTransport>,
        builder: Arc<dyn Builder>,
        resolver: Arc<dyn Resolver>,
    ) -> Self {
        let handler_ctx = forge_scheduler::HandlerContext::new(config.scheduler_config(), bus, builder, resolver);
        Self {
            config,
            store,
            handler_ctx,
        }
    }

    pub fn bus(&self) -> Arc<dyn BusTransport> {
        self.handler_ctx.bus.clone()
    }
}
