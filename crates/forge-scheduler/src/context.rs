//! The explicit context struct every handler receives, replacing the
//! module-level mutable singletons (config/session/publish) of the source
//! system (Design Notes §9).

use std::sync::Arc;

use forge_bus::BusTransport;
use forge_external::{Builder, Resolver};

use crate::config::SchedulerConfig;

#[derive(Clone)]
pub struct HandlerContext {
    pub config: SchedulerConfig,
    pub bus: Arc<dyn BusTransport>,
    pub builder: Arc<dyn Builder>,
    pub resolver: Arc<dyn Resolver>,
}

impl HandlerContext {
    pub fn new(
        config: SchedulerConfig,
        bus: Arc<dyn BusTransport>,
        builder: Arc<dyn Builder>,
        resolver: Arc<dyn Resolver>,
    ) -> Self {
        Self {
            config,
            bus,
            builder,
            resolver,
        }
    }
}
