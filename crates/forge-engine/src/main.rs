//! Binary entry point: load configuration, connect the store, wire the
//! external ports, and run the event loop and poller until asked to stop.
//!
//! The REST submission surface, the real build system, and the real
//! module-metadata resolver are external collaborators outside this core's
//! scope. This binary wires `forge_external`'s mock implementations as
//! placeholders for those two ports so the service is runnable end-to-end in
//! isolation; a deployment wires its real builder and resolver clients in
//! their place by constructing [`EngineContext::new`] with different
//! `Arc<dyn Builder>` / `Arc<dyn Resolver>` values.

use std::sync::Arc;

use forge_bus::ChannelBus;
use forge_engine::{ConfigLoader, EngineContext, EventLoop, Poller};
use forge_external::{MockBuilder, MockResolver};
use forge_store::Store;
use tracing_subscriber::EnvFilter;

fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_tracing();

    let config = ConfigLoader::new().load()?;
    tracing::info!(database_url = %config.database_url, system = %config.system, "loaded configuration");

    let store = Store::connect(&config.database_url).await?;
    let bus = Arc::new(ChannelBus::default());
    let builder = Arc::new(MockBuilder::new());
    let resolver = Arc::new(MockResolver::new());

    let ctx = EngineContext::new(config, store, bus, builder, resolver);

    let event_loop = EventLoop::spawn(ctx.clone());
    let poller = Poller::spawn(ctx);

    tracing::info!("module build orchestrator core running, press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");

    poller.stop();
    event_loop.shutdown();
    event_loop.join().await;

    Ok(())
}
