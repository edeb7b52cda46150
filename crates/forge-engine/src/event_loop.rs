//! The event loop: an ingest worker drains the bus into an internal FIFO
//! queue, a dispatch worker drains that queue one event at a time, opening a
//! store transaction per event and committing or rolling it back around
//! [`forge_scheduler::dispatch`].
//!
//! Splitting ingest from dispatch means a slow dispatch (a retrying resolver
//! call, say) never causes the bus subscription to lag and drop events —
//! the internal queue is unbounded and absorbs the difference.

use forge_bus::{BusError, BusEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::context::EngineContext;

enum QueueItem {
    Event(BusEvent),
    Shutdown,
}

pub struct EventLoop {
    queue_tx: mpsc::UnboundedSender<QueueItem>,
    ingest_handle: JoinHandle<()>,
    dispatch_handle: JoinHandle<()>,
}

impl EventLoop {
    pub fn spawn(ctx: EngineContext) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();

        let ingest_handle = tokio::spawn(run_ingest(ctx.clone(), queue_tx.clone()));
        let dispatch_handle = tokio::spawn(run_dispatch(ctx, queue_rx, queue_tx.clone()));

        Self {
            queue_tx,
            ingest_handle,
            dispatch_handle,
        }
    }

    /// Requests a clean stop: the dispatch worker finishes whatever it's
    /// doing, drains anything already queued, then exits on the sentinel.
    /// The ingest worker is aborted directly since it's parked in
    /// `subscription.recv()` with nothing left to drain.
    pub fn shutdown(&self) {
        self.ingest_handle.abort();
        let _ = self.queue_tx.send(QueueItem::Shutdown);
    }

    pub async fn join(self) {
        let _ = self.dispatch_handle.await;
    }
}

async fn run_ingest(ctx: EngineContext, queue_tx: mpsc::UnboundedSender<QueueItem>) {
    let mut subscription = ctx.bus().subscribe();
    loop {
        match subscription.recv().await {
            Ok(event) => {
                if queue_tx.send(QueueItem::Event(event)).is_err() {
                    break;
                }
            }
            Err(BusError::Lagged(n)) => {
                tracing::warn!(dropped = n, "event loop ingest lagged, events dropped");
            }
            Err(BusError::Closed) => break,
        }
    }
}

async fn run_dispatch(
    ctx: EngineContext,
    mut queue_rx: mpsc::UnboundedReceiver<QueueItem>,
    queue_tx: mpsc::UnboundedSender<QueueItem>,
) {
    while let Some(item) = queue_rx.recv().await {
        match item {
            QueueItem::Shutdown => break,
            QueueItem::Event(event) => {
                let span = tracing::info_span!("dispatch_event", kind = ?forge_scheduler::EventKind::from(&event));
                dispatch_one(&ctx, event, &queue_tx).instrument(span).await;
            }
        }
    }
}

async fn dispatch_one(ctx: &EngineContext, event: BusEvent, queue_tx: &mpsc::UnboundedSender<QueueItem>) {
    let mut session = match ctx.store.begin().await {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(error = %e, "failed to open store session, dropping event");
            return;
        }
    };

    match forge_scheduler::dispatch(&ctx.handler_ctx, &mut session, event).await {
        Ok(followups) => {
            if let Err(e) = session.commit().await {
                tracing::error!(error = %e, "failed to commit dispatch result");
                return;
            }
            for followup in followups {
                let _ = queue_tx.send(QueueItem::Event(followup));
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "dispatch failed, rolling back; the poller will reconcile");
            if let Err(rollback_err) = session.rollback().await {
                tracing::error!(error = %rollback_err, "rollback itself failed");
            }
        }
    }
}
