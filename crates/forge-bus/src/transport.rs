//! The transport abstraction over the event bus, and the in-process
//! implementation the engine runs with.
//!
//! A cheaply cloneable handle over a channel, `Send + Sync`, safe to hand to
//! every worker that needs to publish or subscribe. Unlike a point-to-point
//! mpsc mailbox, a bus needs fan-out — every subscriber sees every event —
//! so the in-process transport is built on `tokio::sync::broadcast` rather
//! than `mpsc`.

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

use crate::error::BusError;
use crate::event::BusEvent;

#[async_trait]
pub trait BusTransport: Send + Sync {
    async fn publish(&self, event: BusEvent) -> Result<(), BusError>;

    /// A fresh subscription that will see every event published from this
    /// point forward. Events published before a subscriber attaches are not
    /// replayed.
    fn subscribe(&self) -> BusSubscription;
}

enum SubscriptionInner {
    Broadcast(broadcast::Receiver<BusEvent>),
    Channel(mpsc::UnboundedReceiver<BusEvent>),
}

/// A handle to receive events from a subscription. Wraps whichever channel
/// primitive the transport underneath happens to use, so [`ChannelBus`] and
/// [`crate::MockBus`] consumers write identical code.
pub struct BusSubscription {
    inner: SubscriptionInner,
}

impl BusSubscription {
    pub(crate) fn from_broadcast(receiver: broadcast::Receiver<BusEvent>) -> Self {
        Self {
            inner: SubscriptionInner::Broadcast(receiver),
        }
    }

    pub(crate) fn from_channel(receiver: mpsc::UnboundedReceiver<BusEvent>) -> Self {
        Self {
            inner: SubscriptionInner::Channel(receiver),
        }
    }

    pub async fn recv(&mut self) -> Result<BusEvent, BusError> {
        match &mut self.inner {
            SubscriptionInner::Broadcast(receiver) => loop {
                match receiver.recv().await {
                    Ok(event) => return Ok(event),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(dropped = n, "bus subscriber lagged, events dropped");
                        return Err(BusError::Lagged(n));
                    }
                    Err(broadcast::error::RecvError::Closed) => return Err(BusError::Closed),
                }
            },
            SubscriptionInner::Channel(receiver) => receiver.recv().await.ok_or(BusError::Closed),
        }
    }
}

/// In-process bus backed by a broadcast channel. No persistence: a
/// subscriber that is not attached when an event is published never sees it,
/// which is why the engine wires up every subscriber (the ingest worker,
/// and — in tests — any assertion hooks) before publishing starts.
#[derive(Clone)]
pub struct ChannelBus {
    sender: broadcast::Sender<BusEvent>,
}

impl ChannelBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }
}

impl Default for ChannelBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl BusTransport for ChannelBus {
    async fn publish(&self, event: BusEvent) -> Result<(), BusError> {
        // A send with no subscribers is not an error: the bus doesn't know
        // or care whether anyone is listening yet.
        let _ = self.sender.send(event);
        Ok(())
    }

    fn subscribe(&self) -> BusSubscription {
        BusSubscription::from_broadcast(self.sender.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{BusEvent, TagChanged};

    #[tokio::test]
    async fn subscriber_sees_events_published_after_it_subscribes() {
        let bus = ChannelBus::new(16);
        let mut sub = bus.subscribe();

        bus.publish(BusEvent::TagChanged(TagChanged {
            msg_id: "m1".into(),
            tag: "module-foo-f29".into(),
            nvr: "foo-1.0-1".into(),
            tagged: true,
        }))
        .await
        .unwrap();

        let event = sub.recv().await.unwrap();
        assert_eq!(event.msg_id(), "m1");
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_error() {
        let bus = ChannelBus::new(16);
        let result = bus
            .publish(BusEvent::TagChanged(TagChanged {
                msg_id: "m1".into(),
                tag: "t".into(),
                nvr: "n".into(),
                tagged: true,
            }))
            .await;
        assert!(result.is_ok());
    }
}
