//! A scripted bus for scheduler and engine tests.
//!
//! Unlike [`crate::ChannelBus`], [`MockBus`] keeps every published event in a
//! `Vec` a test can inspect afterwards (`published()`), and lets a test push
//! synthetic incoming events directly onto the one subscription it hands out
//! — there is no fan-out to simulate, scheduler tests only ever run one
//! consumer.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::BusError;
use crate::event::BusEvent;
use crate::transport::{BusSubscription, BusTransport};

pub struct MockBus {
    published: Mutex<Vec<BusEvent>>,
    incoming_tx: mpsc::UnboundedSender<BusEvent>,
    incoming_rx: Mutex<Option<mpsc::UnboundedReceiver<BusEvent>>>,
}

impl MockBus {
    pub fn new() -> Self {
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        Self {
            published: Mutex::new(Vec::new()),
            incoming_tx,
            incoming_rx: Mutex::new(Some(incoming_rx)),
        }
    }

    /// Queue an event for the next `subscribe().recv()` to pick up, as if it
    /// arrived from the real bus.
    pub fn push_incoming(&self, event: BusEvent) {
        let _ = self.incoming_tx.send(event);
    }

    /// Every event a test's code under test has published, in order.
    pub fn published(&self) -> Vec<BusEvent> {
        self.published.lock().unwrap().clone()
    }
}

impl Default for MockBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BusTransport for MockBus {
    async fn publish(&self, event: BusEvent) -> Result<(), BusError> {
        self.published.lock().unwrap().push(event);
        Ok(())
    }

    fn subscribe(&self) -> BusSubscription {
        let receiver = self
            .incoming_rx
            .lock()
            .unwrap()
            .take()
            .expect("MockBus: subscribe() called more than once");
        BusSubscription::from_channel(receiver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::TagChanged;

    #[tokio::test]
    async fn pushed_events_are_delivered_to_the_one_subscriber() {
        let bus = MockBus::new();
        let mut sub = bus.subscribe();

        bus.push_incoming(BusEvent::TagChanged(TagChanged {
            msg_id: "m1".into(),
            tag: "module-foo-f29".into(),
            nvr: "foo-1.0-1".into(),
            tagged: true,
        }));

        let event = sub.recv().await.unwrap();
        assert_eq!(event.msg_id(), "m1");
    }

    #[tokio::test]
    async fn published_events_are_recorded_for_assertions() {
        let bus = MockBus::new();
        bus.publish(BusEvent::TagChanged(TagChanged {
            msg_id: "m1".into(),
            tag: "t".into(),
            nvr: "n".into(),
            tagged: true,
        }))
        .await
        .unwrap();

        assert_eq!(bus.published().len(), 1);
    }
}
