//! Delivery of director events to the actuator and any other listeners.

use async_trait::async_trait;
use auteur_types::{
    events::{DirectorEvent, EventKind},
    AuteurError, Result,
};
use futures::{stream::BoxStream, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{trace, warn};

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: DirectorEvent) -> Result<()>;
    fn subscribe(&self) -> BoxStream<'static, DirectorEvent>;
}

/// In-process bus backed by a broadcast channel. Events published before a
/// subscriber attaches are not replayed to it.
#[derive(Clone)]
pub struct LocalBus {
    tx: broadcast::Sender<DirectorEvent>,
}

impl LocalBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Stream of a single event kind. Ends when the bus is dropped.
    pub fn subscribe_kind(&self, kind: EventKind) -> BoxStream<'static, DirectorEvent> {
        let mut rx = self.tx.subscribe();
        let stream = async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok(event) if event.kind == kind => yield event,
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(?kind, skipped, "subscriber lagging; events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        };
        stream.boxed()
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EventSink for LocalBus {
    async fn publish(&self, event: DirectorEvent) -> Result<()> {
        match self.tx.send(event) {
            Ok(receivers) => trace!(receivers, "event published"),
            Err(_) => trace!("event published with no subscribers"),
        }
        Ok(())
    }

    fn subscribe(&self) -> BoxStream<'static, DirectorEvent> {
        BroadcastStream::new(self.tx.subscribe())
            .filter_map(|event| async move {
                match event {
                    Ok(event) => Some(event),
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        warn!(skipped, "subscriber lagging; events dropped");
                        None
                    }
                }
            })
            .boxed()
    }
}

pub fn network_error(message: impl Into<String>) -> AuteurError {
    AuteurError::Network(message.into())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use auteur_types::{
        director::{Panel, Phase},
        events::EventPayload,
    };

    #[tokio::test]
    async fn subscribers_see_events_in_order() {
        let bus = LocalBus::new(16);
        let mut all = bus.subscribe();
        let mut panels = bus.subscribe_kind(EventKind::Panel);
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(DirectorEvent::phase_changed(
            Duration::from_secs(1),
            Phase::NotStarted,
            Phase::Running,
        ))
        .await
        .unwrap();
        bus.publish(DirectorEvent::panel_changed(Duration::from_secs(2), None, Panel::Kda))
            .await
            .unwrap();
        bus.publish(DirectorEvent::panel_changed(
            Duration::from_secs(17),
            Some(Panel::Kda),
            Panel::ActionsPerMinute,
        ))
        .await
        .unwrap();

        let kinds: Vec<EventKind> = (&mut all).take(3).map(|e| e.kind).collect().await;
        assert_eq!(kinds, vec![EventKind::Phase, EventKind::Panel, EventKind::Panel]);

        let first = panels.next().await.unwrap();
        let second = panels.next().await.unwrap();
        assert_eq!(first.offset, Duration::from_secs(2));
        assert!(matches!(
            second.payload,
            EventPayload::PanelChanged(ref change) if change.current == Panel::ActionsPerMinute
        ));
    }

    #[tokio::test]
    async fn publishing_without_subscribers_is_fine() {
        let bus = LocalBus::default();
        let result = bus
            .publish(DirectorEvent::phase_changed(
                Duration::ZERO,
                Phase::Running,
                Phase::Paused,
            ))
            .await;
        assert!(result.is_ok());
        assert!(network_error("unreachable").to_string().contains("unreachable"));
    }

    #[tokio::test]
    async fn lagging_subscriber_skips_ahead() {
        let bus = LocalBus::new(2);
        let mut stream = bus.subscribe();
        for secs in 0..5 {
            bus.publish(DirectorEvent::panel_changed(
                Duration::from_secs(secs),
                None,
                Panel::Talents,
            ))
            .await
            .unwrap();
        }
        let next = stream.next().await.unwrap();
        assert_eq!(next.offset, Duration::from_secs(3));
    }
}
