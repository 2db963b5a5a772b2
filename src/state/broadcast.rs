//! Per-match notification topics with one bounded queue per viewer.

use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::dto::sse::ServerEvent;

/// Handle of one connected viewer.
#[derive(Clone, Debug)]
pub struct Subscriber {
    /// Identifier used to unsubscribe.
    pub id: Uuid,
    /// Bounded queue feeding the viewer's stream.
    pub tx: mpsc::Sender<ServerEvent>,
}

/// Outcome of a publish, for logging only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Subscribers that accepted the event.
    pub delivered: usize,
    /// Subscribers whose queue was full; they miss this event.
    pub dropped: usize,
    /// Subscribers that had disconnected and were removed.
    pub pruned: usize,
}

/// One notification topic per match, each with its own subscriber list.
pub struct MatchBroadcaster {
    topics: DashMap<Uuid, Vec<Subscriber>>,
    capacity: usize,
}

impl MatchBroadcaster {
    /// Broadcaster whose subscriber queues hold `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Fresh bounded queue sized for a subscriber.
    pub fn channel(&self) -> (mpsc::Sender<ServerEvent>, mpsc::Receiver<ServerEvent>) {
        mpsc::channel(self.capacity)
    }

    /// Add `subscriber` to the topic of `match_id`.
    pub fn subscribe(&self, match_id: Uuid, subscriber: Subscriber) {
        debug!(%match_id, subscriber_id = %subscriber.id, "viewer subscribed");
        self.topics.entry(match_id).or_default().push(subscriber);
    }

    /// Remove a subscriber. Returns whether it was registered.
    pub fn unsubscribe(&self, match_id: Uuid, subscriber_id: Uuid) -> bool {
        let removed = match self.topics.get_mut(&match_id) {
            Some(mut subscribers) => {
                let before = subscribers.len();
                subscribers.retain(|subscriber| subscriber.id != subscriber_id);
                before != subscribers.len()
            }
            None => false,
        };
        self.topics
            .remove_if(&match_id, |_, subscribers| subscribers.is_empty());
        if removed {
            debug!(%match_id, %subscriber_id, "viewer unsubscribed");
        }
        removed
    }

    /// Number of viewers currently following `match_id`.
    pub fn subscriber_count(&self, match_id: Uuid) -> usize {
        self.topics
            .get(&match_id)
            .map(|subscribers| subscribers.len())
            .unwrap_or(0)
    }

    /// Deliver `event` to every subscriber of `match_id` without waiting.
    ///
    /// A full queue drops the event for that subscriber only; a closed queue
    /// removes the subscriber from the topic.
    pub fn publish(&self, match_id: Uuid, event: ServerEvent) -> Delivery {
        let mut delivery = Delivery::default();
        let Some(mut subscribers) = self.topics.get_mut(&match_id) else {
            return delivery;
        };

        subscribers.retain(|subscriber| match subscriber.tx.try_send(event.clone()) {
            Ok(()) => {
                delivery.delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                delivery.dropped += 1;
                true
            }
            Err(TrySendError::Closed(_)) => {
                delivery.pruned += 1;
                false
            }
        });
        drop(subscribers);

        if delivery.pruned > 0 {
            self.topics
                .remove_if(&match_id, |_, subscribers| subscribers.is_empty());
        }
        if delivery.dropped > 0 {
            warn!(
                %match_id,
                event = event.event.as_deref().unwrap_or("message"),
                dropped = delivery.dropped,
                "slow viewers missed a match notification"
            );
        }
        delivery
    }

    /// Drop the whole topic of `match_id`, closing every subscriber stream.
    ///
    /// Events already queued are still delivered before the streams end.
    pub fn close_topic(&self, match_id: Uuid) -> usize {
        self.topics
            .remove(&match_id)
            .map(|(_, subscribers)| subscribers.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(name: &str) -> ServerEvent {
        ServerEvent::new(Some(name.to_string()), "{}".to_string())
    }

    fn subscriber(broadcaster: &MatchBroadcaster) -> (Subscriber, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = broadcaster.channel();
        (
            Subscriber {
                id: Uuid::new_v4(),
                tx,
            },
            rx,
        )
    }

    #[tokio::test]
    async fn publish_reaches_only_the_matching_topic() {
        let broadcaster = MatchBroadcaster::new(4);
        let match_a = Uuid::new_v4();
        let match_b = Uuid::new_v4();
        let (sub_a, mut rx_a) = subscriber(&broadcaster);
        let (sub_b, mut rx_b) = subscriber(&broadcaster);
        broadcaster.subscribe(match_a, sub_a);
        broadcaster.subscribe(match_b, sub_b);

        let delivery = broadcaster.publish(match_a, event("basket.scored"));
        assert_eq!(delivery.delivered, 1);

        let received = rx_a.recv().await.unwrap();
        assert_eq!(received.event.as_deref(), Some("basket.scored"));
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn full_subscriber_does_not_block_others() {
        let broadcaster = MatchBroadcaster::new(1);
        let match_id = Uuid::new_v4();
        let (slow, _slow_rx) = subscriber(&broadcaster);
        let (fast, mut fast_rx) = subscriber(&broadcaster);
        broadcaster.subscribe(match_id, slow);
        broadcaster.subscribe(match_id, fast);

        broadcaster.publish(match_id, event("first"));
        fast_rx.recv().await.unwrap();
        let delivery = broadcaster.publish(match_id, event("second"));

        assert_eq!(delivery.delivered, 1);
        assert_eq!(delivery.dropped, 1);
        assert_eq!(
            fast_rx.recv().await.unwrap().event.as_deref(),
            Some("second")
        );
        assert_eq!(broadcaster.subscriber_count(match_id), 2);
    }

    #[test]
    fn closed_subscribers_are_pruned() {
        let broadcaster = MatchBroadcaster::new(4);
        let match_id = Uuid::new_v4();
        let (gone, gone_rx) = subscriber(&broadcaster);
        let (alive, _alive_rx) = subscriber(&broadcaster);
        broadcaster.subscribe(match_id, gone);
        broadcaster.subscribe(match_id, alive);
        drop(gone_rx);

        let delivery = broadcaster.publish(match_id, event("clock.started"));
        assert_eq!(delivery.pruned, 1);
        assert_eq!(delivery.delivered, 1);
        assert_eq!(broadcaster.subscriber_count(match_id), 1);
    }

    #[tokio::test]
    async fn closing_a_topic_ends_streams_after_queued_events() {
        let broadcaster = MatchBroadcaster::new(4);
        let match_id = Uuid::new_v4();
        let (sub, mut rx) = subscriber(&broadcaster);
        broadcaster.subscribe(match_id, sub);

        broadcaster.publish(match_id, event("match.finished"));
        assert_eq!(broadcaster.close_topic(match_id), 1);
        assert_eq!(broadcaster.subscriber_count(match_id), 0);

        assert_eq!(
            rx.recv().await.unwrap().event.as_deref(),
            Some("match.finished")
        );
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn unsubscribe_removes_empty_topics() {
        let broadcaster = MatchBroadcaster::new(4);
        let match_id = Uuid::new_v4();
        let (sub, _rx) = subscriber(&broadcaster);
        let id = sub.id;
        broadcaster.subscribe(match_id, sub);

        assert!(broadcaster.unsubscribe(match_id, id));
        assert!(!broadcaster.unsubscribe(match_id, id));
        assert_eq!(broadcaster.subscriber_count(match_id), 0);
        assert_eq!(
            broadcaster.publish(match_id, event("match.snapshot")),
            Delivery::default()
        );
    }
}
