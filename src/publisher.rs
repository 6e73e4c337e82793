//! Subscription fan-out
//!
//! One broadcast channel per key, where the key is a fixed prefix plus the
//! scoping id (`ENGAGEMENT_UPDATE.<org_id>`, `MENTION.<user_id>`). Channels
//! are created by the first subscriber and removed when the last subscriber
//! drops its stream. Publishing to a key nobody listens on is a no-op:
//! nothing is buffered for later subscribers.

use bson::oid::ObjectId;
use dashmap::DashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, warn};

use crate::db::schemas::{EngagementDoc, Mention};

/// Key prefix for per-organization engagement updates
pub const ENGAGEMENT_UPDATE: &str = "ENGAGEMENT_UPDATE";

/// Key prefix for per-user mentions
pub const MENTION: &str = "MENTION";

/// Default per-channel buffer
pub const DEFAULT_CAPACITY: usize = 64;

/// Channel key for a prefix and scoping id
pub fn channel_key(prefix: &str, id: &ObjectId) -> String {
    format!("{}.{}", prefix, id.to_hex())
}

/// Event carried on a channel
#[derive(Debug, Clone)]
pub enum Event {
    EngagementUpdate(EngagementDoc),
    Mention(Mention),
}

type Registry = DashMap<String, broadcast::Sender<Event>>;

// ============================================================================
// Publisher
// ============================================================================

/// In-process pub/sub registry
#[derive(Clone)]
pub struct Publisher {
    channels: Arc<Registry>,
    capacity: usize,
}

impl Default for Publisher {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Publisher {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Publish to a key; returns how many subscribers received the event
    pub fn publish(&self, key: &str, event: Event) -> usize {
        let Some(sender) = self.channels.get(key).map(|s| s.clone()) else {
            debug!(key, "publish without subscribers");
            return 0;
        };

        // Err only when every receiver is gone
        let delivered = sender.send(event).unwrap_or(0);
        debug!(key, delivered, "published event");
        delivered
    }

    /// Subscribe to a key, creating its channel on first use
    pub fn subscribe(&self, key: &str) -> Subscription {
        let receiver = self
            .channels
            .entry(key.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();

        debug!(key, "subscribed");
        Subscription {
            inner: BroadcastStream::new(receiver),
            _guard: ChannelGuard {
                channels: Arc::clone(&self.channels),
                key: key.to_string(),
            },
        }
    }

    pub fn publish_engagement(&self, engagement: EngagementDoc) -> usize {
        let key = channel_key(ENGAGEMENT_UPDATE, &engagement.org_id);
        self.publish(&key, Event::EngagementUpdate(engagement))
    }

    pub fn publish_mention(&self, user_id: &ObjectId, mention: Mention) -> usize {
        self.publish(&channel_key(MENTION, user_id), Event::Mention(mention))
    }

    /// Engagement updates for one organization
    pub fn subscribe_engagements(
        &self,
        org_id: &ObjectId,
    ) -> impl Stream<Item = EngagementDoc> + Send + Unpin + 'static {
        self.subscribe(&channel_key(ENGAGEMENT_UPDATE, org_id))
            .filter_map(|event| match event {
                Event::EngagementUpdate(engagement) => Some(engagement),
                Event::Mention(_) => None,
            })
    }

    /// Mentions addressed to one user
    pub fn subscribe_mentions(
        &self,
        user_id: &ObjectId,
    ) -> impl Stream<Item = Mention> + Send + Unpin + 'static {
        self.subscribe(&channel_key(MENTION, user_id))
            .filter_map(|event| match event {
                Event::Mention(mention) => Some(mention),
                Event::EngagementUpdate(_) => None,
            })
    }

    /// Number of channels with at least one live subscriber
    pub fn active_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn subscriber_count(&self, key: &str) -> usize {
        self.channels
            .get(key)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// Event stream for one key; dropping it unsubscribes
pub struct Subscription {
    // Declared before the guard so the receiver is gone when the guard runs
    inner: BroadcastStream<Event>,
    _guard: ChannelGuard,
}

impl Stream for Subscription {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => return Poll::Ready(Some(event)),
                Poll::Ready(Some(Err(BroadcastStreamRecvError::Lagged(missed)))) => {
                    warn!(key = %self._guard.key, missed, "subscriber lagged, events skipped");
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

struct ChannelGuard {
    channels: Arc<Registry>,
    key: String,
}

impl Drop for ChannelGuard {
    fn drop(&mut self) {
        let removed = self
            .channels
            .remove_if(&self.key, |_, sender| sender.receiver_count() == 0)
            .is_some();
        debug!(key = %self.key, removed, "unsubscribed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn engagement(org_id: ObjectId, title: &str) -> EngagementDoc {
        let mut doc = EngagementDoc::new(org_id, title.into());
        doc._id = Some(ObjectId::new());
        doc
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_not_replayed() {
        let publisher = Publisher::default();
        let org9 = ObjectId::new();

        assert_eq!(publisher.publish_engagement(engagement(org9, "early")), 0);
        assert_eq!(publisher.active_channels(), 0);

        let mut updates = publisher.subscribe_engagements(&org9);
        let nothing = tokio::time::timeout(Duration::from_millis(50), updates.next()).await;
        assert!(nothing.is_err(), "an event published before subscribing was delivered");

        publisher.publish_engagement(engagement(org9, "late"));
        let received = updates.next().await.unwrap();
        assert_eq!(received.title, "late");
    }

    #[tokio::test]
    async fn test_channels_are_scoped_by_key() {
        let publisher = Publisher::default();
        let org_a = ObjectId::new();
        let org_b = ObjectId::new();

        let mut a = publisher.subscribe_engagements(&org_a);
        assert_eq!(publisher.publish_engagement(engagement(org_b, "b")), 0);
        assert_eq!(publisher.publish_engagement(engagement(org_a, "a")), 1);

        assert_eq!(a.next().await.unwrap().title, "a");
    }

    #[tokio::test]
    async fn test_dropping_last_subscriber_removes_channel() {
        let publisher = Publisher::default();
        let user = ObjectId::new();
        let key = channel_key(MENTION, &user);

        let first = publisher.subscribe_mentions(&user);
        let second = publisher.subscribe_mentions(&user);
        assert_eq!(publisher.subscriber_count(&key), 2);

        drop(first);
        assert_eq!(publisher.active_channels(), 1);
        drop(second);
        assert_eq!(publisher.active_channels(), 0);
        assert_eq!(
            publisher.publish_mention(&user, Mention::new(ObjectId::new(), ObjectId::new(), Some(user))),
            0
        );
    }

    #[tokio::test]
    async fn test_lagging_subscriber_skips_missed_events() {
        let publisher = Publisher::new(2);
        let org = ObjectId::new();
        let mut updates = publisher.subscribe_engagements(&org);

        for title in ["1", "2", "3", "4"] {
            publisher.publish_engagement(engagement(org, title));
        }

        assert_eq!(updates.next().await.unwrap().title, "3");
        assert_eq!(updates.next().await.unwrap().title, "4");
    }

    #[test]
    fn test_channel_key_format() {
        let id = ObjectId::parse_str("65f1c0ffee0000000000abcd").unwrap();
        assert_eq!(channel_key(ENGAGEMENT_UPDATE, &id), "ENGAGEMENT_UPDATE.65f1c0ffee0000000000abcd");
    }
}
