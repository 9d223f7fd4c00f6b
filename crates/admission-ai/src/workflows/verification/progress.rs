//! Per-application publish/subscribe channel for provider state transitions.
//!
//! Events are not buffered for late subscribers: an observer sees exactly the events
//! published after it subscribed. Dropping a [`ProgressSubscription`] unregisters it, and an
//! application entry disappears with its last subscriber.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};

use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::trace;

use super::domain::{ApplicationId, Platform, ProviderRunState};

/// One provider changed state during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub application_id: ApplicationId,
    pub platform: Platform,
    pub status: ProviderRunState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProgressEvent {
    pub fn new(application_id: ApplicationId, platform: Platform, status: ProviderRunState) -> Self {
        Self {
            application_id,
            platform,
            status,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

type SubscriberId = u64;

#[derive(Default)]
struct SubscriberRegistry {
    next_id: SubscriberId,
    by_application: HashMap<ApplicationId, HashMap<SubscriberId, mpsc::UnboundedSender<ProgressEvent>>>,
}

impl SubscriberRegistry {
    fn remove(&mut self, application_id: ApplicationId, subscriber: SubscriberId) {
        if let Some(subscribers) = self.by_application.get_mut(&application_id) {
            subscribers.remove(&subscriber);
            if subscribers.is_empty() {
                self.by_application.remove(&application_id);
            }
        }
    }
}

fn lock(registry: &Mutex<SubscriberRegistry>) -> MutexGuard<'_, SubscriberRegistry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cloneable handle over one shared subscriber registry.
#[derive(Clone, Default)]
pub struct ProgressBroadcaster {
    registry: Arc<Mutex<SubscriberRegistry>>,
}

impl ProgressBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, application_id: ApplicationId) -> ProgressSubscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry
            .by_application
            .entry(application_id)
            .or_default()
            .insert(id, sender);
        trace!(%application_id, subscriber = id, "progress subscriber added");

        ProgressSubscription {
            application_id,
            id,
            receiver,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Delivers `event` to everyone currently subscribed to its application.
    pub fn publish(&self, event: ProgressEvent) {
        let mut registry = lock(&self.registry);
        let Some(subscribers) = registry.by_application.get(&event.application_id) else {
            return;
        };

        let closed: Vec<SubscriberId> = subscribers
            .iter()
            .filter(|(_, sender)| sender.send(event.clone()).is_err())
            .map(|(id, _)| *id)
            .collect();

        for id in closed {
            registry.remove(event.application_id, id);
        }
    }

    pub fn unsubscribe(&self, subscription: ProgressSubscription) {
        drop(subscription);
    }

    pub fn subscriber_count(&self, application_id: ApplicationId) -> usize {
        lock(&self.registry)
            .by_application
            .get(&application_id)
            .map_or(0, HashMap::len)
    }

    /// Number of applications with at least one live subscriber.
    pub fn tracked_applications(&self) -> usize {
        lock(&self.registry).by_application.len()
    }
}

/// Stream of progress events for one application; unsubscribes on drop.
pub struct ProgressSubscription {
    application_id: ApplicationId,
    id: SubscriberId,
    receiver: mpsc::UnboundedReceiver<ProgressEvent>,
    registry: Weak<Mutex<SubscriberRegistry>>,
}

impl ProgressSubscription {
    /// Returns an already-delivered event without waiting.
    pub fn try_recv(&mut self) -> Option<ProgressEvent> {
        self.receiver.try_recv().ok()
    }
}

impl Stream for ProgressSubscription {
    type Item = ProgressEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

impl Drop for ProgressSubscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).remove(self.application_id, self.id);
            trace!(application_id = %self.application_id, subscriber = self.id, "progress subscriber removed");
        }
    }
}
