//! Typed publish/subscribe channel owned by the application root.
//!
//! Handlers run synchronously, in registration order, on the publishing
//! task. Handlers that need to do async work spawn it themselves.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

/// Event topics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    /// The bookmark list changed
    Bookmarks,
    /// Order synchronisation requests and results
    Sync,
}

/// What caused a bookmark list change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeSource {
    CacheLoad,
    Reconcile,
    LocalMutation,
    Import,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookmarkEvent {
    BookmarksChanged { count: usize, source: ChangeSource },
    /// Ask the order queue to flush now
    SyncRequested,
    OrderSyncCompleted { synced: usize, remaining: usize },
}

impl BookmarkEvent {
    pub fn topic(&self) -> Topic {
        match self {
            BookmarkEvent::BookmarksChanged { .. } => Topic::Bookmarks,
            BookmarkEvent::SyncRequested | BookmarkEvent::OrderSyncCompleted { .. } => Topic::Sync,
        }
    }
}

type Handler = Arc<dyn Fn(&BookmarkEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: Vec<(u64, Topic, Handler)>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    // A panicking handler never runs under the lock, so the data stays valid
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Process-wide event bus; clones share the same subscribers
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> Subscription
    where
        F: Fn(&BookmarkEvent) + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.handlers.push((id, topic, Arc::new(handler)));

        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Invoke every handler subscribed to the event's topic
    pub fn publish(&self, event: BookmarkEvent) {
        let topic = event.topic();
        let handlers: Vec<Handler> = lock(&self.registry)
            .handlers
            .iter()
            .filter(|(_, t, _)| *t == topic)
            .map(|(_, _, h)| Arc::clone(h))
            .collect();

        for handler in handlers {
            handler(&event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.registry).handlers.len()
    }
}

/// Handle returned by [`EventBus::subscribe`]. Dropping it keeps the
/// handler registered; call [`Subscription::unsubscribe`] to remove it.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).handlers.retain(|(id, _, _)| *id != self.id);
        }
    }
}
