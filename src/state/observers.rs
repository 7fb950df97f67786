use std::fmt;

use dashmap::DashMap;
use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

/// Fan-out hub delivering every published value to each registered observer.
///
/// Each observer owns an unbounded queue, so delivery never blocks the
/// publisher and every observer sees every value exactly once, in publish
/// order. Observers whose receiving side was dropped are pruned lazily.
pub struct ObserverHub<T> {
    observers: DashMap<Uuid, mpsc::UnboundedSender<T>>,
}

impl<T> Default for ObserverHub<T> {
    fn default() -> Self {
        Self {
            observers: DashMap::new(),
        }
    }
}

impl<T> fmt::Debug for ObserverHub<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverHub")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl<T: Clone> ObserverHub<T> {
    /// Hub without observers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new observer that will receive subsequent values.
    pub fn subscribe(&self) -> Observer<T> {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.observers.insert(id, tx);
        Observer { id, receiver: rx }
    }

    /// Stop delivering to the given observer. Returns whether it was registered.
    pub fn unsubscribe(&self, id: Uuid) -> bool {
        self.observers.remove(&id).is_some()
    }

    /// Deliver `value` to every live observer.
    pub fn publish(&self, value: T) {
        let mut closed = Vec::new();
        for entry in self.observers.iter() {
            if entry.value().send(value.clone()).is_err() {
                closed.push(*entry.key());
            }
        }

        // Removal must happen after the iterator releases its shard locks.
        for id in closed {
            self.observers.remove(&id);
        }
    }

    /// Number of registered observers.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// True when nobody is observing.
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

/// Receiving end handed out by [`ObserverHub::subscribe`].
#[derive(Debug)]
pub struct Observer<T> {
    id: Uuid,
    receiver: mpsc::UnboundedReceiver<T>,
}

impl<T> Observer<T> {
    /// Identifier accepted by [`ObserverHub::unsubscribe`].
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wait for the next value; `None` once the hub has dropped this observer.
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    /// Return an already queued value without waiting.
    pub fn try_recv(&mut self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    /// Convert the observer into a [`Stream`] of values.
    pub fn into_stream(self) -> impl Stream<Item = T> {
        UnboundedReceiverStream::new(self.receiver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_observer_sees_values_in_order() {
        let hub = ObserverHub::new();
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();

        hub.publish(1);
        hub.publish(2);

        assert_eq!(first.try_recv(), Some(1));
        assert_eq!(first.try_recv(), Some(2));
        assert_eq!(first.try_recv(), None);
        assert_eq!(second.try_recv(), Some(1));
        assert_eq!(second.try_recv(), Some(2));
    }

    #[test]
    fn dropped_observers_are_pruned() {
        let hub = ObserverHub::new();
        let kept = hub.subscribe();
        drop(hub.subscribe());
        assert_eq!(hub.len(), 2);

        hub.publish("x");
        assert_eq!(hub.len(), 1);
        assert!(hub.unsubscribe(kept.id()));
        assert!(hub.is_empty());
    }
}
