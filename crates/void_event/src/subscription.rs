//! Subscriber registry
//!
//! Changes made while a delivery is in progress are queued and applied when
//! the outermost delivery finishes, so a list is never mutated while it is
//! being walked.

use crate::envelope::{Event, EventEnvelope};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use void_core::RttiId;

/// Receives delivered events
pub trait Subscriber: Send + Sync {
    fn notify(&self, event: &EventEnvelope);
}

impl<F> Subscriber for F
where
    F: Fn(&EventEnvelope) + Send + Sync,
{
    fn notify(&self, event: &EventEnvelope) {
        self(event)
    }
}

/// Subscriber ID
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub u64);

enum PendingChange {
    Subscribe(RttiId, SubscriberId, Arc<dyn Subscriber>),
    Unsubscribe(SubscriberId),
    Clear,
}

#[derive(Default)]
struct State {
    lists: HashMap<RttiId, Vec<(SubscriberId, Arc<dyn Subscriber>)>>,
    next_id: u64,
    delivering: usize,
    pending: Vec<PendingChange>,
}

impl State {
    fn apply(&mut self, change: PendingChange) {
        match change {
            PendingChange::Subscribe(event_type, id, subscriber) => {
                self.lists.entry(event_type).or_default().push((id, subscriber));
            }
            PendingChange::Unsubscribe(id) => {
                for list in self.lists.values_mut() {
                    list.retain(|(sub_id, _)| *sub_id != id);
                }
                self.lists.retain(|_, list| !list.is_empty());
            }
            PendingChange::Clear => self.lists.clear(),
        }
    }

    fn submit(&mut self, change: PendingChange) {
        if self.delivering > 0 {
            self.pending.push(change);
        } else {
            self.apply(change);
        }
    }
}

/// Per-event-type subscriber lists
#[derive(Default)]
pub struct Subscriptions {
    state: Mutex<State>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to events of type `E`
    pub fn subscribe<E: Event>(&self, subscriber: Arc<dyn Subscriber>) -> SubscriberId {
        self.subscribe_id(E::TYPE_ID, subscriber)
    }

    /// Subscribe to events by type id
    pub fn subscribe_id(&self, event_type: RttiId, subscriber: Arc<dyn Subscriber>) -> SubscriberId {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = SubscriberId(state.next_id);
        state.submit(PendingChange::Subscribe(event_type, id, subscriber));
        id
    }

    /// Subscribe a closure to events of type `E`
    pub fn subscribe_fn<E, F>(&self, handler: F) -> SubscriberId
    where
        E: Event,
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.subscribe::<E>(Arc::new(move |envelope: &EventEnvelope| {
            if let Some(event) = envelope.downcast_ref::<E>() {
                handler(event);
            }
        }))
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.state.lock().submit(PendingChange::Unsubscribe(id));
    }

    /// Drop every subscriber
    pub fn clear(&self) {
        self.state.lock().submit(PendingChange::Clear);
    }

    /// Number of subscribers to `event_type`, pending changes excluded
    pub fn count(&self, event_type: RttiId) -> usize {
        self.state.lock().lists.get(&event_type).map_or(0, Vec::len)
    }

    /// Snapshot of the subscribers to `event_type`
    pub fn subscribers(&self, event_type: RttiId) -> Vec<Arc<dyn Subscriber>> {
        self.state
            .lock()
            .lists
            .get(&event_type)
            .map(|list| list.iter().map(|(_, s)| Arc::clone(s)).collect())
            .unwrap_or_default()
    }

    /// Defer changes until the returned guard is dropped
    pub fn begin_delivery(&self) -> DeliveryGuard<'_> {
        self.state.lock().delivering += 1;
        DeliveryGuard { owner: self }
    }

    /// True while any delivery guard is alive
    pub fn is_delivering(&self) -> bool {
        self.state.lock().delivering > 0
    }
}

impl fmt::Debug for Subscriptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Subscriptions")
            .field("event_types", &state.lists.len())
            .field("delivering", &state.delivering)
            .field("pending", &state.pending.len())
            .finish()
    }
}

/// Keeps subscription changes deferred while alive
pub struct DeliveryGuard<'a> {
    owner: &'a Subscriptions,
}

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.owner.state.lock();
        state.delivering -= 1;
        if state.delivering == 0 {
            let pending = std::mem::take(&mut state.pending);
            for change in pending {
                state.apply(change);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use void_core::rtti;

    #[derive(Debug)]
    struct Ping(u32);
    rtti!(Ping);

    #[test]
    fn test_subscribe_and_unsubscribe() {
        let subs = Subscriptions::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let id = subs.subscribe_fn(move |ping: &Ping| {
            counter.fetch_add(ping.0 as usize, Ordering::SeqCst);
        });

        assert_eq!(subs.count(<Ping as void_core::RttiType>::TYPE_ID), 1);
        let envelope = EventEnvelope::new(Ping(3));
        for subscriber in subs.subscribers(envelope.type_id()) {
            subscriber.notify(&envelope);
        }
        assert_eq!(hits.load(Ordering::SeqCst), 3);

        subs.unsubscribe(id);
        assert!(subs.subscribers(envelope.type_id()).is_empty());
    }

    #[test]
    fn test_changes_deferred_during_delivery() {
        let subs = Subscriptions::new();
        let ping = <Ping as void_core::RttiType>::TYPE_ID;
        let first = subs.subscribe_fn(|_: &Ping| {});

        {
            let _outer = subs.begin_delivery();
            let _inner = subs.begin_delivery();
            subs.subscribe_fn(|_: &Ping| {});
            subs.unsubscribe(first);
            assert_eq!(subs.count(ping), 1);
            drop(_inner);
            assert!(subs.is_delivering());
            assert_eq!(subs.count(ping), 1);
        }

        assert!(!subs.is_delivering());
        assert_eq!(subs.count(ping), 1);
        assert_eq!(subs.subscribers(ping).len(), 1);

        subs.clear();
        assert_eq!(subs.count(ping), 0);
    }
}
