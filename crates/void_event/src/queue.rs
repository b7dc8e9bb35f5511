//! Time-ordered event queue
//!
//! Events are queued with a delay and delivered by [`EventQueue::update`]
//! once due, in the order they were queued. While `update` is delivering,
//! `enqueue` and `clear` are recorded and applied after delivery finishes.

use crate::envelope::EventEnvelope;
use crate::subscription::{Subscriber, Subscriptions};
use crate::time::GameTime;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Fan-out tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventQueueConfig {
    /// Deliver on worker threads when an event has more subscribers than this
    pub parallel_threshold: usize,
    /// Upper bound on worker threads per delivery
    pub max_workers: usize,
}

impl Default for EventQueueConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: 8,
            max_workers: 4,
        }
    }
}

#[derive(Default)]
struct QueueState {
    events: Vec<EventEnvelope>,
    updating: bool,
    pending_enqueue: Vec<EventEnvelope>,
    pending_clear: bool,
}

/// Queue of delayed events
pub struct EventQueue {
    state: Mutex<QueueState>,
    subscriptions: Arc<Subscriptions>,
    config: EventQueueConfig,
}

impl EventQueue {
    /// Create a queue with its own subscriptions
    pub fn new(config: EventQueueConfig) -> Self {
        Self::with_subscriptions(config, Arc::new(Subscriptions::new()))
    }

    /// Create a queue that delivers to existing subscriptions
    pub fn with_subscriptions(config: EventQueueConfig, subscriptions: Arc<Subscriptions>) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            subscriptions,
            config,
        }
    }

    pub fn subscriptions(&self) -> &Arc<Subscriptions> {
        &self.subscriptions
    }

    pub fn config(&self) -> &EventQueueConfig {
        &self.config
    }

    /// Queue `envelope` to become due `delay` after `now`
    pub fn enqueue(&self, mut envelope: EventEnvelope, now: &GameTime, delay: Duration) {
        envelope.stamp(now.total(), delay);
        let mut state = self.state.lock();
        if state.updating {
            state.pending_enqueue.push(envelope);
        } else {
            state.events.push(envelope);
        }
    }

    /// Deliver immediately, bypassing the queue
    pub fn send(&self, envelope: &EventEnvelope) {
        self.deliver(envelope);
    }

    /// Deliver every event due at `now`, oldest first
    pub fn update(&self, now: &GameTime) {
        let due = {
            let mut state = self.state.lock();
            if state.updating {
                log::warn!("EventQueue::update called during delivery; ignored");
                return;
            }
            state.updating = true;
            let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut state.events)
                .into_iter()
                .partition(|e| e.is_expired(now.total()));
            state.events = waiting;
            due
        };

        let _guard = UpdateGuard { state: &self.state };
        if !due.is_empty() {
            log::trace!("Delivering {} events at {:?}", due.len(), now.total());
        }
        for envelope in &due {
            self.deliver(envelope);
        }
    }

    /// Drop every queued event. During delivery this also drops events
    /// queued earlier in the same delivery.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        if state.updating {
            state.pending_clear = true;
            state.pending_enqueue.clear();
        } else {
            state.events.clear();
        }
    }

    /// Number of queued events, pending ones included
    pub fn len(&self) -> usize {
        let state = self.state.lock();
        state.events.len() + state.pending_enqueue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True while `update` is delivering
    pub fn is_updating(&self) -> bool {
        self.state.lock().updating
    }

    /// Notify every subscriber, on worker threads above the threshold.
    /// Returns once all of them have been notified.
    fn deliver(&self, envelope: &EventEnvelope) {
        let _guard = self.subscriptions.begin_delivery();
        let subscribers = self.subscriptions.subscribers(envelope.type_id());
        if subscribers.len() <= self.config.parallel_threshold || self.config.max_workers < 2 {
            for subscriber in &subscribers {
                subscriber.notify(envelope);
            }
            return;
        }

        let workers = self.config.max_workers.min(subscribers.len());
        let chunk = subscribers.len().div_ceil(workers);
        let result = crossbeam_utils::thread::scope(|scope| {
            for batch in subscribers.chunks(chunk) {
                scope.spawn(move |_| notify_all(batch, envelope));
            }
        });
        if result.is_err() {
            log::error!("A subscriber to {} panicked during delivery", envelope.type_name());
        }
    }
}

/// Ends an update, even one unwound by a panicking subscriber
struct UpdateGuard<'a> {
    state: &'a Mutex<QueueState>,
}

impl Drop for UpdateGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.updating = false;
        if std::mem::take(&mut state.pending_clear) {
            state.events.clear();
        }
        let pending = std::mem::take(&mut state.pending_enqueue);
        state.events.extend(pending);
        if std::thread::panicking() {
            log::error!("Event delivery panicked; {} events still queued", state.events.len());
        }
    }
}

fn notify_all(batch: &[Arc<dyn Subscriber>], envelope: &EventEnvelope) {
    for subscriber in batch {
        subscriber.notify(envelope);
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new(EventQueueConfig::default())
    }
}

impl fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("EventQueue")
            .field("queued", &state.events.len())
            .field("pending", &state.pending_enqueue.len())
            .field("updating", &state.updating)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use void_core::rtti;

    #[derive(Debug)]
    struct Tick(u32);
    rtti!(Tick);

    fn at(ms: u64) -> GameTime {
        GameTime::at(Duration::from_millis(ms))
    }

    #[test]
    fn test_delivers_when_due_in_order() {
        let queue = EventQueue::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        queue
            .subscriptions()
            .subscribe_fn(move |tick: &Tick| sink.lock().push(tick.0));

        queue.enqueue(EventEnvelope::new(Tick(1)), &at(0), Duration::from_millis(100));
        queue.enqueue(EventEnvelope::new(Tick(2)), &at(0), Duration::ZERO);
        queue.enqueue(EventEnvelope::new(Tick(3)), &at(0), Duration::from_millis(50));

        queue.update(&at(10));
        assert_eq!(*seen.lock(), vec![2]);
        assert_eq!(queue.len(), 2);

        queue.update(&at(100));
        assert_eq!(*seen.lock(), vec![2, 1, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_enqueue_during_update_is_deferred() {
        let queue = Arc::new(EventQueue::default());
        let delivered = Arc::new(AtomicUsize::new(0));

        let inner_queue = Arc::clone(&queue);
        let counter = Arc::clone(&delivered);
        queue.subscriptions().subscribe_fn(move |tick: &Tick| {
            counter.fetch_add(1, Ordering::SeqCst);
            assert!(inner_queue.is_updating());
            if tick.0 < 3 {
                inner_queue.enqueue(EventEnvelope::new(Tick(tick.0 + 1)), &at(0), Duration::ZERO);
            }
        });

        queue.enqueue(EventEnvelope::new(Tick(1)), &at(0), Duration::ZERO);
        queue.update(&at(0));
        assert_eq!(delivered.load(Ordering::SeqCst), 1);
        assert_eq!(queue.len(), 1);

        queue.update(&at(0));
        queue.update(&at(0));
        assert_eq!(delivered.load(Ordering::SeqCst), 3);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_clear_during_update_is_deferred() {
        let queue = Arc::new(EventQueue::default());
        let inner_queue = Arc::clone(&queue);
        queue.subscriptions().subscribe_fn(move |tick: &Tick| {
            if tick.0 == 1 {
                inner_queue.enqueue(EventEnvelope::new(Tick(9)), &at(0), Duration::ZERO);
                inner_queue.clear();
                inner_queue.enqueue(EventEnvelope::new(Tick(2)), &at(0), Duration::ZERO);
            }
        });

        queue.enqueue(EventEnvelope::new(Tick(1)), &at(0), Duration::ZERO);
        queue.enqueue(EventEnvelope::new(Tick(5)), &at(0), Duration::from_secs(60));
        queue.update(&at(0));

        assert_eq!(queue.len(), 1);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        queue
            .subscriptions()
            .subscribe_fn(move |tick: &Tick| sink.lock().push(tick.0));
        queue.update(&at(0));
        assert_eq!(*seen.lock(), vec![2]);
    }

    #[test]
    fn test_parallel_fan_out_reaches_everyone() {
        let queue = EventQueue::new(EventQueueConfig {
            parallel_threshold: 2,
            max_workers: 3,
        });
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..10 {
            let counter = Arc::clone(&hits);
            queue.subscriptions().subscribe_fn(move |_: &Tick| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        queue.send(&EventEnvelope::new(Tick(0)));
        assert_eq!(hits.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_config_defaults_from_partial_json() {
        let config: EventQueueConfig = serde_json::from_str(r#"{ "max_workers": 2 }"#).unwrap();
        assert_eq!(config.max_workers, 2);
        assert_eq!(config.parallel_threshold, EventQueueConfig::default().parallel_threshold);
    }
}
