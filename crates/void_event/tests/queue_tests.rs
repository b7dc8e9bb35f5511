//! Integration tests for void_event crate

use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use void_core::{rtti, RttiType};
use void_event::prelude::*;
use void_event::SubscriberId;

#[derive(Debug)]
struct Alarm {
    source: usize,
}

rtti!(Alarm);

#[derive(Debug)]
struct Silence;

rtti!(Silence);

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_enqueue_from_many_threads() {
    init_logging();
    let queue = Arc::new(EventQueue::default());
    let per_source = Arc::new(Mutex::new([0usize; 4]));
    let sink = Arc::clone(&per_source);
    queue
        .subscriptions()
        .subscribe_fn(move |alarm: &Alarm| sink.lock()[alarm.source] += 1);

    let handles: Vec<_> = (0..4)
        .map(|source| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for _ in 0..25 {
                    queue.enqueue(EventEnvelope::new(Alarm { source }), &GameTime::new(), Duration::ZERO);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(queue.len(), 100);
    queue.update(&GameTime::new());
    assert_eq!(*per_source.lock(), [25; 4]);
    assert!(queue.is_empty());
}

#[test]
fn test_unsubscribe_during_parallel_delivery() {
    init_logging();
    let queue = EventQueue::new(EventQueueConfig {
        parallel_threshold: 1,
        max_workers: 4,
    });
    let subscriptions = Arc::clone(queue.subscriptions());
    let ids: Arc<Mutex<Vec<SubscriberId>>> = Arc::new(Mutex::new(Vec::new()));
    let hits = Arc::new(AtomicUsize::new(0));

    for _ in 0..6 {
        let hits = Arc::clone(&hits);
        let ids_in = Arc::clone(&ids);
        let subs = Arc::clone(&subscriptions);
        let id = subscriptions.subscribe_fn(move |_: &Alarm| {
            hits.fetch_add(1, Ordering::SeqCst);
            assert!(subs.is_delivering());
            for id in ids_in.lock().iter() {
                subs.unsubscribe(*id);
            }
        });
        ids.lock().push(id);
    }

    queue.send(&EventEnvelope::new(Alarm { source: 0 }));
    assert_eq!(hits.load(Ordering::SeqCst), 6);
    assert!(!subscriptions.is_delivering());
    assert_eq!(subscriptions.count(Alarm::TYPE_ID), 0);
}

#[test]
fn test_events_are_routed_by_type() {
    let queue = EventQueue::default();
    let alarms = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&alarms);
    queue.subscriptions().subscribe_fn(move |_: &Alarm| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let mut time = GameTime::new();
    queue.enqueue(EventEnvelope::new(Silence), &time, Duration::ZERO);
    queue.enqueue(EventEnvelope::new(Alarm { source: 1 }), &time, Duration::from_millis(20));

    time.advance(Duration::from_millis(10));
    queue.update(&time);
    assert_eq!(alarms.load(Ordering::SeqCst), 0);
    assert_eq!(queue.len(), 1);

    time.advance(Duration::from_millis(10));
    queue.update(&time);
    assert_eq!(alarms.load(Ordering::SeqCst), 1);
    assert_eq!(queue.subscriptions().count(Silence::TYPE_ID), 0);
}

#[test]
fn test_queue_recovers_from_panicking_subscriber() {
    init_logging();
    let queue = Arc::new(EventQueue::default());
    let armed = Arc::new(AtomicBool::new(true));
    let delivered = Arc::new(AtomicUsize::new(0));

    let inner_queue = Arc::clone(&queue);
    let trigger = Arc::clone(&armed);
    let counter = Arc::clone(&delivered);
    queue.subscriptions().subscribe_fn(move |alarm: &Alarm| {
        if trigger.swap(false, Ordering::SeqCst) {
            inner_queue.enqueue(EventEnvelope::new(Alarm { source: 1 }), &GameTime::new(), Duration::ZERO);
            panic!("alarm {} failed", alarm.source);
        }
        counter.fetch_add(1, Ordering::SeqCst);
    });

    queue.enqueue(EventEnvelope::new(Alarm { source: 0 }), &GameTime::new(), Duration::ZERO);
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| queue.update(&GameTime::new())));
    assert!(outcome.is_err());
    assert!(!queue.is_updating());
    assert!(!queue.subscriptions().is_delivering());
    // The event queued before the panic survives it
    assert_eq!(queue.len(), 1);

    queue.enqueue(EventEnvelope::new(Alarm { source: 2 }), &GameTime::new(), Duration::ZERO);
    queue.update(&GameTime::new());
    assert_eq!(delivered.load(Ordering::SeqCst), 2);
    assert!(queue.is_empty());
}
