//! # void_event - Event Queue
//!
//! Time-ordered event delivery:
//! - [`EventEnvelope`]: a type-erased event plus its enqueue time and delay
//! - [`EventQueue`]: delivers events once due, in enqueue order
//! - [`Subscriptions`]: per-type subscriber lists, safe to change mid-delivery
//! - Parallel fan-out across worker threads for busy event types
//!
//! ```ignore
//! let queue = EventQueue::default();
//! queue.subscriptions().subscribe_fn(|hit: &Hit| println!("{}", hit.damage));
//! queue.enqueue(EventEnvelope::new(Hit { damage: 3 }), &time, Duration::from_secs(1));
//! queue.update(&time);
//! ```

pub mod envelope;
pub mod queue;
pub mod subscription;
pub mod time;

pub use envelope::{Event, EventEnvelope};
pub use queue::{EventQueue, EventQueueConfig};
pub use subscription::{DeliveryGuard, Subscriber, SubscriberId, Subscriptions};
pub use time::GameTime;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Event, EventEnvelope, EventQueue, EventQueueConfig, GameTime, Subscriber, Subscriptions};
}
