//! Event envelopes

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use void_core::{Rtti, RttiId, RttiType};

/// Trait for events
pub trait Event: Rtti + RttiType + Send + Sync {}

// Blanket implementation
impl<T: Rtti + RttiType + Send + Sync> Event for T {}

/// Event payload plus delivery metadata
#[derive(Clone)]
pub struct EventEnvelope {
    type_id: RttiId,
    type_name: &'static str,
    data: Arc<dyn Any + Send + Sync>,
    enqueued_at: Duration,
    delay: Duration,
}

impl EventEnvelope {
    /// Wrap an event
    pub fn new<E: Event>(event: E) -> Self {
        Self {
            type_id: E::TYPE_ID,
            type_name: E::TYPE_NAME,
            data: Arc::new(event),
            enqueued_at: Duration::ZERO,
            delay: Duration::ZERO,
        }
    }

    /// Event type id
    pub fn type_id(&self) -> RttiId {
        self.type_id
    }

    /// Event type name
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Try to downcast to specific event type
    pub fn downcast_ref<E: Event>(&self) -> Option<&E> {
        self.data.downcast_ref::<E>()
    }

    /// Time the envelope was queued
    pub fn enqueued_at(&self) -> Duration {
        self.enqueued_at
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Time at which the event becomes due
    pub fn due_at(&self) -> Duration {
        self.enqueued_at.saturating_add(self.delay)
    }

    /// True once `now` has reached the due time
    pub fn is_expired(&self, now: Duration) -> bool {
        now >= self.due_at()
    }

    pub(crate) fn stamp(&mut self, enqueued_at: Duration, delay: Duration) {
        self.enqueued_at = enqueued_at;
        self.delay = delay;
    }
}

impl fmt::Debug for EventEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEnvelope")
            .field("type", &self.type_name)
            .field("enqueued_at", &self.enqueued_at)
            .field("delay", &self.delay)
            .finish()
    }
}
