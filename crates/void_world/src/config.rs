//! Simulation configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use void_event::EventQueueConfig;

/// Simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Event queue fan-out
    pub event_queue: EventQueueConfig,

    /// Longest frame the clock advances by; longer deltas are clamped
    pub frame_budget: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            event_queue: EventQueueConfig::default(),
            frame_budget: Duration::from_millis(250),
        }
    }
}

impl SimulationConfig {
    /// Clamp `delta` to the frame budget
    pub fn clamp_delta(&self, delta: Duration) -> Duration {
        if delta > self.frame_budget {
            log::debug!("Frame delta {:?} clamped to {:?}", delta, self.frame_budget);
            self.frame_budget
        } else {
            delta
        }
    }
}
