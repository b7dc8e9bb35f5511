//! Simulation clock

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Total elapsed simulation time and the length of the last frame
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GameTime {
    total: Duration,
    delta: Duration,
}

impl GameTime {
    /// Clock at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock at an arbitrary point
    pub fn at(total: Duration) -> Self {
        Self {
            total,
            delta: Duration::ZERO,
        }
    }

    /// Time since start
    pub fn total(&self) -> Duration {
        self.total
    }

    /// Length of the last frame
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Move forward by one frame
    pub fn advance(&mut self, delta: Duration) {
        self.delta = delta;
        self.total = self.total.saturating_add(delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance() {
        let mut time = GameTime::new();
        time.advance(Duration::from_millis(16));
        time.advance(Duration::from_millis(17));
        assert_eq!(time.total(), Duration::from_millis(33));
        assert_eq!(time.delta(), Duration::from_millis(17));
        assert_eq!(GameTime::at(Duration::from_secs(2)).delta(), Duration::ZERO);
    }
}
