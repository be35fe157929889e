//! Translation of physical keyboard/pointer state into virtual pad state.
//!
//! The mapping layer is pure: it never talks to a device. The sampling loop
//! feeds it a configuration snapshot plus a physical-input query and pushes
//! the results to the virtual controller.
//!
//! ```text
//! keys / pointer buttons ──► [resolver] ──────► buttons, triggers, d-pad, left stick
//! pointer position ────────► [motion_filter] ─► right stick
//! ```

pub mod error;
pub mod input_id;
pub mod motion_filter;
pub mod resolver;

pub use error::MapperError;
pub use input_id::{InputId, InputKind, PointerButton};
pub use motion_filter::{FilterParams, MotionState};
pub use resolver::{ButtonCommand, DigitalResolver, PressQuery};

use std::time::{Duration, Instant};

/// Analog stick position, both axes in `[-1, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StickVector {
    pub x: f32,
    pub y: f32,
}

impl StickVector {
    pub const NEUTRAL: StickVector = StickVector { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x: x.clamp(-1.0, 1.0),
            y: y.clamp(-1.0, 1.0),
        }
    }

    pub fn is_neutral(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

/// Rate limiter for log lines emitted from the 1 kHz loop.
///
/// The first call always passes so a problem shows up immediately.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_interval: Duration,
    last_event_time: Option<Instant>,
    suppressed: u64,
}

impl RateLimiter {
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            min_interval: Duration::from_millis(min_interval_ms),
            last_event_time: None,
            suppressed: 0,
        }
    }

    /// Returns `Some(suppressed_count)` when a new line may be logged.
    pub fn should_log(&mut self, now: Instant) -> Option<u64> {
        let due = match self.last_event_time {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.min_interval,
        };

        if due {
            self.last_event_time = Some(now);
            let suppressed = self.suppressed;
            self.suppressed = 0;
            Some(suppressed)
        } else {
            self.suppressed += 1;
            None
        }
    }
}
