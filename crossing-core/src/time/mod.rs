//! ## crossing-core::time
//! **Simulation clock**
//!
//! Monotonic elapsed time since the simulation started, plus tick-scaled
//! sleeping. One tick is a fixed fraction of a real second (100ms by default).

use std::time::{Duration, Instant};

/// Default length of a tick in real time.
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

/// Time source shared by the arbiter and every agent driver.
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock was started.
    fn elapsed(&self) -> Duration;

    /// Real-time length of one tick.
    fn tick(&self) -> Duration;

    /// Suspends the calling thread for `ticks` ticks.
    fn sleep_ticks(&self, ticks: u32) {
        if ticks > 0 {
            std::thread::sleep(self.tick() * ticks);
        }
    }
}

/// Wall-clock backed simulation clock.
#[derive(Debug, Clone)]
pub struct SimClock {
    epoch: Instant,
    tick: Duration,
}

impl SimClock {
    /// Starts a clock now with the given tick length.
    pub fn start(tick: Duration) -> Self {
        Self {
            epoch: Instant::now(),
            tick,
        }
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::start(DEFAULT_TICK)
    }
}

impl Clock for SimClock {
    #[inline]
    fn elapsed(&self) -> Duration {
        self.epoch.elapsed()
    }

    #[inline]
    fn tick(&self) -> Duration {
        self.tick
    }
}

/// Formats an elapsed time as `HH:MM:SS.t`.
pub fn format_elapsed(elapsed: Duration) -> String {
    // Round to tenths first so 59.96s prints as 00:01:00.0, not 00:00:60.0.
    let tenths = (elapsed.as_millis() + 50) / 100;
    let hours = tenths / 36_000;
    let minutes = (tenths % 36_000) / 600;
    let seconds = (tenths % 600) / 10;
    let fraction = tenths % 10;
    format!("{hours:02}:{minutes:02}:{seconds:02}.{fraction}")
}
