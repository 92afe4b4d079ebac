use std::time::{Duration, Instant};

/// Rate at which the delay and sound timers count down.
pub const TIMER_HZ: u32 = 60;

const NANOS_PER_SECOND: u128 = 1_000_000_000;

/// 60Hz countdown register.
///
/// Nothing ticks this timer. The current value is derived from the wall-clock
/// time elapsed since the last `set`, so it stays accurate however often the
/// interpreter is stepped.
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start_value: u8,
    started_at: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start_value: 0,
            started_at: Instant::now(),
        }
    }

    pub fn set(&mut self, value: u8) {
        self.set_at(value, Instant::now());
    }

    pub fn set_at(&mut self, value: u8, now: Instant) {
        self.start_value = value;
        self.started_at = now;
    }

    pub fn get(&self) -> u8 {
        self.get_at(Instant::now())
    }

    /// Value of the timer as observed at `now`.
    pub fn get_at(&self, now: Instant) -> u8 {
        let elapsed = now.saturating_duration_since(self.started_at);
        let ticks = ticks_in(elapsed);

        u8::try_from(u128::from(self.start_value).saturating_sub(ticks)).unwrap_or(0)
    }

    pub fn is_active(&self) -> bool {
        self.get() > 0
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

/// Whole 60Hz periods contained in `elapsed`.
fn ticks_in(elapsed: Duration) -> u128 {
    elapsed.as_nanos() * u128::from(TIMER_HZ) / NANOS_PER_SECOND
}
