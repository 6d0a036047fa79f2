use chrono::{Local, NaiveTime};
use std::thread;
use std::time::{Duration, Instant};

/// Monotonic millisecond clock with blocking sleeps.
///
/// All waiting in the firmware goes through this trait so the control flow
/// can be driven by a simulated clock in tests.
pub trait Clock {
    fn now_ms(&self) -> u64;
    fn sleep_ms(&self, ms: u64);
    fn time_of_day(&self) -> NaiveTime;
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    boot: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            boot: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.boot.elapsed().as_millis() as u64
    }

    fn sleep_ms(&self, ms: u64) {
        thread::sleep(Duration::from_millis(ms));
    }

    fn time_of_day(&self) -> NaiveTime {
        Local::now().time()
    }
}

/// `HH:MM:SS`, as shown on the clock screen.
pub fn format_time_of_day(time: NaiveTime) -> String {
    time.format("%H:%M:%S").to_string()
}
