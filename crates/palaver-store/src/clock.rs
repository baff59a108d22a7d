//! Strictly monotonic timestamp source.
//!
//! Message ordering and sync cursors are keyed by millisecond Unix times.
//! Two mutations in the same millisecond would otherwise produce equal
//! stamps, so the clock remembers the last value it handed out and never
//! repeats it.

use std::sync::Mutex;

use chrono::Utc;

use palaver_shared::Timestamp;

pub struct MonotonicClock {
    last: Mutex<Timestamp>,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { last: Mutex::new(0) }
    }

    /// Current millisecond Unix time, strictly greater than any value this
    /// instance returned before.
    pub fn now(&self) -> Timestamp {
        let mut last = self.last.lock().expect("clock mutex poisoned");
        let now = Utc::now().timestamp_millis();
        let stamp = now.max(*last + 1);
        *last = stamp;
        stamp
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strictly_increasing() {
        let clock = MonotonicClock::new();
        let mut prev = 0;
        for _ in 0..1000 {
            let t = clock.now();
            assert!(t > prev);
            prev = t;
        }
    }

    #[test]
    fn tracks_wall_clock() {
        let clock = MonotonicClock::new();
        let wall = Utc::now().timestamp_millis();
        assert!(clock.now() >= wall);
    }
}
