//! Rate and cost counters for the validation queue (§4.4 scheduler loop,
//! §5 "Backpressure").
//!
//! Both counters are process-local and reset at process-local midnight;
//! cross-instance coordination is explicitly out of scope (§4.4).

use std::collections::VecDeque;

/// At most this many validator calls per [`RATE_WINDOW_SECONDS`] (§4.4).
pub const RATE_LIMIT_PER_WINDOW: usize = 10;
pub const RATE_WINDOW_SECONDS: i64 = 60;

/// Daily budget in currency units, and the cost of a single validator
/// call (§4.4 "10 currency units at 0.01/item" => 1000 calls/day).
pub const DAILY_BUDGET: f64 = 10.0;
pub const COST_PER_ITEM: f64 = 0.01;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Sliding window of call timestamps, capped at [`RATE_LIMIT_PER_WINDOW`].
#[derive(Debug, Default)]
pub struct RateWindow {
    calls: VecDeque<i64>,
}

impl RateWindow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn prune(&mut self, now: i64) {
        while let Some(&front) = self.calls.front() {
            if now - front >= RATE_WINDOW_SECONDS {
                self.calls.pop_front();
            } else {
                break;
            }
        }
    }

    /// Calls still counted against the window as of `now`.
    pub fn used(&mut self, now: i64) -> usize {
        self.prune(now);
        self.calls.len()
    }

    #[must_use]
    pub fn is_exhausted(&mut self, now: i64) -> bool {
        self.used(now) >= RATE_LIMIT_PER_WINDOW
    }

    /// Seconds until the oldest call in the window ages out, or `0` if
    /// the window isn't exhausted.
    pub fn remaining_wait(&mut self, now: i64) -> i64 {
        if !self.is_exhausted(now) {
            return 0;
        }
        let oldest = *self.calls.front().expect("exhausted implies non-empty");
        (RATE_WINDOW_SECONDS - (now - oldest)).max(0)
    }

    pub fn record(&mut self, now: i64) {
        self.prune(now);
        self.calls.push_back(now);
    }
}

/// Daily spend tracker, auto-resetting at the next process-local midnight
/// once exhausted (§4.4 "auto-pause until next midnight reset").
#[derive(Debug)]
pub struct Budget {
    spent: f64,
    day_start: i64,
}

impl Budget {
    #[must_use]
    pub fn new(now: i64) -> Self {
        Self {
            spent: 0.0,
            day_start: day_start(now),
        }
    }

    fn roll_if_new_day(&mut self, now: i64) {
        let today = day_start(now);
        if today != self.day_start {
            self.day_start = today;
            self.spent = 0.0;
        }
    }

    pub fn remaining(&mut self, now: i64) -> f64 {
        self.roll_if_new_day(now);
        (DAILY_BUDGET - self.spent).max(0.0)
    }

    #[must_use]
    pub fn is_exhausted(&mut self, now: i64) -> bool {
        self.remaining(now) < COST_PER_ITEM
    }

    pub fn record_spend(&mut self, now: i64, amount: f64) {
        self.roll_if_new_day(now);
        self.spent += amount;
    }

    pub fn total_spent(&mut self, now: i64) -> f64 {
        self.roll_if_new_day(now);
        self.spent
    }
}

fn day_start(now: i64) -> i64 {
    now - now.rem_euclid(SECONDS_PER_DAY)
}
