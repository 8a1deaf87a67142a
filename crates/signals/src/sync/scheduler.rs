//! Fixed-interval cycle scheduling
//!
//! Cycles run back to back on one thread: wait for the interval to elapse
//! after the previous cycle finished, run, repeat. A slow cycle delays the
//! next one instead of overlapping it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Default time between shutdown checks while waiting
const DEFAULT_POLL: Duration = Duration::from_secs(1);

/// Check whether a new cycle is due.
///
/// # Arguments
/// * `last_finished` - When the previous cycle finished (None if none has run)
/// * `now` - Current instant
/// * `interval` - Minimum time between the end of one cycle and the start of the next
///
/// # Returns
/// `true` if the interval has passed (or nothing has run yet)
pub fn interval_elapsed(last_finished: Option<Instant>, now: Instant, interval: Duration) -> bool {
    match last_finished {
        Some(last) => now.saturating_duration_since(last) >= interval,
        None => true, // Never ran, so the first cycle is due immediately
    }
}

/// Drives a cycle function on a fixed interval until shutdown
#[derive(Debug, Clone)]
pub struct Scheduler {
    interval: Duration,
    poll: Duration,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            poll: DEFAULT_POLL,
        }
    }

    /// Override how often the shutdown flag is checked while idle
    pub fn with_poll(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run `cycle` immediately, then once per interval, until `shutdown` is set
    ///
    /// The flag is only checked between cycles, so an in-flight cycle always
    /// runs to completion. Returns the number of cycles run.
    pub fn run<F>(&self, shutdown: &AtomicBool, mut cycle: F) -> usize
    where
        F: FnMut(),
    {
        let mut last_finished: Option<Instant> = None;
        let mut cycles = 0;

        while !shutdown.load(Ordering::SeqCst) {
            let now = Instant::now();

            if interval_elapsed(last_finished, now, self.interval) {
                cycle();
                cycles += 1;
                last_finished = Some(Instant::now());
                continue;
            }

            // Sleep until due, waking up regularly to check for shutdown.
            // A due time past the end of the clock is never reached.
            let remaining = last_finished
                .and_then(|last| last.checked_add(self.interval))
                .map_or(self.poll, |due| due.saturating_duration_since(now));
            thread::sleep(remaining.min(self.poll));
        }

        cycles
    }
}
