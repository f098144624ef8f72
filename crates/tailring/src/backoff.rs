use std::hint;
use std::thread;

/// Adaptive wait strategy for slot backpressure.
///
/// Spins with PAUSE hints, then yields to the OS, then tells the caller to park.
/// A slot that drains within a few microseconds never pays for a condvar round trip.
#[derive(Debug, Default)]
pub(crate) struct Backoff {
    step: u32,
}

impl Backoff {
    const SPIN_LIMIT: u32 = 6; // 2^6 = 64 spins max before yielding
    const YIELD_LIMIT: u32 = 10;

    #[inline]
    pub(crate) fn new() -> Self {
        Self { step: 0 }
    }

    /// One round of waiting: exponential spin first, `yield_now` after.
    #[inline]
    pub(crate) fn snooze(&mut self) {
        if self.step <= Self::SPIN_LIMIT {
            for _ in 0..(1u32 << self.step) {
                hint::spin_loop();
            }
        } else {
            thread::yield_now();
        }
        if self.step <= Self::YIELD_LIMIT {
            self.step += 1;
        }
    }

    /// Busy waiting is exhausted; the caller should block.
    #[inline]
    pub(crate) fn should_park(&self) -> bool {
        self.step > Self::YIELD_LIMIT
    }
}
