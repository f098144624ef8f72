//! Splits a stream of known length into contiguous per-worker byte ranges.

#[cfg(debug_assertions)]
use crate::invariants::debug_assert_partition_tiles;

/// Half-open byte range `[start, end)` assigned to one ingestion worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Byte offset the worker seeks to.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.start
    }

    /// Number of bytes the worker is responsible for.
    #[inline]
    pub fn budget(&self) -> u64 {
        self.end - self.start
    }

    /// Offset a worker's reader is opened at: one byte before `start`, so the
    /// worker can tell whether `start` falls on a line boundary.
    #[inline]
    pub fn lead_in(&self) -> u64 {
        self.start.saturating_sub(1)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Partitions `[0, len)` into `workers` ranges of `ceil(len / workers)` bytes.
///
/// The last non-empty range is clamped to `len`. When the stream is shorter than
/// the worker count, trailing ranges are empty and sit at `len`.
///
/// # Panics
///
/// Panics if `workers` is zero.
pub fn partition(len: u64, workers: usize) -> Vec<ByteRange> {
    assert!(workers > 0, "worker count must be positive");
    let chunk = len.div_ceil(workers as u64);

    let ranges: Vec<ByteRange> = (0..workers as u64)
        .map(|i| ByteRange {
            start: (i * chunk).min(len),
            end: ((i + 1) * chunk).min(len),
        })
        .collect();

    #[cfg(debug_assertions)]
    debug_assert_partition_tiles!(&ranges, len);

    ranges
}
