//! Debug assertion macros for batch ring invariants.
//!
//! Active only in debug builds (`#[cfg(debug_assertions)]`), so release builds
//! carry no overhead.

// =============================================================================
// Partition tiling
// =============================================================================

/// Assert that byte ranges are ordered, contiguous and cover `[0, len)` exactly.
///
/// Used in: `partition()` before returning
macro_rules! debug_assert_partition_tiles {
    ($ranges:expr, $len:expr) => {{
        let mut cursor = 0u64;
        for range in $ranges {
            debug_assert!(
                range.start == cursor && range.start <= range.end,
                "partition gap or overlap: expected start {}, got [{}, {})",
                cursor,
                range.start,
                range.end
            );
            cursor = range.end;
        }
        debug_assert_eq!(cursor, $len, "partition does not end at stream length");
    }};
}

// =============================================================================
// Slot contents
// =============================================================================

/// Assert that a trace entry handed out by a slot holds at least one span.
///
/// **Invariant**: a slot never maps a trace id to an empty span list.
///
/// Used in: `BatchRing::append()` after pushing, `QueryEngine` while merging
macro_rules! debug_assert_nonempty_spans {
    ($trace_id:expr, $spans:expr) => {
        debug_assert!(
            !$spans.is_empty(),
            "slot holds empty span list for trace {}",
            $trace_id
        )
    };
}

/// Assert that a worker only claims slots from its own residue class.
///
/// **Invariant**: worker `w` of `n` writes slots `w, w+n, w+2n, ... mod capacity`
/// (checked through the logical batch position, which is never reduced).
///
/// Used in: `IngestWorker::advance()`
macro_rules! debug_assert_owned_batch {
    ($worker:expr, $workers:expr, $batch_pos:expr) => {
        debug_assert_eq!(
            $batch_pos % $workers,
            $worker,
            "worker {} advanced to batch {} outside its sequence",
            $worker,
            $batch_pos
        )
    };
}

/// Assert that a slot is empty before a new generation starts filling it.
///
/// Used in: `IngestWorker::advance()` after the backpressure wait
macro_rules! debug_assert_slot_drained {
    ($ring:expr, $slot:expr) => {
        debug_assert_eq!(
            $ring.size($slot),
            0,
            "slot {} reused before its previous generation was cleared",
            $slot
        )
    };
}

pub(crate) use debug_assert_nonempty_spans;
pub(crate) use debug_assert_owned_batch;
pub(crate) use debug_assert_partition_tiles;
pub(crate) use debug_assert_slot_drained;
