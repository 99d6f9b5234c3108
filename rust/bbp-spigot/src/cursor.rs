//! Shared work cursor handing out contiguous index ranges.

use std::sync::{Mutex, PoisonError};

/// Half-open index range `[start, end)` claimed by one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch {
    pub start: u64,
    pub end: u64,
}

impl Batch {
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Monotonic counter over `[0, upper_bound)`. Successive claims return
/// adjacent batches in increasing order; together they tile the range.
#[derive(Debug)]
pub struct WorkCursor {
    next: Mutex<u64>,
    upper_bound: u64,
    batch_size: u64,
}

impl WorkCursor {
    /// A `batch_size` of zero is treated as 1.
    pub fn new(upper_bound: u64, batch_size: u64) -> Self {
        Self {
            next: Mutex::new(0),
            upper_bound,
            batch_size: batch_size.max(1),
        }
    }

    /// Claim the next batch, or `None` once the range is exhausted.
    pub fn claim(&self) -> Option<Batch> {
        let mut next = self.next.lock().unwrap_or_else(PoisonError::into_inner);
        if *next >= self.upper_bound {
            return None;
        }
        let start = *next;
        let end = start.saturating_add(self.batch_size).min(self.upper_bound);
        *next = end;
        Some(Batch { start, end })
    }

    pub fn upper_bound(&self) -> u64 {
        self.upper_bound
    }

    pub fn batch_size(&self) -> u64 {
        self.batch_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::thread;

    fn drain(cursor: &WorkCursor) -> Vec<Batch> {
        std::iter::from_fn(|| cursor.claim()).collect()
    }

    #[test]
    fn test_claims_in_order() {
        let cursor = WorkCursor::new(250, 100);
        assert_eq!(
            drain(&cursor),
            vec![
                Batch { start: 0, end: 100 },
                Batch { start: 100, end: 200 },
                Batch { start: 200, end: 250 },
            ]
        );
        assert_eq!(cursor.claim(), None);
    }

    #[test]
    fn test_empty_range() {
        let cursor = WorkCursor::new(0, 1);
        assert_eq!(cursor.claim(), None);
    }

    #[test]
    fn test_zero_batch_size_is_one() {
        let cursor = WorkCursor::new(3, 0);
        assert_eq!(cursor.batch_size(), 1);
        assert_eq!(drain(&cursor).len(), 3);
    }

    #[test]
    fn test_concurrent_claims_tile_range() {
        let cursor = WorkCursor::new(10_007, 13);
        let mut claimed: Vec<Batch> = thread::scope(|s| {
            let handles: Vec<_> = (0..8).map(|_| s.spawn(|| drain(&cursor))).collect();
            handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
        });
        claimed.sort_by_key(|b| b.start);

        assert_eq!(claimed.len() as u64, 10_007u64.div_ceil(13));
        let mut expected_start = 0;
        for batch in &claimed {
            assert_eq!(batch.start, expected_start, "gap or overlap at {expected_start}");
            assert!(!batch.is_empty());
            expected_start = batch.end;
        }
        assert_eq!(expected_start, 10_007);
    }

    proptest! {
        #[test]
        fn proptest_batches_tile_range(upper in 0u64..5_000, batch in 1u64..300) {
            let batches = drain(&WorkCursor::new(upper, batch));
            prop_assert_eq!(batches.len() as u64, upper.div_ceil(batch));
            prop_assert_eq!(batches.iter().map(Batch::len).sum::<u64>(), upper);
            for pair in batches.windows(2) {
                prop_assert_eq!(pair[0].end, pair[1].start);
            }
        }
    }
}
