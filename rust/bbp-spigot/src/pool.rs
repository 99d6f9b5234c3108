//! Scoped worker group evaluating the exact sum.
//!
//! Each worker loops claim → compute → store until the cursor is exhausted.
//! The cursor lock is held only while claiming and the slot lock only while
//! adding, never while a batch is evaluated.

use crate::accumulator::StripedAccumulator;
use crate::cursor::WorkCursor;
use crate::error::SpigotError;
use crate::extended::ExtFloat;
use crate::formula::SeriesPlan;
use serde::Serialize;
use std::thread;

/// What one worker did before retiring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkerStats {
    pub batches: u64,
    pub indices: u64,
}

/// Joined result of a worker group.
#[derive(Debug, Clone)]
pub struct PoolOutcome {
    /// Left sum over `[0, upper_bound)`, reduced into `[0, 1)`.
    pub left: ExtFloat,
    /// One entry per worker, in spawn order.
    pub workers: Vec<WorkerStats>,
}

impl PoolOutcome {
    pub fn batches(&self) -> u64 {
        self.workers.iter().map(|w| w.batches).sum()
    }

    pub fn indices(&self) -> u64 {
        self.workers.iter().map(|w| w.indices).sum()
    }
}

fn work(plan: &SeriesPlan, cursor: &WorkCursor, accumulator: &StripedAccumulator) -> WorkerStats {
    let mut stats = WorkerStats::default();
    while let Some(batch) = cursor.claim() {
        let partial = plan.left_sum(batch);
        accumulator.add(partial);
        stats.batches += 1;
        stats.indices += batch.len();
    }
    stats
}

/// Spawn `threads` workers over `plan` and join them all.
///
/// If a spawn fails, the workers already running still drain the cursor and
/// are joined before the error is returned.
pub fn run_workers(plan: &SeriesPlan, threads: u32) -> Result<PoolOutcome, SpigotError> {
    let cursor = WorkCursor::new(plan.upper_bound(), plan.batch_size());
    let accumulator = StripedAccumulator::new();

    let workers = thread::scope(|s| {
        let mut handles = Vec::with_capacity(threads as usize);
        let mut failure = None;

        for index in 0..threads as usize {
            let (cursor, accumulator) = (&cursor, &accumulator);
            let spawned = thread::Builder::new()
                .name(format!("bbp-worker-{index}"))
                .spawn_scoped(s, move || work(plan, cursor, accumulator));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    failure = Some(SpigotError::Spawn { index, source });
                    break;
                }
            }
        }

        let mut stats = Vec::with_capacity(handles.len());
        for (index, handle) in handles.into_iter().enumerate() {
            match handle.join() {
                Ok(worker) => stats.push(worker),
                Err(_) => {
                    failure.get_or_insert(SpigotError::WorkerPanicked { index });
                }
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(stats),
        }
    })?;

    Ok(PoolOutcome {
        left: accumulator.total(),
        workers,
    })
}
