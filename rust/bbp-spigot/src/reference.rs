//! Alternative schedules for the exact sum, used to validate the striped
//! worker pool: a plain in-order loop and a rayon map/reduce over the same
//! fixed batch tiling.

use crate::engine::hex_digits;
use crate::error::SpigotError;
use crate::extended::ExtFloat;
use crate::formula::SeriesPlan;
use hexpi_core::{Algorithm, DigitReport, DigitRequest, DIGITS_PER_WINDOW};
use rayon::prelude::*;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Left sum over every batch, one after another on the calling thread.
pub fn sequential_left_sum(plan: &SeriesPlan) -> ExtFloat {
    (0..plan.batch_count()).fold(ExtFloat::ZERO, |acc, i| {
        (acc + plan.left_sum(plan.batch(i))).fract()
    })
}

/// Left sum over every batch on the rayon global pool.
pub fn parallel_left_sum(plan: &SeriesPlan) -> ExtFloat {
    (0..plan.batch_count())
        .into_par_iter()
        .map(|i| plan.left_sum(plan.batch(i)))
        .reduce(|| ExtFloat::ZERO, |a, b| (a + b).fract())
}

/// Digits of the full sum with the exact part supplied by `left_sum`.
fn digits_with(plan: &SeriesPlan, left_sum: fn(&SeriesPlan) -> ExtFloat) -> (String, Duration) {
    let started = Instant::now();
    let fraction = (left_sum(plan) + plan.right_sum().value).fract();
    let digits = hex_digits(fraction, DIGITS_PER_WINDOW);
    (digits, started.elapsed())
}

/// Digits from the striped pool, the sequential loop and rayon, side by side.
#[derive(Debug, Clone, Serialize)]
pub struct CrossCheckReport {
    pub algorithm: Algorithm,
    pub offset: u64,
    pub pooled_digits: String,
    pub sequential_digits: String,
    pub rayon_digits: String,
    pub pooled_time: Duration,
    pub sequential_time: Duration,
    pub rayon_time: Duration,
}

impl CrossCheckReport {
    pub fn agrees(&self) -> bool {
        self.pooled_digits == self.sequential_digits && self.pooled_digits == self.rayon_digits
    }
}

impl std::fmt::Display for CrossCheckReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "  Algorithm:      {}", self.algorithm)?;
        writeln!(f, "  Offset:         {}", self.offset)?;
        writeln!(
            f,
            "  Striped pool:   {} ({:.5}s)",
            self.pooled_digits,
            self.pooled_time.as_secs_f64()
        )?;
        writeln!(
            f,
            "  Sequential:     {} ({:.5}s)",
            self.sequential_digits,
            self.sequential_time.as_secs_f64()
        )?;
        writeln!(
            f,
            "  Rayon:          {} ({:.5}s)",
            self.rayon_digits,
            self.rayon_time.as_secs_f64()
        )?;
        write!(f, "  Results match:  {}", self.agrees())
    }
}

/// Rerun `request` on the sequential and rayon schedules and set the digits
/// beside `pooled`, the striped pool's report for the same request.
pub fn cross_check(
    request: &DigitRequest,
    pooled: &DigitReport,
) -> Result<CrossCheckReport, SpigotError> {
    request.validate()?;
    let plan = SeriesPlan::configure(request);
    let (sequential_digits, sequential_time) = digits_with(&plan, sequential_left_sum);
    let (rayon_digits, rayon_time) = digits_with(&plan, parallel_left_sum);

    Ok(CrossCheckReport {
        algorithm: plan.algorithm(),
        offset: plan.offset(),
        pooled_digits: pooled.digits.clone(),
        sequential_digits,
        rayon_digits,
        pooled_time: pooled.elapsed,
        sequential_time,
        rayon_time,
    })
}
