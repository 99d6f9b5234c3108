//! Request in, hex digits out.

use crate::error::SpigotError;
use crate::extended::ExtFloat;
use crate::formula::SeriesPlan;
use crate::pool::run_workers;
use hexpi_core::{DigitReport, DigitRequest, DIGITS_PER_WINDOW, HEX_ALPHABET};
use std::time::Instant;

/// Compute the hex digits of π that follow `request.offset`.
///
/// Runs the exact sum on `request.threads` workers, then adds the tail and
/// reads [`DIGITS_PER_WINDOW`] digits from the fractional part. Nothing is
/// shared between calls.
pub fn compute(request: &DigitRequest) -> Result<DigitReport, SpigotError> {
    request.validate()?;
    let plan = SeriesPlan::configure(request);

    log::info!(
        "starting {} at offset {}: {} threads, upper bound {}, batch size {}",
        plan.algorithm(),
        plan.offset(),
        request.threads,
        plan.upper_bound(),
        plan.batch_size()
    );

    let started = Instant::now();
    let pool = run_workers(&plan, request.threads)?;

    for (index, stats) in pool.workers.iter().enumerate() {
        log::debug!(
            "worker {} retired after {} batches ({} indices)",
            index,
            stats.batches,
            stats.indices
        );
    }

    let tail = plan.right_sum();
    if !tail.converged {
        log::warn!(
            "tail sum at offset {} hit the cap of {} extra terms before reaching {:e}",
            request.offset,
            request.tail.max_extra_terms,
            request.tail.epsilon
        );
    }

    let fraction = (pool.left + tail.value).fract();
    let digits = hex_digits(fraction, DIGITS_PER_WINDOW);
    let elapsed = started.elapsed();

    log::info!(
        "digits {} in {:.5}s ({} batches, {} tail terms)",
        digits,
        elapsed.as_secs_f64(),
        pool.batches(),
        tail.terms
    );

    Ok(DigitReport {
        algorithm: plan.algorithm(),
        offset: plan.offset(),
        threads: request.threads,
        batch_size: plan.batch_size(),
        digits,
        fraction: fraction.to_f64(),
        batches: pool.batches(),
        tail_terms: tail.terms,
        tail_converged: tail.converged,
        elapsed,
    })
}

/// First `count` hexadecimal digits of `fraction mod 1`.
pub fn hex_digits(fraction: ExtFloat, count: usize) -> String {
    let mut y = fraction;
    let mut out = String::with_capacity(count);
    for _ in 0..count {
        y = y.fract().mul_pow2(4);
        let digit = (y.floor().hi() as usize).min(15);
        out.push(HEX_ALPHABET[digit] as char);
    }
    out
}
