//! Term tables for both formulas and the per-request series plan.

use crate::cursor::Batch;
use crate::extended::ExtFloat;
use crate::series::{self, TailSum, Term};
use hexpi_core::{Algorithm, DigitRequest, TailLimits};

const fn original(coefficient: f64, rest: u64) -> Term {
    Term {
        coefficient,
        alternating: false,
        stride: 8,
        rest,
        radix_log2: 4,
        offset_scale: 1,
        shift: 0,
        decay: 1,
    }
}

const fn bellard(coefficient: f64, stride: u64, rest: u64, shift: i64) -> Term {
    Term {
        coefficient,
        alternating: true,
        stride,
        rest,
        radix_log2: 1,
        offset_scale: 4,
        shift,
        decay: 10,
    }
}

/// π = Σ 16^-k (4/(8k+1) − 2/(8k+4) − 1/(8k+5) − 1/(8k+6))
pub const ORIGINAL_TERMS: [Term; 4] = [
    original(4.0, 1),
    original(-2.0, 4),
    original(-1.0, 5),
    original(-1.0, 6),
];

/// π = 2^-6 Σ (−1)^k 2^-10k (−2^5/(4k+1) − 1/(4k+3) + 2^8/(10k+1) − 2^6/(10k+3)
///     − 2^2/(10k+5) − 2^2/(10k+7) + 1/(10k+9)),
/// with the powers of two folded into each term's shift.
pub const BELLARD_TERMS: [Term; 7] = [
    bellard(-1.0, 4, 1, -1),
    bellard(-1.0, 4, 3, -6),
    bellard(1.0, 10, 1, 2),
    bellard(-1.0, 10, 3, 0),
    bellard(-1.0, 10, 5, -4),
    bellard(-1.0, 10, 7, -4),
    bellard(1.0, 10, 9, -6),
];

pub fn terms(algorithm: Algorithm) -> &'static [Term] {
    match algorithm {
        Algorithm::Original => &ORIGINAL_TERMS,
        Algorithm::Bellard => &BELLARD_TERMS,
    }
}

/// Tail of every term of a formula, summed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormulaTail {
    pub value: ExtFloat,
    pub terms: u64,
    pub converged: bool,
}

/// Everything a computation needs once the request is resolved: the term
/// table, each term's bound, the upper bound driving the worker pool and
/// the effective batch size. Read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPlan {
    algorithm: Algorithm,
    offset: u64,
    terms: &'static [Term],
    bounds: Vec<u64>,
    upper_bound: u64,
    batch_size: u64,
    tail: TailLimits,
}

impl SeriesPlan {
    /// Resolve `request` into a plan. A batch size above the upper bound is
    /// shrunk to it, but never below 1.
    pub fn configure(request: &DigitRequest) -> Self {
        let terms = terms(request.algorithm);
        let bounds: Vec<u64> = terms.iter().map(|t| t.bound(request.offset)).collect();
        let upper_bound = bounds.iter().copied().max().unwrap_or(0);
        let batch_size = request.batch_size.min(upper_bound).max(1);

        Self {
            algorithm: request.algorithm,
            offset: request.offset,
            terms,
            bounds,
            upper_bound,
            batch_size,
            tail: request.tail,
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Per-term bounds, in term-table order.
    pub fn bounds(&self) -> &[u64] {
        &self.bounds
    }

    pub fn upper_bound(&self) -> u64 {
        self.upper_bound
    }

    pub fn batch_size(&self) -> u64 {
        self.batch_size
    }

    /// Number of batches needed to tile `[0, upper_bound)`.
    pub fn batch_count(&self) -> u64 {
        self.upper_bound.div_ceil(self.batch_size)
    }

    /// The `index`-th batch of the fixed tiling.
    pub fn batch(&self, index: u64) -> Batch {
        let start = index.saturating_mul(self.batch_size).min(self.upper_bound);
        let end = start.saturating_add(self.batch_size).min(self.upper_bound);
        Batch { start, end }
    }

    /// Left sum of every term over `batch`, reduced into `[0, 1)`.
    pub fn left_sum(&self, batch: Batch) -> ExtFloat {
        self.terms
            .iter()
            .zip(&self.bounds)
            .fold(ExtFloat::ZERO, |acc, (term, &bound)| {
                let part = series::left_sum(term, self.offset, bound, batch.start, batch.len());
                (acc + part).fract()
            })
    }

    /// Tail of every term, each starting at its own bound.
    pub fn right_sum(&self) -> FormulaTail {
        self.terms.iter().zip(&self.bounds).fold(
            FormulaTail {
                value: ExtFloat::ZERO,
                terms: 0,
                converged: true,
            },
            |acc, (term, &bound)| {
                let TailSum {
                    value,
                    terms,
                    converged,
                } = series::right_sum(term, self.offset, bound, &self.tail);
                FormulaTail {
                    value: (acc.value + value).fract(),
                    terms: acc.terms + terms,
                    converged: acc.converged && converged,
                }
            },
        )
    }
}
