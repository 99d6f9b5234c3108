//! Shared types and configuration for hexadecimal π digit extraction.
//!
//! A [`DigitRequest`] names the series, the digit offset and the worker count;
//! engines answer with a [`DigitReport`] holding the hex window and timing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;

/// Number of hexadecimal digits produced per computation.
pub const DIGITS_PER_WINDOW: usize = 10;

/// Upper-case hexadecimal alphabet used when rendering digits.
pub const HEX_ALPHABET: &[u8; 16] = b"0123456789ABCDEF";

/// Offset used when the caller does not choose one.
pub const DEFAULT_OFFSET: u64 = 10_000;

/// Default number of series indices claimed per batch.
pub const DEFAULT_BATCH_SIZE: u64 = 100;

/// Largest accepted worker count.
pub const MAX_THREADS: u32 = 65_536;

/// Largest accepted digit offset. Keeps `8k + j`, `10k + j` and `4n + l`
/// inside 64-bit integers for every term of both formulas.
pub const MAX_OFFSET: u64 = 1 << 60;

/// Tail terms below this magnitude are dropped.
pub const DEFAULT_TAIL_EPSILON: f64 = 1e-17;

/// Hard cap on tail terms evaluated past a term's bound.
pub const DEFAULT_TAIL_TERMS: u64 = 100;

/// Available digit-extraction series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Bailey–Borwein–Plouffe, 4 terms, base 16.
    Original,
    /// Bellard, 7 alternating terms, base 2.
    Bellard,
}

impl Algorithm {
    pub const ALL: [Algorithm; 2] = [Algorithm::Original, Algorithm::Bellard];

    /// Number of series terms in the formula.
    pub fn term_count(self) -> usize {
        match self {
            Algorithm::Original => 4,
            Algorithm::Bellard => 7,
        }
    }

    /// Lower-case name accepted on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Original => "original",
            Algorithm::Bellard => "bellard",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Original => write!(f, "Original (4-Term)"),
            Algorithm::Bellard => write!(f, "Bellard (7-Term)"),
        }
    }
}

impl FromStr for Algorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "original" => Ok(Algorithm::Original),
            "bellard" => Ok(Algorithm::Bellard),
            _ => Err(ConfigError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Rejected configuration values. Raised before any computation starts.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown algorithm `{0}` (expected `bellard` or `original`)")]
    UnknownAlgorithm(String),

    #[error("thread count must be at least 1")]
    ZeroThreads,

    #[error("thread count {0} exceeds the maximum of {max}", max = MAX_THREADS)]
    TooManyThreads(u32),

    #[error("batch size must be at least 1")]
    ZeroBatchSize,

    #[error("offset {0} exceeds the maximum of {max}", max = MAX_OFFSET)]
    OffsetTooLarge(u64),

    #[error("tail epsilon must be a positive finite number, got {0}")]
    InvalidEpsilon(f64),
}

/// Stopping rule for the convergent tail of each series term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TailLimits {
    /// Stop once a term's magnitude falls below this value.
    pub epsilon: f64,
    /// Evaluate at most this many terms past the bound (the bound itself
    /// included, so up to `max_extra_terms + 1` terms).
    pub max_extra_terms: u64,
}

impl Default for TailLimits {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_TAIL_EPSILON,
            max_extra_terms: DEFAULT_TAIL_TERMS,
        }
    }
}

/// One digit-extraction job. Read-only for the duration of a computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DigitRequest {
    pub algorithm: Algorithm,
    /// Number of hex digits after the point to skip.
    pub offset: u64,
    /// Worker threads spawned for the exact sum.
    pub threads: u32,
    /// Series indices claimed per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
    #[serde(default)]
    pub tail: TailLimits,
}

fn default_batch_size() -> u64 {
    DEFAULT_BATCH_SIZE
}

impl Default for DigitRequest {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Bellard,
            offset: DEFAULT_OFFSET,
            threads: available_threads(),
            batch_size: DEFAULT_BATCH_SIZE,
            tail: TailLimits::default(),
        }
    }
}

impl DigitRequest {
    /// Build a validated request with the default batch size and tail limits.
    pub fn new(algorithm: Algorithm, offset: u64, threads: u32) -> Result<Self, ConfigError> {
        let request = Self {
            algorithm,
            offset,
            threads,
            batch_size: DEFAULT_BATCH_SIZE,
            tail: TailLimits::default(),
        };
        request.validate()?;
        Ok(request)
    }

    pub fn with_batch_size(mut self, batch_size: u64) -> Result<Self, ConfigError> {
        self.batch_size = batch_size;
        self.validate()?;
        Ok(self)
    }

    pub fn with_tail(mut self, tail: TailLimits) -> Result<Self, ConfigError> {
        self.tail = tail;
        self.validate()?;
        Ok(self)
    }

    /// Check every field against its accepted range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threads == 0 {
            return Err(ConfigError::ZeroThreads);
        }
        if self.threads > MAX_THREADS {
            return Err(ConfigError::TooManyThreads(self.threads));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.offset > MAX_OFFSET {
            return Err(ConfigError::OffsetTooLarge(self.offset));
        }
        if !(self.tail.epsilon.is_finite() && self.tail.epsilon > 0.0) {
            return Err(ConfigError::InvalidEpsilon(self.tail.epsilon));
        }
        Ok(())
    }
}

/// Outcome of one digit-extraction run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigitReport {
    pub algorithm: Algorithm,
    pub offset: u64,
    pub threads: u32,
    /// Batch size actually used, after shrinking to the upper bound.
    pub batch_size: u64,
    /// Hexadecimal digits starting right after `offset`.
    pub digits: String,
    /// The fractional value the digits were read from, in [0, 1).
    pub fraction: f64,
    /// Batches claimed by the worker pool.
    pub batches: u64,
    /// Tail terms evaluated across all series terms.
    pub tail_terms: u64,
    /// Whether every tail stopped on epsilon rather than the hard cap.
    pub tail_converged: bool,
    /// Wall-clock time of the parallel phase plus assembly.
    pub elapsed: Duration,
}

impl fmt::Display for DigitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} digits @ {} = {}",
            self.digits.len(),
            self.offset,
            self.digits
        )?;
        write!(f, "Total Exec. Time: {:.5}s", self.elapsed.as_secs_f64())
    }
}

/// Hardware threads reported by the OS, at least 1.
pub fn available_threads() -> u32 {
    std::thread::available_parallelism()
        .map(|n| u32::try_from(n.get()).unwrap_or(MAX_THREADS))
        .unwrap_or(1)
        .clamp(1, MAX_THREADS)
}

/// Rough thread-count recommendation for an offset on a machine with
/// `available` hardware threads. Small offsets do not amortise spawn cost.
pub fn suggested_threads(offset: u64, available: u32) -> RangeInclusive<u32> {
    if offset < 1_000 || available <= 2 {
        return 1..=2;
    }
    if offset < 10_000 && available >= 4 {
        return 3..=4;
    }
    if offset < 1_000_000 && available >= 8 {
        return 6..=8;
    }
    if offset > 1_000_000 && available >= 12 {
        return 12..=available;
    }
    1..=2
}

/// Render `n` with a dot every three digits: `1234567` becomes `1.234.567`.
pub fn group_digits(n: u64) -> String {
    let raw = n.to_string();
    let mut out = String::with_capacity(raw.len() + raw.len() / 3);
    for (i, ch) in raw.chars().enumerate() {
        if i > 0 && (raw.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}
