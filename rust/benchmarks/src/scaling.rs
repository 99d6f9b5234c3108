//! Scaling runs for the BBP spigot.
//!
//! Times digit extraction across worker counts, formulas and batch sizes,
//! checks that every configuration yields the same digits, and prints a JSON
//! summary of all timed runs at the end.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use bbp_spigot::reference::cross_check;
use bbp_spigot::{compute, Algorithm, DigitReport, DigitRequest};
use hexpi_core::{available_threads, group_digits, suggested_threads};

/// Maximum time per single computation (seconds).
const TIMEOUT_SECS: u64 = 60;

/// Run a closure with a timeout. Returns None if timed out.
fn with_timeout<T: Send + 'static>(
    timeout: Duration,
    f: impl FnOnce() -> T + Send + 'static,
) -> Option<(T, Duration)> {
    let (tx, rx) = mpsc::channel();
    let start = Instant::now();
    std::thread::spawn(move || {
        let result = f();
        let _ = tx.send(result);
    });
    match rx.recv_timeout(timeout) {
        Ok(result) => Some((result, start.elapsed())),
        Err(_) => None,
    }
}

/// One timed run, as printed in the JSON summary.
#[derive(Debug, Clone, Serialize)]
struct ScalingRow {
    section: &'static str,
    algorithm: Algorithm,
    offset: u64,
    threads: u32,
    batch_size: u64,
    digits: String,
    seconds: f64,
    speedup: f64,
}

/// Why a run produced no report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Overrun {
    /// Exceeded the limit; its thread is still running.
    TimedOut,
    /// Not started because an earlier run timed out.
    Skipped,
}

impl Overrun {
    fn label(self) -> &'static str {
        match self {
            Overrun::TimedOut => "TIMEOUT",
            Overrun::Skipped => "SKIPPED",
        }
    }
}

/// Time limit shared by every run. A timed-out computation keeps its
/// detached thread on the cores, so nothing is timed after the first one.
struct Limiter {
    timeout: Duration,
    stalled: bool,
}

impl Limiter {
    fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            stalled: false,
        }
    }

    fn call<T: Send + 'static>(
        &mut self,
        f: impl FnOnce() -> T + Send + 'static,
    ) -> Result<T, Overrun> {
        if self.stalled {
            return Err(Overrun::Skipped);
        }
        match with_timeout(self.timeout, f) {
            Some((result, _)) => Ok(result),
            None => {
                self.stalled = true;
                Err(Overrun::TimedOut)
            }
        }
    }
}

fn run(limiter: &mut Limiter, request: DigitRequest) -> Result<DigitReport, &'static str> {
    match limiter.call(move || compute(&request)) {
        Ok(Ok(report)) => Ok(report),
        Ok(Err(e)) => {
            println!("  error: {e}");
            Err("ERROR")
        }
        Err(overrun) => Err(overrun.label()),
    }
}

fn thread_counts(max: u32) -> Vec<u32> {
    let mut counts = vec![1u32];
    while counts[counts.len() - 1] * 2 <= max {
        counts.push(counts[counts.len() - 1] * 2);
    }
    if counts[counts.len() - 1] != max {
        counts.push(max);
    }
    counts
}

fn main() {
    println!("================================================================");
    println!("  SCALING: BBP / Bellard hex digit extraction");
    println!("================================================================\n");

    let available = available_threads();
    println!("  Hardware threads: {available}\n");

    let mut limiter = Limiter::new(Duration::from_secs(TIMEOUT_SECS));
    let mut rows = Vec::new();
    bench_threads(&mut limiter, available, &mut rows);
    bench_formulas(&mut limiter, available, &mut rows);
    bench_batch_sizes(&mut limiter, available, &mut rows);
    check_random_offsets(&mut limiter, available);
    print_thread_hints(available);

    println!("\n  TIMEOUT = exceeded {TIMEOUT_SECS}s limit");
    println!("  SKIPPED = not run, an earlier run timed out and still holds the cores");

    println!("\n================================================================");
    println!("  JSON summary");
    println!("================================================================\n");
    match serde_json::to_string_pretty(&rows) {
        Ok(json) => println!("{json}"),
        Err(e) => println!("  could not serialize summary: {e}"),
    }
}

// ============================================================================
// Section 1: worker count
// ============================================================================

fn bench_threads(limiter: &mut Limiter, available: u32, rows: &mut Vec<ScalingRow>) {
    println!("--- Section 1: Worker Count (Bellard) ---\n");
    println!(
        "  {:>12} {:>8} {:>12} {:>10} {:>12}",
        "offset", "threads", "time_s", "speedup", "digits"
    );
    println!("  {}", "-".repeat(58));

    for offset in [10_000u64, 100_000, 1_000_000] {
        let mut baseline = None;
        let mut reference_digits: Option<String> = None;

        for threads in thread_counts(available) {
            let Ok(request) = DigitRequest::new(Algorithm::Bellard, offset, threads) else {
                continue;
            };
            let report = match run(limiter, request) {
                Ok(report) => report,
                Err(label) => {
                    println!(
                        "  {:>12} {:>8} {:>12} {:>10} {:>12}",
                        group_digits(offset),
                        threads,
                        label,
                        "-",
                        "-"
                    );
                    continue;
                }
            };

            let seconds = report.elapsed.as_secs_f64();
            let base = *baseline.get_or_insert(seconds);
            let speedup = if seconds > 0.0 { base / seconds } else { f64::INFINITY };
            let status = match &reference_digits {
                Some(d) if *d != report.digits => " MISMATCH",
                _ => "",
            };
            reference_digits.get_or_insert_with(|| report.digits.clone());

            println!(
                "  {:>12} {:>8} {:>12.5} {:>9.2}x {:>12}{}",
                group_digits(offset),
                threads,
                seconds,
                speedup,
                report.digits,
                status
            );
            rows.push(ScalingRow {
                section: "threads",
                algorithm: report.algorithm,
                offset,
                threads,
                batch_size: report.batch_size,
                digits: report.digits,
                seconds,
                speedup,
            });
        }
        println!();
    }
}

// ============================================================================
// Section 2: formula
// ============================================================================

fn bench_formulas(limiter: &mut Limiter, available: u32, rows: &mut Vec<ScalingRow>) {
    println!("--- Section 2: Original vs Bellard ({available} threads) ---\n");
    println!(
        "  {:>12} {:>14} {:>14} {:>10} {:>8}",
        "offset", "original_s", "bellard_s", "ratio", "match"
    );
    println!("  {}", "-".repeat(62));

    for offset in [1_000u64, 10_000, 100_000, 500_000] {
        let mut reports = Vec::new();
        let mut missing = "ERROR";
        for algorithm in Algorithm::ALL {
            let Ok(request) = DigitRequest::new(algorithm, offset, available) else {
                continue;
            };
            match run(limiter, request) {
                Ok(report) => reports.push(report),
                Err(label) => missing = label,
            }
        }
        let [original, bellard] = reports.as_slice() else {
            println!("  {:>12} {:>14}", group_digits(offset), missing);
            continue;
        };

        let (o, b) = (original.elapsed.as_secs_f64(), bellard.elapsed.as_secs_f64());
        println!(
            "  {:>12} {:>14.5} {:>14.5} {:>9.2}x {:>8}",
            group_digits(offset),
            o,
            b,
            if b > 0.0 { o / b } else { f64::INFINITY },
            original.digits == bellard.digits
        );
        for report in [original, bellard] {
            rows.push(ScalingRow {
                section: "formula",
                algorithm: report.algorithm,
                offset,
                threads: available,
                batch_size: report.batch_size,
                digits: report.digits.clone(),
                seconds: report.elapsed.as_secs_f64(),
                speedup: 1.0,
            });
        }
    }
    println!();
}

// ============================================================================
// Section 3: batch size
// ============================================================================

fn bench_batch_sizes(limiter: &mut Limiter, available: u32, rows: &mut Vec<ScalingRow>) {
    let offset = 200_000u64;
    println!(
        "--- Section 3: Batch Size (Bellard, offset {}, {available} threads) ---\n",
        group_digits(offset)
    );
    println!("  {:>10} {:>10} {:>12} {:>12}", "batch", "batches", "time_s", "digits");
    println!("  {}", "-".repeat(48));

    for batch in [1u64, 10, 100, 1_000, 10_000] {
        let Ok(request) = DigitRequest::new(Algorithm::Bellard, offset, available)
            .and_then(|r| r.with_batch_size(batch))
        else {
            continue;
        };
        let report = match run(limiter, request) {
            Ok(report) => report,
            Err(label) => {
                println!("  {:>10} {:>10} {:>12}", batch, "-", label);
                continue;
            }
        };
        let seconds = report.elapsed.as_secs_f64();
        println!(
            "  {:>10} {:>10} {:>12.5} {:>12}",
            batch, report.batches, seconds, report.digits
        );
        rows.push(ScalingRow {
            section: "batch_size",
            algorithm: report.algorithm,
            offset,
            threads: available,
            batch_size: report.batch_size,
            digits: report.digits,
            seconds,
            speedup: 1.0,
        });
    }
    println!();
}

// ============================================================================
// Section 4: schedule cross-check
// ============================================================================

fn check_random_offsets(limiter: &mut Limiter, available: u32) {
    println!("--- Section 4: Striped Pool vs Sequential vs Rayon ---\n");

    let mut rng = StdRng::seed_from_u64(12345);
    let mut agreed = 0;
    let trials = 10;
    for _ in 0..trials {
        let algorithm = Algorithm::ALL[rng.gen_range(0..Algorithm::ALL.len())];
        let offset = rng.gen_range(0..50_000u64);
        let threads = rng.gen_range(1..=available);
        let Ok(request) = DigitRequest::new(algorithm, offset, threads) else {
            continue;
        };
        let pooled = match run(limiter, request) {
            Ok(report) => report,
            Err(label) => {
                println!("  {label} at offset {offset}");
                continue;
            }
        };
        match cross_check(&request, &pooled) {
            Ok(report) => {
                if report.agrees() {
                    agreed += 1;
                } else {
                    println!("  MISMATCH\n{report}\n");
                }
            }
            Err(e) => println!("  error at offset {offset}: {e}"),
        }
    }
    println!("  {agreed}/{trials} random configurations agree\n");
}

// ============================================================================
// Section 5: thread hints
// ============================================================================

fn print_thread_hints(available: u32) {
    println!("--- Section 5: Suggested Worker Counts ---\n");
    for offset in [500u64, 5_000, 50_000, 500_000, 5_000_000] {
        let hint = suggested_threads(offset, available);
        println!(
            "  offset {:>12}: {}-{} threads",
            group_digits(offset),
            hint.start(),
            hint.end()
        );
    }
}
