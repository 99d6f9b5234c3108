//! Command-line front end.
//!
//! Usage:
//!   bbp-spigot [algorithm] [offset] [threads] [--batch-size N] [--tail-terms N] [--json] [--cross-check]
//!
//! With no positional arguments the default request runs (Bellard, offset
//! 10 000, every available hardware thread). Logs go to stderr and are
//! filtered by `RUST_LOG` (default `warn`).

use anyhow::{Context, Result};
use bbp_spigot::reference::cross_check;
use bbp_spigot::{compute, Algorithm, DigitRequest, TailLimits};
use clap::Parser;
use hexpi_core::{available_threads, group_digits, suggested_threads, MAX_THREADS};

/// Hexadecimal digits of π at an arbitrary offset
#[derive(Parser, Debug)]
#[command(name = "bbp-spigot")]
#[command(about = "Compute 10 hexadecimal digits of pi after a given offset")]
struct Args {
    /// Series to use: `bellard` or `original`
    algorithm: Option<Algorithm>,

    /// Number of hex digits to skip
    offset: Option<u64>,

    /// Worker threads for the exact sum
    #[arg(value_parser = clap::value_parser!(u32).range(1..=MAX_THREADS as i64))]
    threads: Option<u32>,

    /// Series indices claimed per batch
    #[arg(long, default_value_t = hexpi_core::DEFAULT_BATCH_SIZE)]
    batch_size: u64,

    /// Maximum tail terms evaluated past each bound
    #[arg(long, default_value_t = hexpi_core::DEFAULT_TAIL_TERMS)]
    tail_terms: u64,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Also run the sequential and rayon schedules and compare digits
    #[arg(long)]
    cross_check: bool,
}

impl Args {
    /// Fill omitted positions from the default request.
    fn request(&self) -> Result<DigitRequest> {
        let defaults = DigitRequest::default();
        if self.algorithm.is_none() {
            log::info!(
                "no arguments given, running the default configuration: {} at offset {} with {} threads",
                defaults.algorithm,
                defaults.offset,
                defaults.threads
            );
        }

        let request = DigitRequest::new(
            self.algorithm.unwrap_or(defaults.algorithm),
            self.offset.unwrap_or(defaults.offset),
            self.threads.unwrap_or(defaults.threads),
        )?
        .with_batch_size(self.batch_size)?
        .with_tail(TailLimits {
            max_extra_terms: self.tail_terms,
            ..TailLimits::default()
        })?;
        Ok(request)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let request = args.request().context("invalid configuration")?;

    let available = available_threads();
    let hint = suggested_threads(request.offset, available);
    log::info!(
        "offset {}: {}-{} threads suggested, {} available",
        group_digits(request.offset),
        hint.start(),
        hint.end(),
        available
    );
    if request.threads > available {
        log::warn!(
            "{} workers requested on {} hardware threads",
            request.threads,
            available
        );
    }

    let report = compute(&request).context("digit extraction failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }

    if args.cross_check {
        let check = cross_check(&request, &report).context("cross-check failed")?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&check)?);
        } else {
            println!("\n--- Cross-check ---\n{check}");
        }
        if !check.agrees() {
            anyhow::bail!("schedules disagree at offset {}", request.offset);
        }
    }

    Ok(())
}
