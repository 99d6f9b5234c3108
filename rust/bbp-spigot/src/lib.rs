//! Hexadecimal digits of π at an arbitrary offset, without computing the
//! digits before it.
//!
//! Two spigot series are supported: the 4-term Bailey–Borwein–Plouffe
//! formula in base 16 and Bellard's 7-term alternating formula in base 2.
//! Each term splits at a bound into an exact left sum, computed with modular
//! exponentiation and split into batches across a worker pool, and a short
//! convergent tail evaluated afterwards on the calling thread.
//!
//! ```no_run
//! use bbp_spigot::{compute, Algorithm, DigitRequest};
//!
//! // Skip 999 999 digits: the window starting at position 10^6.
//! let request = DigitRequest::new(Algorithm::Bellard, 999_999, 8).unwrap();
//! let report = compute(&request).unwrap();
//! assert_eq!(report.digits, "26C65E52CB");
//! ```

pub mod accumulator;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod extended;
pub mod formula;
pub mod modpow;
pub mod pool;
pub mod reference;
pub mod series;

pub use engine::{compute, hex_digits};
pub use error::SpigotError;
pub use extended::ExtFloat;
pub use formula::SeriesPlan;
pub use hexpi_core::{Algorithm, ConfigError, DigitReport, DigitRequest, TailLimits};
