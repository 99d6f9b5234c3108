//! Lock-striped accumulator for batch results.

use crate::extended::ExtFloat;
use std::sync::{Mutex, PoisonError};

/// Number of independently locked partial sums.
pub const STRIPES: usize = 15;

/// Fixed set of partial sums, each behind its own mutex. A round-robin index
/// picks the slot for every incoming value, so concurrent writers mostly
/// land on different locks. Every slot is kept reduced into `[0, 1)`.
#[derive(Debug)]
pub struct StripedAccumulator {
    slots: [Mutex<ExtFloat>; STRIPES],
    next_slot: Mutex<usize>,
}

impl Default for StripedAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl StripedAccumulator {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| Mutex::new(ExtFloat::ZERO)),
            next_slot: Mutex::new(0),
        }
    }

    /// Add `value` to the next slot in rotation. Returns the slot used.
    pub fn add(&self, value: ExtFloat) -> usize {
        let slot = {
            let mut next = self.next_slot.lock().unwrap_or_else(PoisonError::into_inner);
            let slot = *next;
            *next = (slot + 1) % STRIPES;
            slot
        };
        let mut sum = self.slots[slot].lock().unwrap_or_else(PoisonError::into_inner);
        *sum = (*sum + value).fract();
        slot
    }

    /// Sum of all slots, reduced into `[0, 1)`.
    pub fn total(&self) -> ExtFloat {
        self.slots.iter().fold(ExtFloat::ZERO, |acc, slot| {
            let sum = *slot.lock().unwrap_or_else(PoisonError::into_inner);
            (acc + sum).fract()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};
    use std::thread;

    fn circular_distance(a: ExtFloat, b: ExtFloat) -> f64 {
        let d = (a - b).fract().to_f64();
        d.min(1.0 - d)
    }

    #[test]
    fn test_round_robin_slots() {
        let acc = StripedAccumulator::new();
        let slots: Vec<usize> = (0..2 * STRIPES).map(|_| acc.add(ExtFloat::ZERO)).collect();
        let expected: Vec<usize> = (0..STRIPES).chain(0..STRIPES).collect();
        assert_eq!(slots, expected);
    }

    #[test]
    fn test_total_wraps_mod_one() {
        let acc = StripedAccumulator::new();
        for _ in 0..10 {
            acc.add(ExtFloat::from_f64(0.75));
        }
        // 7.5 mod 1
        assert_eq!(acc.total(), ExtFloat::from_f64(0.5));
    }

    #[test]
    fn test_feeding_order_does_not_matter() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let values: Vec<ExtFloat> = (0..2_000)
            .map(|_| {
                let den = rng.gen_range(2..1_000_000_007u64);
                ExtFloat::from_ratio(rng.gen_range(0..den), den)
            })
            .collect();

        let single = values
            .iter()
            .fold(ExtFloat::ZERO, |acc, &v| (acc + v).fract());

        for _ in 0..5 {
            let mut shuffled = values.clone();
            shuffled.shuffle(&mut rng);
            let striped = StripedAccumulator::new();
            for v in shuffled {
                striped.add(v);
            }
            let distance = circular_distance(single, striped.total());
            assert!(distance < 1e-25, "distance {distance:e}");
        }
    }

    #[test]
    fn test_concurrent_adds() {
        let acc = StripedAccumulator::new();
        let step = ExtFloat::from_f64(1.0 / 1024.0);
        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..1_000 {
                        acc.add(step);
                    }
                });
            }
        });
        // 8000 / 1024 = 7.8125, all exact in binary.
        assert_eq!(acc.total(), ExtFloat::from_f64(0.8125));
    }
}
