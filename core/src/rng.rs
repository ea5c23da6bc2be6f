//! Injectable random number generation.
//!
//! RULE: The simulator never reaches for a platform RNG on its own.
//! Every run receives a RandomSource from its caller, so a test can
//! hand in a seeded stream (or a fixed sequence) and get the same
//! result back every time.
//!
//! Concurrent runs each get their own stream, derived from
//! (master_seed, run_index). Two runs never share generator state.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// A source of uniform draws in [0.0, 1.0).
pub trait RandomSource {
    fn next_f64(&mut self) -> f64;
}

/// A seeded PCG stream for one simulation run.
pub struct SimulationRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl SimulationRng {
    pub fn seeded(seed: u64) -> Self {
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(seed),
        }
    }

    /// Non-reproducible stream for callers that do not need replay.
    pub fn from_entropy() -> Self {
        Self {
            name: "entropy",
            inner: Pcg64Mcg::from_entropy(),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Draw a raw u64 (full range).
    pub fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }
}

impl RandomSource for SimulationRng {
    /// Top 53 bits of a u64, scaled into [0.0, 1.0).
    fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}

/// Hands out independent per-run streams from a single master seed.
#[derive(Debug, Clone, Copy)]
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// The stream for run `run_index`. Same (seed, index) pair, same stream.
    pub fn for_run(&self, run_index: u64) -> SimulationRng {
        let derived_seed = self.master_seed ^ run_index.wrapping_mul(0x9e37_79b9_7f4a_7c15);
        SimulationRng::seeded(derived_seed).with_name("simulation")
    }
}

/// Replays a fixed list of draws, wrapping around at the end.
///
/// Used where a test needs to know exactly which `u` each sample sees.
#[derive(Debug, Clone)]
pub struct SequenceSource {
    values: Vec<f64>,
    cursor: usize,
}

impl SequenceSource {
    /// Panics if `values` is empty or holds anything outside [0, 1).
    pub fn new(values: Vec<f64>) -> Self {
        assert!(!values.is_empty(), "sequence must not be empty");
        assert!(
            values.iter().all(|v| (0.0..1.0).contains(v)),
            "sequence values must lie in [0, 1)"
        );
        Self { values, cursor: 0 }
    }
}

impl RandomSource for SequenceSource {
    fn next_f64(&mut self) -> f64 {
        let v = self.values[self.cursor];
        self.cursor = (self.cursor + 1) % self.values.len();
        v
    }
}
