//! Random stream for ticket suffixes.
//!
//! RULE: Ticket generation never calls a platform RNG directly.
//! Production seeds the stream once from entropy; tests pass a fixed seed so
//! generated ticket numbers are reproducible.

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

pub struct SuffixRng {
    inner: Pcg64Mcg,
}

impl SuffixRng {
    pub fn seeded(seed: u64) -> Self {
        // Spread low-entropy seeds (0, 1, 2, ...) across the state space.
        let derived_seed = seed ^ 0x9e37_79b9_7f4a_7c15;
        Self {
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self::seeded(rand::random())
    }

    /// Roll a u64 in [0, n).
    pub fn next_below(&mut self, n: u64) -> u64 {
        use rand::Rng;
        assert!(n > 0, "n must be > 0");
        self.inner.gen_range(0..n)
    }
}
