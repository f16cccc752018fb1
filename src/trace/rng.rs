//! Seeded random source shared by seeding and mesh construction.
//!
//! One `FlowRng` is threaded by `&mut` through the batch generator and then
//! the mesh builder. Given the same seed, the same draw order produces the
//! same mesh, whichever thread it runs on.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Deterministic-when-seeded random source.
#[derive(Debug, Clone)]
pub struct FlowRng {
    inner: StdRng,
    seed: u64,
}

impl FlowRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Seed this source was created with
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform value in `[0, 1)`
    #[inline]
    pub fn next_unit(&mut self) -> f32 {
        self.inner.gen::<f32>()
    }

    /// Uniform value in `[0, max]`
    #[inline]
    pub fn next_in(&mut self, max: f32) -> f32 {
        self.inner.gen_range(0.0..=max)
    }
}
