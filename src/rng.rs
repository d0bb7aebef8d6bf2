use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Seeded uniform source. The same seed always yields the same variate sequence.
pub struct SeasonRng {
    inner: ChaCha8Rng,
}

impl SeasonRng {
    pub fn seeded(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Falls back to an OS-seeded draw when no seed is supplied.
    pub fn from_option(seed: Option<u64>) -> Self {
        Self::seeded(seed.unwrap_or_else(|| rand::thread_rng().r#gen()))
    }

    /// Uniform variate in `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.inner.r#gen::<f64>()
    }
}
