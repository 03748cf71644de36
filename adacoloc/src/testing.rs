//! Synthetic two-channel images for tests.

use common::buffer2::Buffer2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Uniform noise in `[0, 1)`.
pub fn noise(width: usize, height: usize, seed: u64) -> Buffer2<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    Buffer2::from_fn(width, height, |_, _| rng.random::<f64>())
}

/// Distinct value per pixel, so no two samples ever tie.
pub fn distinct_ramp(width: usize, height: usize) -> Buffer2<f64> {
    Buffer2::from_fn(width, height, |x, y| (y * width + x) as f64 + 1.0)
}

/// Channel pair whose left half is positively and right half negatively
/// associated.
pub fn split_association(width: usize, height: usize, seed: u64) -> (Buffer2<f64>, Buffer2<f64>) {
    let base = noise(width, height, seed);
    let jitter = noise(width, height, seed.wrapping_add(1));
    let paired = Buffer2::from_fn(width, height, |x, y| {
        let v = base[(x, y)];
        let j = 0.05 * jitter[(x, y)];
        if x < width / 2 {
            v + j
        } else {
            1.0 - v + j
        }
    });
    (base, paired)
}
