//! Effective sample size of a weighted neighborhood.

use crate::sampler::LocalSample;

/// Per-channel intensity thresholds.
///
/// Samples strictly below either threshold carry no weight.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Thresholds {
    pub channel1: f64,
    pub channel2: f64,
}

impl Thresholds {
    pub fn new(channel1: f64, channel2: f64) -> Self {
        Self { channel1, channel2 }
    }

    #[inline]
    pub fn passes(&self, x: f64, y: f64) -> bool {
        !(x < self.channel1 || y < self.channel2)
    }
}

/// Gates `sample` by `thresholds` and returns `sqrt(N)` with
/// `N = (Σw)² / Σw²`.
///
/// Gating zeroes weights in place; the Kendall estimator reads the gated
/// weights afterwards. Returns 0 when no weight survives.
pub fn effective_sqrt_n(sample: &mut LocalSample, thresholds: Thresholds) -> f64 {
    let (x, y, w) = sample.split_weights_mut();

    let mut sum_w = 0.0;
    let mut sum_sq_w = 0.0;
    for ((&xi, &yi), wi) in x.iter().zip(y).zip(w.iter_mut()) {
        if !thresholds.passes(xi, yi) {
            *wi = 0.0;
        }
        sum_w += *wi;
        sum_sq_w += *wi * *wi;
    }

    let denom = sum_w * sum_w;
    if denom <= 0.0 {
        return 0.0;
    }
    (denom / sum_sq_w).sqrt()
}
