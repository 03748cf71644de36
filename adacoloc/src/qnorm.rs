//! Quantile function of the normal distribution.
//!
//! Invalid probabilities yield `NaN` instead of an error, so callers must
//! check the result.

use statrs::distribution::{ContinuousCDF, Normal};

/// Standard normal quantile.
///
/// `p` outside `[0, 1]` gives `NaN`. Both `p == 0` and `p == 1` give
/// `+inf`; use [`qnorm_with`] for the signed tails.
pub fn qnorm(p: f64) -> f64 {
    if !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p == 0.0 || p == 1.0 {
        return f64::INFINITY;
    }
    qnorm_with(p, 0.0, 1.0, true, false)
}

/// Quantile of `Normal(mean, sd)`.
///
/// With `log_p` the input is `ln(p)`. With `lower_tail == false` the result
/// is negated. Returns `NaN` for probabilities outside `[0, 1]` and for a
/// non-positive or non-finite `sd`.
pub fn qnorm_with(p: f64, mean: f64, sd: f64, lower_tail: bool, log_p: bool) -> f64 {
    let p = if log_p { p.exp() } else { p };
    if !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    let Ok(dist) = Normal::new(mean, sd) else {
        return f64::NAN;
    };

    let q = if p == 0.0 {
        f64::NEG_INFINITY
    } else if p == 1.0 {
        f64::INFINITY
    } else {
        dist.inverse_cdf(p)
    };
    if lower_tail {
        q
    } else {
        -q
    }
}
