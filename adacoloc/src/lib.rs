//! Adacoloc - adaptive colocalization maps for two-channel images.
//!
//! Computes, for every pixel, a locally smoothed weighted Kendall tau
//! between two co-registered channels. Each pixel's neighborhood grows over
//! a fixed number of rounds; neighbors whose current association differs
//! too much from the center are de-weighted, and pixels whose estimate
//! stops being stable are frozen at their last accepted value.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use adacoloc::{AdaptiveKendallTau, Config};
//! use common::buffer2::Buffer2;
//!
//! let config = Config::default().with_seed(42);
//! let estimator = AdaptiveKendallTau::from_config(config)?;
//! let result = estimator.compute(&channel1, &channel2, 0.0, 0.0)?;
//!
//! println!("{} pixels frozen", result.diagnostics.frozen_pixels());
//! ```

mod adaptive;
mod config;
mod effective;
mod error;
mod kendall;
mod kernel;
mod qnorm;
mod sampler;

#[cfg(test)]
mod testing;

use common::buffer2::Buffer2;
use num_traits::AsPrimitive;

pub use adaptive::{
    AdaptiveKendallTau, ColocalizationResult, Diagnostics, LocalEstimate, RoundStats,
};
pub use config::{Config, Execution};
pub use effective::{effective_sqrt_n, Thresholds};
pub use error::{Error, Result};
pub use kendall::{weighted_kendall_tau, KendallScratch};
pub use kernel::RadialKernel;
pub use qnorm::{qnorm, qnorm_with};
pub use sampler::{decorrelation_scale, window_capacity, LocalSample, SampleSource};

/// Fills `output` with the adaptive smoothed Kendall tau colocalization map
/// of `image1` and `image2` using the default schedule.
///
/// Samples strictly below `thres1` (channel 1) or `thres2` (channel 2) carry
/// no weight. All three grids must share one shape.
pub fn adaptive_smoothed_kendall_tau<T, O>(
    image1: &Buffer2<T>,
    image2: &Buffer2<T>,
    thres1: T,
    thres2: T,
    output: &mut Buffer2<O>,
    seed: u64,
    parallel: bool,
) -> Result<()>
where
    T: AsPrimitive<f64>,
    O: Copy + 'static,
    f64: AsPrimitive<O>,
{
    let config = Config::default()
        .with_seed(seed)
        .with_execution(Execution::from(parallel));
    AdaptiveKendallTau::from_config(config)?.compute_into(image1, image2, thres1, thres2, output)?;
    Ok(())
}
