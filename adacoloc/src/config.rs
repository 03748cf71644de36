//! Run configuration for the adaptive estimator.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How pixels are processed within a round.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Execution {
    /// One worker, pixels in row-major order.
    Sequential,
    /// Pixels shared across the rayon thread pool.
    #[default]
    Parallel,
}

impl From<bool> for Execution {
    fn from(parallel: bool) -> Self {
        if parallel {
            Self::Parallel
        } else {
            Self::Sequential
        }
    }
}

/// Adaptive smoothed Kendall tau parameters.
///
/// Defaults reproduce the published estimator: 15 rounds, stability checks
/// after round 8, bandwidth growth 1.15 and output scale 1.5.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Total number of bandwidth rounds.
    pub rounds: usize,
    /// Round after which the baseline is captured. Freezing is evaluated
    /// from the following round onward.
    pub check_round: usize,
    /// Geometric growth of the neighborhood radius per round.
    pub growth_factor: f64,
    /// Scale applied to `tau * sqrt(N)` in the output map.
    pub output_scale: f64,
    /// Seed for the tie-breaking random streams.
    pub seed: u64,
    pub execution: Execution,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rounds: 15,
            check_round: 8,
            growth_factor: 1.15,
            output_scale: 1.5,
            seed: 0,
            execution: Execution::Parallel,
        }
    }
}

impl Config {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_execution(mut self, execution: Execution) -> Self {
        self.execution = execution;
        self
    }

    /// Parses a YAML document; missing fields take their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rounds == 0 {
            return Err(Error::NoRounds);
        }
        if !self.growth_factor.is_finite() || self.growth_factor < 1.0 {
            return Err(Error::InvalidGrowthFactor(self.growth_factor));
        }
        if !self.output_scale.is_finite() {
            return Err(Error::InvalidOutputScale(self.output_scale));
        }
        Ok(())
    }

    /// Neighborhood radius used in each round.
    ///
    /// The size is accumulated by repeated multiplication (not `powi`) so the
    /// floor boundaries match the reference schedule exactly.
    pub fn radius_schedule(&self) -> Vec<usize> {
        let mut size = 1.0f64;
        let mut radii = Vec::with_capacity(self.rounds);
        for _ in 0..self.rounds {
            radii.push(size.floor() as usize);
            size *= self.growth_factor;
        }
        radii
    }

    pub fn max_radius(&self) -> usize {
        self.radius_schedule().into_iter().max().unwrap_or(0)
    }
}
