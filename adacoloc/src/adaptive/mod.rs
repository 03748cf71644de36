//! Adaptive bandwidth driver.
//!
//! Runs a fixed number of rounds with a growing neighborhood radius. Every
//! round re-estimates tau and `sqrt(N)` for each pixel from the previous
//! round's committed maps, so pixels are independent within a round and can
//! be processed in any order or in parallel.
//!
//! After the check round the estimates are snapshotted as a baseline. From
//! then on a pixel whose new tau drifts from its baseline by more than the
//! de-correlation scale (in units of the baseline standard error) is frozen:
//! the attempted update is discarded and the pixel is skipped in all later
//! rounds.


use std::time::Instant;

use common::buffer2::Buffer2;
use num_traits::AsPrimitive;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::config::{Config, Execution};
use crate::effective::{effective_sqrt_n, Thresholds};
use crate::error::{Error, Result};
use crate::kendall::{weighted_kendall_tau, KendallScratch};
use crate::kernel::RadialKernel;
use crate::sampler::{decorrelation_scale, window_capacity, LocalSample, SampleSource};

/// Local tau estimate and the square root of its effective sample size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalEstimate {
    pub tau: f64,
    pub sqrt_n: f64,
}

impl LocalEstimate {
    /// State of every pixel before the first round.
    pub const INITIAL: Self = Self {
        tau: 0.0,
        sqrt_n: 1.0,
    };

    /// `|baseline.tau - self.tau| * baseline.sqrt_n > lambda`.
    #[inline]
    pub fn drifted_from(&self, baseline: &LocalEstimate, lambda: f64) -> bool {
        (baseline.tau - self.tau).abs() * baseline.sqrt_n > lambda
    }
}

/// Summary of one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundStats {
    pub round: usize,
    pub radius: usize,
    /// Pixels frozen at the end of the round, cumulative.
    pub frozen_pixels: usize,
    /// Pixels whose effective sample size was zero.
    pub degenerate_pixels: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostics {
    pub decorrelation_scale: f64,
    pub rounds: Vec<RoundStats>,
}

impl Diagnostics {
    pub fn frozen_pixels(&self) -> usize {
        self.rounds.last().map_or(0, |r| r.frozen_pixels)
    }
}

/// Maps produced by a full run.
#[derive(Debug, Clone)]
pub struct ColocalizationResult {
    /// `tau * sqrt(N) * output_scale` per pixel.
    pub colocalization: Buffer2<f64>,
    pub tau: Buffer2<f64>,
    pub sqrt_n: Buffer2<f64>,
    pub frozen: Buffer2<bool>,
    pub diagnostics: Diagnostics,
}

/// Adaptive smoothed Kendall tau estimator.
#[derive(Debug, Clone)]
pub struct AdaptiveKendallTau {
    config: Config,
}

impl AdaptiveKendallTau {
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Runs every round and returns all final maps.
    pub fn compute<T>(
        &self,
        image1: &Buffer2<T>,
        image2: &Buffer2<T>,
        thres1: T,
        thres2: T,
    ) -> Result<ColocalizationResult>
    where
        T: AsPrimitive<f64>,
    {
        check_inputs(image1, image2)?;

        let started = Instant::now();
        let thresholds = Thresholds::new(thres1.as_(), thres2.as_());
        let mut state = AdaptiveState::new(
            image1.map(|&v| v.as_()),
            image2.map(|&v| v.as_()),
            thresholds,
            &self.config,
        );

        let mut rounds = Vec::with_capacity(self.config.rounds);
        for (round, radius) in self.config.radius_schedule().into_iter().enumerate() {
            let stats = state.run_round(round, radius, &self.config);
            tracing::debug!(
                round,
                radius,
                frozen = stats.frozen_pixels,
                degenerate = stats.degenerate_pixels,
                "Adaptive round finished"
            );
            rounds.push(stats);
        }

        let diagnostics = Diagnostics {
            decorrelation_scale: state.decorrelation_scale,
            rounds,
        };
        tracing::info!(
            width = image1.width(),
            height = image1.height(),
            execution = %self.config.execution,
            decorrelation_scale = diagnostics.decorrelation_scale,
            frozen = diagnostics.frozen_pixels(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Adaptive Kendall tau computed"
        );

        Ok(state.into_result(diagnostics))
    }

    /// Runs every round and writes the colocalization map into `output`.
    ///
    /// `output` must have the shape of `image1`; it is validated before any
    /// work starts.
    pub fn compute_into<T, O>(
        &self,
        image1: &Buffer2<T>,
        image2: &Buffer2<T>,
        thres1: T,
        thres2: T,
        output: &mut Buffer2<O>,
    ) -> Result<Diagnostics>
    where
        T: AsPrimitive<f64>,
        O: Copy + 'static,
        f64: AsPrimitive<O>,
    {
        if !output.same_shape(image1) {
            return Err(Error::ShapeMismatch {
                what: "output",
                expected: image1.shape(),
                actual: output.shape(),
            });
        }
        let result = self.compute(image1, image2, thres1, thres2)?;
        for (dst, &src) in output.iter_mut().zip(result.colocalization.iter()) {
            *dst = src.as_();
        }
        Ok(result.diagnostics)
    }
}

fn check_inputs<T>(image1: &Buffer2<T>, image2: &Buffer2<T>) -> Result<()> {
    if !image2.same_shape(image1) {
        return Err(Error::ShapeMismatch {
            what: "image2",
            expected: image1.shape(),
            actual: image2.shape(),
        });
    }
    if image1.is_empty() {
        return Err(Error::EmptyImage);
    }
    Ok(())
}

/// Per-worker buffers sized for the largest neighborhood of the run.
struct Scratch {
    sample: LocalSample,
    kendall: KendallScratch,
}

impl Scratch {
    fn new(capacity: usize) -> Self {
        Self {
            sample: LocalSample::with_capacity(capacity),
            kendall: KendallScratch::with_capacity(capacity),
        }
    }
}

/// Double-buffered per-pixel state.
struct AdaptiveState {
    image1: Buffer2<f64>,
    image2: Buffer2<f64>,
    thresholds: Thresholds,
    /// Committed by the previous round; read-only while a round runs.
    prev: Buffer2<LocalEstimate>,
    next: Buffer2<LocalEstimate>,
    frozen: Buffer2<bool>,
    /// Snapshot taken after the check round. Freezing is active once set.
    baseline: Option<Buffer2<LocalEstimate>>,
    colocalization: Buffer2<f64>,
    decorrelation_scale: f64,
    rng: ChaCha8Rng,
    /// Cells in the largest window of the run, bounded by the image.
    sample_capacity: usize,
    /// Reused by every sequential round.
    scratch: Scratch,
}

impl AdaptiveState {
    fn new(
        image1: Buffer2<f64>,
        image2: Buffer2<f64>,
        thresholds: Thresholds,
        config: &Config,
    ) -> Self {
        let (width, height) = image1.shape();
        let sample_capacity = window_capacity(config.max_radius(), width, height);
        Self {
            thresholds,
            prev: Buffer2::new_filled(width, height, LocalEstimate::INITIAL),
            next: Buffer2::new_filled(width, height, LocalEstimate::INITIAL),
            frozen: Buffer2::new_filled(width, height, false),
            baseline: None,
            colocalization: Buffer2::new_default(width, height),
            decorrelation_scale: decorrelation_scale(width, height),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            sample_capacity,
            scratch: Scratch::new(sample_capacity),
            image1,
            image2,
        }
    }

    fn run_round(&mut self, round: usize, radius: usize, config: &Config) -> RoundStats {
        let (width, height) = self.prev.shape();
        let kernel = RadialKernel::for_image(radius, width, height);
        let update = PixelUpdate {
            source: SampleSource {
                image1: &self.image1,
                image2: &self.image2,
                estimates: &self.prev,
                decorrelation_scale: self.decorrelation_scale,
            },
            kernel: &kernel,
            thresholds: self.thresholds,
            baseline: self.baseline.as_ref(),
            lambda: self.decorrelation_scale,
            output_scale: config.output_scale,
            rng: &self.rng,
            stream_offset: (round as u64).wrapping_mul(self.prev.len() as u64),
        };

        match config.execution {
            Execution::Sequential => {
                let scratch = &mut self.scratch;
                let cells = self
                    .next
                    .pixels_mut()
                    .iter_mut()
                    .zip(self.colocalization.pixels_mut().iter_mut())
                    .zip(self.frozen.pixels_mut().iter_mut());
                for (idx, ((next, out), frozen)) in cells.enumerate() {
                    update.apply(idx, scratch, next, out, frozen);
                }
            }
            Execution::Parallel => {
                let capacity = self.sample_capacity;
                self.next
                    .pixels_mut()
                    .par_iter_mut()
                    .zip(self.colocalization.pixels_mut().par_iter_mut())
                    .zip(self.frozen.pixels_mut().par_iter_mut())
                    .enumerate()
                    .for_each_init(
                        || Scratch::new(capacity),
                        |scratch, (idx, ((next, out), frozen))| {
                            update.apply(idx, scratch, next, out, frozen);
                        },
                    );
            }
        }

        std::mem::swap(&mut self.prev, &mut self.next);
        if round == config.check_round {
            self.baseline = Some(self.prev.clone());
        }

        RoundStats {
            round,
            radius,
            frozen_pixels: self.frozen.iter().filter(|&&f| f).count(),
            degenerate_pixels: self.prev.iter().filter(|e| e.sqrt_n <= 0.0).count(),
        }
    }

    fn into_result(self, diagnostics: Diagnostics) -> ColocalizationResult {
        ColocalizationResult {
            colocalization: self.colocalization,
            tau: self.prev.map(|e| e.tau),
            sqrt_n: self.prev.map(|e| e.sqrt_n),
            frozen: self.frozen,
            diagnostics,
        }
    }
}

/// Everything one pixel update reads. Shared by all workers of a round.
struct PixelUpdate<'a> {
    source: SampleSource<'a>,
    kernel: &'a RadialKernel,
    thresholds: Thresholds,
    baseline: Option<&'a Buffer2<LocalEstimate>>,
    lambda: f64,
    output_scale: f64,
    rng: &'a ChaCha8Rng,
    stream_offset: u64,
}

impl PixelUpdate<'_> {
    fn apply(
        &self,
        idx: usize,
        scratch: &mut Scratch,
        next: &mut LocalEstimate,
        out: &mut f64,
        frozen: &mut bool,
    ) {
        let prev = self.source.estimates[idx];
        // Frozen pixels keep their estimate and output.
        if *frozen {
            *next = prev;
            return;
        }

        let (x, y) = self.source.estimates.coords(idx);
        self.source.gather(self.kernel, x, y, &mut scratch.sample);
        let sqrt_n = effective_sqrt_n(&mut scratch.sample, self.thresholds);

        let candidate = if sqrt_n <= 0.0 {
            *out = 0.0;
            LocalEstimate { tau: 0.0, sqrt_n }
        } else {
            // One independent stream per (round, pixel) keeps tie-breaking
            // identical across execution modes.
            let mut rng = self.rng.clone();
            rng.set_stream(self.stream_offset.wrapping_add(idx as u64));
            let tau = weighted_kendall_tau(
                scratch.sample.x(),
                scratch.sample.y(),
                scratch.sample.w(),
                &mut scratch.kendall,
                &mut rng,
            );
            *out = tau * sqrt_n * self.output_scale;
            LocalEstimate { tau, sqrt_n }
        };

        *next = match self.baseline {
            Some(baseline) if candidate.drifted_from(&baseline[idx], self.lambda) => {
                *frozen = true;
                prev
            }
            _ => candidate,
        };
    }
}
