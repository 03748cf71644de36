//! Weighted neighborhood sampling around a pixel.
//!
//! Each neighbor contributes `(x, y, w)` where `x`/`y` are the two channel
//! values and `w` is the radial kernel weight, further reduced when the
//! neighbor's previous tau estimate disagrees with the center's. The tau
//! difference acts as the edge indicator, so smoothing stops at boundaries
//! between regions of different association.

use common::buffer2::Buffer2;

use crate::adaptive::LocalEstimate;
use crate::kernel::RadialKernel;

/// Global de-correlation scale `2 * sqrt(ln(width * height))`.
///
/// Bounds how far a neighbor's tau may differ (in units of the center's
/// standard error) before it is dropped from the sample.
pub fn decorrelation_scale(width: usize, height: usize) -> f64 {
    2.0 * ((width * height) as f64).ln().sqrt()
}

/// Number of cells in the largest window of radius `radius` that fits a
/// `width x height` image: `min(2r+1, width) * min(2r+1, height)`.
pub fn window_capacity(radius: usize, width: usize, height: usize) -> usize {
    let span = radius.saturating_mul(2).saturating_add(1);
    span.min(width) * span.min(height)
}

/// Parallel `(x, y, w)` arrays for one neighborhood.
///
/// The length is always [`window_capacity`] for the radius and image last
/// gathered; cells of a border window that is clamped further are zero
/// padded at the tail.
#[derive(Debug, Clone, Default)]
pub struct LocalSample {
    x: Vec<f64>,
    y: Vec<f64>,
    w: Vec<f64>,
}

impl LocalSample {
    /// Pre-allocates for `capacity` cells, see [`window_capacity`].
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            x: Vec::with_capacity(capacity),
            y: Vec::with_capacity(capacity),
            w: Vec::with_capacity(capacity),
        }
    }

    pub fn from_parts(x: Vec<f64>, y: Vec<f64>, w: Vec<f64>) -> Self {
        assert!(
            x.len() == y.len() && y.len() == w.len(),
            "sample arrays must have equal length"
        );
        Self { x, y, w }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.w.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.w.is_empty()
    }

    #[inline]
    pub fn x(&self) -> &[f64] {
        &self.x
    }

    #[inline]
    pub fn y(&self) -> &[f64] {
        &self.y
    }

    #[inline]
    pub fn w(&self) -> &[f64] {
        &self.w
    }

    /// Values read-only, weights writable.
    #[inline]
    pub fn split_weights_mut(&mut self) -> (&[f64], &[f64], &mut [f64]) {
        (&self.x, &self.y, &mut self.w)
    }

    fn reset(&mut self, len: usize) {
        for buf in [&mut self.x, &mut self.y, &mut self.w] {
            buf.clear();
            buf.resize(len, 0.0);
        }
    }
}

/// Inclusive window `[start, end]` along one axis, clamped to the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Window {
    pub start: usize,
    pub end: usize,
    center: usize,
    reach: usize,
}

impl Window {
    /// `reach` is the kernel's stored half-extent on this axis and must be at
    /// least `min(radius, extent - 1)`.
    pub fn clamped(center: usize, radius: usize, reach: usize, extent: usize) -> Self {
        debug_assert!(center < extent);
        debug_assert!(reach >= radius.min(extent - 1));
        Self {
            start: center.saturating_sub(radius),
            end: center.saturating_add(radius).min(extent - 1),
            center,
            reach,
        }
    }

    /// Kernel index of image position `pos`, measured from the unclamped
    /// window so border pixels see an off-center slice of the kernel.
    #[inline]
    pub fn kernel_index(&self, pos: usize) -> usize {
        pos + self.reach - self.center
    }
}

/// Read-only inputs shared by every pixel of a round.
#[derive(Debug, Clone, Copy)]
pub struct SampleSource<'a> {
    pub image1: &'a Buffer2<f64>,
    pub image2: &'a Buffer2<f64>,
    /// Estimates committed by the previous round.
    pub estimates: &'a Buffer2<LocalEstimate>,
    pub decorrelation_scale: f64,
}

impl SampleSource<'_> {
    /// Fills `sample` with the weighted neighborhood of pixel `(x, y)`.
    pub fn gather(&self, kernel: &RadialKernel, x: usize, y: usize, sample: &mut LocalSample) {
        let radius = kernel.radius();
        let (reach_x, reach_y) = kernel.reach();
        let (width, height) = self.image1.shape();
        sample.reset(window_capacity(radius, width, height));

        let cols = Window::clamped(x, radius, reach_x, width);
        let rows = Window::clamped(y, radius, reach_y, height);

        let center = self.estimates[(x, y)];
        let mut index = 0;
        for k in rows.start..=rows.end {
            let ky = rows.kernel_index(k);
            for l in cols.start..=cols.end {
                let kx = cols.kernel_index(l);
                sample.x[index] = self.image1[(l, k)];
                sample.y[index] = self.image2[(l, k)];

                let d = (self.estimates[(l, k)].tau - center.tau).abs() * center.sqrt_n
                    / self.decorrelation_scale;
                // NaN (single-pixel image) falls through to zero weight.
                sample.w[index] = if d < 1.0 {
                    kernel.weight(kx, ky) * (1.0 - d) * (1.0 - d)
                } else {
                    0.0
                };
                index += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::float_ext::FloatExt;

    fn ramp(width: usize, height: usize, offset: f64) -> Buffer2<f64> {
        Buffer2::from_fn(width, height, |x, y| offset + (y * width + x) as f64)
    }

    fn flat_estimates(width: usize, height: usize) -> Buffer2<LocalEstimate> {
        Buffer2::new_filled(width, height, LocalEstimate::INITIAL)
    }

    #[test]
    fn test_decorrelation_scale() {
        assert!(decorrelation_scale(32, 32).approximately_eq(2.0 * (1024f64).ln().sqrt()));
        assert_eq!(decorrelation_scale(1, 1), 0.0);
    }

    #[test]
    fn test_window_clamping() {
        let w = Window::clamped(1, 3, 3, 10);
        assert_eq!((w.start, w.end), (0, 4));
        assert_eq!(w.kernel_index(0), 2);
        assert_eq!(w.kernel_index(4), 6);

        let w = Window::clamped(8, 3, 3, 10);
        assert_eq!((w.start, w.end), (5, 9));
        assert_eq!(w.kernel_index(5), 0);

        let w = Window::clamped(5, 2, 2, 10);
        assert_eq!((w.start, w.end), (3, 7));

        // Kernel stored only up to the image extent.
        let w = Window::clamped(1, usize::MAX, 3, 4);
        assert_eq!((w.start, w.end), (0, 3));
        assert_eq!(w.kernel_index(0), 2);
        assert_eq!(w.kernel_index(3), 5);
    }

    #[test]
    fn test_interior_sample_matches_kernel() {
        let image1 = ramp(7, 7, 0.0);
        let image2 = ramp(7, 7, 100.0);
        let estimates = flat_estimates(7, 7);
        let source = SampleSource {
            image1: &image1,
            image2: &image2,
            estimates: &estimates,
            decorrelation_scale: decorrelation_scale(7, 7),
        };
        let kernel = RadialKernel::generate(2);
        let mut sample = LocalSample::with_capacity(window_capacity(2, 7, 7));
        source.gather(&kernel, 3, 3, &mut sample);

        assert_eq!(sample.len(), 25);
        // Row-major over the 5x5 window starting at (1, 1).
        assert_eq!(sample.x()[0], image1[(1, 1)]);
        assert_eq!(sample.y()[0], image2[(1, 1)]);
        assert_eq!(sample.x()[24], image1[(5, 5)]);
        assert_eq!(sample.x()[12], image1[(3, 3)]);
        for (i, &w) in sample.w().iter().enumerate() {
            assert_eq!(w, kernel.weight(i % 5, i / 5));
        }
    }

    #[test]
    fn test_corner_sample_is_partial_kernel_with_padding() {
        let image1 = ramp(5, 4, 0.0);
        let image2 = ramp(5, 4, 1.0);
        let estimates = flat_estimates(5, 4);
        let source = SampleSource {
            image1: &image1,
            image2: &image2,
            estimates: &estimates,
            decorrelation_scale: decorrelation_scale(5, 4),
        };
        let kernel = RadialKernel::generate(1);
        let mut sample = LocalSample::with_capacity(window_capacity(3, 5, 4));
        source.gather(&kernel, 0, 0, &mut sample);

        assert_eq!(sample.len(), 9);
        assert_eq!(&sample.x()[..4], &[0.0, 1.0, 5.0, 6.0]);
        assert_eq!(sample.w()[0], kernel.weight(1, 1));
        assert_eq!(sample.w()[1], kernel.weight(2, 1));
        assert_eq!(sample.w()[2], kernel.weight(1, 2));
        assert_eq!(sample.w()[3], kernel.weight(2, 2));
        assert!(sample.x()[4..].iter().all(|&v| v == 0.0));
        assert!(sample.y()[4..].iter().all(|&v| v == 0.0));
        assert!(sample.w()[4..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_tau_difference_deweights_neighbors() {
        let image = ramp(3, 3, 0.0);
        let mut estimates = flat_estimates(3, 3);
        let scale = decorrelation_scale(3, 3);
        estimates[(1, 1)] = LocalEstimate {
            tau: 0.5,
            sqrt_n: 2.0,
        };
        // d = 0.25 * 2 / scale, well below 1.
        estimates[(0, 0)] = LocalEstimate {
            tau: 0.25,
            sqrt_n: 1.0,
        };
        // d = 1.5 * 2 / scale > 1, dropped.
        estimates[(2, 2)] = LocalEstimate {
            tau: -1.0,
            sqrt_n: 1.0,
        };
        let source = SampleSource {
            image1: &image,
            image2: &image,
            estimates: &estimates,
            decorrelation_scale: scale,
        };
        let kernel = RadialKernel::generate(1);
        let mut sample = LocalSample::default();
        source.gather(&kernel, 1, 1, &mut sample);

        let d0 = 0.25 * 2.0 / scale;
        let expected = kernel.weight(0, 0) * (1.0 - d0) * (1.0 - d0);
        assert!(sample.w()[0].approximately_eq(expected));
        assert_eq!(sample.w()[8], 0.0);
        // Neighbors still at tau 0 differ by 0.5 from the center.
        let d1 = 0.5 * 2.0 / scale;
        let expected = kernel.weight(1, 0) * (1.0 - d1) * (1.0 - d1);
        assert!(sample.w()[1].approximately_eq(expected));
        assert_eq!(sample.w()[4], 1.0);
    }

    #[test]
    fn test_single_pixel_image_has_no_weight() {
        let image = Buffer2::new(1, 1, vec![3.0]);
        let estimates = flat_estimates(1, 1);
        let source = SampleSource {
            image1: &image,
            image2: &image,
            estimates: &estimates,
            decorrelation_scale: decorrelation_scale(1, 1),
        };
        let mut sample = LocalSample::default();
        source.gather(&RadialKernel::generate(1), 0, 0, &mut sample);
        assert!(sample.w().iter().all(|&w| w == 0.0));
    }

    #[test]
    fn test_window_capacity_is_bounded_by_image() {
        assert_eq!(window_capacity(0, 8, 8), 1);
        assert_eq!(window_capacity(2, 8, 8), 25);
        assert_eq!(window_capacity(2, 3, 8), 15);
        assert_eq!(window_capacity(usize::MAX, 5, 4), 20);
    }

    #[test]
    fn test_huge_radius_covers_whole_image() {
        let image1 = ramp(5, 4, 0.0);
        let image2 = ramp(5, 4, 50.0);
        let estimates = flat_estimates(5, 4);
        let source = SampleSource {
            image1: &image1,
            image2: &image2,
            estimates: &estimates,
            decorrelation_scale: decorrelation_scale(5, 4),
        };
        let kernel = RadialKernel::for_image(1_000_000, 5, 4);
        let mut sample = LocalSample::default();

        source.gather(&kernel, 0, 3, &mut sample);
        assert_eq!(sample.len(), 20);
        assert_eq!(sample.x(), image1.pixels());
        assert_eq!(sample.y(), image2.pixels());
        assert!(sample.w().iter().all(|&w| w > 0.99 && w <= 1.0));
        assert_eq!(sample.w()[15], 1.0);
    }
}
