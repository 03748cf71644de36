//! Radial weighting kernel for the local neighborhoods.

use common::buffer2::Buffer2;

/// Squared ratio of the kernel support to the neighborhood radius.
///
/// The weight reaches zero at `radius * sqrt(2.5)`, beyond the window corner,
/// so every cell of the square window keeps a positive weight.
const SUPPORT_RATIO_SQ: f64 = 2.5;

/// Radial kernel with linearly decaying weights.
///
/// The nominal kernel is `(2r+1) x (2r+1)`. Only offsets up to `reach` from
/// the center are stored, since a window clamped to an image never reaches
/// further than the image extent.
#[derive(Debug, Clone, PartialEq)]
pub struct RadialKernel {
    radius: usize,
    reach_x: usize,
    reach_y: usize,
    weights: Buffer2<f64>,
}

impl RadialKernel {
    /// Full `(2r+1) x (2r+1)` kernel.
    pub fn generate(radius: usize) -> Self {
        Self::clipped(radius, radius, radius)
    }

    /// Kernel of radius `radius` for a `width x height` image.
    ///
    /// Storage is bounded by the image size whatever the radius.
    pub fn for_image(radius: usize, width: usize, height: usize) -> Self {
        Self::clipped(radius, width.saturating_sub(1), height.saturating_sub(1))
    }

    /// Weight at offset `(i, j)` from the center is `1 - d` where
    /// `d = sqrt(i² + j²) / (r * sqrt(2.5))`, or 0 once `d >= 1`.
    ///
    /// Offsets are limited to `max_dx` columns and `max_dy` rows.
    fn clipped(radius: usize, max_dx: usize, max_dy: usize) -> Self {
        let reach_x = radius.min(max_dx);
        let reach_y = radius.min(max_dy);
        let mut weights = Buffer2::new_default(2 * reach_x + 1, 2 * reach_y + 1);
        if radius == 0 {
            weights[(0, 0)] = 1.0;
            return Self {
                radius,
                reach_x,
                reach_y,
                weights,
            };
        }

        let support = radius as f64 * SUPPORT_RATIO_SQ.sqrt();
        let (cx, cy) = (reach_x, reach_y);
        for i in 0..=reach_y {
            for j in 0..=reach_x {
                let d = ((i * i + j * j) as f64).sqrt() / support;
                let w = if d >= 1.0 { 0.0 } else { 1.0 - d };
                weights[(cx + j, cy + i)] = w;
                weights[(cx + j, cy - i)] = w;
                weights[(cx - j, cy + i)] = w;
                weights[(cx - j, cy - i)] = w;
            }
        }

        Self {
            radius,
            reach_x,
            reach_y,
            weights,
        }
    }

    #[inline]
    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Largest stored `(column, row)` offset from the center.
    #[inline]
    pub fn reach(&self) -> (usize, usize) {
        (self.reach_x, self.reach_y)
    }

    /// Weight at stored column `kx` and row `ky`; the center sits at
    /// [`RadialKernel::reach`].
    #[inline]
    pub fn weight(&self, kx: usize, ky: usize) -> f64 {
        self.weights[(kx, ky)]
    }

    #[inline]
    pub fn weights(&self) -> &Buffer2<f64> {
        &self.weights
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::float_ext::FloatExt;

    #[test]
    fn test_size_and_center() {
        for radius in 0..6 {
            let kernel = RadialKernel::generate(radius);
            let side = 2 * radius + 1;
            assert_eq!(kernel.reach(), (radius, radius));
            assert_eq!(kernel.weights().shape(), (side, side));
            assert_eq!(kernel.weight(radius, radius), 1.0);
        }
    }

    #[test]
    fn test_four_fold_symmetry() {
        for radius in 1..8 {
            let kernel = RadialKernel::generate(radius);
            let c = radius;
            for i in 0..=radius {
                for j in 0..=radius {
                    let w = kernel.weight(c + j, c + i);
                    assert_eq!(w, kernel.weight(c + j, c - i));
                    assert_eq!(w, kernel.weight(c - j, c + i));
                    assert_eq!(w, kernel.weight(c - j, c - i));
                    // Radial, so transposing the offset changes nothing either.
                    assert_eq!(w, kernel.weight(c + i, c + j));
                }
            }
        }
    }

    #[test]
    fn test_radius_one_values() {
        let kernel = RadialKernel::generate(1);
        let support = 2.5f64.sqrt();
        assert!(kernel.weight(2, 1).approximately_eq(1.0 - 1.0 / support));
        assert!(kernel
            .weight(2, 2)
            .approximately_eq(1.0 - 2.0f64.sqrt() / support));
    }

    #[test]
    fn test_decay_with_distance() {
        let kernel = RadialKernel::generate(5);
        let c = 5;
        for step in 0..5 {
            assert!(kernel.weight(c + step, c) > kernel.weight(c + step + 1, c));
        }
        for i in 0..=5usize {
            for j in 0..=5usize {
                let dist = ((i * i + j * j) as f64).sqrt();
                let w = kernel.weight(c + j, c + i);
                if dist >= 5.0 * 2.5f64.sqrt() {
                    assert_eq!(w, 0.0);
                } else {
                    assert!(w > 0.0 && w <= 1.0);
                }
            }
        }
    }

    #[test]
    fn test_image_bounds_limit_storage() {
        let kernel = RadialKernel::for_image(1_000_000, 5, 3);
        assert_eq!(kernel.radius(), 1_000_000);
        assert_eq!(kernel.reach(), (4, 2));
        assert_eq!(kernel.weights().shape(), (9, 5));
        assert_eq!(kernel.weight(4, 2), 1.0);
        // Support is far beyond the image, so every stored weight is close to 1.
        assert!(kernel.weights().iter().all(|&w| w > 0.99 && w <= 1.0));
    }

    #[test]
    fn test_image_bounds_keep_weights_of_small_radius() {
        let full = RadialKernel::generate(2);
        let clipped = RadialKernel::for_image(2, 3, 10);
        assert_eq!(clipped.reach(), (2, 2));
        assert_eq!(clipped, full);

        let narrow = RadialKernel::for_image(2, 2, 10);
        assert_eq!(narrow.reach(), (1, 2));
        for ky in 0..5 {
            for kx in 0..3 {
                assert_eq!(narrow.weight(kx, ky), full.weight(kx + 1, ky));
            }
        }
    }
}
