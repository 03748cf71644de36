//! Weighted Kendall rank correlation.
//!
//! For samples with positive weight, tau is
//!
//! ```text
//! tau = Σ_{i<j} w_i w_j sign(x_i - x_j) sign(y_i - y_j) / Σ_{i<j} w_i w_j
//! ```
//!
//! evaluated in O(n log n): samples are ordered by x, each gets its rank in
//! the y order, and a bottom-up merge sort over those ranks accumulates the
//! weight of every discordant (inverted) pair.
//!
//! Ties are broken with one random key per sample, shared by the x and y
//! orders. A pair tied in both coordinates therefore stays concordant, and
//! for tie-free data the keys are never consulted, so the result does not
//! depend on the random stream.


use std::cmp::Ordering;

use rand::RngCore;

#[derive(Debug, Clone, Copy)]
struct Record {
    x: f64,
    y: f64,
    w: f64,
    key: u64,
    position: usize,
}

impl Record {
    #[inline]
    fn cmp_by(&self, other: &Self, value: impl Fn(&Self) -> f64) -> Ordering {
        value(self)
            .total_cmp(&value(other))
            .then(self.key.cmp(&other.key))
            .then(self.position.cmp(&other.position))
    }
}

/// Reusable work buffers for [`weighted_kendall_tau`].
#[derive(Debug, Clone, Default)]
pub struct KendallScratch {
    records: Vec<Record>,
    by_y: Vec<usize>,
    ranks: Vec<usize>,
    ranked_w: Vec<f64>,
    merge_ranks: Vec<usize>,
    merge_w: Vec<f64>,
}

impl KendallScratch {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            by_y: Vec::with_capacity(capacity),
            ranks: Vec::with_capacity(capacity),
            ranked_w: Vec::with_capacity(capacity),
            merge_ranks: Vec::with_capacity(capacity),
            merge_w: Vec::with_capacity(capacity),
        }
    }
}

/// Weighted Kendall tau of `(x, y)` with importance weights `w`.
///
/// Samples with `w <= 0` are ignored. Returns 0 when fewer than two samples
/// carry weight. The result is always within `[-1, 1]`.
pub fn weighted_kendall_tau<R: RngCore>(
    x: &[f64],
    y: &[f64],
    w: &[f64],
    scratch: &mut KendallScratch,
    rng: &mut R,
) -> f64 {
    debug_assert!(x.len() == y.len() && y.len() == w.len());

    let records = &mut scratch.records;
    records.clear();
    let mut total_w = 0.0;
    let mut total_sq_w = 0.0;
    for (position, ((&xi, &yi), &wi)) in x.iter().zip(y).zip(w).enumerate() {
        if wi > 0.0 {
            records.push(Record {
                x: xi,
                y: yi,
                w: wi,
                key: rng.next_u64(),
                position,
            });
            total_w += wi;
            total_sq_w += wi * wi;
        }
    }

    let pair_weight = 0.5 * (total_w * total_w - total_sq_w);
    if records.len() < 2 || pair_weight <= 0.0 {
        return 0.0;
    }

    records.sort_unstable_by(|a, b| a.cmp_by(b, |r| r.x));

    let m = records.len();
    scratch.by_y.clear();
    scratch.by_y.extend(0..m);
    scratch
        .by_y
        .sort_unstable_by(|&a, &b| records[a].cmp_by(&records[b], |r| r.y));

    scratch.ranks.clear();
    scratch.ranks.resize(m, 0);
    for (rank, &i) in scratch.by_y.iter().enumerate() {
        scratch.ranks[i] = rank;
    }
    scratch.ranked_w.clear();
    scratch.ranked_w.extend(records.iter().map(|r| r.w));

    let discordant = weighted_inversions(
        &mut scratch.ranks,
        &mut scratch.ranked_w,
        &mut scratch.merge_ranks,
        &mut scratch.merge_w,
    );

    ((pair_weight - 2.0 * discordant) / pair_weight).clamp(-1.0, 1.0)
}

/// Sorts `ranks` (carrying `weights` along) and returns the summed weight
/// products of all pairs `i < j` with `ranks[i] > ranks[j]`.
///
/// Ranks must be distinct.
fn weighted_inversions(
    ranks: &mut [usize],
    weights: &mut [f64],
    merge_ranks: &mut Vec<usize>,
    merge_w: &mut Vec<f64>,
) -> f64 {
    let n = ranks.len();
    merge_ranks.clear();
    merge_ranks.resize(n, 0);
    merge_w.clear();
    merge_w.resize(n, 0.0);

    let mut inversions = 0.0;
    let mut width = 1;
    while width < n {
        let mut lo = 0;
        while lo + width < n {
            let mid = lo + width;
            let hi = (lo + 2 * width).min(n);

            let mut left_w: f64 = weights[lo..mid].iter().sum();
            let (mut i, mut j, mut k) = (lo, mid, lo);
            while i < mid && j < hi {
                if ranks[i] < ranks[j] {
                    merge_ranks[k] = ranks[i];
                    merge_w[k] = weights[i];
                    left_w -= weights[i];
                    i += 1;
                } else {
                    // Every remaining left element outranks ranks[j].
                    inversions += weights[j] * left_w.max(0.0);
                    merge_ranks[k] = ranks[j];
                    merge_w[k] = weights[j];
                    j += 1;
                }
                k += 1;
            }
            let rest = mid - i;
            merge_ranks[k..k + rest].copy_from_slice(&ranks[i..mid]);
            merge_w[k..k + rest].copy_from_slice(&weights[i..mid]);
            k += rest;
            let rest = hi - j;
            merge_ranks[k..k + rest].copy_from_slice(&ranks[j..hi]);
            merge_w[k..k + rest].copy_from_slice(&weights[j..hi]);

            ranks[lo..hi].copy_from_slice(&merge_ranks[lo..hi]);
            weights[lo..hi].copy_from_slice(&merge_w[lo..hi]);
            lo += 2 * width;
        }
        width *= 2;
    }
    inversions
}
