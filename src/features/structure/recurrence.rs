//! k-nearest-neighbour recurrence matrix
//!
//! # Algorithm
//!
//! 1. L2-normalize every feature frame; similarity is the cosine
//! 2. For each frame, rank every other frame `j` with `|i - j| >= width` by
//!    similarity and keep the `k` best with positive similarity
//! 3. With `symmetric`, keep a link only when each frame is among the
//!    other's neighbours
//! 4. `Connectivity` writes 1 per link, `Affinity` writes the cosine
//!
//! `k` defaults to `2·ceil(sqrt(n - 2·width + 1))`.

use crate::features::chroma::normalization::l2_norm;
use crate::parallel::map_indices;
use serde::{Deserialize, Serialize};

const EPSILON: f32 = 1e-10;

/// Recurrence weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecurrenceMode {
    /// Binary nearest-neighbour links
    Connectivity,
    /// Cosine similarity on nearest-neighbour links
    Affinity,
}

/// Dense square recurrence matrix
#[derive(Debug, Clone, PartialEq)]
pub struct RecurrenceMatrix {
    n: usize,
    data: Vec<f32>,
}

impl RecurrenceMatrix {
    /// Number of frames (rows and columns)
    pub fn len(&self) -> usize {
        self.n
    }

    /// True for a matrix over zero frames
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Entry `(i, j)`
    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.data[i * self.n + j]
    }

    /// Row `i`
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.n..(i + 1) * self.n]
    }

    /// Entry `(i, j)` equals entry `(j, i)` everywhere
    pub fn is_symmetric(&self) -> bool {
        (0..self.n).all(|i| (i + 1..self.n).all(|j| self.get(i, j) == self.get(j, i)))
    }
}

/// Default neighbour count for `n` frames and exclusion width `width`
pub fn default_k(n: usize, width: usize) -> usize {
    let effective = (n + 1).saturating_sub(2 * width).max(1);
    2 * (effective as f64).sqrt().ceil() as usize
}

/// Build the recurrence matrix of a feature sequence
///
/// # Arguments
///
/// * `features` - Feature frames (all of the same dimension)
/// * `mode` - Binary or cosine-weighted links
/// * `width` - Links with `|i - j| < width` are excluded (at least 1)
/// * `k` - Neighbours per frame, `None` for the default
/// * `symmetric` - Keep mutual neighbours only
/// * `parallel` - Compute rows on the rayon pool
pub fn recurrence_matrix(
    features: &[Vec<f32>],
    mode: RecurrenceMode,
    width: usize,
    k: Option<usize>,
    symmetric: bool,
    parallel: bool,
) -> RecurrenceMatrix {
    let n = features.len();
    let width = width.max(1);
    let k = k
        .unwrap_or_else(|| default_k(n, width))
        .min(n.saturating_sub(1))
        .max(1);

    log::debug!(
        "Recurrence matrix: {} frames, k={}, width={}, mode={:?}, symmetric={}",
        n,
        k,
        width,
        mode,
        symmetric
    );

    let normalized: Vec<Vec<f32>> = features
        .iter()
        .map(|f| {
            let norm = l2_norm(f);
            if norm > EPSILON {
                f.iter().map(|v| v / norm).collect()
            } else {
                vec![0.0; f.len()]
            }
        })
        .collect();

    // Row i: the k most similar frames outside the exclusion band
    let neighbours: Vec<Vec<(usize, f32)>> = map_indices(n, parallel, |i| {
        let mut sims: Vec<(usize, f32)> = (0..n)
            .filter(|&j| i.abs_diff(j) >= width)
            .map(|j| (j, dot(&normalized[i], &normalized[j])))
            .filter(|&(_, s)| s > EPSILON)
            .collect();
        sims.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        sims.truncate(k);
        sims
    });

    let mut is_neighbour = vec![false; n * n];
    for (i, row) in neighbours.iter().enumerate() {
        for &(j, _) in row {
            is_neighbour[i * n + j] = true;
        }
    }

    let mut data = vec![0.0f32; n * n];
    for (i, row) in neighbours.iter().enumerate() {
        for &(j, sim) in row {
            if symmetric && !is_neighbour[j * n + i] {
                continue;
            }
            data[i * n + j] = match mode {
                RecurrenceMode::Connectivity => 1.0,
                RecurrenceMode::Affinity => sim,
            };
        }
    }

    RecurrenceMatrix { n, data }
}

/// Cosine similarity of two frames
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let na = l2_norm(a);
    let nb = l2_norm(b);
    if na < EPSILON || nb < EPSILON {
        return 0.0;
    }
    dot(a, b) / (na * nb)
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Repeating sequence of one-hot frames with the given period
    fn periodic_features(n: usize, period: usize) -> Vec<Vec<f32>> {
        (0..n)
            .map(|i| {
                let mut v = vec![0.0f32; period];
                v[i % period] = 1.0;
                v
            })
            .collect()
    }

    #[test]
    fn test_default_k() {
        assert_eq!(default_k(100, 3), 2 * 10);
        assert_eq!(default_k(2, 3), 2);
    }

    #[test]
    fn test_symmetric_and_band_excluded() {
        let feats = periodic_features(40, 8);
        let rec = recurrence_matrix(&feats, RecurrenceMode::Connectivity, 3, None, true, false);
        assert!(rec.is_symmetric());
        for i in 0..40usize {
            for j in 0..40usize {
                if i.abs_diff(j) < 3 {
                    assert_eq!(rec.get(i, j), 0.0);
                }
            }
        }
    }

    #[test]
    fn test_links_land_on_period_multiples() {
        let feats = periodic_features(40, 8);
        let rec = recurrence_matrix(&feats, RecurrenceMode::Affinity, 3, None, true, false);
        for i in 0..40 {
            for j in 0..40 {
                if rec.get(i, j) > 0.0 {
                    assert_eq!(i.abs_diff(j) % 8, 0, "link {} -> {}", i, j);
                }
            }
        }
        assert!(rec.get(0, 8) > 0.99);
    }

    #[test]
    fn test_silent_features_have_no_links() {
        let feats = vec![vec![0.0f32; 12]; 30];
        let rec = recurrence_matrix(&feats, RecurrenceMode::Affinity, 3, None, true, false);
        assert!(rec.row(5).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let feats = periodic_features(64, 5);
        let a = recurrence_matrix(&feats, RecurrenceMode::Affinity, 2, Some(6), false, false);
        let b = recurrence_matrix(&feats, RecurrenceMode::Affinity, 2, Some(6), false, true);
        assert_eq!(a, b);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
