//! Recurrence → lag representation
//!
//! Row `lag` of the lag matrix holds the element-wise sum of the two
//! diagonals at that offset: `L[lag][i] = R[i][i + lag] + R[i + lag][i]`.
//! A passage that repeats after `lag` frames shows up as a run of high
//! values in that row, and the row sum (lag energy) peaks at loop lengths.

use super::recurrence::RecurrenceMatrix;

/// Lag-indexed diagonals of a recurrence matrix
#[derive(Debug, Clone, PartialEq)]
pub struct LagMatrix {
    rows: Vec<Vec<f32>>,
}

impl LagMatrix {
    /// Build from a recurrence matrix
    pub fn from_recurrence(rec: &RecurrenceMatrix) -> Self {
        let n = rec.len();
        let rows = (0..n)
            .map(|lag| {
                (0..n - lag)
                    .map(|i| {
                        if lag == 0 {
                            rec.get(i, i)
                        } else {
                            rec.get(i, i + lag) + rec.get(i + lag, i)
                        }
                    })
                    .collect()
            })
            .collect();
        Self { rows }
    }

    /// Number of lags (equals the frame count)
    pub fn n_lags(&self) -> usize {
        self.rows.len()
    }

    /// Diagonal pair at `lag`, indexed by the earlier frame
    pub fn diagonal(&self, lag: usize) -> &[f32] {
        &self.rows[lag]
    }

    /// Total recurrence at every lag
    pub fn lag_energy(&self) -> Vec<f32> {
        self.rows.iter().map(|row| row.iter().sum()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::structure::recurrence::{recurrence_matrix, RecurrenceMode};

    #[test]
    fn test_lag_energy_peaks_at_period() {
        let feats: Vec<Vec<f32>> = (0..60)
            .map(|i| {
                let mut v = vec![0.0f32; 10];
                v[i % 10] = 1.0;
                v
            })
            .collect();
        let rec = recurrence_matrix(&feats, RecurrenceMode::Connectivity, 3, None, true, false);
        let lag = LagMatrix::from_recurrence(&rec);
        let energy = lag.lag_energy();

        assert_eq!(lag.n_lags(), 60);
        assert_eq!(energy[0], 0.0);
        // 50 pairs at lag 10, counted on both diagonals
        assert_eq!(energy[10], 100.0);
        assert_eq!(energy[5], 0.0);
        assert!(energy[10] > energy[20]);
    }

    #[test]
    fn test_diagonal_length() {
        let feats = vec![vec![1.0f32, 0.0]; 8];
        let rec = recurrence_matrix(&feats, RecurrenceMode::Affinity, 1, Some(7), true, false);
        let lag = LagMatrix::from_recurrence(&rec);
        assert_eq!(lag.diagonal(3).len(), 5);
    }
}
