use ndarray::{Array1, Array2, Axis};
use serde::Serialize;

use crate::errors::ShapeError;
use crate::structs::index::IndexTable;
use crate::structs::weights::Weights;

/// Posterior group memberships, `U` in the EM literature.
///
/// Row `i` belongs to record `i` of the [IndexTable] and column `g` to group `g`.
/// Each row sums to one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Responsibilities {
    matrix: Array2<f64>,
}

impl Responsibilities {
    pub fn new() -> Self {
        Responsibilities {
            matrix: Array2::zeros((0, 0)),
        }
    }

    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    pub fn nrecords(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn ngroups(&self) -> usize {
        self.matrix.ncols()
    }

    pub fn check_shape(&self, records: usize, groups: usize) -> Result<(), ShapeError> {
        if self.matrix.dim() != (records, groups) {
            return Err(ShapeError::Responsibilities {
                rows: self.nrecords(),
                cols: self.ngroups(),
                expected_rows: records,
                expected_cols: groups,
            });
        }
        Ok(())
    }

    /// Frequency-weighted column means: the closed-form update of the mixing weights
    pub fn mixing_weights(&self, index: &IndexTable) -> Weights {
        let frequencies = index.frequencies();
        let total = frequencies.sum();
        let sums: Array1<f64> = frequencies.dot(&self.matrix);
        Weights::new(sums / total)
    }

    /// `-Σ_i f_i Σ_g U[i,g] ln U[i,g]`
    pub fn entropy(&self, index: &IndexTable) -> f64 {
        let plogp = self.matrix.mapv(|u| if u > 0.0 { u * u.ln() } else { 0.0 });
        -index.frequencies().dot(&plogp.sum_axis(Axis(1)))
    }

    /// `Σ_i f_i Σ_g U[i,g] ln pg[g]`
    pub fn mixing_term(&self, weights: &Weights, index: &IndexTable) -> f64 {
        let log_weights = weights.weights().mapv(f64::ln);
        index.frequencies().dot(&self.matrix.dot(&log_weights))
    }
}

impl Default for Responsibilities {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Array2<f64>> for Responsibilities {
    fn from(matrix: Array2<f64>) -> Self {
        Responsibilities { matrix }
    }
}
