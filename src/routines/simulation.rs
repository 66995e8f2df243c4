use eyre::{eyre, Result};
use linfa_linalg::cholesky::Cholesky;
use ndarray::{Array1, Array2};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand_distr::StandardNormal;

use crate::errors::{ParameterError, ShapeError};
use crate::structs::index::IndexTable;
use crate::structs::weights::Weights;

/// A sample drawn by [simulate]
#[derive(Debug, Clone)]
pub struct SimulatedData {
    /// `n x P` matrix of 0-based categories
    pub observations: Array2<usize>,
    /// Generating group of each row, 0-based
    pub labels: Vec<usize>,
    /// Cut points used to discretise each variable, with infinite outer bounds
    pub thresholds: Vec<Array1<f64>>,
    pub categories: Vec<usize>,
}

impl SimulatedData {
    /// Bivariate contingency tables of the observations
    pub fn index_table(&self) -> Result<IndexTable, ShapeError> {
        IndexTable::from_observations(self.observations.view(), &self.categories)
    }

    /// Number of rows drawn from each group
    pub fn group_sizes(&self, n_groups: usize) -> Vec<usize> {
        let mut sizes = vec![0; n_groups];
        for &label in &self.labels {
            if label < n_groups {
                sizes[label] += 1;
            }
        }
        sizes
    }
}

/// Draw `n` observations from a mixture of multivariate normals and discretise them.
///
/// Each row picks its group with probabilities `weights`, then a latent vector
/// from `N(mu[g], sigma[g])`. Variable `p` is cut into `categories[p]` bins of
/// equal width between its smallest and largest drawn value.
pub fn simulate<R: Rng + ?Sized>(
    n: usize,
    mu: &[Array1<f64>],
    sigma: &[Array2<f64>],
    weights: &Weights,
    categories: &[usize],
    rng: &mut R,
) -> Result<SimulatedData> {
    if n == 0 {
        return Err(eyre!("Cannot simulate an empty sample"));
    }
    if mu.is_empty() {
        return Err(ShapeError::NoGroups.into());
    }
    for (what, found) in [("covariances", sigma.len()), ("weights", weights.len())] {
        if found != mu.len() {
            return Err(ShapeError::GroupCount {
                what,
                expected: mu.len(),
                found,
            }
            .into());
        }
    }
    weights.validate()?;
    let n_variables = mu[0].len();
    if categories.len() != n_variables {
        return Err(ShapeError::CategoryCount {
            expected: n_variables,
            found: categories.len(),
        }
        .into());
    }
    if let Some((variable, &c)) = categories.iter().enumerate().find(|(_, c)| **c < 2) {
        return Err(ShapeError::TooFewCategories {
            variable,
            categories: c,
        }
        .into());
    }

    let mut factors = Vec::with_capacity(sigma.len());
    for (group, (m, s)) in mu.iter().zip(sigma).enumerate() {
        if m.len() != n_variables || s.dim() != (n_variables, n_variables) {
            return Err(ShapeError::Dimension {
                what: "covariance",
                group,
                expected: n_variables,
                found: s.nrows(),
            }
            .into());
        }
        let lower = s
            .cholesky()
            .map_err(|_| ParameterError::NotPositiveDefinite { group })?;
        factors.push(lower);
    }

    let groups = WeightedIndex::new(weights.iter())?;
    let mut latent = Array2::<f64>::zeros((n, n_variables));
    let mut labels = Vec::with_capacity(n);
    for mut row in latent.rows_mut() {
        let g = groups.sample(rng);
        let z: Array1<f64> = (0..n_variables).map(|_| rng.sample(StandardNormal)).collect();
        row.assign(&(&mu[g] + &factors[g].dot(&z)));
        labels.push(g);
    }

    let mut observations = Array2::<usize>::zeros((n, n_variables));
    let mut thresholds = Vec::with_capacity(n_variables);
    for (p, &c) in categories.iter().enumerate() {
        let column = latent.column(p);
        let min = column.fold(f64::INFINITY, |a, &b| a.min(b));
        let max = column.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        if max <= min {
            return Err(eyre!(
                "Variable {} has no spread in the sample, its cut points would coincide",
                p
            ));
        }
        let cuts = Array1::linspace(min, max, c + 1);
        let interior = cuts.slice(ndarray::s![1..c]);

        for (o, &x) in observations.column_mut(p).iter_mut().zip(column) {
            *o = interior.iter().filter(|&&t| t <= x).count();
        }

        let mut t = cuts.to_vec();
        t[0] = f64::NEG_INFINITY;
        t[c] = f64::INFINITY;
        thresholds.push(Array1::from(t));
    }

    tracing::debug!("Simulated {} observations of {} variables", n, n_variables);
    Ok(SimulatedData {
        observations,
        labels,
        thresholds,
        categories: categories.to_vec(),
    })
}
