use eyre::Result;
use linfa_linalg::cholesky::Cholesky;
use ndarray::{Array1, Array2};
use serde::Serialize;

use crate::errors::{ParameterError, ShapeError};
use crate::structs::layout::Layout;

const ANCHOR_TOLERANCE: f64 = 1e-8;

/// Parameters of the latent mixture.
///
/// Group `g` is a multivariate normal with mean `mu[g]` and covariance
/// `sigma[g] = factors[g]ᵗ · factors[g]`, where each factor is upper
/// triangular. The first group is the identifiability anchor: its mean is the
/// zero vector and its factor has a unit diagonal.
///
/// Variable `p` is observed through the thresholds `thresholds[p]`, which
/// start at `-inf`, end at `+inf`, and are strictly increasing in between.
/// Category `c` of that variable is the interval
/// `[thresholds[p][c], thresholds[p][c + 1]]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Theta {
    mu: Vec<Array1<f64>>,
    factors: Vec<Array2<f64>>,
    sigma: Vec<Array2<f64>>,
    thresholds: Vec<Array1<f64>>,
}

impl Theta {
    /// Build a [Theta] from means, upper triangular covariance factors and
    /// thresholds, checking every structural invariant.
    pub fn new(
        mu: Vec<Array1<f64>>,
        factors: Vec<Array2<f64>>,
        thresholds: Vec<Array1<f64>>,
    ) -> Result<Self> {
        if mu.is_empty() {
            return Err(ShapeError::NoGroups.into());
        }
        if factors.len() != mu.len() {
            return Err(ShapeError::GroupCount {
                what: "covariance factors",
                expected: mu.len(),
                found: factors.len(),
            }
            .into());
        }
        let n_variables = mu[0].len();
        if thresholds.len() != n_variables {
            return Err(ShapeError::CategoryCount {
                expected: n_variables,
                found: thresholds.len(),
            }
            .into());
        }
        for (group, (m, a)) in mu.iter().zip(&factors).enumerate() {
            if m.len() != n_variables {
                return Err(ShapeError::Dimension {
                    what: "mean",
                    group,
                    expected: n_variables,
                    found: m.len(),
                }
                .into());
            }
            if a.nrows() != n_variables || a.ncols() != n_variables {
                return Err(ShapeError::Dimension {
                    what: "covariance factor",
                    group,
                    expected: n_variables,
                    found: a.nrows().max(a.ncols()),
                }
                .into());
            }
            check_factor(group, a)?;
        }
        if mu[0].iter().any(|x| x.abs() > ANCHOR_TOLERANCE) {
            return Err(ParameterError::AnchorMean.into());
        }
        for (variable, t) in thresholds.iter().enumerate() {
            check_thresholds(variable, t)?;
        }

        let sigma = factors.iter().map(|a| a.t().dot(a)).collect();
        Ok(Theta {
            mu,
            factors,
            sigma,
            thresholds,
        })
    }

    /// Build a [Theta] from covariance matrices.
    ///
    /// Each factor is the transposed lower Cholesky factor of the covariance.
    /// The Cholesky factor of the first covariance must have a unit diagonal,
    /// as it does for the identity.
    pub fn from_covariances(
        mu: Vec<Array1<f64>>,
        sigma: &[Array2<f64>],
        thresholds: Vec<Array1<f64>>,
    ) -> Result<Self> {
        let mut factors = Vec::with_capacity(sigma.len());
        for (group, s) in sigma.iter().enumerate() {
            let lower = s
                .cholesky()
                .map_err(|_| ParameterError::NotPositiveDefinite { group })?;
            let mut a = lower.t().to_owned();
            for ((i, j), value) in a.indexed_iter_mut() {
                if i > j {
                    *value = 0.0;
                }
            }
            if group == 0 {
                if a.diag().iter().any(|d| (d - 1.0).abs() > ANCHOR_TOLERANCE) {
                    return Err(ParameterError::AnchorFactor.into());
                }
                a.diag_mut().fill(1.0);
            }
            factors.push(a);
        }
        Theta::new(mu, factors, thresholds)
    }

    /// Check that this [Theta] has the shape described by `layout`
    pub fn check_layout(&self, layout: &Layout) -> Result<(), ShapeError> {
        if self.n_groups() != layout.n_groups() {
            return Err(ShapeError::GroupCount {
                what: "theta",
                expected: layout.n_groups(),
                found: self.n_groups(),
            });
        }
        if self.n_variables() != layout.n_variables() {
            return Err(ShapeError::Dimension {
                what: "mean",
                group: 0,
                expected: layout.n_variables(),
                found: self.n_variables(),
            });
        }
        for (variable, (t, &c)) in self.thresholds.iter().zip(layout.categories()).enumerate() {
            if t.len() != c + 1 {
                return Err(ShapeError::ThresholdLength {
                    variable,
                    expected: c + 1,
                    found: t.len(),
                });
            }
        }
        Ok(())
    }

    pub fn mu(&self) -> &[Array1<f64>] {
        &self.mu
    }

    /// Upper triangular factors `A` with `sigma = AᵗA`
    pub fn factors(&self) -> &[Array2<f64>] {
        &self.factors
    }

    pub fn sigma(&self) -> &[Array2<f64>] {
        &self.sigma
    }

    pub fn thresholds(&self) -> &[Array1<f64>] {
        &self.thresholds
    }

    pub fn n_groups(&self) -> usize {
        self.mu.len()
    }

    pub fn n_variables(&self) -> usize {
        self.mu[0].len()
    }
}

fn check_factor(group: usize, a: &Array2<f64>) -> Result<(), ParameterError> {
    for ((i, j), &value) in a.indexed_iter() {
        if i > j && value != 0.0 {
            return Err(ParameterError::NotUpperTriangular { group });
        }
    }
    if group == 0 {
        if a.diag().iter().any(|&d| d != 1.0) {
            return Err(ParameterError::AnchorFactor);
        }
    } else if a.diag().iter().any(|&d| !(d > 0.0 && d.is_finite())) {
        return Err(ParameterError::NonPositiveDiagonal { group });
    }
    Ok(())
}

fn check_thresholds(variable: usize, t: &Array1<f64>) -> Result<(), ParameterError> {
    let n = t.len();
    if n < 3 || t[0] != f64::NEG_INFINITY || t[n - 1] != f64::INFINITY {
        return Err(ParameterError::OpenBounds { variable });
    }
    let interior = t.slice(ndarray::s![1..n - 1]);
    let increasing = interior.iter().all(|x| x.is_finite())
        && interior.windows(2).into_iter().all(|w| w[0] < w[1]);
    if !increasing {
        return Err(ParameterError::NotIncreasing { variable });
    }
    Ok(())
}
