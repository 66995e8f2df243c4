use serde::{Deserialize, Serialize};

use crate::errors::ShapeError;

/// Structural constants of a model: the number of mixture components, the
/// number of ordinal variables and the number of categories of each variable.
///
/// A [Layout] fixes the length and ordering of the unconstrained parameter
/// vector used by [crate::routines::codec].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    n_groups: usize,
    n_variables: usize,
    categories: Vec<usize>,
}

impl Layout {
    pub fn new(
        n_groups: usize,
        n_variables: usize,
        categories: &[usize],
    ) -> Result<Self, ShapeError> {
        if n_groups == 0 {
            return Err(ShapeError::NoGroups);
        }
        if n_variables < 2 {
            return Err(ShapeError::TooFewVariables(n_variables));
        }
        if categories.len() != n_variables {
            return Err(ShapeError::CategoryCount {
                expected: n_variables,
                found: categories.len(),
            });
        }
        if let Some((variable, &count)) = categories.iter().enumerate().find(|(_, &c)| c < 2) {
            return Err(ShapeError::TooFewCategories {
                variable,
                categories: count,
            });
        }
        Ok(Self {
            n_groups,
            n_variables,
            categories: categories.to_vec(),
        })
    }

    pub fn n_groups(&self) -> usize {
        self.n_groups
    }

    pub fn n_variables(&self) -> usize {
        self.n_variables
    }

    /// Number of categories of each variable
    pub fn categories(&self) -> &[usize] {
        &self.categories
    }

    /// Free means: every group but the first
    pub fn n_means(&self) -> usize {
        self.n_variables * (self.n_groups - 1)
    }

    /// Strictly upper triangle of the first group's factor
    pub fn n_anchor_factor(&self) -> usize {
        self.n_variables * (self.n_variables - 1) / 2
    }

    /// Upper triangle, diagonal included, of one free factor
    pub fn n_free_factor(&self) -> usize {
        self.n_variables * (self.n_variables + 1) / 2
    }

    /// Interior thresholds over all variables
    pub fn n_thresholds(&self) -> usize {
        self.categories.iter().map(|c| c - 1).sum()
    }

    /// Length of the unconstrained parameter vector
    pub fn n_parameters(&self) -> usize {
        self.n_means()
            + self.n_anchor_factor()
            + (self.n_groups - 1) * self.n_free_factor()
            + self.n_thresholds()
    }
}
