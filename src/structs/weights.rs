use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::ops::Index;

use crate::errors::ParameterError;

const SUM_TOLERANCE: f64 = 1e-8;

/// The mixing weights (prior group probabilities) of the model.
///
/// This is a thin wrapper around [ndarray::Array1<f64>] to provide additional functionality and context
#[derive(Debug, Clone, PartialEq)]
pub struct Weights {
    weights: Array1<f64>,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            weights: Array1::zeros(0),
        }
    }
}

impl Weights {
    pub fn new(weights: Array1<f64>) -> Self {
        Self { weights }
    }

    /// Create a new [Weights] instance from a vector of weights.
    pub fn from_vec(weights: Vec<f64>) -> Self {
        Self {
            weights: Array1::from(weights),
        }
    }

    /// Equal weights for `n` groups
    pub fn uniform(n: usize) -> Self {
        Self {
            weights: Array1::from_elem(n, 1.0 / n as f64),
        }
    }

    /// Check that the weights are non-negative and sum to one
    pub fn validate(&self) -> Result<(), ParameterError> {
        let sum = self.weights.sum();
        if self.weights.iter().any(|w| !(*w >= 0.0)) || (sum - 1.0).abs() > SUM_TOLERANCE {
            return Err(ParameterError::Weights { sum });
        }
        Ok(())
    }

    /// Get a reference to the weights.
    pub fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    /// Get the number of weights.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Get a vector representation of the weights.
    pub fn to_vec(&self) -> Vec<f64> {
        self.weights.to_vec()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.weights.iter().cloned()
    }
}

impl Serialize for Weights {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_vec().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Weights {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let weights_vec = Vec::<f64>::deserialize(deserializer)?;
        Ok(Self::from_vec(weights_vec))
    }
}

impl From<Vec<f64>> for Weights {
    fn from(weights: Vec<f64>) -> Self {
        Self::from_vec(weights)
    }
}

impl From<Array1<f64>> for Weights {
    fn from(weights: Array1<f64>) -> Self {
        Self { weights }
    }
}

impl Index<usize> for Weights {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.weights[index]
    }
}
