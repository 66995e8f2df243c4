use eyre::Result;
use ndarray::{Array1, Array2};
use serde::Serialize;
use std::path::Path;

use crate::algorithms::Status;
use crate::structs::responsibilities::Responsibilities;
use crate::structs::theta::Theta;
use crate::structs::weights::Weights;

/// An [EmCycle] object contains the summary of a cycle
/// It holds the following information:
/// - `cycle`: The cycle number
/// - `improvement`: The gain of the M-step over its starting value
/// - `likelihood`: The pairwise log-likelihood after the cycle
/// - `statistic`: The convergence statistic compared against the tolerance
/// - `status`: The status of the algorithm after the cycle
#[derive(Debug, Clone, Serialize)]
pub struct EmCycle {
    cycle: usize,
    improvement: f64,
    likelihood: f64,
    statistic: f64,
    status: Status,
}

impl EmCycle {
    pub fn new(
        cycle: usize,
        improvement: f64,
        likelihood: f64,
        statistic: f64,
        status: Status,
    ) -> Self {
        Self {
            cycle,
            improvement,
            likelihood,
            statistic,
            status,
        }
    }

    pub fn cycle(&self) -> usize {
        self.cycle
    }
    pub fn improvement(&self) -> f64 {
        self.improvement
    }
    pub fn likelihood(&self) -> f64 {
        self.likelihood
    }
    pub fn statistic(&self) -> f64 {
        self.statistic
    }
    pub fn status(&self) -> &Status {
        &self.status
    }
}

/// This holds a vector of [EmCycle] objects to provide a more detailed log
#[derive(Debug, Clone, Serialize)]
pub struct CycleLog {
    cycles: Vec<EmCycle>,
}

impl CycleLog {
    pub fn new() -> Self {
        Self { cycles: Vec::new() }
    }

    pub fn cycles(&self) -> &[EmCycle] {
        &self.cycles
    }

    pub fn push(&mut self, cycle: EmCycle) {
        self.cycles.push(cycle);
    }

    pub fn len(&self) -> usize {
        self.cycles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    pub fn last(&self) -> Option<&EmCycle> {
        self.cycles.last()
    }
}

impl Default for CycleLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Fitted model returned by the EM driver
#[derive(Debug, Clone, Serialize)]
pub struct EmResult {
    /// Pairwise log-likelihood of the last cycle
    pub likelihood: f64,
    pub responsibilities: Responsibilities,
    pub weights: Weights,
    pub theta: Theta,
    pub cycles: CycleLog,
    pub status: Status,
}

impl EmResult {
    pub fn mu(&self) -> &[Array1<f64>] {
        self.theta.mu()
    }

    pub fn sigma(&self) -> &[Array2<f64>] {
        self.theta.sigma()
    }

    pub fn thresholds(&self) -> &[Array1<f64>] {
        self.theta.thresholds()
    }

    pub fn converged(&self) -> bool {
        self.status == Status::Converged
    }

    /// Write the result as pretty-printed JSON to `path`.
    ///
    /// Infinite outer thresholds are written as `null`.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        tracing::debug!("Writing result to {:?}", path.as_ref());
        let file = std::fs::File::create(path.as_ref())?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}
