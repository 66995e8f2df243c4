//! The EM driver.
//!
//! Each cycle runs an E-step, then an M-step, and scores the result with the
//! pairwise log-likelihood
//!
//! `lik = flik + entropy + Σ_i f_i Σ_g U[i,g] ln pg[g]`,
//!
//! where `flik` is the composite likelihood reached by the M-step. The
//! sequence of `lik` values is monitored with Aitken's extrapolation: from the
//! third cycle on, the limit of the sequence is estimated from its last three
//! terms, and the loop stops once two successive estimates agree to within the
//! tolerance.

use eyre::Result;

use crate::algorithms::Status;
use crate::routines::evaluation::estep::expectation;
use crate::routines::optimization::mstep::maximization;
use crate::routines::output::{CycleLog, EmCycle, EmResult};
use crate::routines::settings::Settings;
use crate::structs::index::IndexTable;
use crate::structs::responsibilities::Responsibilities;
use crate::structs::theta::Theta;
use crate::structs::weights::Weights;

// Below this distance from one the Aitken ratio gives no usable extrapolation
const RATIO_GUARD: f64 = 1e-12;

/// Aitken acceleration over a sliding window of the last three likelihoods
#[derive(Debug, Clone)]
struct Aitken {
    window: Vec<f64>,
    previous: f64,
    limit: f64,
}

impl Aitken {
    fn new() -> Self {
        Self {
            window: Vec::with_capacity(3),
            previous: f64::NEG_INFINITY,
            limit: f64::NAN,
        }
    }

    /// Add the likelihood of the latest cycle and return the convergence statistic.
    ///
    /// The first three cycles use the plain difference to the previous value.
    /// Afterwards the statistic is the change in the extrapolated limit. NaN is
    /// reported as `+inf`.
    fn update(&mut self, likelihood: f64) -> f64 {
        let statistic = if self.window.len() < 3 {
            self.window.push(likelihood);
            let difference = likelihood - self.previous;
            if self.window.len() == 3 {
                self.limit = extrapolate(&self.window);
            }
            difference
        } else {
            self.window.remove(0);
            self.window.push(likelihood);
            let limit = extrapolate(&self.window);
            let change = (limit - self.limit).abs();
            self.limit = limit;
            change
        };
        self.previous = likelihood;
        if statistic.is_nan() {
            f64::INFINITY
        } else {
            statistic
        }
    }
}

/// The run stops once the statistic is no larger than the tolerance
fn has_converged(statistic: f64, tolerance: f64) -> bool {
    statistic <= tolerance
}

/// Aitken limit of three consecutive terms, or the newest term when the ratio is unusable
fn extrapolate(window: &[f64]) -> f64 {
    let (l1, l2, l3) = (window[0], window[1], window[2]);
    let c = (l3 - l2) / (l2 - l1);
    if !c.is_finite() || (1.0 - c).abs() < RATIO_GUARD {
        return l3;
    }
    let limit = l2 + (l3 - l2) / (1.0 - c);
    if limit.is_finite() {
        limit
    } else {
        l3
    }
}

/// State of an EM run
pub struct EM<'a> {
    theta: Theta,
    weights: Weights,
    responsibilities: Responsibilities,
    index: &'a IndexTable,
    settings: Settings,
    cycle: usize,
    likelihood: f64,
    improvement: f64,
    statistic: f64,
    aitken: Aitken,
    status: Status,
    cycle_log: CycleLog,
}

impl<'a> EM<'a> {
    /// Set up a run from starting values.
    ///
    /// The inputs are expected to be consistent with each other; use
    /// [crate::entrypoints::run_em] to have them checked first.
    pub fn new(theta: Theta, weights: Weights, index: &'a IndexTable, settings: Settings) -> Self {
        Self {
            theta,
            weights,
            responsibilities: Responsibilities::new(),
            index,
            settings,
            cycle: 0,
            likelihood: f64::NEG_INFINITY,
            improvement: 0.0,
            statistic: f64::INFINITY,
            aitken: Aitken::new(),
            status: Status::Starting,
            cycle_log: CycleLog::new(),
        }
    }

    pub fn theta(&self) -> &Theta {
        &self.theta
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    pub fn likelihood(&self) -> f64 {
        self.likelihood
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn cycle(&self) -> usize {
        self.cycle
    }

    /// Whether the loop has reached a terminal state
    pub fn finished(&self) -> bool {
        matches!(
            self.status,
            Status::Converged | Status::IterationLimitReached
        )
    }

    pub fn initialize(&mut self) {
        self.status = Status::Running;
        tracing::info!(
            "{:>5} {:>14} {:>18} {:>14}",
            "Cycle",
            "Improvement",
            "Likelihood",
            "Statistic"
        );
    }

    /// Run one E-step and one M-step, and evaluate convergence.
    ///
    /// Returns `true` once the run is finished.
    pub fn next_cycle(&mut self) -> Result<bool> {
        self.cycle += 1;
        let span = tracing::info_span!("", "{}", format!("Cycle {}", self.cycle));
        let _enter = span.enter();

        self.responsibilities = expectation(&self.theta, &self.weights, self.index);
        let entropy = self.responsibilities.entropy(self.index);

        let step = maximization(
            &self.theta,
            &self.responsibilities,
            self.index,
            &self.settings.optimizer,
        )?;
        tracing::debug!(
            "M-step gained {:.6} after {} restarts",
            step.improvement,
            step.retries
        );

        self.theta = step.theta;
        self.weights = step.weights;
        self.improvement = step.improvement;
        self.likelihood = step.likelihood
            + entropy
            + self.responsibilities.mixing_term(&self.weights, self.index);

        self.convergence_evaluation();
        self.logs();
        Ok(self.finished())
    }

    fn convergence_evaluation(&mut self) {
        self.statistic = self.aitken.update(self.likelihood);
        if has_converged(self.statistic, self.settings.config.tolerance) {
            tracing::info!("The run converged after {} cycles", self.cycle);
            self.status = Status::Converged;
        } else if self.cycle >= self.settings.config.max_cycles {
            tracing::warn!("Maximum number of cycles reached");
            self.status = Status::IterationLimitReached;
        }
        self.cycle_log.push(EmCycle::new(
            self.cycle,
            self.improvement,
            self.likelihood,
            self.statistic,
            self.status,
        ));
    }

    fn logs(&self) {
        tracing::info!(
            "{:>5} {:>14.6} {:>18.6} {:>14.3e}",
            self.cycle,
            self.improvement,
            self.likelihood,
            self.statistic
        );
        tracing::debug!("Mixing weights: {:?}", self.weights.to_vec());
    }

    /// Run cycles until convergence or the cycle limit
    pub fn fit(&mut self) -> Result<EmResult> {
        self.initialize();
        while !self.next_cycle()? {}
        Ok(self.into_result())
    }

    #[allow(clippy::wrong_self_convention)]
    pub fn into_result(&self) -> EmResult {
        EmResult {
            likelihood: self.likelihood,
            responsibilities: self.responsibilities.clone(),
            weights: self.weights.clone(),
            theta: self.theta.clone(),
            cycles: self.cycle_log.clone(),
            status: self.status,
        }
    }
}
