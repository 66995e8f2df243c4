use argmin::core::{CostFunction, Error, Executor, Gradient};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use eyre::Result;
use finitediff::FiniteDiff;
use ndarray::Array1;

use crate::routines::codec::{decode, encode};
use crate::routines::evaluation::likelihood::composite_likelihood;
use crate::routines::settings::OptimizerConfig;
use crate::structs::index::IndexTable;
use crate::structs::layout::Layout;
use crate::structs::responsibilities::Responsibilities;
use crate::structs::theta::Theta;
use crate::structs::weights::Weights;

// Cost reported for vectors at which the objective cannot be evaluated
const PENALTY: f64 = 1e100;

/// Outcome of one M-step
#[derive(Debug, Clone)]
pub struct MStep {
    pub theta: Theta,
    pub weights: Weights,
    /// Composite likelihood at `theta`
    pub likelihood: f64,
    /// `likelihood` minus the composite likelihood at the incoming parameters, never negative
    pub improvement: f64,
    /// Number of times the optimizer was re-seeded
    pub retries: usize,
}

/// Negated composite likelihood, as a cost for argmin
struct CompositeObjective<'a> {
    responsibilities: &'a Responsibilities,
    index: &'a IndexTable,
    layout: &'a Layout,
}

impl<'a> CompositeObjective<'a> {
    fn new(responsibilities: &'a Responsibilities, index: &'a IndexTable, layout: &'a Layout) -> Self {
        Self {
            responsibilities,
            index,
            layout,
        }
    }

    fn negated(&self, vector: &Array1<f64>) -> f64 {
        match composite_likelihood(vector, self.responsibilities, self.index, self.layout) {
            Ok(value) if value.is_finite() => -value,
            _ => PENALTY,
        }
    }
}

impl CostFunction for CompositeObjective<'_> {
    type Param = Array1<f64>;
    type Output = f64;

    fn cost(&self, vector: &Self::Param) -> Result<Self::Output, Error> {
        Ok(self.negated(vector))
    }
}

impl Gradient for CompositeObjective<'_> {
    type Param = Array1<f64>;
    type Gradient = Array1<f64>;

    fn gradient(&self, vector: &Self::Param) -> Result<Self::Gradient, Error> {
        let gradient = vector.central_diff(&|x: &Array1<f64>| self.negated(x));
        if let Some(i) = gradient.iter().position(|g| !g.is_finite()) {
            return Err(Error::msg(format!(
                "Non-finite gradient entry at position {}",
                i
            )));
        }
        Ok(gradient)
    }
}

/// Run L-BFGS from `start` and return the best vector with its cost
fn run_lbfgs(
    objective: CompositeObjective<'_>,
    start: Array1<f64>,
    max_iters: u64,
    config: &OptimizerConfig,
) -> Result<(Array1<f64>, f64), Error> {
    let linesearch = MoreThuenteLineSearch::new();
    let solver = LBFGS::new(linesearch, config.lbfgs_memory)
        .with_tolerance_grad(config.gradient_tolerance)?
        .with_tolerance_cost(config.cost_tolerance)?;

    let res = Executor::new(objective, solver)
        .configure(|state| state.param(start).max_iters(max_iters))
        .run()?;

    let state = res.state();
    tracing::trace!(
        "L-BFGS stopped after {} iterations: {:?}",
        state.iter,
        state.termination_status
    );
    let best = state
        .best_param
        .clone()
        .ok_or_else(|| Error::msg("L-BFGS returned no parameters"))?;
    Ok((best, state.best_cost))
}

/// M-step: update the mixing weights in closed form and maximise the composite
/// likelihood over the remaining parameters.
///
/// The optimizer starts from the incoming parameters, with an iteration cap of
/// [OptimizerConfig::max_iters]. While it ends below the starting value it is
/// re-seeded from where it stopped, at most `max_retries` times. The best vector
/// seen, the start included, is kept, so the improvement is never negative.
pub fn maximization(
    theta: &Theta,
    responsibilities: &Responsibilities,
    index: &IndexTable,
    config: &OptimizerConfig,
) -> Result<MStep> {
    let categories: Vec<usize> = theta.thresholds().iter().map(|t| t.len() - 1).collect();
    let layout = Layout::new(theta.n_groups(), theta.n_variables(), &categories)?;
    responsibilities.check_shape(index.len(), layout.n_groups())?;

    let weights = responsibilities.mixing_weights(index);

    let start = encode(theta, &layout)?;
    let old_value = composite_likelihood(&start, responsibilities, index, &layout)?;
    let max_iters = config.max_iters(layout.n_parameters());

    let mut best = (start.clone(), old_value);
    let mut seed = start;
    let mut retries = 0;
    loop {
        let objective = CompositeObjective::new(responsibilities, index, &layout);
        match run_lbfgs(objective, seed, max_iters, config) {
            Ok((vector, cost)) => {
                let value = -cost;
                if value > best.1 {
                    best = (vector.clone(), value);
                }
                if value >= old_value {
                    break;
                }
                seed = vector;
            }
            Err(err) => {
                tracing::debug!("L-BFGS failed, keeping the best parameters so far: {}", err);
                break;
            }
        }
        if retries == config.max_retries {
            tracing::warn!(
                "M-step did not improve on {:.6} after {} restarts",
                old_value,
                retries
            );
            break;
        }
        retries += 1;
    }

    let (vector, likelihood) = best;
    Ok(MStep {
        theta: decode(&vector, &layout)?,
        weights,
        likelihood,
        improvement: likelihood - old_value,
        retries,
    })
}
