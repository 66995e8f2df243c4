use crate::algorithms::em::EM;
use crate::errors::ShapeError;
use crate::routines::logger;
use crate::routines::output::EmResult;
use crate::routines::settings::Settings;
use crate::structs::index::IndexTable;
use crate::structs::layout::Layout;
use crate::structs::theta::Theta;
use crate::structs::weights::Weights;

use eyre::Result;
use std::time::Instant;

/// Fit the mixture by pairwise composite-likelihood EM.
///
/// `theta` and `weights` are the starting values. Before the first cycle the
/// dimensions of every input are checked against `n_groups`, `n_variables`
/// and `categories`, and the weights must sum to one; a [ShapeError] or
/// [crate::errors::ParameterError] is returned otherwise.
///
/// Reaching `max_cycles` is not an error: the result then carries
/// [crate::algorithms::Status::IterationLimitReached].
pub fn run_em(
    theta: Theta,
    weights: Weights,
    index: &IndexTable,
    n_groups: usize,
    n_variables: usize,
    categories: &[usize],
    settings: &Settings,
) -> Result<EmResult> {
    let layout = Layout::new(n_groups, n_variables, categories)?;
    theta.check_layout(&layout)?;
    if weights.len() != n_groups {
        return Err(ShapeError::GroupCount {
            what: "weights",
            expected: n_groups,
            found: weights.len(),
        }
        .into());
    }
    weights.validate()?;
    index.check_layout(&layout)?;

    tracing::info!(
        "Fitting {} groups to {} variables ({} free parameters, {} table cells over {} pairs)",
        n_groups,
        n_variables,
        layout.n_parameters(),
        index.len(),
        index.n_pairs()
    );

    let now = Instant::now();
    let mut em = EM::new(theta, weights, index, settings.clone());
    let result = em.fit()?;
    tracing::info!(
        "EM finished in {:.2?} after {} cycles: {}",
        now.elapsed(),
        result.cycles.len(),
        result.status
    );
    Ok(result)
}

/// [run_em] with [Settings::default]
pub fn run_em_default(
    theta: Theta,
    weights: Weights,
    index: &IndexTable,
    n_groups: usize,
    n_variables: usize,
    categories: &[usize],
) -> Result<EmResult> {
    run_em(
        theta,
        weights,
        index,
        n_groups,
        n_variables,
        categories,
        &Settings::default(),
    )
}

/// Primary entrypoint for ordmix
///
/// Sets up logging from `settings` and runs [run_em].
pub fn fit(
    theta: Theta,
    weights: Weights,
    index: &IndexTable,
    categories: &[usize],
    settings: &Settings,
) -> Result<EmResult> {
    logger::setup_log(settings)?;
    tracing::info!("Starting ordmix");
    let (n_groups, n_variables) = (theta.n_groups(), theta.n_variables());
    run_em(
        theta,
        weights,
        index,
        n_groups,
        n_variables,
        categories,
        settings,
    )
}
