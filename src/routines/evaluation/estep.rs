use ndarray::parallel::prelude::*;
use ndarray::{Array2, Axis};

use crate::routines::evaluation::rectangle::components;
use crate::structs::index::IndexTable;
use crate::structs::responsibilities::Responsibilities;
use crate::structs::theta::Theta;
use crate::structs::weights::Weights;

/// E-step: posterior probability that each cell of `index` arose from each group.
///
/// Every unnormalised entry `pg[g] · P_g(cell)` is floored at machine epsilon,
/// so no row can sum to zero, and the rows are then normalised to one.
pub fn expectation(theta: &Theta, weights: &Weights, index: &IndexTable) -> Responsibilities {
    let components = components(theta);
    let records = index.records();
    let mut u = Array2::zeros((records.len(), components.len()));

    u.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(i, mut row)| {
            for (g, component) in components.iter().enumerate() {
                let p = component.cell_probability(&records[i], theta.thresholds());
                row[g] = (weights[g] * p).max(f64::EPSILON);
            }
            let total = row.sum();
            row /= total;
        });

    Responsibilities::from(u)
}
