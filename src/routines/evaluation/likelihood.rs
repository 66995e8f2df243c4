use eyre::Result;
use ndarray::Array1;
use rayon::prelude::*;

use crate::routines::codec::decode;
use crate::routines::evaluation::rectangle::components;
use crate::structs::index::IndexTable;
use crate::structs::layout::Layout;
use crate::structs::responsibilities::Responsibilities;
use crate::structs::theta::Theta;
use crate::structs::weights::Weights;

/// Composite log-likelihood of the completed data at the parameter vector `vector`.
///
/// `Σ_g Σ_i U[i,g] · f_i · ln P_g(cell_i)`, with every cell probability floored
/// at machine epsilon. This is the objective of the M-step; the mixing weights
/// do not enter it.
pub fn composite_likelihood(
    vector: &Array1<f64>,
    responsibilities: &Responsibilities,
    index: &IndexTable,
    layout: &Layout,
) -> Result<f64> {
    responsibilities.check_shape(index.len(), layout.n_groups())?;
    let theta = decode(vector, layout)?;
    Ok(weighted_log_probability(&theta, responsibilities, index))
}

/// [composite_likelihood] for an already decoded [Theta]
pub fn weighted_log_probability(
    theta: &Theta,
    responsibilities: &Responsibilities,
    index: &IndexTable,
) -> f64 {
    let components = components(theta);
    let u = responsibilities.matrix();
    let contributions: Vec<f64> = index
        .records()
        .par_iter()
        .enumerate()
        .map(|(i, record)| {
            if record.frequency == 0.0 {
                return 0.0;
            }
            components
                .iter()
                .enumerate()
                .map(|(g, component)| {
                    let p = component
                        .cell_probability(record, theta.thresholds())
                        .max(f64::EPSILON);
                    u[[i, g]] * record.frequency * p.ln()
                })
                .sum::<f64>()
        })
        .collect();
    contributions.iter().sum()
}

/// Observed-data pairwise log-likelihood.
///
/// `Σ_i f_i · ln Σ_g pg[g] · P_g(cell_i)`, floored at machine epsilon before the
/// logarithm. It scores a model without responsibilities and does not depend
/// on the EM recursion.
pub fn observed_likelihood(theta: &Theta, weights: &Weights, index: &IndexTable) -> f64 {
    let components = components(theta);
    let contributions: Vec<f64> = index
        .records()
        .par_iter()
        .map(|record| {
            if record.frequency == 0.0 {
                return 0.0;
            }
            let mixture: f64 = components
                .iter()
                .zip(weights.iter())
                .map(|(component, pg)| pg * component.cell_probability(record, theta.thresholds()))
                .sum();
            record.frequency * mixture.max(f64::EPSILON).ln()
        })
        .collect();
    contributions.iter().sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routines::codec::encode;
    use crate::routines::evaluation::estep::expectation;
    use crate::structs::index::IndexRecord;
    use ndarray::{array, Array2};

    const INF: f64 = f64::INFINITY;

    fn setup() -> (Theta, Weights, IndexTable, Layout) {
        let layout = Layout::new(2, 2, &[3, 2]).unwrap();
        let theta = Theta::new(
            vec![array![0.0, 0.0], array![1.0, 1.0]],
            vec![array![[1.0, 0.3], [0.0, 1.0]], array![[0.8, 0.0], [0.0, 1.2]]],
            vec![array![-INF, -0.5, 0.5, INF], array![-INF, 0.3, INF]],
        )
        .unwrap();
        let mut records = Vec::new();
        for ci in 0..3 {
            for cj in 0..2 {
                records.push(IndexRecord {
                    first: 0,
                    second: 1,
                    first_category: ci,
                    second_category: cj,
                    pair: 0,
                    frequency: (1 + ci + 2 * cj) as f64,
                });
            }
        }
        (
            theta,
            Weights::from_vec(vec![0.4, 0.6]),
            IndexTable::from_records(records),
            layout,
        )
    }

    #[test]
    fn test_composite_matches_decoded_evaluation() {
        let (theta, weights, index, layout) = setup();
        let u = expectation(&theta, &weights, &index);
        let v = encode(&theta, &layout).unwrap();
        let from_vector = composite_likelihood(&v, &u, &index, &layout).unwrap();
        let direct = weighted_log_probability(&theta, &u, &index);
        assert!((from_vector - direct).abs() < 1e-9);
        assert!(direct < 0.0);
    }

    #[test]
    fn test_single_group_composite_equals_observed() {
        let layout = Layout::new(1, 2, &[3, 2]).unwrap();
        let (theta, _, index, _) = setup();
        let single = Theta::new(
            vec![theta.mu()[0].clone()],
            vec![theta.factors()[0].clone()],
            theta.thresholds().to_vec(),
        )
        .unwrap();
        let u = Responsibilities::from(Array2::ones((index.len(), 1)));
        let v = encode(&single, &layout).unwrap();
        let composite = composite_likelihood(&v, &u, &index, &layout).unwrap();
        let observed = observed_likelihood(&single, &Weights::from_vec(vec![1.0]), &index);
        assert!((composite - observed).abs() < 1e-9);
    }

    #[test]
    fn test_observed_not_above_zero() {
        let (theta, weights, index, _) = setup();
        let observed = observed_likelihood(&theta, &weights, &index);
        assert!(observed.is_finite());
        assert!(observed < 0.0);
    }

    #[test]
    fn test_zero_frequency_cells_contribute_nothing() {
        let (theta, weights, index, _) = setup();
        let mut records = index.records().to_vec();
        let baseline = observed_likelihood(&theta, &weights, &index);
        records.push(IndexRecord {
            first: 0,
            second: 1,
            first_category: 2,
            second_category: 1,
            pair: 0,
            frequency: 0.0,
        });
        let padded = IndexTable::from_records(records);
        assert_eq!(observed_likelihood(&theta, &weights, &padded), baseline);

        let u = expectation(&theta, &weights, &padded);
        let value = weighted_log_probability(&theta, &u, &padded);
        assert!(value.is_finite());
    }

    #[test]
    fn test_shape_mismatch_is_reported() {
        let (theta, _, index, layout) = setup();
        let v = encode(&theta, &layout).unwrap();
        let u = Responsibilities::from(Array2::ones((index.len(), 3)));
        assert!(composite_likelihood(&v, &u, &index, &layout).is_err());
    }
}
