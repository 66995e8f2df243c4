use ndarray::{Array1, Array2, Axis};

use crate::routines::evaluation::bvn::bivariate_cdf;
use crate::structs::index::IndexRecord;
use crate::structs::theta::Theta;

// Rounding slack tolerated on a correlation before it is treated as degenerate
const RHO_SLACK: f64 = 1e-10;

/// Probability that `X ~ N(mean, cov)` falls in the rectangle `[lower, upper]`.
///
/// Bounds may be infinite. A degenerate covariance or any evaluation that does
/// not produce a finite number gives a probability of `0`.
pub fn rectangle_probability(
    mean: [f64; 2],
    cov: [[f64; 2]; 2],
    lower: [f64; 2],
    upper: [f64; 2],
) -> f64 {
    let sd = [cov[0][0].sqrt(), cov[1][1].sqrt()];
    let rho = cov[0][1] / (sd[0] * sd[1]);
    let standardize = |b: [f64; 2]| [(b[0] - mean[0]) / sd[0], (b[1] - mean[1]) / sd[1]];
    standardized_rectangle(standardize(lower), standardize(upper), rho)
}

/// Rectangle probability of a standard bivariate normal with correlation `rho`
fn standardized_rectangle(lower: [f64; 2], upper: [f64; 2], rho: f64) -> f64 {
    if !(rho.abs() <= 1.0 + RHO_SLACK) {
        return 0.0;
    }
    let rho = rho.clamp(-1.0, 1.0);
    let p = bivariate_cdf(upper[0], upper[1], rho)
        - bivariate_cdf(lower[0], upper[1], rho)
        - bivariate_cdf(upper[0], lower[1], rho)
        + bivariate_cdf(lower[0], lower[1], rho);
    if p.is_finite() {
        p.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Location, scale and correlation of one mixture component.
///
/// Computed once per component and shared by every cell of the index table.
#[derive(Debug, Clone)]
pub struct Component {
    mean: Array1<f64>,
    sd: Array1<f64>,
    corr: Array2<f64>,
}

impl Component {
    pub fn new(mean: &Array1<f64>, sigma: &Array2<f64>) -> Self {
        let sd = sigma.diag().mapv(f64::sqrt);
        let inv = sd.mapv(|s| 1.0 / s);
        let outer = &inv.view().insert_axis(Axis(1)) * &inv.view().insert_axis(Axis(0));
        Component {
            mean: mean.clone(),
            sd,
            corr: sigma * &outer,
        }
    }

    pub fn corr(&self) -> &Array2<f64> {
        &self.corr
    }

    /// Probability of the cell described by `record` under this component
    pub fn cell_probability(&self, record: &IndexRecord, thresholds: &[Array1<f64>]) -> f64 {
        let (i, j) = (record.first, record.second);
        let (ci, cj) = (record.first_category, record.second_category);
        let z = |v: usize, t: f64| (t - self.mean[v]) / self.sd[v];
        let lower = [z(i, thresholds[i][ci]), z(j, thresholds[j][cj])];
        let upper = [z(i, thresholds[i][ci + 1]), z(j, thresholds[j][cj + 1])];
        standardized_rectangle(lower, upper, self.corr[[i, j]])
    }
}

/// One [Component] per group of `theta`
pub fn components(theta: &Theta) -> Vec<Component> {
    theta
        .mu()
        .iter()
        .zip(theta.sigma())
        .map(|(mu, sigma)| Component::new(mu, sigma))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routines::evaluation::bvn::normal_cdf;
    use ndarray::array;

    const INF: f64 = f64::INFINITY;

    #[test]
    fn test_whole_plane() {
        let p = rectangle_probability([0.3, -1.0], [[2.0, 0.5], [0.5, 1.0]], [-INF, -INF], [INF, INF]);
        assert!((p - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_independent_box() {
        let p = rectangle_probability([1.0, 0.0], [[4.0, 0.0], [0.0, 1.0]], [0.0, -1.0], [3.0, 0.5]);
        let px = normal_cdf(1.0) - normal_cdf(-0.5);
        let py = normal_cdf(0.5) - normal_cdf(-1.0);
        assert!((p - px * py).abs() < 1e-12);
    }

    #[test]
    fn test_quadrant() {
        let r: f64 = 0.6;
        let p = rectangle_probability([0.0, 0.0], [[1.0, r], [r, 1.0]], [0.0, 0.0], [INF, INF]);
        let expected = 0.25 + r.asin() / (2.0 * std::f64::consts::PI);
        assert!((p - expected).abs() < 1e-10);
    }

    #[test]
    fn test_degenerate_covariance_is_zero() {
        let singular = rectangle_probability([0.0, 0.0], [[0.0, 0.0], [0.0, 1.0]], [-1.0, -1.0], [1.0, 1.0]);
        assert_eq!(singular, 0.0);
        let invalid = rectangle_probability([0.0, 0.0], [[1.0, 2.0], [2.0, 1.0]], [-1.0, -1.0], [1.0, 1.0]);
        assert_eq!(invalid, 0.0);
        let negative = rectangle_probability([0.0, 0.0], [[-1.0, 0.0], [0.0, 1.0]], [-1.0, -1.0], [1.0, 1.0]);
        assert_eq!(negative, 0.0);
    }

    #[test]
    fn test_component_cells_partition_the_plane() {
        let sigma = array![[1.0, 0.4, 0.0], [0.4, 2.0, -0.3], [0.0, -0.3, 0.5]];
        let mean = array![0.5, -0.2, 1.0];
        let component = Component::new(&mean, &sigma);
        assert!((component.corr()[[0, 1]] - 0.4 / 2f64.sqrt()).abs() < 1e-15);
        assert!((component.corr()[[2, 2]] - 1.0).abs() < 1e-15);

        let thresholds = vec![
            array![-INF, -0.5, 0.7, INF],
            array![-INF, 0.0, INF],
            array![-INF, -1.0, 0.0, 1.5, INF],
        ];
        let mut total = 0.0;
        for ci in 0..3 {
            for cj in 0..4 {
                let record = IndexRecord {
                    first: 0,
                    second: 2,
                    first_category: ci,
                    second_category: cj,
                    pair: 1,
                    frequency: 1.0,
                };
                let p = component.cell_probability(&record, &thresholds);
                assert!((0.0..=1.0).contains(&p));
                total += p;
            }
        }
        assert!((total - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_component_matches_rectangle() {
        let sigma = array![[1.5, 0.6], [0.6, 0.8]];
        let mean = array![0.2, -0.4];
        let component = Component::new(&mean, &sigma);
        let thresholds = vec![array![-INF, -0.3, 0.9, INF], array![-INF, 0.1, INF]];
        let record = IndexRecord {
            first: 0,
            second: 1,
            first_category: 1,
            second_category: 0,
            pair: 0,
            frequency: 3.0,
        };
        let direct = rectangle_probability(
            [0.2, -0.4],
            [[1.5, 0.6], [0.6, 0.8]],
            [-0.3, -INF],
            [0.9, 0.1],
        );
        assert!((component.cell_probability(&record, &thresholds) - direct).abs() < 1e-14);
    }
}
