//! Conversion between a [Theta] and the unconstrained vector handed to the optimizer.
//!
//! The vector is laid out as
//! 1. the means of groups `2..G`, row by row,
//! 2. the strictly upper triangle of the first group's factor (its diagonal is fixed to 1),
//! 3. for groups `2..G`, the upper triangle of the factor, with every diagonal entry stored as its logarithm,
//! 4. for every variable, the first interior threshold followed by the logarithm of each gap
//!    between consecutive interior thresholds.
//!
//! Any real vector of the right length decodes to a valid [Theta]: the factors get a positive
//! diagonal and the thresholds come out strictly increasing.

use eyre::Result;
use ndarray::{s, Array1, Array2};

use crate::errors::ShapeError;
use crate::structs::layout::Layout;
use crate::structs::theta::Theta;

/// Flatten `theta` into an unconstrained parameter vector
pub fn encode(theta: &Theta, layout: &Layout) -> Result<Array1<f64>> {
    theta.check_layout(layout)?;
    let p = layout.n_variables();
    let mut vector = Vec::with_capacity(layout.n_parameters());

    for mu in theta.mu().iter().skip(1) {
        vector.extend(mu.iter());
    }

    let anchor = &theta.factors()[0];
    for i in 0..p {
        for j in (i + 1)..p {
            vector.push(anchor[[i, j]]);
        }
    }

    for a in theta.factors().iter().skip(1) {
        for i in 0..p {
            vector.push(a[[i, i]].ln());
            for j in (i + 1)..p {
                vector.push(a[[i, j]]);
            }
        }
    }

    for t in theta.thresholds() {
        let interior = t.slice(s![1..t.len() - 1]);
        vector.push(interior[0]);
        vector.extend(interior.windows(2).into_iter().map(|w| (w[1] - w[0]).ln()));
    }

    Ok(Array1::from(vector))
}

/// Rebuild a [Theta] from a parameter vector produced by [encode] or by the optimizer
pub fn decode(vector: &Array1<f64>, layout: &Layout) -> Result<Theta> {
    if vector.len() != layout.n_parameters() {
        return Err(ShapeError::VectorLength {
            expected: layout.n_parameters(),
            found: vector.len(),
        }
        .into());
    }
    let p = layout.n_variables();
    let g = layout.n_groups();
    let mut values = vector.iter().copied();
    // The length check above guarantees the iterator is never exhausted
    let mut next = || values.next().unwrap_or(f64::NAN);

    let mut mu = Vec::with_capacity(g);
    mu.push(Array1::zeros(p));
    for _ in 1..g {
        mu.push(Array1::from_shape_fn(p, |_| next()));
    }

    let mut factors = Vec::with_capacity(g);
    let mut anchor = Array2::eye(p);
    for i in 0..p {
        for j in (i + 1)..p {
            anchor[[i, j]] = next();
        }
    }
    factors.push(anchor);
    for _ in 1..g {
        let mut a = Array2::zeros((p, p));
        for i in 0..p {
            a[[i, i]] = next().exp();
            for j in (i + 1)..p {
                a[[i, j]] = next();
            }
        }
        factors.push(a);
    }

    let mut thresholds = Vec::with_capacity(p);
    for &categories in layout.categories() {
        let mut t = Vec::with_capacity(categories + 1);
        t.push(f64::NEG_INFINITY);
        let mut cut = next();
        t.push(cut);
        for _ in 1..(categories - 1) {
            cut += next().exp();
            t.push(cut);
        }
        t.push(f64::INFINITY);
        thresholds.push(Array1::from(t));
    }

    Theta::new(mu, factors, thresholds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn theta() -> (Theta, Layout) {
        let layout = Layout::new(2, 3, &[3, 2, 4]).unwrap();
        let theta = Theta::new(
            vec![array![0.0, 0.0, 0.0], array![1.5, -0.5, 2.0]],
            vec![
                array![[1.0, 0.3, -0.2], [0.0, 1.0, 0.1], [0.0, 0.0, 1.0]],
                array![[1.2, 0.4, 0.0], [0.0, 0.8, -0.3], [0.0, 0.0, 1.1]],
            ],
            vec![
                array![f64::NEG_INFINITY, -0.5, 0.7, f64::INFINITY],
                array![f64::NEG_INFINITY, 0.2, f64::INFINITY],
                array![f64::NEG_INFINITY, -1.0, 0.0, 1.5, f64::INFINITY],
            ],
        )
        .unwrap();
        (theta, layout)
    }

    #[test]
    fn test_vector_layout() {
        let (theta, layout) = theta();
        let v = encode(&theta, &layout).unwrap();
        assert_eq!(v.len(), layout.n_parameters());
        // means of group 2
        assert_eq!(v.slice(ndarray::s![0..3]).to_vec(), vec![1.5, -0.5, 2.0]);
        // strictly upper triangle of the anchor factor
        assert_eq!(v.slice(ndarray::s![3..6]).to_vec(), vec![0.3, -0.2, 0.1]);
        // free factor, log diagonal
        assert!((v[6] - 1.2f64.ln()).abs() < 1e-15);
        assert_eq!(v[7], 0.4);
        // first threshold of the first variable, then the log gap
        assert_eq!(v[12], -0.5);
        assert!((v[13] - 1.2f64.ln()).abs() < 1e-15);
    }

    #[test]
    fn test_roundtrip() {
        let (theta, layout) = theta();
        let v = encode(&theta, &layout).unwrap();
        let back = decode(&v, &layout).unwrap();

        for (a, b) in theta.mu().iter().zip(back.mu()) {
            assert!(a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-12));
        }
        for (a, b) in theta.sigma().iter().zip(back.sigma()) {
            assert!(a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-12));
        }
        for (a, b) in theta.thresholds().iter().zip(back.thresholds()) {
            assert_eq!(a[0], b[0]);
            assert_eq!(a[a.len() - 1], b[b.len() - 1]);
            assert!(a
                .iter()
                .zip(b)
                .filter(|(x, _)| x.is_finite())
                .all(|(x, y)| (x - y).abs() < 1e-12));
        }
    }

    #[test]
    fn test_any_vector_decodes_to_valid_parameters() {
        let layout = Layout::new(3, 3, &[4, 3, 2]).unwrap();
        let v = Array1::from_shape_fn(layout.n_parameters(), |i| {
            ((i * 7919) % 13) as f64 / 3.0 - 2.0
        });
        let theta = decode(&v, &layout).unwrap();

        for a in theta.factors().iter().skip(1) {
            assert!(a.diag().iter().all(|&d| d > 0.0));
        }
        for t in theta.thresholds() {
            assert_eq!(t[0], f64::NEG_INFINITY);
            assert_eq!(t[t.len() - 1], f64::INFINITY);
            assert!(t.windows(2).into_iter().all(|w| w[0] < w[1]));
        }
        assert!(theta.mu()[0].iter().all(|&m| m == 0.0));
        assert!(theta.factors()[0].diag().iter().all(|&d| d == 1.0));
    }

    #[test]
    fn test_wrong_length() {
        let layout = Layout::new(2, 2, &[2, 2]).unwrap();
        let err = decode(&Array1::zeros(3), &layout).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ShapeError>(),
            Some(&ShapeError::VectorLength {
                expected: layout.n_parameters(),
                found: 3
            })
        );
    }
}
