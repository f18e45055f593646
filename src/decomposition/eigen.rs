//! # Symmetric Eigen-decomposition
//!
//! Cyclic Jacobi rotations on a dense symmetric matrix. Covariance matrices in
//! feature space are small, so the O(n^3) sweep cost is not a concern and
//! no LAPACK backend is needed.

use ndarray::{Array1, Array2};

use super::PcaError;

const MAX_SWEEPS: usize = 100;
const TOLERANCE: f64 = 1e-14;

/// Eigenvalues and eigenvectors of a symmetric matrix.
///
/// Eigenvalues come back in descending order; column `i` of the returned
/// matrix is the unit eigenvector for eigenvalue `i`.
pub fn symmetric_eigen(matrix: &Array2<f64>) -> Result<(Array1<f64>, Array2<f64>), PcaError> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(PcaError::InvalidArgument(format!(
            "eigen-decomposition needs a square matrix, got {}x{}",
            n,
            matrix.ncols()
        )));
    }

    let mut a = matrix.clone();
    let mut v = Array2::<f64>::eye(n);
    let scale = a.iter().map(|x| x * x).sum::<f64>().max(f64::MIN_POSITIVE);

    let mut converged = n < 2;
    for _sweep in 0..MAX_SWEEPS {
        let off = off_diagonal_norm(&a);
        if !off.is_finite() || !scale.is_finite() {
            return Err(PcaError::NoConvergence(MAX_SWEEPS));
        }
        if off <= TOLERANCE * scale {
            converged = true;
            break;
        }
        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[[p, q]];
                if apq == 0.0 {
                    continue;
                }
                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                // f64::signum(0.0) is 1.0, so theta == 0 rotates by 45 degrees.
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;
                rotate(&mut a, &mut v, p, q, c, s);
            }
        }
    }
    if !converged && off_diagonal_norm(&a) > TOLERANCE.sqrt() * scale {
        return Err(PcaError::NoConvergence(MAX_SWEEPS));
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| a[[j, j]].total_cmp(&a[[i, i]]));

    let values = Array1::from_iter(order.iter().map(|&i| a[[i, i]]));
    let mut vectors = Array2::<f64>::zeros((n, n));
    for (dst, &src) in order.iter().enumerate() {
        vectors.column_mut(dst).assign(&v.column(src));
    }
    Ok((values, vectors))
}

fn off_diagonal_norm(a: &Array2<f64>) -> f64 {
    let mut sum = 0.0;
    for ((i, j), x) in a.indexed_iter() {
        if i != j {
            sum += x * x;
        }
    }
    sum
}

/// Applies the rotation `A <- J^T A J`, `V <- V J` in the (p, q) plane.
fn rotate(a: &mut Array2<f64>, v: &mut Array2<f64>, p: usize, q: usize, c: f64, s: f64) {
    let n = a.nrows();
    for k in 0..n {
        let akp = a[[k, p]];
        let akq = a[[k, q]];
        a[[k, p]] = c * akp - s * akq;
        a[[k, q]] = s * akp + c * akq;
    }
    for k in 0..n {
        let apk = a[[p, k]];
        let aqk = a[[q, k]];
        a[[p, k]] = c * apk - s * aqk;
        a[[q, k]] = s * apk + c * aqk;
    }
    for k in 0..n {
        let vkp = v[[k, p]];
        let vkq = v[[k, q]];
        v[[k, p]] = c * vkp - s * vkq;
        v[[k, q]] = s * vkp + c * vkq;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn diagonal_matrix_is_sorted() {
        let (values, vectors) = symmetric_eigen(&array![[1.0, 0.0], [0.0, 3.0]]).unwrap();
        assert_close(values[0], 3.0);
        assert_close(values[1], 1.0);
        assert_close(vectors[[1, 0]].abs(), 1.0);
    }

    #[test]
    fn reconstructs_symmetric_matrix() {
        let m = array![[4.0, 1.0, 2.0], [1.0, 3.0, 0.5], [2.0, 0.5, 5.0]];
        let (values, vectors) = symmetric_eigen(&m).unwrap();

        // A v = lambda v for every pair
        for i in 0..3 {
            let v = vectors.column(i);
            let av = m.dot(&v);
            for k in 0..3 {
                assert_close(av[k], values[i] * v[k]);
            }
        }
        // Orthonormal columns
        let gram = vectors.t().dot(&vectors);
        for i in 0..3 {
            for j in 0..3 {
                assert_close(gram[[i, j]], if i == j { 1.0 } else { 0.0 });
            }
        }
        assert!(values[0] >= values[1] && values[1] >= values[2]);
    }

    #[test]
    fn non_finite_entries_do_not_converge() {
        let m = array![[1.0, f64::NAN], [f64::NAN, 2.0]];
        assert_eq!(
            symmetric_eigen(&m).unwrap_err(),
            PcaError::NoConvergence(MAX_SWEEPS)
        );
        let m = array![[f64::INFINITY, 0.5], [0.5, 1.0]];
        assert!(symmetric_eigen(&m).is_err());
    }

    #[test]
    fn rejects_non_square_input() {
        let err = symmetric_eigen(&Array2::zeros((2, 3))).unwrap_err();
        assert!(matches!(err, PcaError::InvalidArgument(_)));
    }
}
