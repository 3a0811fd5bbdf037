// ─────────────────────────────────────────────────────────────────────
// pNet Kernel — Correlation
// ─────────────────────────────────────────────────────────────────────

use pnet_types::{Matrix, PnetError, PnetResult};

use crate::linalg::matmul_tn;

/// Centred norms below this are treated as zero variance.
const VARIANCE_FLOOR: f64 = 1e-12;

/// Clamp a correlation to [-1, 1], mapping NaN to 0 and Inf to the
/// nearest bound.
#[inline]
pub fn clamp_correlation(value: f64) -> f64 {
    if value.is_nan() {
        log::warn!("clamp_correlation: NaN detected, clamping to 0");
        return 0.0;
    }
    value.clamp(-1.0, 1.0)
}

/// Pearson correlation of two equal-length vectors.
///
/// A constant vector has no defined correlation; 0.0 is returned.
pub fn pearson(a: &[f64], b: &[f64]) -> PnetResult<f64> {
    if a.len() != b.len() {
        return Err(PnetError::dimension("pearson", a.len(), b.len()));
    }
    if a.is_empty() {
        return Ok(0.0);
    }
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;
    let (mut sab, mut saa, mut sbb) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        sab += dx * dy;
        saa += dx * dx;
        sbb += dy * dy;
    }
    let denom = saa.sqrt() * sbb.sqrt();
    if denom < VARIANCE_FLOOR {
        return Ok(0.0);
    }
    Ok(clamp_correlation(sab / denom))
}

/// Centre every column and scale it to unit L2 norm.
/// Zero-variance columns become all zeros.
fn standardize_columns(a: &Matrix) -> Matrix {
    let (n, p) = a.shape();
    let mut out = a.clone();
    if n == 0 {
        return out;
    }
    let mut means = vec![0.0; p];
    for row in a.as_slice().chunks_exact(p.max(1)) {
        for (m, v) in means.iter_mut().zip(row) {
            *m += v;
        }
    }
    for m in means.iter_mut() {
        *m /= n as f64;
    }
    let mut norms = vec![0.0; p];
    for row in out.as_mut_slice().chunks_exact_mut(p.max(1)) {
        for ((v, m), s) in row.iter_mut().zip(&means).zip(norms.iter_mut()) {
            *v -= m;
            *s += *v * *v;
        }
    }
    let inv: Vec<f64> = norms
        .iter()
        .map(|s| {
            let norm = s.sqrt();
            if norm < VARIANCE_FLOOR {
                0.0
            } else {
                1.0 / norm
            }
        })
        .collect();
    crate::linalg::scale_columns(&mut out, &inv);
    out
}

/// Pearson correlation between every column of `a` (`n × p`) and every
/// column of `b` (`n × q`); result is `p × q`.
pub fn column_correlation(a: &Matrix, b: &Matrix) -> PnetResult<Matrix> {
    if a.rows() != b.rows() {
        return Err(PnetError::dimension("column correlation rows", a.rows(), b.rows()));
    }
    let za = standardize_columns(a);
    let zb = standardize_columns(b);
    let mut corr = matmul_tn(&za, &zb)?;
    for v in corr.as_mut_slice().iter_mut() {
        *v = clamp_correlation(*v);
    }
    Ok(corr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pearson_identical() {
        let a = [1.0, 2.0, 3.0, 5.0];
        assert!((pearson(&a, &a).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_anti() {
        let a = [1.0, 2.0, 3.0];
        let b = [3.0, 2.0, 1.0];
        assert!((pearson(&a, &b).unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_constant_is_zero() {
        assert_eq!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_pearson_length_mismatch() {
        assert!(pearson(&[1.0, 2.0], &[1.0]).is_err());
    }

    #[test]
    fn test_clamp_correlation() {
        assert_eq!(clamp_correlation(f64::NAN), 0.0);
        assert_eq!(clamp_correlation(1.0000001), 1.0);
        assert_eq!(clamp_correlation(f64::NEG_INFINITY), -1.0);
    }

    #[test]
    fn test_column_correlation_matches_pearson() {
        let a = Matrix::from_rows(&[
            vec![1.0, 0.0],
            vec![2.0, 1.0],
            vec![4.0, 0.5],
            vec![3.0, 2.0],
        ])
        .unwrap();
        let b = Matrix::from_rows(&[
            vec![0.2, 9.0, 1.0],
            vec![0.4, 7.0, 1.0],
            vec![0.1, 8.0, 1.0],
            vec![0.9, 1.0, 1.0],
        ])
        .unwrap();
        let c = column_correlation(&a, &b).unwrap();
        assert_eq!(c.shape(), (2, 3));
        for i in 0..2 {
            for j in 0..3 {
                let expected = pearson(&a.column(i), &b.column(j)).unwrap();
                assert!((c.get(i, j) - expected).abs() < 1e-10);
            }
        }
        // constant column in b
        assert_eq!(c.get(0, 2), 0.0);
    }

    #[test]
    fn test_column_correlation_row_mismatch() {
        assert!(column_correlation(&Matrix::zeros(3, 2), &Matrix::zeros(4, 2)).is_err());
    }
}
