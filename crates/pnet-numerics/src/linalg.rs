// ─────────────────────────────────────────────────────────────────────
// pNet Kernel — Dense Products
// ─────────────────────────────────────────────────────────────────────
//! Matrix products used by the factorization updates.
//!
//! The `*_into` variants write into caller-owned outputs so the
//! iteration loops run without allocating. Loops are ordered so the
//! innermost index walks contiguous row-major memory.

use pnet_types::{Matrix, PnetError, PnetResult};

fn check_shape(what: &str, out: &Matrix, rows: usize, cols: usize) -> PnetResult<()> {
    if out.rows() != rows || out.cols() != cols {
        return Err(PnetError::Validation(format!(
            "{what}: output is {}x{}, expected {rows}x{cols}",
            out.rows(),
            out.cols()
        )));
    }
    Ok(())
}

/// `out = A · B` with A `m × n`, B `n × p`.
pub fn matmul_into(a: &Matrix, b: &Matrix, out: &mut Matrix) -> PnetResult<()> {
    let (m, n) = a.shape();
    let p = b.cols();
    if b.rows() != n {
        return Err(PnetError::dimension("matmul inner", n, b.rows()));
    }
    check_shape("matmul", out, m, p)?;

    let a_data = a.as_slice();
    let b_data = b.as_slice();
    let o = out.as_mut_slice();
    o.fill(0.0);
    for i in 0..m {
        let o_row = &mut o[i * p..(i + 1) * p];
        for (kk, &a_ik) in a_data[i * n..(i + 1) * n].iter().enumerate() {
            if a_ik == 0.0 {
                continue;
            }
            let b_row = &b_data[kk * p..(kk + 1) * p];
            for (o_ij, &b_kj) in o_row.iter_mut().zip(b_row) {
                *o_ij += a_ik * b_kj;
            }
        }
    }
    Ok(())
}

/// `out = Aᵀ · B` with A `n × m`, B `n × p`.
pub fn matmul_tn_into(a: &Matrix, b: &Matrix, out: &mut Matrix) -> PnetResult<()> {
    let (n, m) = a.shape();
    let p = b.cols();
    if b.rows() != n {
        return Err(PnetError::dimension("matmul_tn inner", n, b.rows()));
    }
    check_shape("matmul_tn", out, m, p)?;

    let a_data = a.as_slice();
    let b_data = b.as_slice();
    let o = out.as_mut_slice();
    o.fill(0.0);
    for r in 0..n {
        let b_row = &b_data[r * p..(r + 1) * p];
        for (i, &a_ri) in a_data[r * m..(r + 1) * m].iter().enumerate() {
            if a_ri == 0.0 {
                continue;
            }
            let o_row = &mut o[i * p..(i + 1) * p];
            for (o_ij, &b_rj) in o_row.iter_mut().zip(b_row) {
                *o_ij += a_ri * b_rj;
            }
        }
    }
    Ok(())
}

/// `out = Aᵀ · A` (`m × m` Gram matrix of the columns of A).
pub fn gram_into(a: &Matrix, out: &mut Matrix) -> PnetResult<()> {
    matmul_tn_into(a, a, out)
}

/// Allocating `A · B`.
pub fn matmul(a: &Matrix, b: &Matrix) -> PnetResult<Matrix> {
    let mut out = Matrix::zeros(a.rows(), b.cols());
    matmul_into(a, b, &mut out)?;
    Ok(out)
}

/// Allocating `Aᵀ · B`.
pub fn matmul_tn(a: &Matrix, b: &Matrix) -> PnetResult<Matrix> {
    let mut out = Matrix::zeros(a.cols(), b.cols());
    matmul_tn_into(a, b, &mut out)?;
    Ok(out)
}

/// Σ a_ij².
pub fn frobenius_sq(a: &Matrix) -> f64 {
    a.as_slice().iter().map(|v| v * v).sum()
}

/// Σ a_ij · b_ij (Frobenius inner product). Shapes must agree.
pub fn frobenius_inner(a: &Matrix, b: &Matrix) -> PnetResult<f64> {
    if a.shape() != b.shape() {
        return Err(PnetError::dimension(
            "frobenius inner product",
            a.rows() * a.cols(),
            b.rows() * b.cols(),
        ));
    }
    Ok(a
        .as_slice()
        .iter()
        .zip(b.as_slice())
        .map(|(x, y)| x * y)
        .sum())
}

/// L2 norm of every column.
pub fn column_norms(a: &Matrix) -> Vec<f64> {
    let cols = a.cols();
    let mut sums = vec![0.0; cols];
    for row in a.as_slice().chunks_exact(cols.max(1)) {
        for (s, v) in sums.iter_mut().zip(row) {
            *s += v * v;
        }
    }
    sums.into_iter().map(f64::sqrt).collect()
}

/// Sum of every column.
pub fn column_sums(a: &Matrix) -> Vec<f64> {
    let cols = a.cols();
    let mut sums = vec![0.0; cols];
    for row in a.as_slice().chunks_exact(cols.max(1)) {
        for (s, v) in sums.iter_mut().zip(row) {
            *s += v;
        }
    }
    sums
}

/// Multiply column `j` of `a` by `factors[j]`.
pub fn scale_columns(a: &mut Matrix, factors: &[f64]) {
    let cols = a.cols();
    for row in a.as_mut_slice().chunks_exact_mut(cols.max(1)) {
        for (v, f) in row.iter_mut().zip(factors) {
            *v *= f;
        }
    }
}
