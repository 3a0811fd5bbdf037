// ─────────────────────────────────────────────────────────────────────
// pNet Kernel — Objective Terms
// ─────────────────────────────────────────────────────────────────────
//! Objective evaluation for the factorization loop.
//!
//! The reconstruction term uses the trace expansion
//! `||X||² − 2⟨XᵀU, V⟩ + ⟨UᵀU, VᵀV⟩`, which costs one `S × T × K`
//! product instead of materialising `U Vᵀ`.

use serde::{Deserialize, Serialize};

use pnet_numerics::linalg::{frobenius_inner, frobenius_sq, gram_into, matmul_tn, matmul_tn_into};
use pnet_types::{Matrix, PnetError, PnetResult};

use crate::factors::{Factors, Workspace};
use crate::updates::MapTerms;

/// Per-term objective values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveBreakdown {
    pub reconstruction: f64,
    pub prior: f64,
    pub smoothness: f64,
    pub sparsity: f64,
    pub total: f64,
}

fn expand(x_sq: f64, cross: f64, utu: &Matrix, vtv: &Matrix) -> PnetResult<f64> {
    // rounding can push a perfect fit slightly below zero
    Ok((x_sq - 2.0 * cross + frobenius_inner(utu, vtv)?).max(0.0))
}

/// `||X − U Vᵀ||²_F`.
pub fn reconstruction_error(x: &Matrix, u: &Matrix, v: &Matrix) -> PnetResult<f64> {
    if u.rows() != x.rows() {
        return Err(PnetError::dimension("loadings rows", x.rows(), u.rows()));
    }
    if v.rows() != x.cols() {
        return Err(PnetError::dimension("map rows", x.cols(), v.rows()));
    }
    let xtu = matmul_tn(x, u)?;
    let cross = frobenius_inner(&xtu, v)?;
    expand(frobenius_sq(x), cross, &matmul_tn(u, u)?, &matmul_tn(v, v)?)
}

/// Evaluate every active term at the current factors.
///
/// `x_sq` is `||X||²`, computed once per solve. Overwrites `ws.xtu`,
/// `ws.utu` and `ws.vtv`.
pub fn evaluate(
    x: &Matrix,
    x_sq: f64,
    f: &Factors,
    ws: &mut Workspace,
    terms: &MapTerms<'_>,
) -> PnetResult<ObjectiveBreakdown> {
    matmul_tn_into(x, &f.u, &mut ws.xtu)?;
    gram_into(&f.u, &mut ws.utu)?;
    gram_into(&f.v, &mut ws.vtv)?;
    let cross = frobenius_inner(&ws.xtu, &f.v)?;
    let reconstruction = expand(x_sq, cross, &ws.utu, &ws.vtv)?;

    let prior = match terms.prior {
        Some((g, weight)) => {
            weight
                * f.v
                    .as_slice()
                    .iter()
                    .zip(g.as_slice())
                    .map(|(v, g)| (v - g) * (v - g))
                    .sum::<f64>()
        }
        None => 0.0,
    };
    let smoothness = match terms.graph {
        Some((graph, weight)) => weight * graph.laplacian_quadratic(&f.v)?,
        None => 0.0,
    };
    // λ_1 enters the update denominator directly, which matches 2λ_1‖V‖₁
    // against the squared loss.
    let sparsity = 2.0 * terms.sparsity * f.v.as_slice().iter().sum::<f64>();

    let total = reconstruction + prior + smoothness + sparsity;
    if !total.is_finite() {
        return Err(PnetError::Numerical(format!(
            "objective is not finite (reconstruction {reconstruction})"
        )));
    }
    Ok(ObjectiveBreakdown {
        reconstruction,
        prior,
        smoothness,
        sparsity,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pnet_numerics::linalg::matmul;

    #[test]
    fn test_reconstruction_error_matches_direct() {
        let f = Factors::random(6, 8, 2, 3);
        let x = Matrix::filled(6, 8, 0.7);
        let approx = matmul(&f.u, &f.v.transpose()).unwrap();
        let direct: f64 = x
            .as_slice()
            .iter()
            .zip(approx.as_slice())
            .map(|(a, b)| (a - b).powi(2))
            .sum();
        let traced = reconstruction_error(&x, &f.u, &f.v).unwrap();
        assert!((direct - traced).abs() < 1e-9 * direct.max(1.0));
    }

    #[test]
    fn test_exact_factorization_is_zero() {
        let f = Factors::random(5, 7, 2, 8);
        let x = matmul(&f.u, &f.v.transpose()).unwrap();
        assert!(reconstruction_error(&x, &f.u, &f.v).unwrap() < 1e-9);
    }

    #[test]
    fn test_reconstruction_dimension_checked() {
        let f = Factors::random(5, 7, 2, 8);
        assert!(reconstruction_error(&Matrix::zeros(5, 6), &f.u, &f.v).is_err());
        assert!(reconstruction_error(&Matrix::zeros(4, 7), &f.u, &f.v).is_err());
    }

    #[test]
    fn test_evaluate_terms() {
        let f = Factors::random(5, 7, 2, 8);
        let x = matmul(&f.u, &f.v.transpose()).unwrap();
        let mut ws = Workspace::for_factors(&f);
        let prior = Matrix::zeros(7, 2);
        let terms = MapTerms::new(Some((&prior, 2.0)), None, 0.5);
        let obj = evaluate(&x, frobenius_sq(&x), &f, &mut ws, &terms).unwrap();
        let v_sq = frobenius_sq(&f.v);
        let v_sum: f64 = f.v.as_slice().iter().sum();
        assert!(obj.reconstruction < 1e-9);
        assert!((obj.prior - 2.0 * v_sq).abs() < 1e-12);
        assert!((obj.sparsity - v_sum).abs() < 1e-12);
        assert_eq!(obj.smoothness, 0.0);
        assert!((obj.total - (obj.reconstruction + obj.prior + obj.sparsity)).abs() < 1e-12);
    }
}
