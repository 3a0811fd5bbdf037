// ─────────────────────────────────────────────────────────────────────
// pNet Kernel — Multiplicative Updates
// ─────────────────────────────────────────────────────────────────────
//! Lee–Seung style multiplicative updates for
//!
//! ```text
//! ||X − U Vᵀ||²_F + λ_g ||V − G||²_F + λ_s tr(Vᵀ L V) + 2λ_1 ||V||_1
//! ```
//!
//! Every rule splits the gradient into a positive and a negative part
//! and scales the factor by negative / positive, so non-negative factors
//! stay non-negative.

use pnet_data::SpatialGraph;
use pnet_numerics::linalg::{column_norms, gram_into, matmul_into, matmul_tn_into};
use pnet_types::{Matrix, PnetError, PnetResult};

use crate::factors::{Factors, Workspace};

/// Optional regularizers acting on the maps V.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapTerms<'a> {
    /// Group prior G with weight λ_g.
    pub prior: Option<(&'a Matrix, f64)>,
    /// Spatial graph with weight λ_s.
    pub graph: Option<(&'a SpatialGraph, f64)>,
    /// λ_1.
    pub sparsity: f64,
}

impl<'a> MapTerms<'a> {
    /// Drop zero-weight terms so the update loop skips them entirely.
    pub fn new(
        prior: Option<(&'a Matrix, f64)>,
        graph: Option<(&'a SpatialGraph, f64)>,
        sparsity: f64,
    ) -> Self {
        Self {
            prior: prior.filter(|(_, w)| *w > 0.0),
            graph: graph.filter(|(_, w)| *w > 0.0),
            sparsity,
        }
    }
}

/// `U ← U ⊙ (X V) ⊘ (U VᵀV + ε)`.
pub fn update_loadings(x: &Matrix, f: &mut Factors, ws: &mut Workspace, eps: f64) -> PnetResult<()> {
    matmul_into(x, &f.v, &mut ws.xv)?;
    gram_into(&f.v, &mut ws.vtv)?;
    matmul_into(&f.u, &ws.vtv, &mut ws.u_denom)?;
    for ((u, num), den) in f
        .u
        .as_mut_slice()
        .iter_mut()
        .zip(ws.xv.as_slice())
        .zip(ws.u_denom.as_slice())
    {
        *u *= num / (den + eps);
    }
    Ok(())
}

/// `V ← V ⊙ (XᵀU + λ_g G + λ_s W V) ⊘ (V UᵀU + λ_g V + λ_s D V + λ_1 + ε)`.
pub fn update_maps(
    x: &Matrix,
    f: &mut Factors,
    ws: &mut Workspace,
    terms: &MapTerms<'_>,
    eps: f64,
) -> PnetResult<()> {
    matmul_tn_into(x, &f.u, &mut ws.xtu)?;
    gram_into(&f.u, &mut ws.utu)?;
    matmul_into(&f.v, &ws.utu, &mut ws.v_denom)?;

    if let Some((prior, weight)) = terms.prior {
        if prior.shape() != f.v.shape() {
            return Err(PnetError::dimension(
                "group prior nodes",
                f.v.rows(),
                prior.rows(),
            ));
        }
        for ((num, den), (&g, &v)) in ws
            .xtu
            .as_mut_slice()
            .iter_mut()
            .zip(ws.v_denom.as_mut_slice())
            .zip(prior.as_slice().iter().zip(f.v.as_slice()))
        {
            *num += weight * g;
            *den += weight * v;
        }
    }

    if let Some((graph, weight)) = terms.graph {
        graph.multiply_into(&f.v, &mut ws.wv)?;
        let k = f.k();
        for node in 0..f.v.rows() {
            let degree = graph.degree(node);
            let v_row = f.v.row(node);
            let wv_row = ws.wv.row(node);
            let num = ws.xtu.row_mut(node);
            for (n, w) in num.iter_mut().zip(wv_row) {
                *n += weight * w;
            }
            let den = &mut ws.v_denom.as_mut_slice()[node * k..(node + 1) * k];
            for (d, v) in den.iter_mut().zip(v_row) {
                *d += weight * degree * v;
            }
        }
    }

    let floor = terms.sparsity + eps;
    for ((v, num), den) in f
        .v
        .as_mut_slice()
        .iter_mut()
        .zip(ws.xtu.as_slice())
        .zip(ws.v_denom.as_slice())
    {
        *v *= num / (den + floor);
    }
    Ok(())
}

/// Rescale V's columns to unit L2 norm and move the scale into U, so
/// `U Vᵀ` is unchanged. All-zero columns are left alone.
pub fn normalize_columns(f: &mut Factors, eps: f64) {
    let norms = column_norms(&f.v);
    let k = f.k();
    for row in f.v.as_mut_slice().chunks_exact_mut(k) {
        for (v, n) in row.iter_mut().zip(&norms) {
            if *n > eps {
                *v /= n;
            }
        }
    }
    for row in f.u.as_mut_slice().chunks_exact_mut(k) {
        for (u, n) in row.iter_mut().zip(&norms) {
            if *n > eps {
                *u *= n;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objective::reconstruction_error;
    use pnet_numerics::linalg::matmul;

    fn problem() -> (Matrix, Factors) {
        let truth = Factors::random(12, 15, 3, 5);
        let x = matmul(&truth.u, &truth.v.transpose()).unwrap();
        (x, Factors::random(12, 15, 3, 11))
    }

    #[test]
    fn test_updates_keep_non_negative() {
        let (x, mut f) = problem();
        let mut ws = Workspace::for_factors(&f);
        for _ in 0..20 {
            update_loadings(&x, &mut f, &mut ws, 1e-12).unwrap();
            update_maps(&x, &mut f, &mut ws, &MapTerms::default(), 1e-12).unwrap();
        }
        assert!(f.u.is_non_negative());
        assert!(f.v.is_non_negative());
    }

    #[test]
    fn test_updates_reduce_reconstruction_error() {
        let (x, mut f) = problem();
        let mut ws = Workspace::for_factors(&f);
        let mut previous = reconstruction_error(&x, &f.u, &f.v).unwrap();
        for _ in 0..30 {
            update_loadings(&x, &mut f, &mut ws, 1e-12).unwrap();
            update_maps(&x, &mut f, &mut ws, &MapTerms::default(), 1e-12).unwrap();
            let current = reconstruction_error(&x, &f.u, &f.v).unwrap();
            assert!(current <= previous * (1.0 + 1e-9) + 1e-9);
            previous = current;
        }
    }

    #[test]
    fn test_prior_pulls_maps_towards_group() {
        let (x, f0) = problem();
        let prior = Matrix::filled(15, 3, 0.5);
        let distance = |v: &Matrix| -> f64 {
            v.as_slice()
                .iter()
                .zip(prior.as_slice())
                .map(|(a, b)| (a - b).powi(2))
                .sum()
        };
        let run = |weight: f64| -> f64 {
            let mut f = f0.clone();
            let mut ws = Workspace::for_factors(&f);
            let terms = MapTerms::new(Some((&prior, weight)), None, 0.0);
            for _ in 0..50 {
                update_loadings(&x, &mut f, &mut ws, 1e-12).unwrap();
                update_maps(&x, &mut f, &mut ws, &terms, 1e-12).unwrap();
            }
            distance(&f.v)
        };
        assert!(run(1e4) < run(0.0));
    }

    #[test]
    fn test_prior_shape_checked() {
        let (x, mut f) = problem();
        let mut ws = Workspace::for_factors(&f);
        let prior = Matrix::filled(14, 3, 0.5);
        let terms = MapTerms::new(Some((&prior, 1.0)), None, 0.0);
        assert!(update_maps(&x, &mut f, &mut ws, &terms, 1e-12).is_err());
    }

    #[test]
    fn test_graph_term_smooths_maps() {
        let (x, f0) = problem();
        let edges: Vec<(usize, usize)> = (0..14).map(|i| (i, i + 1)).collect();
        let graph = SpatialGraph::from_edges(15, &edges).unwrap();
        let run = |weight: f64| -> f64 {
            let mut f = f0.clone();
            let mut ws = Workspace::for_factors(&f);
            let terms = MapTerms::new(None, Some((&graph, weight)), 0.0);
            for _ in 0..50 {
                update_loadings(&x, &mut f, &mut ws, 1e-12).unwrap();
                update_maps(&x, &mut f, &mut ws, &terms, 1e-12).unwrap();
                normalize_columns(&mut f, 1e-12);
            }
            graph.laplacian_quadratic(&f.v).unwrap()
        };
        assert!(run(100.0) < run(0.0));
    }

    #[test]
    fn test_normalize_columns_preserves_product() {
        let (_, mut f) = problem();
        let before = matmul(&f.u, &f.v.transpose()).unwrap();
        normalize_columns(&mut f, 1e-12);
        let after = matmul(&f.u, &f.v.transpose()).unwrap();
        for n in column_norms(&f.v) {
            assert!((n - 1.0).abs() < 1e-12);
        }
        for (a, b) in before.as_slice().iter().zip(after.as_slice()) {
            assert!((a - b).abs() < 1e-9);
        }
    }
}
