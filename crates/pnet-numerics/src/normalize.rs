// ─────────────────────────────────────────────────────────────────────
// pNet Kernel — Data Normalization
// ─────────────────────────────────────────────────────────────────────
//! Shift + scale normalization of a `T × S` scan matrix.
//!
//! Factorization requires non-negative input, so the pipeline default is
//! `vp-vmax`: every node is shifted to be non-negative, then min-max
//! scaled to [0, 1].

use pnet_types::{Matrix, Normalization, PnetError, PnetResult, ScaleMethod, ShiftMethod};

/// Fraction clipped from each tail by the global (`g`) scale.
const GLOBAL_TAIL: f64 = 0.001;

/// Apply `scheme` to `data` and return the normalized copy.
pub fn normalize(data: &Matrix, scheme: Normalization) -> PnetResult<Matrix> {
    let eps = f64::EPSILON;
    let (t, s) = data.shape();
    let mut x = data.clone();
    if x.is_empty() {
        return Ok(x);
    }

    match scheme.shift {
        ShiftMethod::None => {}
        ShiftMethod::Z => {
            for row in x.as_mut_slice().chunks_exact_mut(s) {
                let mean = row.iter().sum::<f64>() / s as f64;
                let var = row.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / s as f64;
                let sd = var.sqrt().max(eps);
                for v in row.iter_mut() {
                    *v = (*v - mean) / sd;
                }
            }
        }
        ShiftMethod::Gp => {
            let shift = x.min_value().min(0.0).abs();
            for v in x.as_mut_slice().iter_mut() {
                *v += shift;
            }
        }
        ShiftMethod::Vp => {
            let mins = column_extreme(&x, f64::min, f64::INFINITY);
            for row in x.as_mut_slice().chunks_exact_mut(s) {
                for (v, m) in row.iter_mut().zip(&mins) {
                    *v += m.min(0.0).abs();
                }
            }
        }
    }

    match scheme.scale {
        ScaleMethod::None => {}
        ScaleMethod::N2 => {
            for row in x.as_mut_slice().chunks_exact_mut(s) {
                let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt() + eps;
                row.iter_mut().for_each(|v| *v /= norm);
            }
        }
        ScaleMethod::N1 => {
            for row in x.as_mut_slice().chunks_exact_mut(s) {
                let norm = row.iter().sum::<f64>() + eps;
                row.iter_mut().for_each(|v| *v /= norm);
            }
        }
        ScaleMethod::Rn1 => {
            let sums = crate::linalg::column_sums(&x);
            for row in x.as_mut_slice().chunks_exact_mut(s) {
                for (v, sum) in row.iter_mut().zip(&sums) {
                    *v /= sum + eps;
                }
            }
        }
        ScaleMethod::G => {
            let mut sorted = x.as_slice().to_vec();
            sorted.sort_by(f64::total_cmp);
            let len = sorted.len();
            let lo = sorted[(len as f64 * GLOBAL_TAIL) as usize];
            let hi = sorted[((len as f64 * (1.0 - GLOBAL_TAIL)) as usize).min(len - 1)];
            let range = (hi - lo).max(eps);
            for v in x.as_mut_slice().iter_mut() {
                *v = (v.clamp(lo, hi) - lo) / range;
            }
        }
        ScaleMethod::Vmax => {
            let mins = column_extreme(&x, f64::min, f64::INFINITY);
            let maxs = column_extreme(&x, f64::max, f64::NEG_INFINITY);
            for row in x.as_mut_slice().chunks_exact_mut(s) {
                for ((v, lo), hi) in row.iter_mut().zip(&mins).zip(&maxs) {
                    *v = (*v - lo) / (hi - lo).max(eps);
                }
            }
        }
    }

    if !x.is_finite() {
        return Err(PnetError::Numerical(format!(
            "normalization {scheme} produced NaN or Inf ({t}x{s} input)"
        )));
    }
    Ok(x)
}

fn column_extreme(x: &Matrix, pick: fn(f64, f64) -> f64, init: f64) -> Vec<f64> {
    let s = x.cols();
    let mut out = vec![init; s];
    for row in x.as_slice().chunks_exact(s) {
        for (o, &v) in out.iter_mut().zip(row) {
            *o = pick(*o, v);
        }
    }
    out
}
