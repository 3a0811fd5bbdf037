// ─────────────────────────────────────────────────────────────────────
// pNet Kernel — Functional Homogeneity
// ─────────────────────────────────────────────────────────────────────
//! How well each network's time series explains the nodes it covers.
//!
//! For maps P (`S × K`) over a scan X (`T × S`):
//!
//! ```text
//! s_k  = X p_k / Σ_v p_{v,k}
//! FH_k = Σ_v corr(s_k, x_v) · p_{v,k} / Σ_v p_{v,k}
//! ```

use pnet_numerics::column_correlation;
use pnet_numerics::linalg::{column_sums, matmul, scale_columns};
use pnet_types::{Matrix, PnetError, PnetResult};

/// Loading-weighted mean time series of every network (`T × K`).
/// A map with zero total weight yields an all-zero series.
pub fn network_time_series(x: &Matrix, maps: &Matrix) -> PnetResult<Matrix> {
    if x.cols() != maps.rows() {
        return Err(PnetError::dimension("homogeneity map nodes", x.cols(), maps.rows()));
    }
    let mut series = matmul(x, maps)?;
    let inv: Vec<f64> = column_sums(maps)
        .into_iter()
        .map(|s| if s > 0.0 { 1.0 / s } else { 0.0 })
        .collect();
    scale_columns(&mut series, &inv);
    Ok(series)
}

/// `FH_k` for every network. Empty maps score 0.
pub fn functional_homogeneity(x: &Matrix, maps: &Matrix) -> PnetResult<Vec<f64>> {
    let series = network_time_series(x, maps)?;
    // S × K: node v against network k
    let corr = column_correlation(x, &series)?;
    let k = maps.cols();
    let mut weighted = vec![0.0; k];
    for (c_row, p_row) in corr.as_slice().chunks_exact(k).zip(maps.as_slice().chunks_exact(k)) {
        for ((w, c), p) in weighted.iter_mut().zip(c_row).zip(p_row) {
            *w += c * p;
        }
    }
    Ok(weighted
        .into_iter()
        .zip(column_sums(maps))
        .map(|(w, s)| if s > 0.0 { w / s } else { 0.0 })
        .collect())
}
