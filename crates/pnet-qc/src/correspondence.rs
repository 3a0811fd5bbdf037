// ─────────────────────────────────────────────────────────────────────
// pNet Kernel — Spatial Correspondence
// ─────────────────────────────────────────────────────────────────────
//! One-to-one correspondence between group maps G and personalized
//! maps P, both `S × K`.
//!
//! `C[i][j] = corr(g_i, p_j)` over space. pFN j is matched when its own
//! group network beats every other one, i.e. `delta[j] ≥ 0` with
//! `delta[j] = C[j][j] − max_{i≠j} C[i][j]`.

use pnet_numerics::column_correlation;
use pnet_types::{Matrix, MissMatch, PnetError, PnetResult};

/// Subtracted from the diagonal before taking the column max, which
/// excludes it (correlations never go below −1). With K = 1 the delta
/// is therefore 2.
const DIAGONAL_EXCLUSION: f64 = 2.0;

/// `K × K` correlation between every gFN and every pFN.
pub fn spatial_correspondence(group: &Matrix, personal: &Matrix) -> PnetResult<Matrix> {
    if group.rows() != personal.rows() {
        return Err(PnetError::dimension(
            "personalized map nodes",
            group.rows(),
            personal.rows(),
        ));
    }
    if group.cols() != personal.cols() {
        return Err(PnetError::dimension(
            "personalized map count",
            group.cols(),
            personal.cols(),
        ));
    }
    column_correlation(group, personal)
}

/// Own-match correlation minus the best competing group correlation.
pub fn delta_correspondence(correspondence: &Matrix) -> Vec<f64> {
    let k = correspondence.cols();
    (0..k)
        .map(|j| {
            let competitor = (0..k)
                .map(|i| {
                    let c = correspondence.get(i, j);
                    if i == j {
                        c - DIAGONAL_EXCLUSION
                    } else {
                        c
                    }
                })
                .fold(f64::NEG_INFINITY, f64::max);
            correspondence.get(j, j) - competitor
        })
        .collect()
}

/// Every pFN with a negative delta, paired with the gFN it correlates
/// with most.
pub fn miss_matches(correspondence: &Matrix, delta: &[f64]) -> Vec<MissMatch> {
    delta
        .iter()
        .enumerate()
        .filter(|&(_, &d)| d < 0.0)
        .map(|(j, _)| MissMatch {
            personal: j,
            group: argmax_column(correspondence, j),
        })
        .collect()
}

/// First row index holding the column maximum.
fn argmax_column(m: &Matrix, col: usize) -> usize {
    let mut best = 0;
    for i in 1..m.rows() {
        if m.get(i, col) > m.get(best, col) {
            best = i;
        }
    }
    best
}
