// ─────────────────────────────────────────────────────────────────────
// pNet Kernel — Quality Control Records
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::matrix::Matrix;

/// A personalized network that resembles a different group network more
/// than its own counterpart. Indices are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissMatch {
    /// Index of the personalized network.
    pub personal: usize,
    /// Group network it correlates with most.
    pub group: usize,
}

/// Per-subject quality control outcome.
///
/// A failed network is reported here, never raised as an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QcRecord {
    pub subject_id: String,
    /// Spatial correlation of pFN k with gFN k.
    pub scores: Vec<f64>,
    /// Pass flag per network (threshold and one-to-one correspondence).
    pub passed: Vec<bool>,
    /// `K × K`, entry (i, j) = corr(gFN i, pFN j).
    pub spatial_correspondence: Matrix,
    /// Own-match correlation minus best competing group correlation.
    pub delta_spatial_correspondence: Vec<f64>,
    pub miss_matches: Vec<MissMatch>,
    /// Weighted mean correlation between each pFN time series and every node.
    pub functional_homogeneity: Option<Vec<f64>>,
    /// Same measure computed with the group maps.
    pub functional_homogeneity_control: Option<Vec<f64>>,
}

impl QcRecord {
    pub fn k(&self) -> usize {
        self.scores.len()
    }

    pub fn passed_all(&self) -> bool {
        self.passed.iter().all(|&p| p)
    }

    pub fn failed_networks(&self) -> Vec<usize> {
        self.passed
            .iter()
            .enumerate()
            .filter_map(|(k, &p)| (!p).then_some(k))
            .collect()
    }

    pub fn n_miss_matched(&self) -> usize {
        self.miss_matches.len()
    }

    pub fn mean_score(&self) -> f64 {
        if self.scores.is_empty() {
            return 0.0;
        }
        self.scores.iter().sum::<f64>() / self.scores.len() as f64
    }

    /// Mean homogeneity gain of personalized over group maps, if computed.
    pub fn homogeneity_gain(&self) -> Option<f64> {
        let fh = self.functional_homogeneity.as_ref()?;
        let control = self.functional_homogeneity_control.as_ref()?;
        if fh.is_empty() || fh.len() != control.len() {
            return None;
        }
        let gain: f64 = fh.iter().zip(control).map(|(p, g)| p - g).sum();
        Some(gain / fh.len() as f64)
    }
}
