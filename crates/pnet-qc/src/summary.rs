// ─────────────────────────────────────────────────────────────────────
// pNet Kernel — Cohort QC Summary
// ─────────────────────────────────────────────────────────────────────

use std::fmt;

use serde::{Deserialize, Serialize};

use pnet_types::QcRecord;

/// One subject's line in the summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectQc {
    pub subject_id: String,
    pub mean_score: f64,
    pub failed_networks: Vec<usize>,
    pub n_miss_matched: usize,
    pub homogeneity_gain: Option<f64>,
}

/// Aggregate of many [`QcRecord`]s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QcSummary {
    pub subjects: Vec<SubjectQc>,
}

impl QcSummary {
    pub fn from_records(records: &[QcRecord]) -> Self {
        let subjects = records
            .iter()
            .map(|r| SubjectQc {
                subject_id: r.subject_id.clone(),
                mean_score: r.mean_score(),
                failed_networks: r.failed_networks(),
                n_miss_matched: r.n_miss_matched(),
                homogeneity_gain: r.homogeneity_gain(),
            })
            .collect();
        Self { subjects }
    }

    pub fn n_subjects(&self) -> usize {
        self.subjects.len()
    }

    /// Subjects with at least one failed network.
    pub fn n_failed(&self) -> usize {
        self.subjects
            .iter()
            .filter(|s| !s.failed_networks.is_empty())
            .count()
    }

    pub fn failed_subjects(&self) -> Vec<&str> {
        self.subjects
            .iter()
            .filter(|s| !s.failed_networks.is_empty())
            .map(|s| s.subject_id.as_str())
            .collect()
    }

    pub fn total_miss_matches(&self) -> usize {
        self.subjects.iter().map(|s| s.n_miss_matched).sum()
    }

    pub fn mean_score(&self) -> f64 {
        if self.subjects.is_empty() {
            return 0.0;
        }
        self.subjects.iter().map(|s| s.mean_score).sum::<f64>() / self.subjects.len() as f64
    }
}

impl fmt::Display for QcSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Quality control: {} subjects, {} failed", self.n_subjects(), self.n_failed())?;
        writeln!(f, "Mean spatial correspondence: {:.4}", self.mean_score())?;
        writeln!(f, "Miss-matched networks: {}", self.total_miss_matches())?;
        for s in &self.subjects {
            let status = if s.failed_networks.is_empty() { "PASS" } else { "FAIL" };
            write!(f, "  {status} {}  score {:.4}", s.subject_id, s.mean_score)?;
            if !s.failed_networks.is_empty() {
                write!(f, "  failed {:?}", s.failed_networks)?;
            }
            if s.n_miss_matched > 0 {
                write!(f, "  miss-matched {}", s.n_miss_matched)?;
            }
            if let Some(gain) = s.homogeneity_gain {
                write!(f, "  FH gain {gain:+.4}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pnet_types::{Matrix, MissMatch};

    fn record(id: &str, passed: Vec<bool>, miss: usize) -> QcRecord {
        let k = passed.len();
        QcRecord {
            subject_id: id.into(),
            scores: vec![0.5; k],
            passed,
            spatial_correspondence: Matrix::zeros(k, k),
            delta_spatial_correspondence: vec![0.1; k],
            miss_matches: (0..miss).map(|j| MissMatch { personal: j, group: j + 1 }).collect(),
            functional_homogeneity: Some(vec![0.6; k]),
            functional_homogeneity_control: Some(vec![0.5; k]),
        }
    }

    #[test]
    fn test_counts() {
        let summary = QcSummary::from_records(&[
            record("a", vec![true, true], 0),
            record("b", vec![false, true], 1),
            record("c", vec![true, false], 0),
        ]);
        assert_eq!(summary.n_subjects(), 3);
        assert_eq!(summary.n_failed(), 2);
        assert_eq!(summary.failed_subjects(), vec!["b", "c"]);
        assert_eq!(summary.total_miss_matches(), 1);
        assert!((summary.mean_score() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_display_report() {
        let summary = QcSummary::from_records(&[
            record("a", vec![true], 0),
            record("b", vec![false], 1),
        ]);
        let text = summary.to_string();
        assert!(text.starts_with("Quality control: 2 subjects, 1 failed"));
        assert!(text.contains("PASS a"));
        assert!(text.contains("FAIL b"));
        assert!(text.contains("failed [0]"));
        assert!(text.contains("FH gain +0.1000"));
    }

    #[test]
    fn test_empty_summary() {
        let summary = QcSummary::from_records(&[]);
        assert_eq!(summary.n_failed(), 0);
        assert_eq!(summary.mean_score(), 0.0);
    }
}
