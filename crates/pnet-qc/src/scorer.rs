// ─────────────────────────────────────────────────────────────────────
// pNet Kernel — Quality Control Scorer
// ─────────────────────────────────────────────────────────────────────
//! Per-subject quality control of personalized FNs against the group.
//!
//! A network passes when its own-match spatial correlation reaches
//! `min_correlation` and it is not mismatched to another group network.
//! Failures are reported in the record and logged, never raised.

use pnet_types::{GroupFnSet, PersonalizedFnSet, PnetError, PnetResult, QcConfig, QcRecord, Scan};

use crate::correspondence::{delta_correspondence, miss_matches, spatial_correspondence};
use crate::homogeneity::functional_homogeneity;

/// Score one subject. `scan` is only read when homogeneity is enabled.
pub fn score_subject(
    scan: &Scan,
    group: &GroupFnSet,
    personal: &PersonalizedFnSet,
    config: &QcConfig,
) -> PnetResult<QcRecord> {
    personal.check_against(group)?;
    let correspondence = spatial_correspondence(group.maps(), personal.maps())?;
    let delta = delta_correspondence(&correspondence);
    let miss_matches = miss_matches(&correspondence, &delta);

    let scores: Vec<f64> = (0..group.k()).map(|k| correspondence.get(k, k)).collect();
    let passed: Vec<bool> = scores
        .iter()
        .zip(&delta)
        .map(|(&score, &d)| score >= config.min_correlation && d >= 0.0)
        .collect();

    let (functional_homogeneity, functional_homogeneity_control) = if config.compute_homogeneity {
        if scan.subject_id() != personal.subject_id() {
            return Err(PnetError::Validation(format!(
                "scan of {} scored against maps of {}",
                scan.subject_id(),
                personal.subject_id()
            )));
        }
        group.check_nodes("homogeneity scan nodes", scan.n_nodes())?;
        (
            Some(functional_homogeneity(scan.data(), personal.maps())?),
            Some(functional_homogeneity(scan.data(), group.maps())?),
        )
    } else {
        (None, None)
    };

    let record = QcRecord {
        subject_id: personal.subject_id().to_string(),
        scores,
        passed,
        spatial_correspondence: correspondence,
        delta_spatial_correspondence: delta,
        miss_matches,
        functional_homogeneity,
        functional_homogeneity_control,
    };

    if !record.passed_all() {
        log::warn!(
            "QC FAILURE for {}: networks {:?} (min correlation {}), {} mismatched",
            record.subject_id,
            record.failed_networks(),
            config.min_correlation,
            record.n_miss_matched()
        );
    }
    Ok(record)
}

/// Config-holding wrapper over [`score_subject`].
#[derive(Debug, Clone)]
pub struct QualityControlScorer {
    config: QcConfig,
}

impl QualityControlScorer {
    pub fn new(config: QcConfig) -> PnetResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &QcConfig {
        &self.config
    }

    pub fn score(
        &self,
        scan: &Scan,
        group: &GroupFnSet,
        personal: &PersonalizedFnSet,
    ) -> PnetResult<QcRecord> {
        score_subject(scan, group, personal, &self.config)
    }

    /// Score scans and personalized sets pairwise, in order.
    pub fn score_all(
        &self,
        scans: &[Scan],
        group: &GroupFnSet,
        personal: &[PersonalizedFnSet],
    ) -> PnetResult<Vec<QcRecord>> {
        if scans.len() != personal.len() {
            return Err(PnetError::dimension("QC subjects", scans.len(), personal.len()));
        }
        scans
            .iter()
            .zip(personal)
            .map(|(scan, set)| self.score(scan, group, set))
            .collect()
    }
}
