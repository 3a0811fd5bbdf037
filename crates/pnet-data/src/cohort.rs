// ─────────────────────────────────────────────────────────────────────
// pNet Kernel — Cohort Assembly
// ─────────────────────────────────────────────────────────────────────
//! A list of scans that share one spatial domain, plus the per-study
//! preparation step (normalize each scan, optionally merge the scans of
//! each subject along time).

use pnet_numerics::normalize;
use pnet_types::{Matrix, Normalization, PnetConfig, PnetError, PnetResult, Scan};

#[derive(Debug, Clone)]
pub struct Cohort {
    scans: Vec<Scan>,
}

impl Cohort {
    /// Every scan must cover the same number of nodes.
    pub fn new(scans: Vec<Scan>) -> PnetResult<Self> {
        let first = scans
            .first()
            .ok_or_else(|| PnetError::Validation("cohort has no scans".into()))?;
        let n_nodes = first.n_nodes();
        if let Some(bad) = scans.iter().find(|s| s.n_nodes() != n_nodes) {
            return Err(PnetError::dimension(
                format!("nodes of scan {}", bad.subject_id()),
                n_nodes,
                bad.n_nodes(),
            ));
        }
        Ok(Self { scans })
    }

    pub fn scans(&self) -> &[Scan] {
        &self.scans
    }

    pub fn into_scans(self) -> Vec<Scan> {
        self.scans
    }

    pub fn len(&self) -> usize {
        self.scans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scans.is_empty()
    }

    pub fn n_nodes(&self) -> usize {
        self.scans[0].n_nodes()
    }

    pub fn total_timepoints(&self) -> usize {
        self.scans.iter().map(Scan::n_timepoints).sum()
    }

    /// Distinct subject ids in order of first appearance.
    pub fn subjects(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for scan in &self.scans {
            if !out.contains(&scan.subject_id()) {
                out.push(scan.subject_id());
            }
        }
        out
    }

    /// All scans stacked along time (`T_total × S`).
    pub fn concatenated(&self) -> PnetResult<Matrix> {
        let blocks: Vec<&Matrix> = self.scans.iter().map(Scan::data).collect();
        Matrix::vstack(&blocks)
    }

    pub fn normalized(&self, scheme: Normalization) -> PnetResult<Self> {
        if scheme.is_none() {
            return Ok(self.clone());
        }
        let scans = self
            .scans
            .iter()
            .map(|scan| scan.with_data(normalize(scan.data(), scheme)?))
            .collect::<PnetResult<Vec<_>>>()?;
        Ok(Self { scans })
    }

    /// One scan per subject: that subject's scans concatenated along time
    /// in input order. Session is dropped when more than one scan merged.
    pub fn combine_by_subject(&self) -> PnetResult<Self> {
        let mut scans = Vec::new();
        for subject in self.subjects() {
            let own: Vec<&Scan> = self
                .scans
                .iter()
                .filter(|s| s.subject_id() == subject)
                .collect();
            if let [only] = own.as_slice() {
                scans.push((*only).clone());
                continue;
            }
            let blocks: Vec<&Matrix> = own.iter().map(|s| s.data()).collect();
            let mut merged = Scan::new(subject, Matrix::vstack(&blocks)?)?;
            if let Some(tr) = own[0].repetition_time() {
                merged = merged.with_repetition_time(tr);
            }
            log::debug!("combined {} scans of {subject}", own.len());
            scans.push(merged);
        }
        Ok(Self { scans })
    }

    /// Merge per subject when configured, without normalizing.
    pub fn merged(&self, config: &PnetConfig) -> PnetResult<Self> {
        if config.combine_scans {
            self.combine_by_subject()
        } else {
            Ok(self.clone())
        }
    }

    /// Normalize every scan, then merge per subject when configured.
    pub fn prepare(&self, config: &PnetConfig) -> PnetResult<Self> {
        self.normalized(config.normalization)?.merged(config)
    }
}
