// ─────────────────────────────────────────────────────────────────────
// pNet Kernel — Pipeline
// ─────────────────────────────────────────────────────────────────────
//! End-to-end run over one cohort:
//!   1. Prepare: normalize scans, optionally merge per subject
//!   2. Group FNs: estimate once per cohort + config (cached in the store)
//!   3. Personalize: one independent solve per scan, on the rayon pool
//!   4. Quality control: score every subject, summarize the cohort;
//!      homogeneity is measured on the un-normalized scans

use std::sync::Arc;

use rayon::prelude::*;

use pnet_data::{BrainTemplate, Cohort, SpatialGraph};
use pnet_nmf::{GroupFnEstimator, PersonalizedFnSolver};
use pnet_qc::{QcSummary, QualityControlScorer};
use pnet_types::{
    GroupFnSet, PersonalizedFnSet, PnetConfig, PnetError, PnetResult, QcRecord, Scan,
};

use crate::store::GroupFnStore;

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub group: Arc<GroupFnSet>,
    pub personalized: Vec<PersonalizedFnSet>,
    pub qc: Vec<QcRecord>,
    pub summary: QcSummary,
}

pub struct Pipeline {
    config: PnetConfig,
    n_nodes: Option<usize>,
    graph: Option<Arc<SpatialGraph>>,
    store: Arc<GroupFnStore>,
}

impl Pipeline {
    pub fn new(config: PnetConfig) -> PnetResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            n_nodes: None,
            graph: None,
            store: Arc::new(GroupFnStore::new()),
        })
    }

    /// Fix the node space and derive the spatial graph from a template.
    pub fn with_template(mut self, template: &BrainTemplate) -> Self {
        self.n_nodes = Some(template.n_nodes());
        self.graph = Some(Arc::new(SpatialGraph::from_template(template)));
        self
    }

    pub fn with_graph(mut self, graph: Arc<SpatialGraph>) -> Self {
        self.n_nodes = Some(graph.n_nodes());
        self.graph = Some(graph);
        self
    }

    /// Share a group FN cache between pipelines.
    pub fn with_store(mut self, store: Arc<GroupFnStore>) -> Self {
        self.store = store;
        self
    }

    pub fn config(&self) -> &PnetConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<GroupFnStore> {
        &self.store
    }

    /// Normalized (and, when configured, merged) cohort used for solving.
    pub fn prepare(&self, scans: Vec<Scan>) -> PnetResult<Cohort> {
        Ok(self.load(scans)?.prepared)
    }

    fn load(&self, scans: Vec<Scan>) -> PnetResult<Loaded> {
        let cohort = Cohort::new(scans)?;
        if let Some(n) = self.n_nodes {
            if cohort.n_nodes() != n {
                return Err(PnetError::dimension("cohort nodes vs template", n, cohort.n_nodes()));
            }
        }
        let raw = cohort.merged(&self.config)?;
        let prepared = cohort.prepare(&self.config)?;
        Ok(Loaded { raw, prepared })
    }

    /// Group FNs for `label`, estimated at most once per configuration
    /// and spatial graph.
    pub fn estimate_group(&self, label: &str, cohort: &Cohort) -> PnetResult<Arc<GroupFnSet>> {
        let key = GroupFnStore::key(label, &self.config, self.graph.as_deref());
        self.store.get_or_estimate(&key, || {
            let mut estimator = GroupFnEstimator::new(self.config.decomposition.clone())?;
            if let Some(graph) = &self.graph {
                estimator = estimator.with_graph(graph.clone());
            }
            estimator.estimate(cohort.scans())
        })
    }

    pub fn personalize(
        &self,
        group: &Arc<GroupFnSet>,
        cohort: &Cohort,
    ) -> PnetResult<Vec<PersonalizedFnSet>> {
        let mut solver =
            PersonalizedFnSolver::new(group.clone(), self.config.decomposition.clone())?;
        if let Some(graph) = &self.graph {
            solver = solver.with_graph(graph.clone())?;
        }
        solver.solve_all(cohort.scans(), self.config.parallel)
    }

    /// Score every subject. `cohort` should hold the un-normalized scans
    /// so that homogeneity reflects the acquired signal.
    pub fn quality_control(
        &self,
        group: &GroupFnSet,
        cohort: &Cohort,
        personalized: &[PersonalizedFnSet],
    ) -> PnetResult<(Vec<QcRecord>, QcSummary)> {
        let scorer = QualityControlScorer::new(self.config.qc.clone())?;
        let scans = cohort.scans();
        if scans.len() != personalized.len() {
            return Err(PnetError::dimension("QC subjects", scans.len(), personalized.len()));
        }
        let records = if self.config.parallel {
            scans
                .par_iter()
                .zip(personalized.par_iter())
                .map(|(scan, set)| scorer.score(scan, group, set))
                .collect::<PnetResult<Vec<_>>>()?
        } else {
            scorer.score_all(scans, group, personalized)?
        };
        let summary = QcSummary::from_records(&records);
        Ok((records, summary))
    }

    /// Full run: prepare, estimate (or reuse) group FNs, personalize, QC.
    pub fn run(&self, label: &str, scans: Vec<Scan>) -> PnetResult<PipelineOutcome> {
        let loaded = self.load(scans)?;
        let cohort = &loaded.prepared;
        log::info!(
            "pNet run {label}: {} scans, {} subjects, S={}",
            cohort.len(),
            cohort.subjects().len(),
            cohort.n_nodes()
        );
        let group = self.estimate_group(label, cohort)?;
        self.finish(group, &loaded)
    }

    /// Run with externally supplied group maps, e.g. a published atlas.
    pub fn run_with_group(
        &self,
        group: Arc<GroupFnSet>,
        scans: Vec<Scan>,
    ) -> PnetResult<PipelineOutcome> {
        let loaded = self.load(scans)?;
        group.check_nodes("cohort nodes vs group maps", loaded.prepared.n_nodes())?;
        self.finish(group, &loaded)
    }

    fn finish(&self, group: Arc<GroupFnSet>, loaded: &Loaded) -> PnetResult<PipelineOutcome> {
        let personalized = self.personalize(&group, &loaded.prepared)?;
        let (qc, summary) = self.quality_control(&group, &loaded.raw, &personalized)?;
        if summary.n_failed() > 0 {
            log::warn!(
                "{} of {} subjects failed quality control",
                summary.n_failed(),
                summary.n_subjects()
            );
        }
        Ok(PipelineOutcome {
            group,
            personalized,
            qc,
            summary,
        })
    }
}

/// The same scans before and after normalization, merged alike.
struct Loaded {
    raw: Cohort,
    prepared: Cohort,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pnet_data::VolumeMask;
    use pnet_types::Matrix;

    fn config() -> PnetConfig {
        let mut config = PnetConfig::default();
        config.decomposition.k = 2;
        config.decomposition.max_iterations = 50;
        config
    }

    fn scans(n_nodes: usize) -> Vec<Scan> {
        (0..2)
            .map(|s| {
                let rows: Vec<Vec<f64>> = (0..12)
                    .map(|t| {
                        (0..n_nodes)
                            .map(|v| ((t * (v + 1) + s) % 7) as f64 + 0.5)
                            .collect()
                    })
                    .collect();
                Scan::new(format!("sub-{s}"), Matrix::from_rows(&rows).unwrap()).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut bad = config();
        bad.decomposition.k = 0;
        assert!(Pipeline::new(bad).is_err());
    }

    #[test]
    fn test_template_node_count_enforced() {
        let mask = VolumeMask::new([2, 2, 2], &[1.0; 8]).unwrap();
        let pipeline = Pipeline::new(config())
            .unwrap()
            .with_template(&BrainTemplate::Volume(mask));
        assert!(matches!(
            pipeline.prepare(scans(6)),
            Err(PnetError::Dimension { expected: 8, actual: 6, .. })
        ));
        assert!(pipeline.prepare(scans(8)).is_ok());
    }

    #[test]
    fn test_group_estimated_once_per_label() {
        let pipeline = Pipeline::new(config()).unwrap();
        let cohort = pipeline.prepare(scans(6)).unwrap();
        let a = pipeline.estimate_group("study", &cohort).unwrap();
        let b = pipeline.estimate_group("study", &cohort).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(pipeline.store().len(), 1);
    }

    #[test]
    fn test_run_produces_one_result_per_scan() {
        let outcome = Pipeline::new(config()).unwrap().run("study", scans(6)).unwrap();
        assert_eq!(outcome.group.k(), 2);
        assert_eq!(outcome.personalized.len(), 2);
        assert_eq!(outcome.qc.len(), 2);
        assert_eq!(outcome.summary.n_subjects(), 2);
    }

    #[test]
    fn test_run_with_group_checks_nodes() {
        let group = Arc::new(GroupFnSet::from_maps(Matrix::filled(5, 2, 0.5)).unwrap());
        let err = Pipeline::new(config()).unwrap().run_with_group(group, scans(6));
        assert!(matches!(err, Err(PnetError::Dimension { .. })));
    }
}
