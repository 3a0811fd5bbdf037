// ─────────────────────────────────────────────────────────────────────
// pNet Kernel — Personalized FN Solver
// ─────────────────────────────────────────────────────────────────────
//! Per-subject factorization regularized towards the group maps G:
//!
//! ```text
//! ||X − U Vᵀ||²_F + λ_g ||V − G||²_F + λ_s tr(Vᵀ L V) + 2λ_1 ||V||_1
//! ```
//!
//! V starts at G and U is first fitted with V held fixed; that fit is
//! the group-projection baseline. Alternating updates then move V away
//! from G only where the subject's data pays for it.
//!
//! The solver only borrows the group set, so one `Arc<GroupFnSet>` can
//! serve any number of concurrent solves.

use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use pnet_data::SpatialGraph;
use pnet_numerics::linalg::frobenius_sq;
use pnet_types::{
    DecompositionConfig, GroupFnSet, Matrix, PersonalizedFnSet, PnetError, PnetResult, Scan,
    StopReason,
};

use crate::convergence::ConvergenceTracker;
use crate::factors::{Factors, Workspace};
use crate::objective::{evaluate, reconstruction_error};
use crate::updates::{update_loadings, update_maps, MapTerms};

/// Group maps with loadings fitted to one scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Baseline {
    pub loadings: Matrix,
    /// `||X − U Gᵀ||²_F`.
    pub reconstruction_error: f64,
}

pub struct PersonalizedFnSolver {
    group: Arc<GroupFnSet>,
    config: DecompositionConfig,
    graph: Option<Arc<SpatialGraph>>,
}

impl PersonalizedFnSolver {
    pub fn new(group: Arc<GroupFnSet>, config: DecompositionConfig) -> PnetResult<Self> {
        config.validate()?;
        if config.k != group.k() {
            return Err(PnetError::dimension("personalized K", group.k(), config.k));
        }
        Ok(Self {
            group,
            config,
            graph: None,
        })
    }

    /// Enable the spatial smoothness term. The graph must cover the
    /// group maps' nodes.
    pub fn with_graph(mut self, graph: Arc<SpatialGraph>) -> PnetResult<Self> {
        self.group.check_nodes("spatial graph nodes", graph.n_nodes())?;
        self.graph = Some(graph);
        Ok(self)
    }

    pub fn group(&self) -> &Arc<GroupFnSet> {
        &self.group
    }

    pub fn config(&self) -> &DecompositionConfig {
        &self.config
    }

    fn check_scan(&self, scan: &Scan) -> PnetResult<()> {
        self.group.check_nodes(
            &format!("nodes of scan {}", scan.subject_id()),
            scan.n_nodes(),
        )?;
        if !scan.data().is_non_negative() {
            return Err(PnetError::Validation(format!(
                "scan of {} must be non-negative (min = {})",
                scan.subject_id(),
                scan.data().min_value()
            )));
        }
        Ok(())
    }

    /// Fit loadings against the fixed group maps.
    fn warm_start(&self, x: &Matrix, ws: &mut Workspace) -> PnetResult<Factors> {
        let cfg = &self.config;
        let mut f = Factors::with_maps(x.rows(), self.group.maps().clone(), cfg.seed);
        for _ in 0..cfg.loading_warmup_iterations {
            update_loadings(x, &mut f, ws, cfg.epsilon)?;
        }
        f.check_finite("loading warm-up")?;
        Ok(f)
    }

    /// Group-projection baseline for one scan.
    pub fn baseline(&self, scan: &Scan) -> PnetResult<Baseline> {
        self.check_scan(scan)?;
        let x = scan.data();
        let mut ws = Workspace::new(x.rows(), x.cols(), self.group.k());
        let f = self.warm_start(x, &mut ws)?;
        let reconstruction_error = reconstruction_error(x, &f.u, &f.v)?;
        Ok(Baseline {
            loadings: f.u,
            reconstruction_error,
        })
    }

    /// Personalized maps and loadings for one scan.
    pub fn solve(&self, scan: &Scan) -> PnetResult<PersonalizedFnSet> {
        self.check_scan(scan)?;
        let cfg = &self.config;
        let subject = scan.subject_id();
        let x = scan.data();
        let (t, s) = x.shape();
        log::info!("personalizing {subject}: T={t}, S={s}, K={}", cfg.k);

        let mut ws = Workspace::new(t, s, cfg.k);
        let mut f = self.warm_start(x, &mut ws)?;
        let terms = MapTerms::new(
            Some((self.group.maps(), cfg.group_prior_weight)),
            self.graph.as_deref().map(|g| (g, cfg.spatial_weight)),
            cfg.sparsity_weight,
        );
        let x_sq = frobenius_sq(x);

        let mut tracker = ConvergenceTracker::new(cfg);
        tracker.record(evaluate(x, x_sq, &f, &mut ws, &terms)?.total);
        let mut stop = StopReason::MaxIterations;
        for _ in 0..cfg.max_iterations {
            update_loadings(x, &mut f, &mut ws, cfg.epsilon)?;
            update_maps(x, &mut f, &mut ws, &terms, cfg.epsilon)?;
            f.check_finite(subject)?;
            if tracker.record(evaluate(x, x_sq, &f, &mut ws, &terms)?.total) {
                stop = StopReason::Converged;
                break;
            }
        }

        let report = tracker.finish(stop);
        if report.converged() {
            log::info!("{subject} converged after {} iterations", report.iterations);
        } else {
            log::warn!(
                "{subject} hit max_iterations={} (relative change {:.3e})",
                cfg.max_iterations,
                report.relative_change
            );
        }
        PersonalizedFnSet::new(subject, f.v, f.u, report)
    }

    /// Solve every scan; on the rayon pool when `parallel` is set.
    /// Output order follows input order.
    pub fn solve_all(&self, scans: &[Scan], parallel: bool) -> PnetResult<Vec<PersonalizedFnSet>> {
        if parallel {
            scans.par_iter().map(|scan| self.solve(scan)).collect()
        } else {
            scans.iter().map(|scan| self.solve(scan)).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::GroupFnEstimator;
    use pnet_data::synthetic::{generate, SyntheticCohort, SyntheticConfig};

    fn config() -> DecompositionConfig {
        DecompositionConfig {
            k: 4,
            max_iterations: 200,
            ..DecompositionConfig::default()
        }
    }

    fn synthetic() -> SyntheticCohort {
        generate(&SyntheticConfig {
            n_subjects: 3,
            n_timepoints: 40,
            n_nodes: 48,
            max_shift: 2,
            ..SyntheticConfig::default()
        })
        .unwrap()
    }

    fn solver() -> (PersonalizedFnSolver, SyntheticCohort) {
        let data = synthetic();
        let group = GroupFnEstimator::new(config())
            .unwrap()
            .estimate(data.cohort.scans())
            .unwrap();
        (
            PersonalizedFnSolver::new(Arc::new(group), config()).unwrap(),
            data,
        )
    }

    #[test]
    fn test_solve_shapes() {
        let (solver, data) = solver();
        let scan = &data.cohort.scans()[0];
        let set = solver.solve(scan).unwrap();
        assert_eq!(set.subject_id(), scan.subject_id());
        assert_eq!(set.k(), 4);
        assert_eq!(set.n_nodes(), 48);
        assert_eq!(set.n_timepoints(), 40);
        assert!(set.check_against(solver.group()).is_ok());
    }

    #[test]
    fn test_reconstruction_not_worse_than_baseline() {
        let (solver, data) = solver();
        for scan in data.cohort.scans() {
            let baseline = solver.baseline(scan).unwrap();
            let set = solver.solve(scan).unwrap();
            let personal = reconstruction_error(scan.data(), set.loadings(), set.maps()).unwrap();
            assert!(
                personal <= baseline.reconstruction_error * (1.0 + 1e-9) + 1e-12,
                "{personal} > {}",
                baseline.reconstruction_error
            );
        }
    }

    #[test]
    fn test_strong_prior_keeps_group_maps() {
        let data = synthetic();
        let group = Arc::new(
            GroupFnEstimator::new(config())
                .unwrap()
                .estimate(data.cohort.scans())
                .unwrap(),
        );
        let stiff = DecompositionConfig {
            group_prior_weight: 1e8,
            ..config()
        };
        let solver = PersonalizedFnSolver::new(group.clone(), stiff).unwrap();
        let set = solver.solve(&data.cohort.scans()[1]).unwrap();
        for (p, g) in set.maps().as_slice().iter().zip(group.maps().as_slice()) {
            assert!((p - g).abs() < 1e-3);
        }
    }

    #[test]
    fn test_solve_all_parallel_matches_serial() {
        let (solver, data) = solver();
        let serial = solver.solve_all(data.cohort.scans(), false).unwrap();
        let parallel = solver.solve_all(data.cohort.scans(), true).unwrap();
        assert_eq!(serial.len(), 3);
        for (a, b) in serial.iter().zip(&parallel) {
            assert_eq!(a.subject_id(), b.subject_id());
            assert_eq!(a.maps(), b.maps());
        }
    }

    #[test]
    fn test_node_mismatch_rejected() {
        let (solver, _) = solver();
        let scan = Scan::new("short", Matrix::filled(10, 47, 0.5)).unwrap();
        assert!(matches!(solver.solve(&scan), Err(PnetError::Dimension { .. })));
        assert!(matches!(solver.baseline(&scan), Err(PnetError::Dimension { .. })));
    }

    #[test]
    fn test_k_mismatch_rejected() {
        let group = Arc::new(GroupFnSet::from_maps(Matrix::filled(6, 2, 0.5)).unwrap());
        assert!(PersonalizedFnSolver::new(group, config()).is_err());
    }

    #[test]
    fn test_graph_must_cover_group_nodes() {
        let group = Arc::new(GroupFnSet::from_maps(Matrix::filled(6, 4, 0.5)).unwrap());
        let solver = PersonalizedFnSolver::new(group, config()).unwrap();
        let graph = Arc::new(SpatialGraph::from_edges(5, &[]).unwrap());
        assert!(solver.with_graph(graph).is_err());
    }

    #[test]
    fn test_negative_prior_weight_rejected() {
        let group = Arc::new(GroupFnSet::from_maps(Matrix::filled(6, 4, 0.5)).unwrap());
        let bad = DecompositionConfig {
            group_prior_weight: -1.0,
            ..config()
        };
        assert!(matches!(
            PersonalizedFnSolver::new(group, bad),
            Err(PnetError::Config(_))
        ));
    }
}
