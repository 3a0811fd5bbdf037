// ─────────────────────────────────────────────────────────────────────
// pNet Kernel — Group FN Estimator
// ─────────────────────────────────────────────────────────────────────
//! Cohort-level factorization of the time-concatenated scans
//! `X = [X_1; X_2; …]` (`T_total × S`) into K non-negative maps.
//!
//! Per iteration: U update, V update, V columns scaled to unit norm
//! (scale moved into U), objective evaluated. The final networks are
//! sorted by descending energy.
//!
//! Column scaling leaves `U Vᵀ` unchanged but rescales the sparsity and
//! smoothness terms, so the objective trace is non-increasing only when
//! both weights are zero. The stopping rule only needs relative change.

use std::sync::Arc;

use pnet_data::SpatialGraph;
use pnet_numerics::linalg::frobenius_sq;
use pnet_types::{
    DecompositionConfig, GroupFnSet, Matrix, PnetError, PnetResult, Scan, StopReason,
};

use crate::convergence::ConvergenceTracker;
use crate::factors::{Factors, Workspace};
use crate::objective::evaluate;
use crate::updates::{normalize_columns, update_loadings, update_maps, MapTerms};

/// Objective is logged at debug level every this many iterations.
const LOG_EVERY: usize = 50;

pub struct GroupFnEstimator {
    config: DecompositionConfig,
    graph: Option<Arc<SpatialGraph>>,
}

impl GroupFnEstimator {
    pub fn new(config: DecompositionConfig) -> PnetResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            graph: None,
        })
    }

    /// Enable the spatial smoothness term (weight `spatial_weight`).
    pub fn with_graph(mut self, graph: Arc<SpatialGraph>) -> Self {
        self.graph = Some(graph);
        self
    }

    pub fn config(&self) -> &DecompositionConfig {
        &self.config
    }

    /// Estimate K group maps from a cohort of scans sharing S.
    pub fn estimate(&self, scans: &[Scan]) -> PnetResult<GroupFnSet> {
        let first = scans
            .first()
            .ok_or_else(|| PnetError::Config("group estimation needs at least one scan".into()))?;
        let n_nodes = first.n_nodes();
        for scan in scans {
            if scan.n_nodes() != n_nodes {
                return Err(PnetError::dimension(
                    format!("nodes of scan {}", scan.subject_id()),
                    n_nodes,
                    scan.n_nodes(),
                ));
            }
        }
        let blocks: Vec<&Matrix> = scans.iter().map(Scan::data).collect();
        log::info!(
            "group FN estimation: {} scans, K={}",
            scans.len(),
            self.config.k
        );
        self.estimate_matrix(&Matrix::vstack(&blocks)?)
    }

    /// Estimate from an already concatenated `T_total × S` matrix.
    pub fn estimate_matrix(&self, x: &Matrix) -> PnetResult<GroupFnSet> {
        let cfg = &self.config;
        let (t, s) = x.shape();
        if cfg.k > t.min(s) {
            return Err(PnetError::Config(format!(
                "K={} exceeds min(T={t}, S={s})",
                cfg.k
            )));
        }
        if !x.is_non_negative() {
            return Err(PnetError::Validation(format!(
                "group data must be non-negative (min = {}); use a non-negative normalization",
                x.min_value()
            )));
        }
        if let Some(graph) = &self.graph {
            if graph.n_nodes() != s {
                return Err(PnetError::dimension("spatial graph nodes", s, graph.n_nodes()));
            }
        }

        let terms = MapTerms::new(
            None,
            self.graph.as_deref().map(|g| (g, cfg.spatial_weight)),
            cfg.sparsity_weight,
        );
        let mut f = Factors::random(t, s, cfg.k, cfg.seed);
        let mut ws = Workspace::new(t, s, cfg.k);
        let x_sq = frobenius_sq(x);
        normalize_columns(&mut f, cfg.epsilon);

        let mut tracker = ConvergenceTracker::new(cfg);
        tracker.record(evaluate(x, x_sq, &f, &mut ws, &terms)?.total);
        let mut stop = StopReason::MaxIterations;
        for iteration in 1..=cfg.max_iterations {
            update_loadings(x, &mut f, &mut ws, cfg.epsilon)?;
            update_maps(x, &mut f, &mut ws, &terms, cfg.epsilon)?;
            normalize_columns(&mut f, cfg.epsilon);
            f.check_finite("group FN estimation")?;

            let objective = evaluate(x, x_sq, &f, &mut ws, &terms)?;
            if iteration % LOG_EVERY == 0 {
                log::debug!(
                    "group iteration {iteration}: objective {:.6e} (reconstruction {:.6e})",
                    objective.total,
                    objective.reconstruction
                );
            }
            if tracker.record(objective.total) {
                stop = StopReason::Converged;
                break;
            }
        }

        let report = tracker.finish(stop);
        match report.stop_reason {
            StopReason::Converged => log::info!(
                "group FN estimation converged after {} iterations (objective {:.6e})",
                report.iterations,
                report.final_objective
            ),
            StopReason::MaxIterations => log::warn!(
                "group FN estimation hit max_iterations={} (relative change {:.3e} > tolerance {:.1e})",
                cfg.max_iterations,
                report.relative_change,
                cfg.tolerance
            ),
        }

        f.order_by_energy()?;
        GroupFnSet::new(f.v, report, cfg.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pnet_data::synthetic::{generate, SyntheticConfig};
    use pnet_numerics::column_correlation;

    fn small_config() -> DecompositionConfig {
        DecompositionConfig {
            k: 4,
            max_iterations: 300,
            ..DecompositionConfig::default()
        }
    }

    fn cohort() -> Vec<Scan> {
        generate(&SyntheticConfig {
            n_subjects: 3,
            n_timepoints: 40,
            n_nodes: 48,
            max_shift: 0,
            ..SyntheticConfig::default()
        })
        .unwrap()
        .cohort
        .into_scans()
    }

    #[test]
    fn test_output_has_k_maps_of_length_s() {
        let set = GroupFnEstimator::new(small_config())
            .unwrap()
            .estimate(&cohort())
            .unwrap();
        assert_eq!(set.k(), 4);
        assert_eq!(set.n_nodes(), 48);
        assert!(set.maps().is_non_negative());
        assert!(set.report().iterations >= 1);
    }

    #[test]
    fn test_estimation_is_deterministic() {
        let scans = cohort();
        let estimator = GroupFnEstimator::new(small_config()).unwrap();
        let a = estimator.estimate(&scans).unwrap();
        let b = estimator.estimate(&scans).unwrap();
        assert_eq!(a.maps(), b.maps());
        assert_eq!(a.report(), b.report());
    }

    #[test]
    fn test_recovers_ground_truth_networks() {
        let synthetic = generate(&SyntheticConfig {
            n_subjects: 3,
            n_timepoints: 40,
            n_nodes: 48,
            max_shift: 0,
            ..SyntheticConfig::default()
        })
        .unwrap();
        let set = GroupFnEstimator::new(small_config())
            .unwrap()
            .estimate(synthetic.cohort.scans())
            .unwrap();
        let corr = column_correlation(&synthetic.group_maps, set.maps()).unwrap();
        // every true network is matched by some estimated one
        for truth in 0..4 {
            let best = (0..4).map(|j| corr.get(truth, j)).fold(f64::MIN, f64::max);
            assert!(best > 0.8, "network {truth} best correlation {best}");
        }
    }

    #[test]
    fn test_objective_never_increases() {
        let set = GroupFnEstimator::new(small_config())
            .unwrap()
            .estimate(&cohort())
            .unwrap();
        for pair in set.report().objective_trace.windows(2) {
            assert!(pair[1] <= pair[0] * (1.0 + 1e-9) + 1e-9);
        }
    }

    #[test]
    fn test_regularized_estimation_stays_finite() {
        let config = DecompositionConfig {
            sparsity_weight: 0.1,
            spatial_weight: 0.5,
            ..small_config()
        };
        let chain: Vec<(usize, usize)> = (0..47).map(|i| (i, i + 1)).collect();
        let graph = Arc::new(SpatialGraph::from_edges(48, &chain).unwrap());
        let set = GroupFnEstimator::new(config)
            .unwrap()
            .with_graph(graph)
            .estimate(&cohort())
            .unwrap();
        let trace = &set.report().objective_trace;
        assert!(trace.iter().all(|v| v.is_finite() && *v >= 0.0));
        assert!(trace[trace.len() - 1] < trace[0]);
        assert!(set.maps().is_non_negative());
    }

    #[test]
    fn test_max_iterations_reported_not_error() {
        let config = DecompositionConfig {
            max_iterations: 2,
            min_iterations: 1,
            tolerance: 1e-300,
            ..small_config()
        };
        let set = GroupFnEstimator::new(config).unwrap().estimate(&cohort()).unwrap();
        assert_eq!(set.report().stop_reason, StopReason::MaxIterations);
        assert_eq!(set.report().iterations, 2);
        assert_eq!(set.report().objective_trace.len(), 3);
    }

    #[test]
    fn test_empty_cohort_rejected() {
        let err = GroupFnEstimator::new(small_config()).unwrap().estimate(&[]);
        assert!(matches!(err, Err(PnetError::Config(_))));
    }

    #[test]
    fn test_k_too_large_rejected() {
        let config = DecompositionConfig {
            k: 49,
            ..small_config()
        };
        let err = GroupFnEstimator::new(config).unwrap().estimate(&cohort());
        assert!(matches!(err, Err(PnetError::Config(_))));
    }

    #[test]
    fn test_mixed_node_counts_rejected() {
        let mut scans = cohort();
        scans.push(Scan::new("odd", Matrix::filled(10, 47, 1.0)).unwrap());
        let err = GroupFnEstimator::new(small_config()).unwrap().estimate(&scans);
        assert!(matches!(err, Err(PnetError::Dimension { .. })));
    }

    #[test]
    fn test_graph_size_checked() {
        let graph = Arc::new(SpatialGraph::from_edges(10, &[(0, 1)]).unwrap());
        let err = GroupFnEstimator::new(small_config())
            .unwrap()
            .with_graph(graph)
            .estimate(&cohort());
        assert!(matches!(err, Err(PnetError::Dimension { .. })));
    }

    #[test]
    fn test_negative_data_rejected() {
        let scan = Scan::new("neg", Matrix::filled(10, 8, -1.0)).unwrap();
        let err = GroupFnEstimator::new(small_config()).unwrap().estimate(&[scan]);
        assert!(matches!(err, Err(PnetError::Validation(_))));
    }
}
