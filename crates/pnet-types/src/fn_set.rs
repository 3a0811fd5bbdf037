// ─────────────────────────────────────────────────────────────────────
// pNet Kernel — Functional Network Sets
// ─────────────────────────────────────────────────────────────────────
//! Group-level and personalized FN sets plus the convergence report
//! attached to every factorization.

use serde::{Deserialize, Serialize};

use crate::config::DecompositionConfig;
use crate::error::{PnetError, PnetResult};
use crate::matrix::Matrix;

/// Which stopping rule ended an iterative solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// Relative objective change fell below the tolerance.
    Converged,
    /// Iteration cap reached first.
    MaxIterations,
}

/// Outcome of an iterative factorization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceReport {
    pub iterations: usize,
    pub stop_reason: StopReason,
    pub final_objective: f64,
    /// Relative objective change at the last iteration.
    pub relative_change: f64,
    /// Objective after initialisation followed by one value per iteration.
    pub objective_trace: Vec<f64>,
}

impl ConvergenceReport {
    /// Report for maps that were supplied rather than estimated.
    pub fn precomputed() -> Self {
        Self {
            iterations: 0,
            stop_reason: StopReason::Converged,
            final_objective: 0.0,
            relative_change: 0.0,
            objective_trace: Vec::new(),
        }
    }

    pub fn converged(&self) -> bool {
        self.stop_reason == StopReason::Converged
    }
}

/// K group-level spatial maps shared by every subject of a cohort.
///
/// Write-once: there are no mutating accessors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupFnSet {
    maps: Matrix,
    report: ConvergenceReport,
    config: DecompositionConfig,
}

impl GroupFnSet {
    /// Wrap estimated maps (`S × K`). Maps must be finite and non-negative.
    pub fn new(
        maps: Matrix,
        report: ConvergenceReport,
        config: DecompositionConfig,
    ) -> PnetResult<Self> {
        validate_maps(&maps, "group FN maps")?;
        if maps.cols() != config.k {
            return Err(PnetError::dimension("group FN count", config.k, maps.cols()));
        }
        Ok(Self {
            maps,
            report,
            config,
        })
    }

    /// Wrap externally supplied group maps, e.g. a published atlas.
    pub fn from_maps(maps: Matrix) -> PnetResult<Self> {
        let config = DecompositionConfig {
            k: maps.cols(),
            ..DecompositionConfig::default()
        };
        Self::new(maps, ConvergenceReport::precomputed(), config)
    }

    pub fn k(&self) -> usize {
        self.maps.cols()
    }

    pub fn n_nodes(&self) -> usize {
        self.maps.rows()
    }

    pub fn maps(&self) -> &Matrix {
        &self.maps
    }

    /// Spatial map of network `k`.
    pub fn map(&self, k: usize) -> Vec<f64> {
        self.maps.column(k)
    }

    pub fn report(&self) -> &ConvergenceReport {
        &self.report
    }

    pub fn config(&self) -> &DecompositionConfig {
        &self.config
    }

    /// Reject spatial data that does not live on this set's node space.
    pub fn check_nodes(&self, context: &str, n_nodes: usize) -> PnetResult<()> {
        if n_nodes != self.n_nodes() {
            return Err(PnetError::dimension(context, self.n_nodes(), n_nodes));
        }
        Ok(())
    }
}

/// One subject's personalized maps and loadings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonalizedFnSet {
    subject_id: String,
    maps: Matrix,
    loadings: Matrix,
    report: ConvergenceReport,
}

impl PersonalizedFnSet {
    /// `maps` is `S × K`, `loadings` is `T × K`.
    pub fn new(
        subject_id: impl Into<String>,
        maps: Matrix,
        loadings: Matrix,
        report: ConvergenceReport,
    ) -> PnetResult<Self> {
        validate_maps(&maps, "personalized FN maps")?;
        if loadings.cols() != maps.cols() {
            return Err(PnetError::dimension(
                "personalized loadings",
                maps.cols(),
                loadings.cols(),
            ));
        }
        if !loadings.is_finite() {
            return Err(PnetError::Numerical(
                "personalized loadings contain NaN or Inf".into(),
            ));
        }
        Ok(Self {
            subject_id: subject_id.into(),
            maps,
            loadings,
            report,
        })
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn k(&self) -> usize {
        self.maps.cols()
    }

    pub fn n_nodes(&self) -> usize {
        self.maps.rows()
    }

    pub fn n_timepoints(&self) -> usize {
        self.loadings.rows()
    }

    pub fn maps(&self) -> &Matrix {
        &self.maps
    }

    pub fn map(&self, k: usize) -> Vec<f64> {
        self.maps.column(k)
    }

    pub fn loadings(&self) -> &Matrix {
        &self.loadings
    }

    /// Time course of network `k`.
    pub fn loading(&self, k: usize) -> Vec<f64> {
        self.loadings.column(k)
    }

    pub fn report(&self) -> &ConvergenceReport {
        &self.report
    }

    /// Same K and same spatial extent as the group set it came from.
    pub fn check_against(&self, group: &GroupFnSet) -> PnetResult<()> {
        if self.k() != group.k() {
            return Err(PnetError::dimension("personalized FN count", group.k(), self.k()));
        }
        group.check_nodes("personalized FN nodes", self.n_nodes())
    }
}

fn validate_maps(maps: &Matrix, what: &str) -> PnetResult<()> {
    if maps.cols() == 0 || maps.rows() == 0 {
        return Err(PnetError::Validation(format!("{what} are empty")));
    }
    if !maps.is_finite() {
        return Err(PnetError::Numerical(format!("{what} contain NaN or Inf")));
    }
    if !maps.is_non_negative() {
        return Err(PnetError::Validation(format!(
            "{what} must be non-negative (min = {})",
            maps.min_value()
        )));
    }
    Ok(())
}
