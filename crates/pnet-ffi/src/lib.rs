// ─────────────────────────────────────────────────────────────────────
// pNet Kernel — PyO3 FFI Bindings
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
// Note: #[deny(unsafe_code)] not applied: PyO3 proc macros generate
// unsafe blocks internally. All hand-written code in this crate is safe.
//! Python-callable wrappers around the pNet kernel.
//!
//! Exposes `PnetConfig`, `GroupFnEstimator`, `PersonalizedFnSolver`,
//! `QualityControlScorer`, `Pipeline` and their result types to Python.
//!
//! # FFI Conventions
//!
//! - Matrices cross the boundary as row lists: `data[t][v]` for a scan,
//!   `maps[v][k]` for FN maps.
//! - Every `PnetError` becomes a Python `ValueError`.
//! - Solves release the GIL via `Python::allow_threads`.
//!
//! Install: `pip install -e crates/pnet-ffi` (requires maturin).
//!
//! Usage from Python:
//! ```python
//! from pnet_kernel import PnetConfig, Pipeline
//!
//! config = PnetConfig(k=17)
//! outcome = Pipeline(config).run("study", ["sub-01", "sub-02"], [x1, x2])
//! print(outcome.summary)
//! ```

use std::sync::Arc;

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use pnet_core::{Pipeline, PipelineOutcome};
use pnet_data::{BrainTemplate, VolumeMask};
use pnet_nmf::{GroupFnEstimator, PersonalizedFnSolver};
use pnet_qc::{QcSummary, QualityControlScorer};
use pnet_types::{
    GroupFnSet, Matrix, Normalization, PersonalizedFnSet, PnetConfig, PnetError, QcRecord, Scan,
};

// ─── Conversions ────────────────────────────────────────────────────

fn py_err(e: PnetError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn to_matrix(rows: &[Vec<f64>]) -> PyResult<Matrix> {
    Matrix::from_rows(rows).map_err(py_err)
}

fn to_scans(subjects: Vec<String>, data: Vec<Vec<Vec<f64>>>) -> PyResult<Vec<Scan>> {
    if subjects.len() != data.len() {
        return Err(PyValueError::new_err(format!(
            "{} subject ids for {} scans",
            subjects.len(),
            data.len()
        )));
    }
    subjects
        .into_iter()
        .zip(data)
        .map(|(id, rows)| Scan::new(id, to_matrix(&rows)?).map_err(py_err))
        .collect()
}

// ─── PyPnetConfig ───────────────────────────────────────────────────

/// Python-visible run configuration.
#[pyclass(name = "PnetConfig")]
#[derive(Clone)]
struct PyPnetConfig {
    inner: PnetConfig,
}

#[pymethods]
impl PyPnetConfig {
    #[new]
    #[pyo3(signature = (
        k = 17,
        max_iterations = 1000,
        min_iterations = 10,
        tolerance = 1e-6,
        seed = 42,
        spatial_weight = 0.0,
        sparsity_weight = 0.0,
        group_prior_weight = 1.0,
        normalization = "vp-vmax",
        combine_scans = false,
        min_correlation = 0.2,
        compute_homogeneity = true,
        parallel = true,
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        k: usize,
        max_iterations: usize,
        min_iterations: usize,
        tolerance: f64,
        seed: u64,
        spatial_weight: f64,
        sparsity_weight: f64,
        group_prior_weight: f64,
        normalization: &str,
        combine_scans: bool,
        min_correlation: f64,
        compute_homogeneity: bool,
        parallel: bool,
    ) -> PyResult<Self> {
        let mut config = PnetConfig {
            normalization: Normalization::parse(normalization).map_err(py_err)?,
            combine_scans,
            parallel,
            ..PnetConfig::default()
        };
        let d = &mut config.decomposition;
        d.k = k;
        d.max_iterations = max_iterations;
        d.min_iterations = min_iterations;
        d.tolerance = tolerance;
        d.seed = seed;
        d.spatial_weight = spatial_weight;
        d.sparsity_weight = sparsity_weight;
        d.group_prior_weight = group_prior_weight;
        config.qc.min_correlation = min_correlation;
        config.qc.compute_homogeneity = compute_homogeneity;
        config.validate().map_err(py_err)?;
        Ok(Self { inner: config })
    }

    /// Construct from JSON string.
    #[staticmethod]
    fn from_json(json: &str) -> PyResult<Self> {
        let config = PnetConfig::from_json(json).map_err(py_err)?;
        config.validate().map_err(py_err)?;
        Ok(Self { inner: config })
    }

    fn to_json(&self) -> PyResult<String> {
        self.inner.to_json().map_err(py_err)
    }

    #[getter]
    fn k(&self) -> usize {
        self.inner.decomposition.k
    }

    #[getter]
    fn normalization(&self) -> String {
        self.inner.normalization.to_string()
    }

    fn __repr__(&self) -> String {
        format!(
            "PnetConfig(k={}, max_iterations={}, normalization={})",
            self.inner.decomposition.k,
            self.inner.decomposition.max_iterations,
            self.inner.normalization
        )
    }
}

// ─── PyGroupFnSet ───────────────────────────────────────────────────

/// Cohort-level FN maps.
#[pyclass(name = "GroupFnSet")]
#[derive(Clone)]
struct PyGroupFnSet {
    inner: Arc<GroupFnSet>,
}

#[pymethods]
impl PyGroupFnSet {
    /// Wrap externally supplied maps (S x K).
    #[new]
    fn new(maps: Vec<Vec<f64>>) -> PyResult<Self> {
        let set = GroupFnSet::from_maps(to_matrix(&maps)?).map_err(py_err)?;
        Ok(Self {
            inner: Arc::new(set),
        })
    }

    #[getter]
    fn k(&self) -> usize {
        self.inner.k()
    }

    #[getter]
    fn n_nodes(&self) -> usize {
        self.inner.n_nodes()
    }

    #[getter]
    fn maps(&self) -> Vec<Vec<f64>> {
        self.inner.maps().to_rows()
    }

    #[getter]
    fn iterations(&self) -> usize {
        self.inner.report().iterations
    }

    #[getter]
    fn converged(&self) -> bool {
        self.inner.report().converged()
    }

    #[getter]
    fn objective_trace(&self) -> Vec<f64> {
        self.inner.report().objective_trace.clone()
    }

    fn __repr__(&self) -> String {
        format!(
            "GroupFnSet(k={}, n_nodes={}, iterations={})",
            self.inner.k(),
            self.inner.n_nodes(),
            self.inner.report().iterations
        )
    }
}

// ─── PyPersonalizedFnSet ────────────────────────────────────────────

/// One subject's FN maps and loadings.
#[pyclass(name = "PersonalizedFnSet")]
#[derive(Clone)]
struct PyPersonalizedFnSet {
    inner: PersonalizedFnSet,
}

#[pymethods]
impl PyPersonalizedFnSet {
    #[getter]
    fn subject_id(&self) -> &str {
        self.inner.subject_id()
    }

    #[getter]
    fn maps(&self) -> Vec<Vec<f64>> {
        self.inner.maps().to_rows()
    }

    #[getter]
    fn loadings(&self) -> Vec<Vec<f64>> {
        self.inner.loadings().to_rows()
    }

    #[getter]
    fn iterations(&self) -> usize {
        self.inner.report().iterations
    }

    #[getter]
    fn converged(&self) -> bool {
        self.inner.report().converged()
    }

    fn __repr__(&self) -> String {
        format!(
            "PersonalizedFnSet(subject={}, k={}, iterations={})",
            self.inner.subject_id(),
            self.inner.k(),
            self.inner.report().iterations
        )
    }
}

// ─── PyQcRecord ─────────────────────────────────────────────────────

/// Per-subject quality control result.
#[pyclass(name = "QcRecord")]
#[derive(Clone)]
struct PyQcRecord {
    inner: QcRecord,
}

#[pymethods]
impl PyQcRecord {
    #[getter]
    fn subject_id(&self) -> &str {
        &self.inner.subject_id
    }

    #[getter]
    fn scores(&self) -> Vec<f64> {
        self.inner.scores.clone()
    }

    #[getter]
    fn passed(&self) -> Vec<bool> {
        self.inner.passed.clone()
    }

    #[getter]
    fn passed_all(&self) -> bool {
        self.inner.passed_all()
    }

    #[getter]
    fn failed_networks(&self) -> Vec<usize> {
        self.inner.failed_networks()
    }

    fn to_dict<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let r = &self.inner;
        let dict = PyDict::new(py);
        dict.set_item("subject_id", &r.subject_id)?;
        dict.set_item("scores", r.scores.clone())?;
        dict.set_item("passed", r.passed.clone())?;
        dict.set_item("spatial_correspondence", r.spatial_correspondence.to_rows())?;
        dict.set_item("delta_spatial_correspondence", r.delta_spatial_correspondence.clone())?;
        let miss: Vec<(usize, usize)> =
            r.miss_matches.iter().map(|m| (m.personal, m.group)).collect();
        dict.set_item("miss_matches", miss)?;
        dict.set_item("functional_homogeneity", r.functional_homogeneity.clone())?;
        dict.set_item(
            "functional_homogeneity_control",
            r.functional_homogeneity_control.clone(),
        )?;
        Ok(dict)
    }

    fn __repr__(&self) -> String {
        format!(
            "QcRecord(subject={}, mean_score={:.4}, failed={:?})",
            self.inner.subject_id,
            self.inner.mean_score(),
            self.inner.failed_networks()
        )
    }
}

// ─── PyGroupFnEstimator ─────────────────────────────────────────────

#[pyclass(name = "GroupFnEstimator")]
struct PyGroupFnEstimator {
    inner: GroupFnEstimator,
}

#[pymethods]
impl PyGroupFnEstimator {
    #[new]
    fn new(config: &PyPnetConfig) -> PyResult<Self> {
        let inner = GroupFnEstimator::new(config.inner.decomposition.clone()).map_err(py_err)?;
        Ok(Self { inner })
    }

    /// Estimate group maps from already-normalized scans.
    fn estimate(
        &self,
        py: Python<'_>,
        subjects: Vec<String>,
        data: Vec<Vec<Vec<f64>>>,
    ) -> PyResult<PyGroupFnSet> {
        let scans = to_scans(subjects, data)?;
        let set = py
            .allow_threads(|| self.inner.estimate(&scans))
            .map_err(py_err)?;
        Ok(PyGroupFnSet {
            inner: Arc::new(set),
        })
    }
}

// ─── PyPersonalizedFnSolver ─────────────────────────────────────────

#[pyclass(name = "PersonalizedFnSolver")]
struct PyPersonalizedFnSolver {
    inner: PersonalizedFnSolver,
}

#[pymethods]
impl PyPersonalizedFnSolver {
    #[new]
    fn new(group: &PyGroupFnSet, config: &PyPnetConfig) -> PyResult<Self> {
        let inner = PersonalizedFnSolver::new(group.inner.clone(), config.inner.decomposition.clone())
            .map_err(py_err)?;
        Ok(Self { inner })
    }

    fn solve(
        &self,
        py: Python<'_>,
        subject_id: String,
        data: Vec<Vec<f64>>,
    ) -> PyResult<PyPersonalizedFnSet> {
        let scan = Scan::new(subject_id, to_matrix(&data)?).map_err(py_err)?;
        let set = py.allow_threads(|| self.inner.solve(&scan)).map_err(py_err)?;
        Ok(PyPersonalizedFnSet { inner: set })
    }

    /// Reconstruction error of the group maps alone, after fitting
    /// loadings only.
    fn baseline_error(&self, py: Python<'_>, subject_id: String, data: Vec<Vec<f64>>) -> PyResult<f64> {
        let scan = Scan::new(subject_id, to_matrix(&data)?).map_err(py_err)?;
        let baseline = py.allow_threads(|| self.inner.baseline(&scan)).map_err(py_err)?;
        Ok(baseline.reconstruction_error)
    }
}

// ─── PyQualityControlScorer ─────────────────────────────────────────

#[pyclass(name = "QualityControlScorer")]
struct PyQualityControlScorer {
    inner: QualityControlScorer,
}

#[pymethods]
impl PyQualityControlScorer {
    #[new]
    fn new(config: &PyPnetConfig) -> PyResult<Self> {
        let inner = QualityControlScorer::new(config.inner.qc.clone()).map_err(py_err)?;
        Ok(Self { inner })
    }

    fn score(
        &self,
        data: Vec<Vec<f64>>,
        group: &PyGroupFnSet,
        personal: &PyPersonalizedFnSet,
    ) -> PyResult<PyQcRecord> {
        let scan =
            Scan::new(personal.inner.subject_id(), to_matrix(&data)?).map_err(py_err)?;
        let record = self
            .inner
            .score(&scan, &group.inner, &personal.inner)
            .map_err(py_err)?;
        Ok(PyQcRecord { inner: record })
    }
}

// ─── PyPipelineOutcome ──────────────────────────────────────────────

#[pyclass(name = "PipelineOutcome")]
struct PyPipelineOutcome {
    group: Arc<GroupFnSet>,
    personalized: Vec<PersonalizedFnSet>,
    qc: Vec<QcRecord>,
    summary: QcSummary,
}

impl From<PipelineOutcome> for PyPipelineOutcome {
    fn from(outcome: PipelineOutcome) -> Self {
        Self {
            group: outcome.group,
            personalized: outcome.personalized,
            qc: outcome.qc,
            summary: outcome.summary,
        }
    }
}

#[pymethods]
impl PyPipelineOutcome {
    #[getter]
    fn group(&self) -> PyGroupFnSet {
        PyGroupFnSet {
            inner: self.group.clone(),
        }
    }

    #[getter]
    fn personalized<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyList>> {
        let list = PyList::empty(py);
        for set in &self.personalized {
            list.append(PyPersonalizedFnSet { inner: set.clone() })?;
        }
        Ok(list)
    }

    #[getter]
    fn qc<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyList>> {
        let list = PyList::empty(py);
        for record in &self.qc {
            list.append(PyQcRecord {
                inner: record.clone(),
            })?;
        }
        Ok(list)
    }

    #[getter]
    fn summary(&self) -> String {
        self.summary.to_string()
    }

    #[getter]
    fn failed_subjects(&self) -> Vec<String> {
        self.summary
            .failed_subjects()
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}

// ─── PyPipeline ─────────────────────────────────────────────────────

/// Normalize, estimate group FNs, personalize and QC a cohort.
#[pyclass(name = "Pipeline")]
struct PyPipeline {
    inner: Pipeline,
}

#[pymethods]
impl PyPipeline {
    /// `mask_dims` and `mask` describe an optional volume mask; when
    /// given, scans must have one column per in-mask voxel and the
    /// spatial graph follows voxel adjacency.
    #[new]
    #[pyo3(signature = (config, mask_dims = None, mask = None))]
    fn new(
        config: &PyPnetConfig,
        mask_dims: Option<[usize; 3]>,
        mask: Option<Vec<f64>>,
    ) -> PyResult<Self> {
        let mut pipeline = Pipeline::new(config.inner.clone()).map_err(py_err)?;
        match (mask_dims, mask) {
            (Some(dims), Some(values)) => {
                let mask = VolumeMask::new(dims, &values).map_err(py_err)?;
                pipeline = pipeline.with_template(&BrainTemplate::Volume(mask));
            }
            (None, None) => {}
            _ => {
                return Err(PyValueError::new_err(
                    "mask_dims and mask must be given together",
                ))
            }
        }
        Ok(Self { inner: pipeline })
    }

    fn run(
        &self,
        py: Python<'_>,
        label: &str,
        subjects: Vec<String>,
        data: Vec<Vec<Vec<f64>>>,
    ) -> PyResult<PyPipelineOutcome> {
        let scans = to_scans(subjects, data)?;
        let outcome = py
            .allow_threads(|| self.inner.run(label, scans))
            .map_err(py_err)?;
        Ok(outcome.into())
    }

    /// Personalize against supplied group maps instead of estimating.
    fn run_with_group(
        &self,
        py: Python<'_>,
        group: &PyGroupFnSet,
        subjects: Vec<String>,
        data: Vec<Vec<Vec<f64>>>,
    ) -> PyResult<PyPipelineOutcome> {
        let scans = to_scans(subjects, data)?;
        let group = group.inner.clone();
        let outcome = py
            .allow_threads(|| self.inner.run_with_group(group, scans))
            .map_err(py_err)?;
        Ok(outcome.into())
    }

    #[getter]
    fn cached_groups(&self) -> Vec<String> {
        self.inner.store().keys()
    }
}

// ─── Module ─────────────────────────────────────────────────────────

#[pymodule]
fn pnet_kernel(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Configuration and results
    m.add_class::<PyPnetConfig>()?;
    m.add_class::<PyGroupFnSet>()?;
    m.add_class::<PyPersonalizedFnSet>()?;
    m.add_class::<PyQcRecord>()?;
    // Solvers
    m.add_class::<PyGroupFnEstimator>()?;
    m.add_class::<PyPersonalizedFnSolver>()?;
    m.add_class::<PyQualityControlScorer>()?;
    // End to end
    m.add_class::<PyPipeline>()?;
    m.add_class::<PyPipelineOutcome>()?;
    Ok(())
}
