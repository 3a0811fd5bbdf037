// ─────────────────────────────────────────────────────────────────────
// pNet Kernel — Configuration
// ─────────────────────────────────────────────────────────────────────

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PnetError, PnetResult};

/// Factorization parameters shared by the group estimator and the
/// personalized solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecompositionConfig {
    /// Number of functional networks K.
    /// Default: 17.
    pub k: usize,

    /// Iteration cap; doubles as the solve timeout.
    /// Default: 1000.
    pub max_iterations: usize,

    /// Iterations run before the convergence test is consulted.
    /// Default: 10.
    pub min_iterations: usize,

    /// Stop when the relative objective change falls below this.
    /// Default: 1e-6.
    pub tolerance: f64,

    /// Denominator floor for multiplicative updates.
    /// Default: 1e-12.
    pub epsilon: f64,

    /// Seed for factor initialisation.
    /// Default: 42.
    pub seed: u64,

    /// λ_s: weight of the spatial smoothness term tr(VᵀLV).
    /// Only active when a spatial graph is supplied. Default: 0.0.
    pub spatial_weight: f64,

    /// λ_1: L1 sparsity weight on the maps. Default: 0.0.
    pub sparsity_weight: f64,

    /// λ_g: pull of personalized maps towards the group maps.
    /// Default: 1.0.
    pub group_prior_weight: f64,

    /// Loading-only updates run against the group maps before the
    /// personalized alternation starts. Default: 50.
    pub loading_warmup_iterations: usize,
}

impl Default for DecompositionConfig {
    fn default() -> Self {
        Self {
            k: 17,
            max_iterations: 1000,
            min_iterations: 10,
            tolerance: 1e-6,
            epsilon: 1e-12,
            seed: 42,
            spatial_weight: 0.0,
            sparsity_weight: 0.0,
            group_prior_weight: 1.0,
            loading_warmup_iterations: 50,
        }
    }
}

impl DecompositionConfig {
    pub fn validate(&self) -> PnetResult<()> {
        if self.k < 1 {
            return Err(PnetError::Config(format!("k must be >= 1, got {}", self.k)));
        }
        if self.max_iterations < 1 {
            return Err(PnetError::Config(
                "max_iterations must be >= 1".to_string(),
            ));
        }
        if self.min_iterations > self.max_iterations {
            return Err(PnetError::Config(format!(
                "min_iterations ({}) must not exceed max_iterations ({})",
                self.min_iterations, self.max_iterations
            )));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(PnetError::Config(format!(
                "tolerance must be > 0, got {}",
                self.tolerance
            )));
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(PnetError::Config(format!(
                "epsilon must be > 0, got {}",
                self.epsilon
            )));
        }
        for (name, value) in [
            ("spatial_weight", self.spatial_weight),
            ("sparsity_weight", self.sparsity_weight),
            ("group_prior_weight", self.group_prior_weight),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(PnetError::Config(format!(
                    "{name} must be finite and >= 0, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Quality control thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QcConfig {
    /// A network fails when its pFN–gFN spatial correlation is below this.
    /// Default: 0.2.
    pub min_correlation: f64,

    /// Compute functional homogeneity (needs the subject's scan).
    /// Default: true.
    pub compute_homogeneity: bool,
}

impl Default for QcConfig {
    fn default() -> Self {
        Self {
            min_correlation: 0.2,
            compute_homogeneity: true,
        }
    }
}

impl QcConfig {
    pub fn validate(&self) -> PnetResult<()> {
        if !(-1.0..=1.0).contains(&self.min_correlation) {
            return Err(PnetError::Config(format!(
                "min_correlation must be in [-1, 1], got {}",
                self.min_correlation
            )));
        }
        Ok(())
    }
}

/// Shift step applied before scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftMethod {
    None,
    /// Standard score of each time point across nodes.
    Z,
    /// Remove negative values globally.
    Gp,
    /// Remove negative values node by node.
    Vp,
}

/// Scaling step applied after the shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMethod {
    None,
    /// L2 norm of each time point.
    N2,
    /// L1 norm of each time point.
    N1,
    /// L1 norm of each node.
    Rn1,
    /// Global robust min-max (0.1% tails clipped).
    G,
    /// Min-max of each node.
    Vmax,
}

/// Two-stage data normalization, written as `"<shift>-<scale>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Normalization {
    pub shift: ShiftMethod,
    pub scale: ScaleMethod,
}

impl Normalization {
    pub const NONE: Normalization = Normalization {
        shift: ShiftMethod::None,
        scale: ScaleMethod::None,
    };

    pub const VP_VMAX: Normalization = Normalization {
        shift: ShiftMethod::Vp,
        scale: ScaleMethod::Vmax,
    };

    /// Parse `"none"` or `"<shift>-<scale>"`, e.g. `"vp-vmax"`, `"z-n2"`.
    pub fn parse(name: &str) -> PnetResult<Self> {
        let lower = name.trim().to_ascii_lowercase();
        if lower == "none" || lower.is_empty() {
            return Ok(Self::NONE);
        }
        let (shift, scale) = lower
            .split_once('-')
            .ok_or_else(|| PnetError::Config(format!("unsupported normalization: {name}")))?;
        let shift = match shift {
            "none" => ShiftMethod::None,
            "z" => ShiftMethod::Z,
            "gp" => ShiftMethod::Gp,
            "vp" => ShiftMethod::Vp,
            other => {
                return Err(PnetError::Config(format!(
                    "unsupported normalization shift: {other}"
                )))
            }
        };
        let scale = match scale {
            "none" => ScaleMethod::None,
            "n2" => ScaleMethod::N2,
            "n1" => ScaleMethod::N1,
            "rn1" => ScaleMethod::Rn1,
            "g" => ScaleMethod::G,
            "vmax" => ScaleMethod::Vmax,
            other => {
                return Err(PnetError::Config(format!(
                    "unsupported normalization scale: {other}"
                )))
            }
        };
        Ok(Self { shift, scale })
    }

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }
}

impl Default for Normalization {
    fn default() -> Self {
        Self::VP_VMAX
    }
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return f.write_str("none");
        }
        let shift = match self.shift {
            ShiftMethod::None => "none",
            ShiftMethod::Z => "z",
            ShiftMethod::Gp => "gp",
            ShiftMethod::Vp => "vp",
        };
        let scale = match self.scale {
            ScaleMethod::None => "none",
            ScaleMethod::N2 => "n2",
            ScaleMethod::N1 => "n1",
            ScaleMethod::Rn1 => "rn1",
            ScaleMethod::G => "g",
            ScaleMethod::Vmax => "vmax",
        };
        write!(f, "{shift}-{scale}")
    }
}

impl TryFrom<String> for Normalization {
    type Error = PnetError;

    fn try_from(value: String) -> PnetResult<Self> {
        Self::parse(&value)
    }
}

impl From<Normalization> for String {
    fn from(value: Normalization) -> Self {
        value.to_string()
    }
}

/// Runtime configuration for a full pNet run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PnetConfig {
    pub decomposition: DecompositionConfig,
    pub qc: QcConfig,

    /// Per-scan normalization applied before any factorization.
    /// Default: vp-vmax.
    pub normalization: Normalization,

    /// Concatenate all scans of a subject before personalization.
    /// Default: false.
    pub combine_scans: bool,

    /// Solve subjects on the rayon pool. Default: true.
    pub parallel: bool,
}

impl Default for PnetConfig {
    fn default() -> Self {
        Self {
            decomposition: DecompositionConfig::default(),
            qc: QcConfig::default(),
            normalization: Normalization::default(),
            combine_scans: false,
            parallel: true,
        }
    }
}

impl PnetConfig {
    pub fn validate(&self) -> PnetResult<()> {
        self.decomposition.validate()?;
        self.qc.validate()
    }

    /// Load from JSON string. Missing fields take their defaults.
    pub fn from_json(json: &str) -> PnetResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| PnetError::Config(format!("JSON parse error: {e}")))
    }

    pub fn to_json(&self) -> PnetResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| PnetError::Config(format!("JSON encode error: {e}")))
    }

    /// Stable identity of everything that influences group estimation.
    pub fn group_fingerprint(&self) -> String {
        let d = &self.decomposition;
        format!(
            "k={};it={}/{};tol={:e};eps={:e};seed={};ls={:e};l1={:e};norm={};combine={}",
            d.k,
            d.min_iterations,
            d.max_iterations,
            d.tolerance,
            d.epsilon,
            d.seed,
            d.spatial_weight,
            d.sparsity_weight,
            self.normalization,
            self.combine_scans,
        )
    }
}
