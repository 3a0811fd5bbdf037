// ─────────────────────────────────────────────────────────────────────
// pNet Kernel — Core Engine
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Personalized functional network modeling, end to end.
//!
//! # Invariants
//!
//! 1. **Group maps are write-once**: a `GroupFnSet` is estimated at most
//!    once per cohort label and configuration fingerprint, then shared
//!    read-only as `Arc<GroupFnSet>`.
//!
//! 2. **Personalized solves are independent**: each subject owns its
//!    factors and workspace; the only shared state is the group set, so
//!    subjects run in parallel on the rayon pool.
//!
//! 3. **Shapes are checked before solving**: every personalized set has
//!    the group's K and S, and mismatches surface as
//!    `PnetError::Dimension` before any iteration runs.
//!
//! 4. **Soft failures are data**: non-convergence lands in the
//!    `ConvergenceReport`, failed networks in the `QcRecord`; both are
//!    logged with `warn!` and never raised as errors.

pub mod pipeline;
pub mod store;

pub use pipeline::{Pipeline, PipelineOutcome};
pub use store::GroupFnStore;

pub use pnet_data::{BrainTemplate, Cohort, SpatialGraph};
pub use pnet_nmf::{Baseline, GroupFnEstimator, PersonalizedFnSolver};
pub use pnet_qc::{score_subject, QcSummary, QualityControlScorer};
pub use pnet_types::{
    DecompositionConfig, GroupFnSet, Matrix, Normalization, PersonalizedFnSet, PnetConfig,
    PnetError, PnetResult, QcConfig, QcRecord, Scan,
};
