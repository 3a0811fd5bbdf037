// ─────────────────────────────────────────────────────────────────────
// pNet Kernel — Factorization
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Non-negative matrix factorization of fMRI data into functional
//! networks.
//!
//! Architecture:
//!   - Factors / Workspace: pre-allocated U, V and scratch products
//!   - Updates: multiplicative rules with prior, graph and L1 terms
//!   - Objective: per-term breakdown via the trace expansion
//!   - ConvergenceTracker: relative-change stopping rule
//!   - GroupFnEstimator: cohort-level maps (single coordinated solve)
//!   - PersonalizedFnSolver: per-subject maps anchored to the group

pub mod convergence;
pub mod factors;
pub mod group;
pub mod objective;
pub mod personal;
pub mod updates;

pub use convergence::ConvergenceTracker;
pub use factors::{Factors, Workspace};
pub use group::GroupFnEstimator;
pub use objective::{reconstruction_error, ObjectiveBreakdown};
pub use personal::{Baseline, PersonalizedFnSolver};
pub use updates::MapTerms;
