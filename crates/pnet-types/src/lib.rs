// ─────────────────────────────────────────────────────────────────────
// pNet Kernel — Types
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Type definitions, configuration, and error hierarchy for the
//! pNet kernel: personalized functional network modeling of fMRI data.
//!
//! Conventions shared by every crate in the workspace:
//!
//! - Time series are `T × S` matrices (time points × spatial nodes).
//! - Functional network maps are `S × K` (one column per network).
//! - Loadings (network time courses) are `T × K`.

pub mod config;
pub mod error;
pub mod fn_set;
pub mod matrix;
pub mod qc;
pub mod scan;

pub use config::{DecompositionConfig, Normalization, PnetConfig, QcConfig, ScaleMethod, ShiftMethod};
pub use error::{PnetError, PnetResult};
pub use fn_set::{ConvergenceReport, GroupFnSet, PersonalizedFnSet, StopReason};
pub use matrix::Matrix;
pub use qc::{MissMatch, QcRecord};
pub use scan::Scan;
