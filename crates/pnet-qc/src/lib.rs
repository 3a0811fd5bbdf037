// ─────────────────────────────────────────────────────────────────────
// pNet Kernel — Quality Control
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Quality control of personalized functional networks.
//!
//! Two measures per subject:
//! - **Spatial correspondence**: every pFN must resemble its own gFN
//!   more than any other gFN, and at least `min_correlation`.
//! - **Functional homogeneity**: weighted mean correlation between a
//!   network's time series and the nodes it covers, with the group maps
//!   as control.
//!
//! All functions are pure; nothing here mutates shared state.

pub mod correspondence;
pub mod homogeneity;
pub mod scorer;
pub mod summary;

pub use correspondence::{delta_correspondence, miss_matches, spatial_correspondence};
pub use homogeneity::{functional_homogeneity, network_time_series};
pub use scorer::{score_subject, QualityControlScorer};
pub use summary::{QcSummary, SubjectQc};
