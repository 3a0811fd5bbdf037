// ─────────────────────────────────────────────────────────────────────
// pNet Kernel — Data
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! In-memory data layer: brain templates, 4D ↔ 2D reshaping, spatial
//! adjacency graphs and cohort assembly. No file formats are read here;
//! callers hand over arrays already loaded from NIfTI / MGH / MAT.

pub mod cohort;
pub mod graph;
pub mod reshape;
pub mod synthetic;
pub mod template;

pub use cohort::Cohort;
pub use graph::SpatialGraph;
pub use reshape::{maps_to_volume, matrix_to_volume, volume_to_maps, volume_to_matrix, Volume4};
pub use template::{BrainTemplate, Hemisphere, MaskPolarity, SurfaceTemplate, VolumeMask};
