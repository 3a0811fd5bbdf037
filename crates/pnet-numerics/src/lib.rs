// ─────────────────────────────────────────────────────────────────────
// pNet Kernel — Numerics
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Pure-Rust numerical building blocks for the pNet kernel:
//!
//!   - `rng`: seeded xorshift64 generator (deterministic initialisation)
//!   - `linalg`: dense products writing into pre-allocated outputs
//!   - `stats`: Pearson correlation between matrix columns
//!   - `normalize`: per-scan shift + scale normalization

pub mod linalg;
pub mod normalize;
pub mod rng;
pub mod stats;

pub use normalize::normalize;
pub use rng::SimpleRng;
pub use stats::{clamp_correlation, column_correlation, pearson};
