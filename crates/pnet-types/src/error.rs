// ─────────────────────────────────────────────────────────────────────
// pNet Kernel — Error Hierarchy
// ─────────────────────────────────────────────────────────────────────

use thiserror::Error;

/// Root error type for all pNet kernel failures.
///
/// Non-convergence and failed quality control are deliberately absent:
/// both are reported through result values, never raised.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PnetError {
    /// Invalid parameter (K, weights, tolerances, unknown scheme names).
    #[error("config error: {0}")]
    Config(String),

    /// Spatial or temporal extents disagree.
    #[error("dimension mismatch in {context}: expected {expected}, got {actual}")]
    Dimension {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// Malformed input data (empty scans, non-finite samples, bad indices).
    #[error("validation error: {0}")]
    Validation(String),

    /// Numerical error (NaN/Inf in computation).
    #[error("numerical error: {0}")]
    Numerical(String),
}

impl PnetError {
    pub fn dimension(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::Dimension {
            context: context.into(),
            expected,
            actual,
        }
    }
}

pub type PnetResult<T> = Result<T, PnetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_message() {
        let err = PnetError::dimension("scan sub-01", 100, 90);
        assert_eq!(
            err.to_string(),
            "dimension mismatch in scan sub-01: expected 100, got 90"
        );
    }

    #[test]
    fn test_config_message() {
        let err = PnetError::Config("k must be >= 1".into());
        assert_eq!(err.to_string(), "config error: k must be >= 1");
    }
}
