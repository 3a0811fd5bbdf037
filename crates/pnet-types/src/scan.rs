// ─────────────────────────────────────────────────────────────────────
// pNet Kernel — Scan
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::error::{PnetError, PnetResult};
use crate::matrix::Matrix;

/// One fMRI acquisition reduced to a `T × S` matrix over the brain mask.
///
/// Immutable once built: every consumer borrows it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scan {
    subject_id: String,
    session: Option<String>,
    repetition_time: Option<f64>,
    data: Matrix,
}

impl Scan {
    /// Validate and wrap a subject's time series.
    pub fn new(subject_id: impl Into<String>, data: Matrix) -> PnetResult<Self> {
        let subject_id = subject_id.into();
        if subject_id.trim().is_empty() {
            return Err(PnetError::Validation("subject id must not be empty".into()));
        }
        if data.rows() == 0 || data.cols() == 0 {
            return Err(PnetError::Validation(format!(
                "scan of {subject_id} is empty ({}x{})",
                data.rows(),
                data.cols()
            )));
        }
        if !data.is_finite() {
            return Err(PnetError::Validation(format!(
                "scan of {subject_id} contains NaN or Inf"
            )));
        }
        Ok(Self {
            subject_id,
            session: None,
            repetition_time: None,
            data,
        })
    }

    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }

    /// Repetition time in seconds.
    pub fn with_repetition_time(mut self, seconds: f64) -> Self {
        self.repetition_time = Some(seconds);
        self
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }

    pub fn repetition_time(&self) -> Option<f64> {
        self.repetition_time
    }

    pub fn data(&self) -> &Matrix {
        &self.data
    }

    pub fn n_timepoints(&self) -> usize {
        self.data.rows()
    }

    pub fn n_nodes(&self) -> usize {
        self.data.cols()
    }

    /// Same identity, new data (used by normalization and scan combining).
    pub fn with_data(&self, data: Matrix) -> PnetResult<Self> {
        let mut scan = Scan::new(self.subject_id.clone(), data)?;
        scan.session = self.session.clone();
        scan.repetition_time = self.repetition_time;
        Ok(scan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_shape() {
        let scan = Scan::new("sub-01", Matrix::filled(20, 100, 1.0)).unwrap();
        assert_eq!(scan.n_timepoints(), 20);
        assert_eq!(scan.n_nodes(), 100);
        assert_eq!(scan.subject_id(), "sub-01");
        assert!(scan.session().is_none());
    }

    #[test]
    fn test_empty_scan_rejected() {
        assert!(Scan::new("sub-01", Matrix::zeros(0, 10)).is_err());
        assert!(Scan::new("", Matrix::zeros(2, 2)).is_err());
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut m = Matrix::zeros(2, 2);
        m.set(0, 0, f64::INFINITY);
        let err = Scan::new("sub-01", m).unwrap_err();
        assert!(matches!(err, PnetError::Validation(_)));
    }

    #[test]
    fn test_with_data_keeps_metadata() {
        let scan = Scan::new("sub-02", Matrix::zeros(3, 4))
            .unwrap()
            .with_session("ses-1")
            .with_repetition_time(0.72);
        let next = scan.with_data(Matrix::filled(5, 4, 2.0)).unwrap();
        assert_eq!(next.session(), Some("ses-1"));
        assert_eq!(next.repetition_time(), Some(0.72));
        assert_eq!(next.n_timepoints(), 5);
    }
}
