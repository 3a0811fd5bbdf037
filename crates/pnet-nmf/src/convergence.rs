// ─────────────────────────────────────────────────────────────────────
// pNet Kernel — Stopping Rule
// ─────────────────────────────────────────────────────────────────────

use pnet_types::{ConvergenceReport, DecompositionConfig, StopReason};

/// Records the objective trace and decides when a solve has converged.
///
/// Converged once at least `min_iterations` updates ran and
/// `|J_{t-1} − J_t| / max(|J_{t-1}|, ε) < tolerance`.
#[derive(Debug, Clone)]
pub struct ConvergenceTracker {
    tolerance: f64,
    min_iterations: usize,
    eps: f64,
    trace: Vec<f64>,
    relative_change: f64,
}

impl ConvergenceTracker {
    pub fn new(config: &DecompositionConfig) -> Self {
        Self {
            tolerance: config.tolerance,
            min_iterations: config.min_iterations,
            eps: config.epsilon,
            trace: Vec::with_capacity(config.max_iterations + 1),
            relative_change: f64::INFINITY,
        }
    }

    /// Updates recorded so far (the initial objective is not an update).
    pub fn iterations(&self) -> usize {
        self.trace.len().saturating_sub(1)
    }

    pub fn last(&self) -> Option<f64> {
        self.trace.last().copied()
    }

    /// Push the next objective value; `true` when the rule is satisfied.
    pub fn record(&mut self, objective: f64) -> bool {
        if let Some(previous) = self.last() {
            self.relative_change = (previous - objective).abs() / previous.abs().max(self.eps);
        }
        self.trace.push(objective);
        self.iterations() >= self.min_iterations.max(1) && self.relative_change < self.tolerance
    }

    pub fn finish(self, stop_reason: StopReason) -> ConvergenceReport {
        ConvergenceReport {
            iterations: self.iterations(),
            stop_reason,
            final_objective: self.last().unwrap_or(0.0),
            relative_change: self.relative_change,
            objective_trace: self.trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(min_iterations: usize) -> DecompositionConfig {
        DecompositionConfig {
            tolerance: 1e-3,
            min_iterations,
            ..DecompositionConfig::default()
        }
    }

    #[test]
    fn test_initial_value_never_converges() {
        let mut t = ConvergenceTracker::new(&config(0));
        assert!(!t.record(10.0));
        assert!(t.record(10.0));
        assert_eq!(t.iterations(), 1);
    }

    #[test]
    fn test_min_iterations_respected() {
        let mut t = ConvergenceTracker::new(&config(3));
        assert!(!t.record(5.0));
        assert!(!t.record(5.0));
        assert!(!t.record(5.0));
        assert!(t.record(5.0));
    }

    #[test]
    fn test_large_change_keeps_running() {
        let mut t = ConvergenceTracker::new(&config(0));
        t.record(10.0);
        assert!(!t.record(5.0));
        let report = t.finish(StopReason::MaxIterations);
        assert_eq!(report.iterations, 1);
        assert_eq!(report.objective_trace, vec![10.0, 5.0]);
        assert!((report.relative_change - 0.5).abs() < 1e-12);
        assert_eq!(report.final_objective, 5.0);
        assert!(!report.converged());
    }
}
