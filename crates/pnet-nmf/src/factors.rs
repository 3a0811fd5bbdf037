// ─────────────────────────────────────────────────────────────────────
// pNet Kernel — Factor State
// ─────────────────────────────────────────────────────────────────────
//! Pre-allocated state for one factorization `X ≈ U Vᵀ`.
//!
//! `Factors` holds the loadings U (`T × K`) and maps V (`S × K`).
//! `Workspace` holds every intermediate product the multiplicative
//! updates need, sized once so the iteration loop does not allocate.

use pnet_numerics::linalg::column_norms;
use pnet_numerics::SimpleRng;
use pnet_types::{Matrix, PnetError, PnetResult};

/// Lower bound for random initial factors; exact zeros never move under
/// multiplicative updates.
const INIT_FLOOR: f64 = 1e-2;

#[derive(Debug, Clone)]
pub struct Factors {
    /// Loadings, `T × K`.
    pub u: Matrix,
    /// Spatial maps, `S × K`.
    pub v: Matrix,
}

impl Factors {
    /// Uniform random U and V drawn from one seeded stream (U first).
    pub fn random(t: usize, s: usize, k: usize, seed: u64) -> Self {
        let mut rng = SimpleRng::new(seed);
        let mut u = Matrix::zeros(t, k);
        let mut v = Matrix::zeros(s, k);
        rng.fill_uniform(u.as_mut_slice(), INIT_FLOOR, 1.0);
        rng.fill_uniform(v.as_mut_slice(), INIT_FLOOR, 1.0);
        Self { u, v }
    }

    /// Maps fixed to `v`, loadings random.
    pub fn with_maps(t: usize, v: Matrix, seed: u64) -> Self {
        let mut rng = SimpleRng::new(seed);
        let mut u = Matrix::zeros(t, v.cols());
        rng.fill_uniform(u.as_mut_slice(), INIT_FLOOR, 1.0);
        Self { u, v }
    }

    pub fn k(&self) -> usize {
        self.v.cols()
    }

    pub fn check_finite(&self, context: &str) -> PnetResult<()> {
        if !self.u.is_finite() || !self.v.is_finite() {
            return Err(PnetError::Numerical(format!(
                "{context}: factors contain NaN or Inf"
            )));
        }
        Ok(())
    }

    /// ‖u_k‖ · ‖v_k‖ per network.
    pub fn energies(&self) -> Vec<f64> {
        column_norms(&self.u)
            .into_iter()
            .zip(column_norms(&self.v))
            .map(|(a, b)| a * b)
            .collect()
    }

    /// Reorder networks by descending energy; ties keep their index order.
    /// Returns the applied order (new position → old column).
    pub fn order_by_energy(&mut self) -> PnetResult<Vec<usize>> {
        let energy = self.energies();
        let mut order: Vec<usize> = (0..energy.len()).collect();
        order.sort_by(|&a, &b| energy[b].total_cmp(&energy[a]));
        self.u = self.u.permute_columns(&order)?;
        self.v = self.v.permute_columns(&order)?;
        Ok(order)
    }
}

/// Scratch products reused across iterations.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// X V, `T × K`.
    pub xv: Matrix,
    /// Xᵀ U, `S × K`.
    pub xtu: Matrix,
    /// Vᵀ V, `K × K`.
    pub vtv: Matrix,
    /// Uᵀ U, `K × K`.
    pub utu: Matrix,
    /// U VᵀV, `T × K`.
    pub u_denom: Matrix,
    /// V UᵀU, `S × K`.
    pub v_denom: Matrix,
    /// W V, `S × K` (only touched when a graph term is active).
    pub wv: Matrix,
}

impl Workspace {
    pub fn new(t: usize, s: usize, k: usize) -> Self {
        Self {
            xv: Matrix::zeros(t, k),
            xtu: Matrix::zeros(s, k),
            vtv: Matrix::zeros(k, k),
            utu: Matrix::zeros(k, k),
            u_denom: Matrix::zeros(t, k),
            v_denom: Matrix::zeros(s, k),
            wv: Matrix::zeros(s, k),
        }
    }

    pub fn for_factors(f: &Factors) -> Self {
        Self::new(f.u.rows(), f.v.rows(), f.k())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_dimensions_and_range() {
        let f = Factors::random(20, 50, 4, 42);
        assert_eq!(f.u.shape(), (20, 4));
        assert_eq!(f.v.shape(), (50, 4));
        assert!(f.u.as_slice().iter().all(|&v| (INIT_FLOOR..1.0).contains(&v)));
        assert!(f.v.as_slice().iter().all(|&v| (INIT_FLOOR..1.0).contains(&v)));
    }

    #[test]
    fn test_random_is_seeded() {
        let a = Factors::random(5, 6, 2, 9);
        let b = Factors::random(5, 6, 2, 9);
        let c = Factors::random(5, 6, 2, 10);
        assert_eq!(a.u, b.u);
        assert_eq!(a.v, b.v);
        assert_ne!(a.v, c.v);
    }

    #[test]
    fn test_order_by_energy() {
        let mut f = Factors {
            u: Matrix::from_rows(&[vec![1.0, 3.0, 2.0]]).unwrap(),
            v: Matrix::from_rows(&[vec![1.0, 1.0, 1.0]]).unwrap(),
        };
        let order = f.order_by_energy().unwrap();
        assert_eq!(order, vec![1, 2, 0]);
        assert_eq!(f.u.row(0), &[3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_check_finite() {
        let mut f = Factors::random(2, 2, 1, 1);
        assert!(f.check_finite("test").is_ok());
        f.v.set(0, 0, f64::NAN);
        assert!(matches!(f.check_finite("test"), Err(PnetError::Numerical(_))));
    }

    #[test]
    fn test_workspace_shapes() {
        let ws = Workspace::new(10, 30, 3);
        assert_eq!(ws.xv.shape(), (10, 3));
        assert_eq!(ws.xtu.shape(), (30, 3));
        assert_eq!(ws.vtv.shape(), (3, 3));
    }
}
