// ─────────────────────────────────────────────────────────────────────
// pNet Kernel — Spatial Adjacency Graph
// ─────────────────────────────────────────────────────────────────────
//! Node adjacency used by the spatial smoothness term.
//!
//! Volume: 6-connected face neighbours inside the mask.
//! Surface: mesh edges between kept vertices; the right hemisphere is
//! offset by the left node count so both live in one node space.
//!
//! All edges carry unit weight. With `W` the adjacency and `D` its
//! degree matrix, the Laplacian is `L = D − W`.

use serde::{Deserialize, Serialize};

use pnet_types::{Matrix, PnetError, PnetResult};

use crate::template::{BrainTemplate, Hemisphere, SurfaceTemplate, VolumeMask};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialGraph {
    n_nodes: usize,
    /// Sorted, deduplicated neighbour list per node.
    neighbors: Vec<Vec<usize>>,
}

impl SpatialGraph {
    /// Build from an undirected edge list. Self loops and duplicates are
    /// dropped.
    pub fn from_edges(n_nodes: usize, edges: &[(usize, usize)]) -> PnetResult<Self> {
        if let Some(&(a, b)) = edges.iter().find(|&&(a, b)| a >= n_nodes || b >= n_nodes) {
            return Err(PnetError::Validation(format!(
                "edge ({a}, {b}) outside graph of {n_nodes} nodes"
            )));
        }
        Ok(Self::build(n_nodes, edges.iter().copied()))
    }

    fn build(n_nodes: usize, edges: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let mut neighbors = vec![Vec::new(); n_nodes];
        for (a, b) in edges {
            if a != b {
                neighbors[a].push(b);
                neighbors[b].push(a);
            }
        }
        for list in neighbors.iter_mut() {
            list.sort_unstable();
            list.dedup();
        }
        Self { n_nodes, neighbors }
    }

    pub fn from_volume_mask(mask: &VolumeMask) -> Self {
        let [dx, dy, dz] = mask.dims();
        let mut edges = Vec::new();
        for (node, &linear) in mask.node_indices().iter().enumerate() {
            let [x, y, z] = mask.coordinates(linear);
            // forward neighbours only; the reverse edge is added on insert
            let forward = [
                (x + 1 < dx).then(|| mask.linear_index(x + 1, y, z)),
                (y + 1 < dy).then(|| mask.linear_index(x, y + 1, z)),
                (z + 1 < dz).then(|| mask.linear_index(x, y, z + 1)),
            ];
            for other in forward.into_iter().flatten() {
                if let Some(peer) = mask.node_of(other) {
                    edges.push((node, peer));
                }
            }
        }
        Self::build(mask.n_nodes(), edges)
    }

    pub fn from_surface(surface: &SurfaceTemplate) -> Self {
        let offset = surface.left.n_nodes();
        let mut edges = hemisphere_edges(&surface.left, 0);
        edges.extend(hemisphere_edges(&surface.right, offset));
        Self::build(surface.n_nodes(), edges)
    }

    pub fn from_template(template: &BrainTemplate) -> Self {
        match template {
            BrainTemplate::Volume(mask) => Self::from_volume_mask(mask),
            BrainTemplate::Surface(surface) => Self::from_surface(surface),
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.n_nodes
    }

    pub fn neighbors(&self, node: usize) -> &[usize] {
        &self.neighbors[node]
    }

    pub fn degree(&self, node: usize) -> f64 {
        self.neighbors[node].len() as f64
    }

    pub fn degrees(&self) -> Vec<f64> {
        self.neighbors.iter().map(|n| n.len() as f64).collect()
    }

    /// Undirected edge count.
    pub fn n_edges(&self) -> usize {
        self.neighbors.iter().map(Vec::len).sum::<usize>() / 2
    }

    /// `out = W · V` for node-major `V` (`S × K`).
    pub fn multiply_into(&self, v: &Matrix, out: &mut Matrix) -> PnetResult<()> {
        if v.rows() != self.n_nodes {
            return Err(PnetError::dimension("graph product rows", self.n_nodes, v.rows()));
        }
        if out.shape() != v.shape() {
            return Err(PnetError::dimension(
                "graph product output",
                v.rows() * v.cols(),
                out.rows() * out.cols(),
            ));
        }
        for (node, list) in self.neighbors.iter().enumerate() {
            let dst = out.row_mut(node);
            dst.fill(0.0);
            for &peer in list {
                for (d, s) in dst.iter_mut().zip(v.row(peer)) {
                    *d += s;
                }
            }
        }
        Ok(())
    }

    /// `tr(Vᵀ L V) = Σ_edges Σ_k (v_ik − v_jk)²`.
    pub fn laplacian_quadratic(&self, v: &Matrix) -> PnetResult<f64> {
        if v.rows() != self.n_nodes {
            return Err(PnetError::dimension("laplacian rows", self.n_nodes, v.rows()));
        }
        let mut total = 0.0;
        for (node, list) in self.neighbors.iter().enumerate() {
            let a = v.row(node);
            for &peer in list.iter().filter(|&&p| p > node) {
                total += a
                    .iter()
                    .zip(v.row(peer))
                    .map(|(x, y)| (x - y) * (x - y))
                    .sum::<f64>();
            }
        }
        Ok(total)
    }

    /// Stable identity of the node count and edge set (FNV-1a over the
    /// sorted neighbour lists). Equal graphs give equal fingerprints.
    pub fn fingerprint(&self) -> String {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for (node, list) in self.neighbors.iter().enumerate() {
            for &peer in list.iter().filter(|&&p| p > node) {
                for word in [node as u64, peer as u64] {
                    for byte in word.to_le_bytes() {
                        hash ^= u64::from(byte);
                        hash = hash.wrapping_mul(0x0100_0000_01b3);
                    }
                }
            }
        }
        format!("n={};e={};h={hash:016x}", self.n_nodes, self.n_edges())
    }
}

/// Mesh edges between kept vertices, renumbered into node space.
fn hemisphere_edges(hemi: &Hemisphere, offset: usize) -> Vec<(usize, usize)> {
    let mut edges = Vec::with_capacity(hemi.faces().len() * 3);
    for face in hemi.faces() {
        for (a, b) in [(face[0], face[1]), (face[1], face[2]), (face[2], face[0])] {
            if let (Some(na), Some(nb)) = (hemi.node_of(a), hemi.node_of(b)) {
                edges.push((na + offset, nb + offset));
            }
        }
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::MaskPolarity;

    #[test]
    fn test_volume_six_connectivity() {
        // full 3x3x3 cube: centre has 6 neighbours, corner has 3
        let mask = VolumeMask::new([3, 3, 3], &[1.0; 27]).unwrap();
        let g = SpatialGraph::from_volume_mask(&mask);
        assert_eq!(g.n_nodes(), 27);
        assert_eq!(g.degree(mask.linear_index(1, 1, 1)), 6.0);
        assert_eq!(g.degree(0), 3.0);
        // 3 axes * 2 links per line * 9 lines
        assert_eq!(g.n_edges(), 54);
    }

    #[test]
    fn test_volume_edges_respect_mask() {
        // 3x1x1 line with a hole in the middle
        let mask = VolumeMask::new([3, 1, 1], &[1.0, 0.0, 1.0]).unwrap();
        let g = SpatialGraph::from_volume_mask(&mask);
        assert_eq!(g.n_edges(), 0);
    }

    #[test]
    fn test_surface_edges_offset_right_hemisphere() {
        let left = Hemisphere::new(&[1.0; 3], vec![[0, 1, 2]], MaskPolarity::KeepNonZero).unwrap();
        // vertex 3 masked out; face (1,2,3) contributes only edge 1-2
        let right = Hemisphere::new(
            &[1.0, 1.0, 1.0, 0.0],
            vec![[0, 1, 2], [1, 2, 3]],
            MaskPolarity::KeepNonZero,
        )
        .unwrap();
        let surface = SurfaceTemplate::new(left, right).unwrap();
        let g = SpatialGraph::from_surface(&surface);
        assert_eq!(g.n_nodes(), 6);
        assert_eq!(g.n_edges(), 6);
        assert_eq!(g.neighbors(3), &[4, 5]);
        assert!(g.neighbors(2).iter().all(|&p| p < 3));
    }

    #[test]
    fn test_from_edges_dedup_and_bounds() {
        let g = SpatialGraph::from_edges(3, &[(0, 1), (1, 0), (2, 2)]).unwrap();
        assert_eq!(g.n_edges(), 1);
        assert_eq!(g.degrees(), vec![1.0, 1.0, 0.0]);
        assert!(SpatialGraph::from_edges(2, &[(0, 2)]).is_err());
    }

    #[test]
    fn test_multiply_and_laplacian() {
        // path 0 - 1 - 2
        let g = SpatialGraph::from_edges(3, &[(0, 1), (1, 2)]).unwrap();
        let v = Matrix::from_rows(&[vec![1.0], vec![2.0], vec![4.0]]).unwrap();
        let mut wv = Matrix::zeros(3, 1);
        g.multiply_into(&v, &mut wv).unwrap();
        assert_eq!(wv.column(0), vec![2.0, 5.0, 2.0]);
        // (1-2)² + (2-4)²
        assert_eq!(g.laplacian_quadratic(&v).unwrap(), 5.0);
    }

    #[test]
    fn test_fingerprint_tracks_edge_set() {
        let path = SpatialGraph::from_edges(3, &[(0, 1), (1, 2)]).unwrap();
        let same = SpatialGraph::from_edges(3, &[(2, 1), (1, 0), (0, 1)]).unwrap();
        let other = SpatialGraph::from_edges(3, &[(0, 1), (0, 2)]).unwrap();
        let wider = SpatialGraph::from_edges(4, &[(0, 1), (1, 2)]).unwrap();
        assert_eq!(path.fingerprint(), same.fingerprint());
        assert_ne!(path.fingerprint(), other.fingerprint());
        assert_ne!(path.fingerprint(), wider.fingerprint());
    }

    #[test]
    fn test_constant_maps_are_smooth() {
        let mask = VolumeMask::new([2, 2, 2], &[1.0; 8]).unwrap();
        let g = SpatialGraph::from_volume_mask(&mask);
        let v = Matrix::filled(8, 3, 0.7);
        assert_eq!(g.laplacian_quadratic(&v).unwrap(), 0.0);
    }
}
