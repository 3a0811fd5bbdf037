// ─────────────────────────────────────────────────────────────────────
// pNet Kernel — Brain Templates
// ─────────────────────────────────────────────────────────────────────
//! Spatial domain of a study: either a 3D volume mask or a pair of
//! cortical surface meshes with per-vertex masks.
//!
//! Volume masks are flattened in column-major (Fortran) order, the order
//! used by NIfTI and MATLAB, so node indices match those tools.

use serde::{Deserialize, Serialize};

use pnet_types::{PnetError, PnetResult};

/// Which mask entries mark usable nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MaskPolarity {
    /// Nodes where the mask is non-zero (brain masks).
    #[default]
    KeepNonZero,
    /// Nodes where the mask is zero (medial-wall masks).
    KeepZero,
}

impl MaskPolarity {
    #[inline]
    pub fn keeps(self, value: f64) -> bool {
        match self {
            MaskPolarity::KeepNonZero => value != 0.0,
            MaskPolarity::KeepZero => value == 0.0,
        }
    }
}

/// 3D brain mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeMask {
    dims: [usize; 3],
    /// Linear (Fortran) index of every in-mask voxel, ascending.
    nodes: Vec<usize>,
}

impl VolumeMask {
    /// `values` is the mask flattened in Fortran order; voxels > 0 are kept.
    pub fn new(dims: [usize; 3], values: &[f64]) -> PnetResult<Self> {
        let n_voxels = dims.iter().product::<usize>();
        if values.len() != n_voxels {
            return Err(PnetError::dimension("volume mask", n_voxels, values.len()));
        }
        let nodes: Vec<usize> = values
            .iter()
            .enumerate()
            .filter_map(|(i, &v)| (v > 0.0).then_some(i))
            .collect();
        if nodes.is_empty() {
            return Err(PnetError::Validation("volume mask has no voxels".into()));
        }
        Ok(Self { dims, nodes })
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn n_voxels(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Fortran-order linear index of every node.
    pub fn node_indices(&self) -> &[usize] {
        &self.nodes
    }

    #[inline]
    pub fn linear_index(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.dims[0] * (y + self.dims[1] * z)
    }

    pub fn coordinates(&self, linear: usize) -> [usize; 3] {
        let x = linear % self.dims[0];
        let rest = linear / self.dims[0];
        [x, rest % self.dims[1], rest / self.dims[1]]
    }

    /// Node number of the voxel at a linear index, if it is in the mask.
    pub fn node_of(&self, linear: usize) -> Option<usize> {
        self.nodes.binary_search(&linear).ok()
    }
}

/// One cortical hemisphere: triangle mesh plus vertex mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hemisphere {
    n_vertices: usize,
    faces: Vec<[usize; 3]>,
    /// Vertex index of every kept node, ascending.
    nodes: Vec<usize>,
}

impl Hemisphere {
    pub fn new(mask: &[f64], faces: Vec<[usize; 3]>, polarity: MaskPolarity) -> PnetResult<Self> {
        let n_vertices = mask.len();
        if let Some(face) = faces.iter().find(|f| f.iter().any(|&v| v >= n_vertices)) {
            return Err(PnetError::Validation(format!(
                "face {face:?} references a vertex beyond {n_vertices}"
            )));
        }
        let nodes = mask
            .iter()
            .enumerate()
            .filter_map(|(i, &v)| polarity.keeps(v).then_some(i))
            .collect();
        Ok(Self {
            n_vertices,
            faces,
            nodes,
        })
    }

    pub fn n_vertices(&self) -> usize {
        self.n_vertices
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn faces(&self) -> &[[usize; 3]] {
        &self.faces
    }

    pub fn node_indices(&self) -> &[usize] {
        &self.nodes
    }

    pub fn node_of(&self, vertex: usize) -> Option<usize> {
        self.nodes.binary_search(&vertex).ok()
    }
}

/// Left and right hemispheres. Left nodes come first in the node order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceTemplate {
    pub left: Hemisphere,
    pub right: Hemisphere,
}

impl SurfaceTemplate {
    pub fn new(left: Hemisphere, right: Hemisphere) -> PnetResult<Self> {
        if left.n_nodes() + right.n_nodes() == 0 {
            return Err(PnetError::Validation("surface template has no vertices".into()));
        }
        Ok(Self { left, right })
    }

    pub fn n_nodes(&self) -> usize {
        self.left.n_nodes() + self.right.n_nodes()
    }
}

/// Spatial domain of a study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BrainTemplate {
    Volume(VolumeMask),
    Surface(SurfaceTemplate),
}

impl BrainTemplate {
    /// Number of in-mask nodes S.
    pub fn n_nodes(&self) -> usize {
        match self {
            BrainTemplate::Volume(mask) => mask.n_nodes(),
            BrainTemplate::Surface(surface) => surface.n_nodes(),
        }
    }

    pub fn data_type(&self) -> &'static str {
        match self {
            BrainTemplate::Volume(_) => "Volume",
            BrainTemplate::Surface(_) => "Surface",
        }
    }
}
