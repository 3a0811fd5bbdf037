// ─────────────────────────────────────────────────────────────────────
// pNet Kernel — Volume Reshaping
// ─────────────────────────────────────────────────────────────────────
//! 4D volume ↔ 2D matrix conversion through a volume mask.
//!
//! Time series: `[x, y, z, T]` ↔ `T × S`.
//! FN maps:     `[x, y, z, K]` ↔ `S × K`, zeros outside the mask.

use serde::{Deserialize, Serialize};

use pnet_types::{Matrix, PnetError, PnetResult};

use crate::template::VolumeMask;

/// Dense 4D array flattened in Fortran order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume4 {
    dims: [usize; 4],
    data: Vec<f64>,
}

impl Volume4 {
    pub fn new(dims: [usize; 4], data: Vec<f64>) -> PnetResult<Self> {
        let expected = dims.iter().product::<usize>();
        if data.len() != expected {
            return Err(PnetError::dimension("4D volume buffer", expected, data.len()));
        }
        Ok(Self { dims, data })
    }

    pub fn zeros(dims: [usize; 4]) -> Self {
        Self {
            dims,
            data: vec![0.0; dims.iter().product()],
        }
    }

    pub fn dims(&self) -> [usize; 4] {
        self.dims
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize, t: usize) -> f64 {
        let [dx, dy, dz, _] = self.dims;
        self.data[x + dx * (y + dy * (z + dz * t))]
    }

    fn check_mask(&self, mask: &VolumeMask) -> PnetResult<()> {
        let expected = mask.dims();
        match (0..3).find(|&axis| self.dims[axis] != expected[axis]) {
            Some(axis) => Err(PnetError::dimension(
                format!("volume axis {axis} vs mask"),
                expected[axis],
                self.dims[axis],
            )),
            None => Ok(()),
        }
    }
}

/// Extract in-mask voxels of a `[x, y, z, T]` series into `T × S`.
pub fn volume_to_matrix(volume: &Volume4, mask: &VolumeMask) -> PnetResult<Matrix> {
    volume.check_mask(mask)?;
    let n_voxels = mask.n_voxels();
    let frames = volume.dims[3];
    let nodes = mask.node_indices();
    let mut out = Matrix::zeros(frames, nodes.len());
    for t in 0..frames {
        let frame = &volume.data[t * n_voxels..(t + 1) * n_voxels];
        for (dst, &linear) in out.row_mut(t).iter_mut().zip(nodes) {
            *dst = frame[linear];
        }
    }
    Ok(out)
}

/// Scatter a `T × S` series back into a `[x, y, z, T]` volume.
pub fn matrix_to_volume(series: &Matrix, mask: &VolumeMask) -> PnetResult<Volume4> {
    if series.cols() != mask.n_nodes() {
        return Err(PnetError::dimension("series nodes", mask.n_nodes(), series.cols()));
    }
    let [dx, dy, dz] = mask.dims();
    let n_voxels = mask.n_voxels();
    let mut volume = Volume4::zeros([dx, dy, dz, series.rows()]);
    for t in 0..series.rows() {
        let frame = &mut volume.data[t * n_voxels..(t + 1) * n_voxels];
        for (&value, &linear) in series.row(t).iter().zip(mask.node_indices()) {
            frame[linear] = value;
        }
    }
    Ok(volume)
}

/// Scatter `S × K` maps into a `[x, y, z, K]` volume for export.
pub fn maps_to_volume(maps: &Matrix, mask: &VolumeMask) -> PnetResult<Volume4> {
    if maps.rows() != mask.n_nodes() {
        return Err(PnetError::dimension("FN map nodes", mask.n_nodes(), maps.rows()));
    }
    matrix_to_volume(&maps.transpose(), mask)
}

/// Extract in-mask voxels of `[x, y, z, K]` maps into `S × K`.
pub fn volume_to_maps(volume: &Volume4, mask: &VolumeMask) -> PnetResult<Matrix> {
    Ok(volume_to_matrix(volume, mask)?.transpose())
}
