// ─────────────────────────────────────────────────────────────────────
// pNet Kernel — Dense Matrix
// ─────────────────────────────────────────────────────────────────────
//! Row-major dense `f64` matrix used for time series, FN maps and
//! loadings. Arithmetic kernels live in `pnet-numerics`; this type only
//! owns storage, shape checks and element access.

use serde::{Deserialize, Serialize};

use crate::error::{PnetError, PnetResult};

/// Dense row-major matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Allocate a zero-filled `rows × cols` matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, 0.0)
    }

    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Wrap a row-major buffer. Fails if `data.len() != rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> PnetResult<Self> {
        if data.len() != rows * cols {
            return Err(PnetError::dimension(
                format!("matrix buffer {rows}x{cols}"),
                rows * cols,
                data.len(),
            ));
        }
        Ok(Self { rows, cols, data })
    }

    /// Build from nested rows. Ragged input is rejected.
    pub fn from_rows(rows: &[Vec<f64>]) -> PnetResult<Self> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(n_rows * n_cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n_cols {
                return Err(PnetError::Validation(format!(
                    "ragged rows: row {i} has {} values, row 0 has {n_cols}",
                    row.len()
                )));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: n_rows,
            cols: n_cols,
            data,
        })
    }

    /// Stack matrices with equal column count on top of each other.
    pub fn vstack(blocks: &[&Matrix]) -> PnetResult<Self> {
        let cols = match blocks.first() {
            Some(m) => m.cols,
            None => return Ok(Self::zeros(0, 0)),
        };
        let rows: usize = blocks.iter().map(|m| m.rows).sum();
        let mut data = Vec::with_capacity(rows * cols);
        for block in blocks {
            if block.cols != cols {
                return Err(PnetError::dimension("vstack columns", cols, block.cols));
            }
            data.extend_from_slice(&block.data);
        }
        Ok(Self { rows, cols, data })
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [f64] {
        &mut self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Copy of one column.
    pub fn column(&self, col: usize) -> Vec<f64> {
        (0..self.rows).map(|r| self.data[r * self.cols + col]).collect()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.data.chunks(self.cols.max(1)).map(<[f64]>::to_vec).collect()
    }

    pub fn transpose(&self) -> Matrix {
        let mut out = Matrix::zeros(self.cols, self.rows);
        for r in 0..self.rows {
            for c in 0..self.cols {
                out.data[c * self.rows + r] = self.data[r * self.cols + c];
            }
        }
        out
    }

    /// Reorder columns: output column `j` is input column `order[j]`.
    pub fn permute_columns(&self, order: &[usize]) -> PnetResult<Matrix> {
        if order.len() != self.cols {
            return Err(PnetError::dimension("column permutation", self.cols, order.len()));
        }
        if let Some(&bad) = order.iter().find(|&&c| c >= self.cols) {
            return Err(PnetError::Validation(format!(
                "column index {bad} out of range for {} columns",
                self.cols
            )));
        }
        let mut out = Matrix::zeros(self.rows, self.cols);
        for r in 0..self.rows {
            for (j, &src) in order.iter().enumerate() {
                out.data[r * self.cols + j] = self.data[r * self.cols + src];
            }
        }
        Ok(out)
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }

    pub fn is_non_negative(&self) -> bool {
        self.data.iter().all(|&v| v >= 0.0)
    }

    /// Smallest element (`+∞` for an empty matrix).
    pub fn min_value(&self) -> f64 {
        self.data.iter().copied().fold(f64::INFINITY, f64::min)
    }
}
