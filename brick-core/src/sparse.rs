//! Sparse storage for assembled systems.
//!
//! Global matrices are built as coordinate triplets and compressed once into
//! `nalgebra-sparse` CSR, which the solvers and post-processing consume.

use crate::error::{Error, Result};
use nalgebra::DMatrix;
use nalgebra_sparse::coo::CooMatrix;
use nalgebra_sparse::csr::CsrMatrix as NalgebraCsr;

/// Compressed Sparse Row matrix.
pub type CsrMatrix = NalgebraCsr<f64>;

/// Coordinate-format accumulator. Repeated (row, col) entries are summed
/// when compressed.
#[derive(Debug, Clone)]
pub struct TripletMatrix {
    shape: (usize, usize),
    entries: Vec<(usize, usize, f64)>,
}

impl TripletMatrix {
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        Self::with_capacity(n_rows, n_cols, 0)
    }

    pub fn with_capacity(n_rows: usize, n_cols: usize, nnz_estimate: usize) -> Self {
        Self {
            shape: (n_rows, n_cols),
            entries: Vec::with_capacity(nnz_estimate),
        }
    }

    /// Accumulate `value` at (row, col). Exact zeros are skipped.
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(row < self.shape.0 && col < self.shape.1);
        if value != 0.0 {
            self.entries.push((row, col, value));
        }
    }

    /// Scatter a square element matrix into the global DOFs `dofs`.
    pub fn add_submatrix(&mut self, dofs: &[usize], local: &DMatrix<f64>) {
        debug_assert_eq!(local.shape(), (dofs.len(), dofs.len()));
        for (j, &col) in dofs.iter().enumerate() {
            for (i, &row) in dofs.iter().enumerate() {
                self.add(row, col, local[(i, j)]);
            }
        }
    }

    /// Stored entries before duplicate summation.
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    /// Compress to CSR, summing duplicates.
    pub fn to_csr(self) -> Result<CsrMatrix> {
        let (n_rows, n_cols) = self.shape;
        let mut rows = Vec::with_capacity(self.entries.len());
        let mut cols = Vec::with_capacity(self.entries.len());
        let mut values = Vec::with_capacity(self.entries.len());
        for (r, c, v) in self.entries {
            rows.push(r);
            cols.push(c);
            values.push(v);
        }

        let coo = CooMatrix::try_from_triplets(n_rows, n_cols, rows, cols, values)
            .map_err(|e| Error::Assembly(format!("invalid sparse entries: {}", e)))?;
        Ok(CsrMatrix::from(&coo))
    }
}

/// y = A x for a CSR matrix.
pub fn matvec(matrix: &CsrMatrix, x: &[f64]) -> Vec<f64> {
    debug_assert_eq!(matrix.ncols(), x.len());
    matrix
        .row_iter()
        .map(|row| {
            row.col_indices()
                .iter()
                .zip(row.values())
                .map(|(&j, &v)| v * x[j])
                .sum::<f64>()
        })
        .collect()
}

/// Euclidean norm.
pub fn norm(x: &[f64]) -> f64 {
    x.iter().map(|v| v * v).sum::<f64>().sqrt()
}

/// Largest |A_ij - A_ji| relative to the largest |A_ij|.
pub fn asymmetry(matrix: &CsrMatrix) -> f64 {
    let transpose = matrix.transpose();
    let scale = matrix
        .values()
        .iter()
        .fold(0.0_f64, |m, v| m.max(v.abs()))
        .max(f64::MIN_POSITIVE);
    let diff = matrix - &transpose;
    diff.values().iter().fold(0.0_f64, |m, v| m.max(v.abs())) / scale
}
