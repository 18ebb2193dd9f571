//! Dense matrices over GF(256)
//!
//! Only what the codec needs: Vandermonde construction, row selection,
//! multiplication and Gauss-Jordan inversion.

use crate::error::{Result, ShardStoreError};
use crate::gf256;

/// Row-major matrix of field elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<u8>,
}

impl Matrix {
    /// Zero matrix
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0; rows * cols],
        }
    }

    /// Identity matrix
    pub fn identity(size: usize) -> Self {
        let mut m = Self::zeros(size, size);
        for i in 0..size {
            m.set(i, i, 1);
        }
        m
    }

    /// `rows x cols` Vandermonde matrix with `m[i][j] = (i+1)^j`
    ///
    /// Evaluation points `1..=rows` are distinct non-zero field elements as
    /// long as `rows <= 255`, so any `cols` rows are linearly independent.
    pub fn vandermonde(rows: usize, cols: usize) -> Self {
        let mut m = Self::zeros(rows, cols);
        for i in 0..rows {
            let x = (i + 1) as u8;
            for j in 0..cols {
                m.set(i, j, gf256::pow(x, j));
            }
        }
        m
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.data[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: u8) {
        self.data[row * self.cols + col] = value;
    }

    /// Borrow one row
    pub fn row(&self, row: usize) -> &[u8] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// New matrix made of the given rows, in order
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        let mut data = Vec::with_capacity(rows.len() * self.cols);
        for &r in rows {
            data.extend_from_slice(self.row(r));
        }
        Self {
            rows: rows.len(),
            cols: self.cols,
            data,
        }
    }

    /// Matrix product `self * rhs`
    pub fn multiply(&self, rhs: &Matrix) -> Result<Matrix> {
        if self.cols != rhs.rows {
            return Err(ShardStoreError::Internal(format!(
                "matrix dimension mismatch: {}x{} * {}x{}",
                self.rows, self.cols, rhs.rows, rhs.cols
            )));
        }
        let mut out = Matrix::zeros(self.rows, rhs.cols);
        for i in 0..self.rows {
            for j in 0..rhs.cols {
                let mut acc = 0u8;
                for t in 0..self.cols {
                    acc = gf256::add(acc, gf256::mul(self.get(i, t), rhs.get(t, j)));
                }
                out.set(i, j, acc);
            }
        }
        Ok(out)
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for c in 0..self.cols {
            self.data.swap(a * self.cols + c, b * self.cols + c);
        }
    }

    /// Inverse via Gauss-Jordan elimination on `[self | I]`
    ///
    /// Fails with `SingularMatrix` when no inverse exists.
    pub fn invert(&self) -> Result<Matrix> {
        if self.rows != self.cols {
            return Err(ShardStoreError::SingularMatrix);
        }
        let n = self.rows;
        let mut work = self.clone();
        let mut inverse = Matrix::identity(n);

        for col in 0..n {
            let pivot = (col..n)
                .find(|&r| work.get(r, col) != 0)
                .ok_or(ShardStoreError::SingularMatrix)?;
            work.swap_rows(col, pivot);
            inverse.swap_rows(col, pivot);

            // Scale the pivot row so the pivot becomes 1
            let scale = gf256::inv(work.get(col, col))?;
            for c in 0..n {
                work.set(col, c, gf256::mul(work.get(col, c), scale));
                inverse.set(col, c, gf256::mul(inverse.get(col, c), scale));
            }

            // Clear the column everywhere else
            for r in 0..n {
                if r == col {
                    continue;
                }
                let factor = work.get(r, col);
                if factor == 0 {
                    continue;
                }
                for c in 0..n {
                    let w = gf256::add(work.get(r, c), gf256::mul(factor, work.get(col, c)));
                    work.set(r, c, w);
                    let v = gf256::add(inverse.get(r, c), gf256::mul(factor, inverse.get(col, c)));
                    inverse.set(r, c, v);
                }
            }
        }

        Ok(inverse)
    }
}
