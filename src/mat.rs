//! General dense matrix with checked arithmetic and slicing.
//!
//! `Mat` is the loosely typed counterpart of [`Pose`](crate::pose::Pose): it can hold any shape,
//! so every operation that only makes sense for some shapes returns a [`PoseError`] instead of
//! panicking or silently truncating. A `Mat` that passes [`Mat::is_homogeneous`] converts into a
//! `Pose` with `Pose::try_from(&mat)`.
//!
//! ```
//! use robot_post::mat::Mat;
//!
//! let a = Mat::eye(4);
//! let b = Mat::eye(3);
//! assert!(a.try_mul(&b).is_err()); // 4x4 times 3x3 is not defined
//! assert_eq!(Mat::eye(4).inv_h().unwrap(), Mat::eye(4));
//! ```

use std::ops::{Index, IndexMut, Range};

use nalgebra::DMatrix;

use crate::pose_error::PoseError;

/// Maximal sum of absolute deviations of `R*R^T` from identity still accepted as a rotation.
pub const HOMOGENEOUS_TOLERANCE: f64 = 1e-4;

#[derive(Debug, Clone, PartialEq)]
pub struct Mat {
    data: DMatrix<f64>,
}

impl Mat {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Mat { data: DMatrix::zeros(rows, cols) }
    }

    /// Square identity matrix of the given size
    pub fn eye(size: usize) -> Self {
        Mat { data: DMatrix::identity(size, size) }
    }

    /// Builds the matrix from rows. All rows must have the same length.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, PoseError> {
        let cols = rows.first().map_or(0, |r| r.len());
        if let Some(bad) = rows.iter().find(|r| r.len() != cols) {
            return Err(PoseError::InvalidLength { expected: cols, found: bad.len() });
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        Ok(Mat { data: DMatrix::from_row_slice(rows.len(), cols, &flat) })
    }

    /// Builds the matrix from values listed row after row.
    pub fn from_row_slice(rows: usize, cols: usize, values: &[f64]) -> Result<Self, PoseError> {
        if values.len() != rows * cols {
            return Err(PoseError::InvalidLength { expected: rows * cols, found: values.len() });
        }
        Ok(Mat { data: DMatrix::from_row_slice(rows, cols, values) })
    }

    pub fn from_dmatrix(data: DMatrix<f64>) -> Self {
        Mat { data }
    }

    pub fn as_dmatrix(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// (rows, columns)
    pub fn size(&self) -> (usize, usize) {
        self.data.shape()
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    pub fn get(&self, row: usize, col: usize) -> Result<f64, PoseError> {
        self.check_index(row, col)?;
        Ok(self.data[(row, col)])
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) -> Result<(), PoseError> {
        self.check_index(row, col)?;
        self.data[(row, col)] = value;
        Ok(())
    }

    pub fn row(&self, row: usize) -> Result<Vec<f64>, PoseError> {
        if row >= self.rows() {
            return Err(PoseError::OutOfBounds { row, col: 0, size: self.size() });
        }
        Ok(self.data.row(row).iter().copied().collect())
    }

    pub fn col(&self, col: usize) -> Result<Vec<f64>, PoseError> {
        if col >= self.cols() {
            return Err(PoseError::OutOfBounds { row: 0, col, size: self.size() });
        }
        Ok(self.data.column(col).iter().copied().collect())
    }

    /// Copy of the sub-block `rows x cols` (half-open ranges, like Python slices).
    pub fn block(&self, rows: Range<usize>, cols: Range<usize>) -> Result<Mat, PoseError> {
        self.check_range(&rows, &cols)?;
        let view = self.data.view(
            (rows.start, cols.start),
            (rows.end - rows.start, cols.end - cols.start),
        );
        Ok(Mat { data: view.into_owned() })
    }

    /// Overwrites the block starting at (`row`, `col`) with `values`.
    pub fn set_block(&mut self, row: usize, col: usize, values: &Mat) -> Result<(), PoseError> {
        let (r, c) = values.size();
        if row + r > self.rows() || col + c > self.cols() {
            return Err(PoseError::ShapeMismatch {
                operation: "set_block",
                left: self.size(),
                right: (row + r, col + c),
            });
        }
        self.data.view_mut((row, col), (r, c)).copy_from(&values.data);
        Ok(())
    }

    /// Transpose
    pub fn tr(&self) -> Mat {
        Mat { data: self.data.transpose() }
    }

    pub fn scale(&self, factor: f64) -> Mat {
        Mat { data: &self.data * factor }
    }

    /// Matrix product. Inner dimensions must agree.
    pub fn try_mul(&self, other: &Mat) -> Result<Mat, PoseError> {
        if self.cols() != other.rows() {
            return Err(PoseError::ShapeMismatch {
                operation: "multiply",
                left: self.size(),
                right: other.size(),
            });
        }
        Ok(Mat { data: &self.data * &other.data })
    }

    pub fn try_add(&self, other: &Mat) -> Result<Mat, PoseError> {
        self.check_same_shape("add", other)?;
        Ok(Mat { data: &self.data + &other.data })
    }

    pub fn try_sub(&self, other: &Mat) -> Result<Mat, PoseError> {
        self.check_same_shape("subtract", other)?;
        Ok(Mat { data: &self.data - &other.data })
    }

    /// True for 4x4 matrices with a [0, 0, 0, 1] bottom row and an orthonormal rotation block.
    pub fn is_homogeneous(&self) -> bool {
        self.homogeneous_defect().is_none()
    }

    /// Inverse of a homogeneous matrix, computed as [R^T, -R^T t]. Any other matrix is rejected.
    pub fn inv_h(&self) -> Result<Mat, PoseError> {
        if let Some(why) = self.homogeneous_defect() {
            return Err(PoseError::NotHomogeneous(why));
        }
        let rt = self.data.view((0, 0), (3, 3)).transpose();
        let t = self.data.view((0, 3), (3, 1));
        let mut out = DMatrix::identity(4, 4);
        out.view_mut((0, 0), (3, 3)).copy_from(&rt);
        out.view_mut((0, 3), (3, 1)).copy_from(&(-(&rt * t)));
        Ok(Mat { data: out })
    }

    /// Largest absolute element-wise difference, `None` if the shapes differ.
    pub fn max_abs_diff(&self, other: &Mat) -> Option<f64> {
        if self.size() != other.size() {
            return None;
        }
        Some((&self.data - &other.data).amax())
    }

    fn homogeneous_defect(&self) -> Option<String> {
        if self.size() != (4, 4) {
            return Some(format!("expected 4x4, got {}x{}", self.rows(), self.cols()));
        }
        let d = &self.data;
        if d[(3, 0)] != 0.0 || d[(3, 1)] != 0.0 || d[(3, 2)] != 0.0 || d[(3, 3)] != 1.0 {
            return Some(format!(
                "bottom row is [{}, {}, {}, {}]",
                d[(3, 0)], d[(3, 1)], d[(3, 2)], d[(3, 3)]
            ));
        }
        let r = d.view((0, 0), (3, 3));
        let defect = (&r * r.transpose() - DMatrix::<f64>::identity(3, 3)).abs().sum();
        if defect > HOMOGENEOUS_TOLERANCE {
            return Some(format!("rotation block is not orthonormal (defect {:e})", defect));
        }
        None
    }

    fn check_index(&self, row: usize, col: usize) -> Result<(), PoseError> {
        if row >= self.rows() || col >= self.cols() {
            return Err(PoseError::OutOfBounds { row, col, size: self.size() });
        }
        Ok(())
    }

    fn check_range(&self, rows: &Range<usize>, cols: &Range<usize>) -> Result<(), PoseError> {
        if rows.start > rows.end || rows.end > self.rows() || cols.start > cols.end || cols.end > self.cols() {
            return Err(PoseError::OutOfBounds { row: rows.end, col: cols.end, size: self.size() });
        }
        Ok(())
    }

    fn check_same_shape(&self, operation: &'static str, other: &Mat) -> Result<(), PoseError> {
        if self.size() != other.size() {
            return Err(PoseError::ShapeMismatch { operation, left: self.size(), right: other.size() });
        }
        Ok(())
    }
}

impl Index<(usize, usize)> for Mat {
    type Output = f64;

    fn index(&self, index: (usize, usize)) -> &f64 {
        &self.data[index]
    }
}

impl IndexMut<(usize, usize)> for Mat {
    fn index_mut(&mut self, index: (usize, usize)) -> &mut f64 {
        &mut self.data[index]
    }
}

impl std::fmt::Display for Mat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for r in 0..self.rows() {
            let row: Vec<String> = self.data.row(r).iter().map(|v| format!("{:.3}", v)).collect();
            writeln!(f, "[{}]", row.join(", "))?;
        }
        Ok(())
    }
}
