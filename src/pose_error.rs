//! Domain errors of the pose and matrix types

/// Raised when a matrix operation is not defined for its operands.
#[derive(Debug, Clone, PartialEq)]
pub enum PoseError {
    /// Operand shapes do not fit the operation (multiplication, addition, block assignment).
    ShapeMismatch {
        operation: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },
    /// The matrix is not a 4x4 homogeneous transform.
    NotHomogeneous(String),
    /// Element or block access outside the matrix.
    OutOfBounds {
        row: usize,
        col: usize,
        size: (usize, usize),
    },
    /// Input of the wrong length (ragged rows, short angle tuples).
    InvalidLength { expected: usize, found: usize },
    /// A quaternion of zero norm has no rotation.
    ZeroQuaternion,
}

impl std::fmt::Display for PoseError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            PoseError::ShapeMismatch { operation, left, right } =>
                write!(f, "Shape mismatch in {}: {}x{} and {}x{}",
                       operation, left.0, left.1, right.0, right.1),
            PoseError::NotHomogeneous(ref why) =>
                write!(f, "Matrix is not homogeneous: {}", why),
            PoseError::OutOfBounds { row, col, size } =>
                write!(f, "Index ({}, {}) out of bounds for {}x{} matrix", row, col, size.0, size.1),
            PoseError::InvalidLength { expected, found } =>
                write!(f, "Invalid Length: expected {}, found {}", expected, found),
            PoseError::ZeroQuaternion =>
                write!(f, "Quaternion has zero norm"),
        }
    }
}

impl std::error::Error for PoseError {}
