use thiserror::Error;

/// Errors raised when raw sample data cannot be interpreted as a 3D volume.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VolumeError {
    #[error("Expected a 3-dimensional volume, got {ndim} dimension(s)")]
    Dimensionality { ndim: usize },

    #[error("Axis {axis} of shape {shape:?} has zero length")]
    EmptyAxis { axis: usize, shape: Vec<usize> },

    #[error("Shape {shape:?} requires {expected} samples, got {actual}")]
    LengthMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("Shape {shape:?} has more voxels than can be addressed")]
    TooLarge { shape: Vec<usize> },
}
