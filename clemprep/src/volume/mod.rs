//! Volume types shared by every pipeline stage.
//!
//! Volumes are stored in (z, y, x) order with z-slices contiguous in memory.
//! Intensities are processed as `f32`; integer acquisitions are widened on
//! construction with [`Volume::from_samples`].

mod error;


pub use error::VolumeError;

use common::Buffer3;

/// Intensity volume.
pub type Volume = Buffer3<f32>;

/// Binary mask volume; every voxel is 0 or 1.
pub type LabelVolume = Buffer3<u8>;

/// Validate a (z, y, x) shape against the number of available samples.
///
/// Returns `(depth, height, width)` on success.
pub fn validate_shape(shape: &[usize], sample_count: usize) -> Result<[usize; 3], VolumeError> {
    let &[depth, height, width] = shape else {
        return Err(VolumeError::Dimensionality { ndim: shape.len() });
    };

    if let Some(axis) = shape.iter().position(|&len| len == 0) {
        return Err(VolumeError::EmptyAxis {
            axis,
            shape: shape.to_vec(),
        });
    }

    let Some(expected) = shape.iter().try_fold(1usize, |acc, &len| acc.checked_mul(len)) else {
        return Err(VolumeError::TooLarge {
            shape: shape.to_vec(),
        });
    };
    if expected != sample_count {
        return Err(VolumeError::LengthMismatch {
            shape: shape.to_vec(),
            expected,
            actual: sample_count,
        });
    }

    Ok([depth, height, width])
}

/// Constructors that check the shape instead of panicking.
pub trait VolumeExt: Sized {
    /// Build a volume from a (z, y, x) shape and `f32` samples.
    fn from_shape(shape: &[usize], samples: Vec<f32>) -> Result<Self, VolumeError>;

    /// Build a volume from a (z, y, x) shape and any losslessly widenable samples.
    fn from_samples<T>(shape: &[usize], samples: &[T]) -> Result<Self, VolumeError>
    where
        T: Copy + Into<f64>;

    /// Global (min, max) over all voxels. Non-finite voxels are ignored;
    /// returns `None` if no finite voxel exists.
    fn min_max(&self) -> Option<(f32, f32)>;
}

impl VolumeExt for Volume {
    fn from_shape(shape: &[usize], samples: Vec<f32>) -> Result<Self, VolumeError> {
        let [depth, height, width] = validate_shape(shape, samples.len())?;
        Ok(Buffer3::new(width, height, depth, samples))
    }

    fn from_samples<T>(shape: &[usize], samples: &[T]) -> Result<Self, VolumeError>
    where
        T: Copy + Into<f64>,
    {
        let [depth, height, width] = validate_shape(shape, samples.len())?;
        let voxels = samples.iter().map(|&v| v.into() as f32).collect();
        Ok(Buffer3::new(width, height, depth, voxels))
    }

    fn min_max(&self) -> Option<(f32, f32)> {
        slice_min_max(self.voxels())
    }
}

/// (min, max) of the finite values in `values`.
pub fn slice_min_max(values: &[f32]) -> Option<(f32, f32)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}
