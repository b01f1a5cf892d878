//! Clemprep - light-microscopy volume preparation for CLEM registration.
//!
//! This library turns an anisotropic fluorescence stack into inputs a
//! light-to-electron registration can consume:
//! - Pixel geometry from TIFF / ImageJ metadata
//! - Isotropic resampling along z (including linked channels)
//! - Difference-of-Gaussian blob enhancement
//! - Per-slice adaptive thresholding into a binary mask
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use clemprep::{ImageLayer, SegmentationConfig, log_segmentation, make_isotropic};
//!
//! let mut layer = ImageLayer::new("mitochondria", volume, metadata);
//! let z_zoom = make_isotropic(&mut layer, &mut [])?;
//!
//! let labels = log_segmentation(&layer, &SegmentationConfig::default());
//! assert_eq!(labels.name, "mitochondria_seg");
//! ```

pub mod convolution;
pub mod layer;
pub mod pixel_geometry;
pub mod resample;
pub mod segmentation;
pub mod threshold;
pub mod volume;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Core volume types
// ============================================================================

pub use layer::{ImageLayer, LabelLayer, Metadata, MetadataValue, VolumeLayer};
pub use volume::{LabelVolume, Volume, VolumeError, VolumeExt};

// ============================================================================
// Pixel geometry
// ============================================================================

pub use pixel_geometry::{ExprError, PixelGeometry, get_pixel_size};

// ============================================================================
// Resampling
// ============================================================================

pub use resample::{
    InterpolationMethod, ResampleError, make_isotropic, make_isotropic_with, resample_z,
    zoom_values,
};

// ============================================================================
// Segmentation
// ============================================================================

pub use convolution::difference_of_gaussians;
pub use segmentation::{Config as SegmentationConfig, log_segmentation, min_max_scale, segment};
pub use threshold::slice_adaptive_threshold;
