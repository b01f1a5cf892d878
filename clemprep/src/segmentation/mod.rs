//! Difference-of-Gaussian blob segmentation.
//!
//! The pipeline is a single stateless pass:
//!
//! 1. Min-max normalize the whole volume to [0, 1].
//! 2. Difference of Gaussians with σ₁ = `sigma`, σ₂ = `sigma_ratio` · σ₁.
//! 3. Slice-wise adaptive threshold at `threshold` × slice mean.
//!
//! The input volume is never modified.


use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::convolution::{DEFAULT_SIGMA_RATIO, difference_of_gaussians};
use crate::layer::{LabelLayer, VolumeLayer};
use crate::threshold::slice_adaptive_threshold;
use crate::volume::{LabelVolume, Volume, VolumeExt};

/// Segmentation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Inner Gaussian sigma in voxels. Matches blobs of radius ≈ sigma·√3.
    pub sigma: f32,
    /// Multiplier applied to each slice's mean rescaled level.
    pub threshold: f32,
    /// Outer sigma as a multiple of `sigma`.
    pub sigma_ratio: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sigma: 3.0,
            threshold: 1.2,
            sigma_ratio: DEFAULT_SIGMA_RATIO,
        }
    }
}

impl Config {
    pub fn new(sigma: f32, threshold: f32) -> Self {
        Self {
            sigma,
            threshold,
            ..Self::default()
        }
    }

    /// Outer DoG sigma.
    pub fn sigma_2(&self) -> f32 {
        self.sigma * self.sigma_ratio
    }

    /// Validate the configuration.
    pub fn validate(&self) {
        assert!(
            self.sigma.is_finite() && self.sigma > 0.0,
            "sigma must be positive, got {}",
            self.sigma
        );
        assert!(
            self.sigma_ratio.is_finite() && self.sigma_ratio > 0.0,
            "sigma_ratio must be positive, got {}",
            self.sigma_ratio
        );
        assert!(
            self.threshold.is_finite(),
            "threshold must be finite, got {}",
            self.threshold
        );
    }
}

/// Rescale the whole volume to [0, 1] using its global minimum and maximum.
///
/// A volume without intensity range maps to all zeros. Non-finite voxels
/// are excluded from the extrema and map to 0.
pub fn min_max_scale(volume: &Volume) -> Volume {
    let mut scaled = volume.clone();

    let range = volume
        .min_max()
        .map(|(min, max)| (min as f64, max as f64 - min as f64))
        .filter(|&(_, range)| range > 0.0);

    match range {
        Some((min, range)) => scaled.voxels_mut().par_iter_mut().for_each(|v| {
            *v = if v.is_finite() {
                ((*v as f64 - min) / range) as f32
            } else {
                0.0
            }
        }),
        None => scaled.voxels_mut().fill(0.0),
    }

    scaled
}

/// Segment blob-like structures in `volume`.
///
/// Returns the binary mask and the label name `"<name>_seg"`.
pub fn segment(volume: &Volume, name: &str, config: &Config) -> (LabelVolume, String) {
    config.validate();

    tracing::info!(
        "Segmenting {} with sigma={} and threshold={}...",
        name,
        config.sigma,
        config.threshold
    );
    let start = Instant::now();

    let normalized = min_max_scale(volume);
    let response = difference_of_gaussians(&normalized, config.sigma, config.sigma_2());
    let mask = slice_adaptive_threshold(&response, config.threshold);

    tracing::info!(
        "Finished segmenting {} after {:.3}s",
        name,
        start.elapsed().as_secs_f64()
    );

    (mask, LabelLayer::derived_name(name))
}

/// Segment a host layer into a [`LabelLayer`].
pub fn log_segmentation<L>(layer: &L, config: &Config) -> LabelLayer
where
    L: VolumeLayer + ?Sized,
{
    let (mask, name) = segment(layer.data(), layer.name(), config);
    LabelLayer::new(name, mask)
}
