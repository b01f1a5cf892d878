//! Isotropic resampling along the z axis.
//!
//! Light-microscopy stacks are usually acquired with a z step several times
//! larger than the lateral pixel size. Resampling z by `z_size / xy_size`
//! makes voxels cubic so that 3D filters behave the same along every axis.
//!
//! # Interpolation Methods
//!
//! - **Cubic**: Catmull-Rom spline, smooth and interpolating. Default.
//! - **Linear**: Linear blend of the two nearest slices.
//! - **Nearest**: Copies the nearest slice. For masks.

#[cfg(test)]
mod tests;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layer::VolumeLayer;
use crate::pixel_geometry::PixelGeometry;
use crate::volume::{Volume, VolumeError, validate_shape};

/// Upper bound on the resampled depth, guards against absurd metadata.
pub const MAX_OUTPUT_DEPTH: usize = 1 << 20;

/// Interpolation used between z-slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InterpolationMethod {
    Nearest,
    Linear,
    #[default]
    Cubic,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResampleError {
    #[error("Zoom factor must be finite and positive, got {zoom}")]
    InvalidZoom { zoom: f64 },

    #[error("Zoom {zoom} would resample depth {depth} beyond {max} slices", max = MAX_OUTPUT_DEPTH)]
    OutputTooDeep { zoom: f64, depth: usize },

    #[error(transparent)]
    Volume(#[from] VolumeError),
}

/// Zoom factors of a geometry relative to a reference geometry.
///
/// Returns `(xy / xy_ref, z / z_ref)`.
pub fn zoom_values(xy: f64, z: f64, xy_ref: f64, z_ref: f64) -> (f64, f64) {
    (xy / xy_ref, z / z_ref)
}

/// Resample `volume` along z by `z_zoom`, leaving y and x untouched.
///
/// The output depth is `round(depth * z_zoom)` (at least 1). The first and
/// last output slices coincide with the first and last input slices.
/// Volumes with an empty axis are rejected.
pub fn resample_z(
    volume: &Volume,
    z_zoom: f64,
    method: InterpolationMethod,
) -> Result<Volume, ResampleError> {
    let out_depth = checked_output_depth(volume, z_zoom)?;

    if (z_zoom - 1.0).abs() < common::EPSILON && out_depth == volume.depth() {
        return Ok(volume.clone());
    }

    let mut output = Volume::new_default(volume.width(), volume.height(), out_depth);
    let depth = volume.depth();
    let scale = if out_depth > 1 {
        (depth - 1) as f64 / (out_depth - 1) as f64
    } else {
        0.0
    };

    output
        .voxels_mut()
        .par_chunks_mut(volume.slice_len())
        .enumerate()
        .for_each(|(z, out_slice)| {
            let taps = slice_taps(z as f64 * scale, depth, method);
            for (src_z, weight) in taps {
                if weight == 0.0 {
                    continue;
                }
                for (out, &v) in out_slice.iter_mut().zip(volume.slice(src_z)) {
                    *out += weight * v;
                }
            }
        });

    Ok(output)
}

/// Output depth for `volume`, rejecting volumes with an empty axis.
fn checked_output_depth(volume: &Volume, z_zoom: f64) -> Result<usize, ResampleError> {
    validate_shape(&volume.shape(), volume.len())?;
    output_depth(volume.depth(), z_zoom)
}

fn output_depth(depth: usize, z_zoom: f64) -> Result<usize, ResampleError> {
    if !z_zoom.is_finite() || z_zoom <= 0.0 {
        return Err(ResampleError::InvalidZoom { zoom: z_zoom });
    }

    let out_depth = (depth as f64 * z_zoom).round();
    if out_depth > MAX_OUTPUT_DEPTH as f64 {
        return Err(ResampleError::OutputTooDeep {
            zoom: z_zoom,
            depth,
        });
    }

    Ok((out_depth as usize).max(1))
}

/// Source slices and weights contributing to the sample at `src_z`.
fn slice_taps(src_z: f64, depth: usize, method: InterpolationMethod) -> Vec<(usize, f32)> {
    let clamp = |i: i64| i.clamp(0, depth as i64 - 1) as usize;

    match method {
        InterpolationMethod::Nearest => vec![(clamp(src_z.round() as i64), 1.0)],
        InterpolationMethod::Linear => {
            let z0 = src_z.floor();
            let f = (src_z - z0) as f32;
            let z0 = z0 as i64;
            vec![(clamp(z0), 1.0 - f), (clamp(z0 + 1), f)]
        }
        InterpolationMethod::Cubic => {
            let z0 = src_z.floor();
            let f = (src_z - z0) as f32;
            let z0 = z0 as i64;
            (-1..=2)
                .map(|k| (clamp(z0 + k), bicubic_kernel(f - k as f32)))
                .collect()
        }
    }
}

/// Catmull-Rom cubic convolution kernel.
///
/// W(x) = (a+2)|x|^3 - (a+3)|x|^2 + 1       for |x| <= 1
/// W(x) = a|x|^3 - 5a|x|^2 + 8a|x| - 4a     for 1 < |x| < 2
/// W(x) = 0                                  otherwise
///
/// with a = -0.5.
#[inline]
pub(crate) fn bicubic_kernel(x: f32) -> f32 {
    const A: f32 = -0.5;

    let abs_x = x.abs();

    if abs_x <= 1.0 {
        ((A + 2.0) * abs_x - (A + 3.0)) * abs_x * abs_x + 1.0
    } else if abs_x < 2.0 {
        ((A * abs_x - 5.0 * A) * abs_x + 8.0 * A) * abs_x - 4.0 * A
    } else {
        0.0
    }
}

/// Make every layer in the set isotropic, mutating each in place.
///
/// `linked` holds the layers sharing the anchor's acquisition (other
/// channels), already resolved by the caller. Each layer is resampled with
/// the geometry read from its own metadata. Returns the zoom applied to the
/// anchor.
///
/// All zoom factors are validated before any layer is modified.
pub fn make_isotropic<L>(
    anchor: &mut L,
    linked: &mut [&mut dyn VolumeLayer],
) -> Result<f64, ResampleError>
where
    L: VolumeLayer + ?Sized,
{
    make_isotropic_with(anchor, linked, InterpolationMethod::default())
}

/// [`make_isotropic`] with an explicit interpolation method.
pub fn make_isotropic_with<L>(
    anchor: &mut L,
    linked: &mut [&mut dyn VolumeLayer],
    method: InterpolationMethod,
) -> Result<f64, ResampleError>
where
    L: VolumeLayer + ?Sized,
{
    let anchor_zoom = PixelGeometry::from_metadata(anchor.metadata()).z_zoom();
    checked_output_depth(anchor.data(), anchor_zoom)?;

    let linked_zooms = linked
        .iter()
        .map(|layer| {
            let zoom = PixelGeometry::from_metadata(layer.metadata()).z_zoom();
            checked_output_depth(layer.data(), zoom).map(|_| zoom)
        })
        .collect::<Result<Vec<_>, _>>()?;

    apply_zoom(anchor, anchor_zoom, method)?;
    for (layer, zoom) in linked.iter_mut().zip(linked_zooms) {
        apply_zoom(&mut **layer, zoom, method)?;
    }

    Ok(anchor_zoom)
}

fn apply_zoom<L>(layer: &mut L, z_zoom: f64, method: InterpolationMethod) -> Result<(), ResampleError>
where
    L: VolumeLayer + ?Sized,
{
    let before = layer.data().shape();
    let resampled = resample_z(layer.data(), z_zoom, method)?;
    tracing::debug!(
        "Resampled '{}' along z by {:.4}: {:?} -> {:?}",
        layer.name(),
        z_zoom,
        before,
        resampled.shape()
    );
    layer.set_data(resampled);
    Ok(())
}
