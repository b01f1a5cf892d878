//! Slice-wise adaptive thresholding of a blob response.
//!
//! Every z-slice is handled on its own: its intensity range is stretched to
//! the 8-bit range, and pixels at or above `mean * thresh` of the stretched
//! slice become foreground. Slices with weak and strong responses are thus
//! thresholded on the same footing.


use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

use crate::volume::{LabelVolume, Volume, slice_min_max};

/// Upper end of the 8-bit intensity range.
pub const U8_MAX_LEVEL: f32 = 255.0;

/// Stretch `slice` so its minimum maps to 0 and its maximum to 255.
///
/// Levels are truncated to integers. Returns `false` for a flat slice (no
/// finite range), in which case `out` is all zeros.
pub fn rescale_slice_u8(slice: &[f32], out: &mut [u8]) -> bool {
    assert_eq!(slice.len(), out.len(), "Output length mismatch");

    let Some((min, max)) = slice_min_max(slice) else {
        out.fill(0);
        return false;
    };
    // f64 keeps the span of extreme f32 values finite.
    let (min, range) = (min as f64, max as f64 - min as f64);
    if range <= 0.0 {
        out.fill(0);
        return false;
    }

    for (o, &v) in out.iter_mut().zip(slice) {
        // NaN casts to 0, out-of-range values saturate.
        *o = ((v as f64 - min) / range * U8_MAX_LEVEL as f64) as u8;
    }
    true
}

/// Cut-off level for one rescaled slice: `mean(levels) * thresh`.
pub fn slice_threshold(levels: &[u8], thresh: f32) -> f64 {
    debug_assert!(!levels.is_empty());
    let sum: u64 = levels.iter().map(|&v| v as u64).sum();
    sum as f64 / levels.len() as f64 * thresh as f64
}

/// Binarize `response` slice by slice.
///
/// Output voxels are 1 where the rescaled level is `>= mean * thresh` of its
/// slice and 0 elsewhere. Flat slices are entirely 0 whatever `thresh` is.
pub fn slice_adaptive_threshold(response: &Volume, thresh: f32) -> LabelVolume {
    let mut mask = LabelVolume::new_default(response.width(), response.height(), response.depth());
    if response.is_empty() {
        return mask;
    }

    let flat_slices = AtomicUsize::new(0);

    mask.voxels_mut()
        .par_chunks_mut(response.slice_len())
        .enumerate()
        .for_each(|(z, out)| {
            if !rescale_slice_u8(response.slice(z), out) {
                flat_slices.fetch_add(1, Ordering::Relaxed);
                return;
            }
            let threshold = slice_threshold(out, thresh);
            for level in out.iter_mut() {
                *level = (*level as f64 >= threshold) as u8;
            }
        });

    let flat_slices = flat_slices.into_inner();
    if flat_slices > 0 {
        tracing::debug!(
            "{} of {} slices have no intensity range and were left empty",
            flat_slices,
            response.depth()
        );
    }

    mask
}
