//! Tests for isotropic resampling.

use super::*;
use crate::layer::{ImageLayer, Metadata};
use crate::testing::{image_layer, metadata_with_pixel_size, random_volume, volume_from_fn};

// ============================================================================
// Kernel
// ============================================================================

#[test]
fn test_bicubic_kernel_interpolates() {
    assert_eq!(bicubic_kernel(0.0), 1.0);
    assert_eq!(bicubic_kernel(1.0), 0.0);
    assert_eq!(bicubic_kernel(-1.0), 0.0);
    assert_eq!(bicubic_kernel(2.0), 0.0);
}

#[test]
fn test_bicubic_kernel_partition_of_unity() {
    for f in [0.1f32, 0.25, 0.5, 0.9] {
        let sum: f32 = (-1..=2).map(|k| bicubic_kernel(f - k as f32)).sum();
        assert!((sum - 1.0).abs() < 1e-6, "weights sum to {} at f={}", sum, f);
    }
}

#[test]
fn test_zoom_values() {
    assert_eq!(zoom_values(0.5, 2.0, 0.25, 1.0), (2.0, 2.0));
    assert_eq!(zoom_values(1.0, 1.0, 1.0, 4.0), (1.0, 0.25));
}

// ============================================================================
// resample_z
// ============================================================================

#[test]
fn test_identity_zoom_is_exact() {
    let volume = random_volume([5, 4, 3], -1.0, 1.0, 7);
    for method in [
        InterpolationMethod::Nearest,
        InterpolationMethod::Linear,
        InterpolationMethod::Cubic,
    ] {
        let out = resample_z(&volume, 1.0, method).unwrap();
        assert_eq!(out, volume);
    }
}

#[test]
fn test_zoom_two_doubles_depth() {
    let volume = random_volume([8, 4, 4], 0.0, 1.0, 1);
    let out = resample_z(&volume, 2.0, InterpolationMethod::Cubic).unwrap();
    assert_eq!(out.shape(), [16, 4, 4]);
}

#[test]
fn test_endpoints_are_preserved() {
    let volume = random_volume([6, 3, 3], 0.0, 1.0, 3);
    let out = resample_z(&volume, 2.5, InterpolationMethod::Cubic).unwrap();
    assert_eq!(out.depth(), 15);
    assert_eq!(out.slice(0), volume.slice(0));
    for (a, b) in out.slice(14).iter().zip(volume.slice(5)) {
        assert!((a - b).abs() < 1e-6);
    }
}

#[test]
fn test_linear_ramp_is_reproduced() {
    // v = z; corner-aligned mapping keeps the ramp linear in the output.
    let volume = volume_from_fn([5, 2, 2], |_, _, z| z as f32);
    let out = resample_z(&volume, 1.8, InterpolationMethod::Linear).unwrap();
    assert_eq!(out.depth(), 9);
    for z in 0..out.depth() {
        let expected = z as f32 * 0.5;
        for &v in out.slice(z) {
            assert!((v - expected).abs() < 1e-5, "slice {} = {}", z, v);
        }
    }
}

#[test]
fn test_cubic_reproduces_ramp_away_from_edges() {
    // Edge clamping bends the ramp in the outermost interval only.
    let volume = volume_from_fn([5, 2, 2], |_, _, z| z as f32);
    let out = resample_z(&volume, 1.8, InterpolationMethod::Cubic).unwrap();
    for z in 2..=6 {
        let expected = z as f32 * 0.5;
        for &v in out.slice(z) {
            assert!((v - expected).abs() < 1e-5, "slice {} = {}", z, v);
        }
    }
}

#[test]
fn test_nearest_copies_slices() {
    let volume = volume_from_fn([3, 1, 1], |_, _, z| (z * 10) as f32);
    let out = resample_z(&volume, 2.0, InterpolationMethod::Nearest).unwrap();
    // Output slice o samples input o * 2 / 5.
    let values: Vec<f32> = out.iter().copied().collect();
    assert_eq!(values, vec![0.0, 0.0, 10.0, 10.0, 20.0, 20.0]);
}

#[test]
fn test_downsampling() {
    let volume = volume_from_fn([9, 2, 2], |_, _, z| z as f32);
    let out = resample_z(&volume, 0.5, InterpolationMethod::Linear).unwrap();
    assert_eq!(out.depth(), 5);
    let firsts: Vec<f32> = (0..5).map(|z| out.slice(z)[0]).collect();
    assert_eq!(firsts, vec![0.0, 2.0, 4.0, 6.0, 8.0]);
}

#[test]
fn test_single_slice_input() {
    let volume = volume_from_fn([1, 2, 2], |x, y, _| (x + y) as f32);
    let out = resample_z(&volume, 3.0, InterpolationMethod::Cubic).unwrap();
    assert_eq!(out.depth(), 3);
    for z in 0..3 {
        assert_eq!(out.slice(z), volume.slice(0));
    }
}

#[test]
fn test_tiny_zoom_keeps_one_slice() {
    let volume = random_volume([4, 2, 2], 0.0, 1.0, 9);
    let out = resample_z(&volume, 0.01, InterpolationMethod::Cubic).unwrap();
    assert_eq!(out.depth(), 1);
    assert_eq!(out.slice(0), volume.slice(0));
}

#[test]
fn test_invalid_zoom() {
    let volume = random_volume([2, 2, 2], 0.0, 1.0, 0);
    for zoom in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        let err = resample_z(&volume, zoom, InterpolationMethod::Cubic).unwrap_err();
        assert!(matches!(err, ResampleError::InvalidZoom { .. }));
    }
    assert!(matches!(
        resample_z(&volume, 1e9, InterpolationMethod::Cubic),
        Err(ResampleError::OutputTooDeep { .. })
    ));
}

// ============================================================================
// make_isotropic
// ============================================================================

#[test]
fn test_make_isotropic_anchor_only() {
    let mut layer = image_layer(
        "lm",
        random_volume([8, 4, 4], 0.0, 1.0, 11),
        metadata_with_pixel_size(1.0, 2.0),
    );

    let zoom = make_isotropic(&mut layer, &mut []).unwrap();

    assert_eq!(zoom, 2.0);
    assert_eq!(layer.data.shape(), [16, 4, 4]);
}

#[test]
fn test_make_isotropic_without_metadata_is_noop() {
    let volume = random_volume([6, 5, 4], 0.0, 1.0, 5);
    let mut layer = ImageLayer::new("lm", volume.clone(), Metadata::new());

    let zoom = make_isotropic(&mut layer, &mut []).unwrap();

    assert_eq!(zoom, 1.0);
    assert_eq!(layer.data, volume);
}

#[test]
fn test_make_isotropic_resamples_linked_layers_with_own_geometry() {
    let mut anchor = image_layer(
        "ch0",
        random_volume([4, 3, 3], 0.0, 1.0, 1),
        metadata_with_pixel_size(0.5, 1.0),
    );
    let mut same = image_layer(
        "ch1",
        random_volume([4, 3, 3], 0.0, 1.0, 2),
        metadata_with_pixel_size(0.5, 1.0),
    );
    let mut different = image_layer(
        "ch2",
        random_volume([4, 3, 3], 0.0, 1.0, 3),
        metadata_with_pixel_size(0.5, 1.5),
    );

    let zoom = make_isotropic(&mut anchor, &mut [&mut same, &mut different]).unwrap();

    assert_eq!(zoom, 2.0);
    assert_eq!(anchor.data.depth(), 8);
    assert_eq!(same.data.depth(), 8);
    assert_eq!(different.data.depth(), 12);
}

#[test]
fn test_make_isotropic_validates_before_mutating() {
    let anchor_volume = random_volume([4, 2, 2], 0.0, 1.0, 1);
    let mut anchor = image_layer(
        "ch0",
        anchor_volume.clone(),
        metadata_with_pixel_size(1.0, 2.0),
    );
    let mut broken = image_layer(
        "ch1",
        random_volume([4, 2, 2], 0.0, 1.0, 2),
        metadata_with_pixel_size(1e-300, 1e300),
    );

    let result = make_isotropic(&mut anchor, &mut [&mut broken]);

    assert!(result.is_err());
    assert_eq!(anchor.data, anchor_volume, "anchor must stay untouched");
}

#[test]
fn test_make_isotropic_with_nearest() {
    let mut layer = image_layer(
        "mask",
        volume_from_fn([2, 1, 1], |_, _, z| z as f32),
        metadata_with_pixel_size(1.0, 3.0),
    );

    let zoom = make_isotropic_with(&mut layer, &mut [], InterpolationMethod::Nearest).unwrap();

    assert_eq!(zoom, 3.0);
    assert!(layer.data.iter().all(|&v| v == 0.0 || v == 1.0));
    assert_eq!(layer.data.depth(), 6);
}

#[test]
fn test_resample_rejects_empty_volume() {
    let volume = Volume::new(3, 3, 0, vec![]);
    for zoom in [1.0, 2.5] {
        let err = resample_z(&volume, zoom, InterpolationMethod::Cubic).unwrap_err();
        assert!(matches!(
            err,
            ResampleError::Volume(VolumeError::EmptyAxis { axis: 0, .. })
        ));
    }
}

#[test]
fn test_make_isotropic_rejects_empty_linked_layer() {
    let anchor_volume = random_volume([4, 2, 2], 0.0, 1.0, 7);
    let mut anchor = image_layer(
        "ch0",
        anchor_volume.clone(),
        metadata_with_pixel_size(1.0, 2.0),
    );
    let mut empty = image_layer(
        "ch1",
        Volume::new(2, 2, 0, vec![]),
        metadata_with_pixel_size(1.0, 2.0),
    );

    let err = make_isotropic(&mut anchor, &mut [&mut empty]).unwrap_err();

    assert!(matches!(err, ResampleError::Volume(_)));
    assert_eq!(anchor.data, anchor_volume);
    assert_eq!(empty.data.depth(), 0);
}
