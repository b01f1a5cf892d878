//! Testing utilities for clemprep.

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::layer::{ImageLayer, Metadata, MetadataValue};
use crate::pixel_geometry::{IMAGE_DESCRIPTION_KEY, X_RESOLUTION_KEY, Y_RESOLUTION_KEY};
use crate::volume::Volume;

/// Initialize tracing subscriber for tests.
/// Safe to call multiple times - will only initialize once.
/// Respects RUST_LOG env var, defaults to "info".
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Volume of the given (z, y, x) shape where voxel value = `f(x, y, z)`.
pub fn volume_from_fn(shape: [usize; 3], f: impl Fn(usize, usize, usize) -> f32) -> Volume {
    let [depth, height, width] = shape;
    let mut voxels = Vec::with_capacity(depth * height * width);
    for z in 0..depth {
        for y in 0..height {
            for x in 0..width {
                voxels.push(f(x, y, z));
            }
        }
    }
    Volume::new(width, height, depth, voxels)
}

/// Isotropic 3D Gaussian blob on a zero background.
///
/// `center` is (z, y, x); `sigma` is the blob's standard deviation in voxels.
pub fn gaussian_blob(shape: [usize; 3], center: [f32; 3], sigma: f32, amplitude: f32) -> Volume {
    let two_sigma_sq = 2.0 * sigma * sigma;
    volume_from_fn(shape, |x, y, z| {
        let dz = z as f32 - center[0];
        let dy = y as f32 - center[1];
        let dx = x as f32 - center[2];
        amplitude * (-(dx * dx + dy * dy + dz * dz) / two_sigma_sq).exp()
    })
}

/// Uniform random volume in `[low, high)` with a fixed seed.
pub fn random_volume(shape: [usize; 3], low: f32, high: f32, seed: u64) -> Volume {
    let mut rng = StdRng::seed_from_u64(seed);
    volume_from_fn(shape, |_, _, _| 0.0).map(|_| rng.random_range(low..high))
}

/// Metadata carrying the given lateral and axial pixel sizes.
pub fn metadata_with_pixel_size(xy: f64, z: f64) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert(X_RESOLUTION_KEY.to_string(), MetadataValue::Number(1.0 / xy));
    metadata.insert(Y_RESOLUTION_KEY.to_string(), MetadataValue::Number(1.0 / xy));
    metadata.insert(
        IMAGE_DESCRIPTION_KEY.to_string(),
        MetadataValue::Text(format!("ImageJ=1.53t\nunit=micron\nspacing={}\n", z)),
    );
    metadata
}

pub fn image_layer(name: &str, data: Volume, metadata: Metadata) -> ImageLayer {
    ImageLayer::new(name, data, metadata)
}
