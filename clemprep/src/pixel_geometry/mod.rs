//! Physical voxel size from acquisition metadata.
//!
//! x and y sizes come from the TIFF `XResolution` / `YResolution` tags
//! (pixels per unit, so the size is the reciprocal). The z spacing and unit
//! come from the ImageJ side-channel block stored under `ImageDescription`,
//! a newline separated list of `key=value` pairs.
//!
//! Missing or malformed entries never fail: the affected field falls back to
//! 1 (or `"micron"`) and a warning is logged, so the worst case downstream is
//! a no-op resample.

pub mod expr;


use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layer::{Metadata, MetadataValue};

pub use expr::ExprError;

pub const X_RESOLUTION_KEY: &str = "XResolution";
pub const Y_RESOLUTION_KEY: &str = "YResolution";
pub const IMAGE_DESCRIPTION_KEY: &str = "ImageDescription";
pub const SPACING_KEY: &str = "spacing";
pub const UNIT_KEY: &str = "unit";
pub const DEFAULT_UNIT: &str = "micron";

/// Physical size of one voxel along each axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PixelGeometry {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub unit: String,
}

impl Default for PixelGeometry {
    fn default() -> Self {
        Self {
            x: 1.0,
            y: 1.0,
            z: 1.0,
            unit: DEFAULT_UNIT.to_string(),
        }
    }
}

impl PixelGeometry {
    pub fn new(x: f64, y: f64, z: f64, unit: impl Into<String>) -> Self {
        Self {
            x,
            y,
            z,
            unit: unit.into(),
        }
    }

    /// Resolve the geometry from a metadata mapping.
    ///
    /// x/y and z/unit are resolved independently of each other.
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let (x, y) = resolve_xy(metadata);
        let (z, unit) = resolve_z_and_unit(metadata);
        Self { x, y, z, unit }
    }

    /// Zoom along z that makes the z spacing equal to the x spacing.
    ///
    /// x and y sizes are assumed equal.
    pub fn z_zoom(&self) -> f64 {
        self.z / self.x
    }

    pub fn is_isotropic(&self) -> bool {
        (self.z_zoom() - 1.0).abs() < common::EPSILON
    }
}

/// Resolve `(x, y, z, unit)` from a metadata mapping.
pub fn get_pixel_size(metadata: &Metadata) -> PixelGeometry {
    PixelGeometry::from_metadata(metadata)
}

/// Reasons a single metadata field could not be used.
#[derive(Debug, Error, PartialEq)]
enum FieldError {
    #[error("'{key}' not recorded in metadata")]
    Missing { key: &'static str },

    #[error("'{key}' is not a text entry")]
    NotText { key: &'static str },

    #[error("'{key}' is malformed: {source}")]
    Malformed {
        key: &'static str,
        #[source]
        source: ExprError,
    },

    #[error("'{key}' must be positive, got {value}")]
    NotPositive { key: &'static str, value: f64 },
}

fn resolve_xy(metadata: &Metadata) -> (f64, f64) {
    let sizes = resolution_to_size(metadata, X_RESOLUTION_KEY)
        .and_then(|x| Ok((x, resolution_to_size(metadata, Y_RESOLUTION_KEY)?)));

    match sizes {
        Ok(sizes) => sizes,
        Err(e) => {
            tracing::warn!("{}; using x/y pixel size 1", e);
            (1.0, 1.0)
        }
    }
}

fn resolution_to_size(metadata: &Metadata, key: &'static str) -> Result<f64, FieldError> {
    let resolution = match metadata.get(key) {
        None => return Err(FieldError::Missing { key }),
        Some(MetadataValue::Number(v)) => *v,
        Some(MetadataValue::Rational {
            numerator,
            denominator,
        }) => {
            if *denominator == 0 {
                return Err(FieldError::Malformed {
                    key,
                    source: ExprError::DivisionByZero,
                });
            }
            *numerator as f64 / *denominator as f64
        }
        Some(MetadataValue::Text(text)) => {
            expr::evaluate(text).map_err(|source| FieldError::Malformed { key, source })?
        }
    };

    positive(key, resolution).map(|r| 1.0 / r)
}

fn positive(key: &'static str, value: f64) -> Result<f64, FieldError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(FieldError::NotPositive { key, value })
    }
}

fn resolve_z_and_unit(metadata: &Metadata) -> (f64, String) {
    let description = match metadata.get(IMAGE_DESCRIPTION_KEY) {
        Some(MetadataValue::Text(text)) => text.as_str(),
        Some(_) => {
            tracing::warn!(
                "{}; using z pixel size 1 and unit '{}'",
                FieldError::NotText {
                    key: IMAGE_DESCRIPTION_KEY
                },
                DEFAULT_UNIT
            );
            return (1.0, DEFAULT_UNIT.to_string());
        }
        None => {
            tracing::warn!(
                "ImageJ metadata not recorded in metadata; using z pixel size 1 and unit '{}'",
                DEFAULT_UNIT
            );
            return (1.0, DEFAULT_UNIT.to_string());
        }
    };

    let entries = parse_description(description);

    let z = match entries.get(SPACING_KEY) {
        None => Err(FieldError::Missing { key: SPACING_KEY }),
        Some(text) => expr::evaluate(text)
            .map_err(|source| FieldError::Malformed {
                key: SPACING_KEY,
                source,
            })
            .and_then(|v| positive(SPACING_KEY, v)),
    }
    .unwrap_or_else(|e| {
        tracing::warn!("{}; using z pixel size 1", e);
        1.0
    });

    let unit = match entries.get(UNIT_KEY) {
        Some(unit) if !unit.is_empty() => unit.to_string(),
        _ => {
            tracing::warn!(
                "{}; using unit '{}'",
                FieldError::Missing { key: UNIT_KEY },
                DEFAULT_UNIT
            );
            DEFAULT_UNIT.to_string()
        }
    };

    (z, unit)
}

/// Split an ImageJ description block into `key=value` entries.
///
/// Empty lines and bare `=` separators are dropped. Each remaining line is
/// split on its first `=`; lines without one are skipped. Later duplicates
/// win.
pub fn parse_description(description: &str) -> BTreeMap<&str, &str> {
    let mut entries = BTreeMap::new();

    for line in description.split('\n') {
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line == "=" {
            continue;
        }
        match line.split_once('=') {
            Some((key, value)) => {
                entries.insert(key.trim(), value.trim());
            }
            None => tracing::debug!("Skipping ImageJ metadata line without '=': {:?}", line),
        }
    }

    entries
}
