//! Host-facing volume containers.
//!
//! The pipeline never depends on a concrete viewer type. Anything that can
//! hand out its voxels, accept replacement voxels, expose a metadata map and
//! carry a display name can be resampled and segmented.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::volume::{LabelVolume, Volume};

/// A single metadata entry as delivered by the image reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetadataValue {
    Number(f64),
    /// TIFF RATIONAL tag, e.g. `XResolution = 300/1`.
    Rational { numerator: u32, denominator: u32 },
    Text(String),
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Number(value)
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Text(value)
    }
}

/// String-keyed metadata mapping attached to a volume.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// Capability set the pipeline needs from a volume container.
pub trait VolumeLayer {
    fn name(&self) -> &str;

    fn set_name(&mut self, name: String);

    fn data(&self) -> &Volume;

    /// Replace the backing voxel buffer.
    fn set_data(&mut self, data: Volume);

    fn metadata(&self) -> &Metadata;
}

/// Grayscale intensity volume with its acquisition metadata.
#[derive(Debug, Clone)]
pub struct ImageLayer {
    pub name: String,
    pub data: Volume,
    pub metadata: Metadata,
}

impl ImageLayer {
    pub fn new(name: impl Into<String>, data: Volume, metadata: Metadata) -> Self {
        Self {
            name: name.into(),
            data,
            metadata,
        }
    }
}

impl VolumeLayer for ImageLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn data(&self) -> &Volume {
        &self.data
    }

    fn set_data(&mut self, data: Volume) {
        self.data = data;
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

/// Binary segmentation produced from an [`ImageLayer`].
///
/// Foreground voxels are 1, background voxels 0. Components are not
/// separated into distinct labels.
#[derive(Debug, Clone)]
pub struct LabelLayer {
    pub name: String,
    pub data: LabelVolume,
}

impl LabelLayer {
    /// Suffix appended to the source layer name.
    pub const NAME_SUFFIX: &'static str = "_seg";

    pub fn new(name: impl Into<String>, data: LabelVolume) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Name of the label layer derived from `source_name`.
    pub fn derived_name(source_name: &str) -> String {
        format!("{}{}", source_name, Self::NAME_SUFFIX)
    }

    /// Number of foreground voxels.
    pub fn foreground_count(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }
}
