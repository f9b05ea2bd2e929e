//! The `info.json` manifest written at the end of a preprocessing run.

use serde::{Deserialize, Serialize};

use crate::page::GroundTruthMode;

/// Output paths produced for one input scan. Paths are relative to the
/// dataset output directory, except for the original input path.
#[derive(Debug, Clone, Default)]
pub struct FileOutputs {
    pub original_image_path: String,
    pub image_path: Option<String>,
    pub sem_seg_path: Option<String>,
    pub instances_path: Option<String>,
    pub pano_path: Option<String>,
    pub segments_info_path: Option<String>,
}

/// Column-wise view of all per-file outputs, as stored in the manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestData {
    pub original_image_paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sem_seg_paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instances_paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pano_paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub segments_info_paths: Vec<String>,
}

impl ManifestData {
    pub fn push(&mut self, outputs: FileOutputs) {
        self.original_image_paths.push(outputs.original_image_path);
        if let Some(path) = outputs.image_path {
            self.image_paths.push(path);
        }
        if let Some(path) = outputs.sem_seg_path {
            self.sem_seg_paths.push(path);
        }
        if let Some(path) = outputs.instances_path {
            self.instances_paths.push(path);
        }
        if let Some(path) = outputs.pano_path {
            self.pano_paths.push(path);
        }
        if let Some(path) = outputs.segments_info_path {
            self.segments_info_paths.push(path);
        }
    }

    pub fn len(&self) -> usize {
        self.original_image_paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.original_image_paths.is_empty()
    }
}

/// Top-level layout of `info.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub data: ManifestData,
    /// Configured region names, in class order.
    pub classes: Vec<String>,
    pub mode: GroundTruthMode,
}
