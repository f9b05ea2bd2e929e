//! Serialized record types for instance and panoptic ground truth.

use serde::{Deserialize, Serialize};

/// A single annotated object instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    /// Absolute `[min_x, min_y, max_x, max_y]` bounding box.
    pub bbox: [f32; 4],
    /// Box encoding; 0 means absolute XYXY.
    pub bbox_mode: u32,
    /// Zero-based class id, background excluded.
    pub category_id: u32,
    /// One or more flattened `[x, y, x, y, ...]` polygons.
    pub segmentation: Vec<Vec<f32>>,
    /// Always empty; kept for format compatibility.
    pub keypoints: Vec<f32>,
    pub iscrowd: bool,
}

/// Pixel-info record for one segment of a panoptic mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentsInfo {
    /// Segment id as encoded into the mask colors.
    pub id: u32,
    /// Zero-based class id, background excluded.
    pub category_id: u32,
    pub iscrowd: bool,
}

/// On-disk layout of an instances JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstancesFile {
    /// Mask shape as (height, width).
    pub image_size: (u32, u32),
    pub annotations: Vec<Instance>,
}

/// On-disk layout of a panoptic segments-info JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanoInfoFile {
    /// Mask shape as (height, width).
    pub image_size: (u32, u32),
    pub segments_info: Vec<SegmentsInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instances_serialize_with_expected_keys() {
        let file = InstancesFile {
            image_size: (100, 200),
            annotations: vec![Instance {
                bbox: [1.0, 2.0, 3.0, 4.0],
                bbox_mode: 0,
                category_id: 1,
                segmentation: vec![vec![1.0, 2.0, 3.0, 2.0, 3.0, 4.0]],
                keypoints: vec![],
                iscrowd: false,
            }],
        };
        let json = serde_json::to_value(&file).expect("should serialize");
        assert_eq!(json["image_size"][0], 100);
        assert_eq!(json["annotations"][0]["bbox_mode"], 0);
        assert_eq!(json["annotations"][0]["iscrowd"], false);
    }

    #[test]
    fn pano_info_round_trips() {
        let file = PanoInfoFile {
            image_size: (50, 60),
            segments_info: vec![SegmentsInfo {
                id: 7,
                category_id: 0,
                iscrowd: false,
            }],
        };
        let json = serde_json::to_string(&file).expect("should serialize");
        let back: PanoInfoFile = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(back.segments_info, file.segments_info);
    }
}
