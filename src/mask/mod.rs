//! Rasterization of PAGE annotations into ground-truth masks.
//!
//! The [`GroundTruthBuilder`] turns a parsed [`crate::page::PageAnnotation`]
//! into semantic segmentation masks, instance records, or panoptic masks,
//! depending on the configured [`crate::page::GroundTruthMode`].

pub mod converter;
pub mod draw;
pub mod instances;

pub use converter::GroundTruthBuilder;
pub use draw::{id_to_rgb, rgb_to_id};
pub use instances::{Instance, InstancesFile, PanoInfoFile, SegmentsInfo};
