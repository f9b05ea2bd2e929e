//! Ground-truth preprocessing for document layout analysis.
//!
//! `layprep` turns annotated document scans (images plus PAGE XML layout
//! annotations) into the per-pixel ground truth a segmentation trainer
//! consumes. It covers:
//!
//! - the YAML training configuration with `_BASE_` inheritance
//!   ([`config`]),
//! - PAGE XML parsing into a typed layout model ([`page`]),
//! - rasterization of regions, text lines, and baselines into semantic
//!   segmentation masks, COCO-style instances, and panoptic targets
//!   ([`mask`]),
//! - the parallel dataset pipeline that writes the on-disk training
//!   layout and manifest ([`dataset`]).
//!
//! The training loop itself, augmentation execution, and model
//! architecture are out of scope: this crate produces their inputs.

pub mod config;
pub mod core;
pub mod dataset;
pub mod mask;
pub mod page;
pub mod utils;

pub use config::TrainingConfig;
pub use crate::core::{LayprepError, LayprepResult, ParallelPolicy, ProcessingStage};
pub use dataset::Preprocessor;
pub use mask::GroundTruthBuilder;
pub use page::{GroundTruthMode, PageAnnotation, RegionSet};
