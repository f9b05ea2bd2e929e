//! Dataset preprocessing: input collection, resizing, and the pipeline
//! that writes the on-disk training layout.

pub mod manifest;
pub mod paths;
pub mod preprocess;
pub mod resize;

pub use manifest::{DatasetManifest, FileOutputs, ManifestData};
pub use paths::{collect_image_paths, image_path_to_xml_path, SUPPORTED_IMAGE_EXTENSIONS};
pub use preprocess::Preprocessor;
pub use resize::{DpiPolicy, ResizePolicy};
