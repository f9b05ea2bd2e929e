//! Shared helpers: image I/O and logging setup.

pub mod image;
pub mod logging;

pub use image::{load_image, probe_dimensions, probe_dpi, save_image, LoadedImage};
pub use logging::init_tracing;
