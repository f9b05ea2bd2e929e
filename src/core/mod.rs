//! Core building blocks shared across the preprocessing pipeline.
//!
//! This module contains the fundamental components used throughout the
//! crate:
//! - Error handling ([`errors`])
//! - Parallel processing policy ([`parallel`])
//! - Scalar and shape validation helpers ([`validation`])

pub mod errors;
pub mod parallel;
pub mod validation;

pub use errors::{LayprepError, LayprepResult, ProcessingStage};
pub use parallel::ParallelPolicy;
pub use validation::{
    validate_image_dimensions, validate_non_empty, validate_positive, validate_probability,
    validate_range,
};
