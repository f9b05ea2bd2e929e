//! Core error types for the preprocessing pipeline.
//!
//! This module defines the fundamental error types used throughout the
//! crate, including the main [`LayprepError`] enum and the
//! [`ProcessingStage`] enum that locates a failure within the pipeline.

use std::path::Path;

use thiserror::Error;

/// Convenience alias for results produced by this crate.
pub type LayprepResult<T> = Result<T, LayprepError>;

/// Enum representing different stages of the preprocessing pipeline.
///
/// Used to identify where an error occurred, providing context for
/// debugging and error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Error occurred while parsing an annotation or configuration file.
    Parse,
    /// Error occurred while rasterizing annotations into masks.
    Rasterize,
    /// Error occurred while computing or applying a resize.
    Resize,
    /// Error occurred during image processing operations.
    ImageProcessing,
    /// Error occurred while processing the dataset as a whole.
    DatasetProcessing,
    /// Error occurred while writing the dataset manifest.
    Manifest,
    /// Generic processing error.
    Generic,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::Parse => write!(f, "parse"),
            ProcessingStage::Rasterize => write!(f, "rasterize"),
            ProcessingStage::Resize => write!(f, "resize"),
            ProcessingStage::ImageProcessing => write!(f, "image processing"),
            ProcessingStage::DatasetProcessing => write!(f, "dataset processing"),
            ProcessingStage::Manifest => write!(f, "manifest"),
            ProcessingStage::Generic => write!(f, "processing"),
        }
    }
}

/// Enum representing the errors that can occur in the preprocessing
/// pipeline.
///
/// Covers annotation parsing, configuration loading and validation,
/// image I/O, and rasterization failures.
#[derive(Error, Debug)]
pub enum LayprepError {
    /// Error occurred while loading an image.
    #[error("image load")]
    ImageLoad(#[from] image::ImageError),

    /// Error occurred while parsing an XML document.
    #[error("xml parse")]
    Xml(#[from] roxmltree::Error),

    /// Error occurred while parsing a YAML document.
    #[error("yaml parse")]
    Yaml(#[from] serde_yaml::Error),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),

    /// Error occurred while serializing output JSON.
    #[error("json")]
    Json(#[from] serde_json::Error),

    /// Error occurred during processing.
    #[error("{kind} failed: {context}")]
    Processing {
        /// The stage of the pipeline where the error occurred.
        kind: ProcessingStage,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    Config {
        /// A message describing the configuration error.
        message: String,
    },
}

impl LayprepError {
    /// Creates an invalid-input error from anything printable.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a configuration error with context and details.
    ///
    /// # Arguments
    ///
    /// * `context` - High-level description of what was being configured
    /// * `details` - Specific details about what went wrong
    pub fn config_error_detailed(context: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Config {
            message: format!("{}: {}", context.into(), details.into()),
        }
    }

    /// Creates a configuration error for invalid field values.
    pub fn invalid_field(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::Config {
            message: format!(
                "invalid value for field '{}': expected {}, got {}",
                field.into(),
                expected.into(),
                actual.into()
            ),
        }
    }

    /// Wraps an error that occurred at a given pipeline stage.
    pub fn processing(
        kind: ProcessingStage,
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind,
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Wraps an error that occurred while handling a specific file.
    pub fn processing_for_path(
        kind: ProcessingStage,
        path: &Path,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind,
            context: path.display().to_string(),
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_detailed_formats_context_and_details() {
        let err = LayprepError::config_error_detailed(
            "solver validation",
            "BASE_LR must be positive, got -0.1",
        );
        assert_eq!(
            err.to_string(),
            "configuration: solver validation: BASE_LR must be positive, got -0.1"
        );
    }

    #[test]
    fn invalid_field_names_the_field() {
        let err = LayprepError::invalid_field("INPUT.BRIGHTNESS.PROBABILITY", "[0, 1]", "1.5");
        assert!(err.to_string().contains("INPUT.BRIGHTNESS.PROBABILITY"));
        assert!(matches!(err, LayprepError::Config { .. }));
    }

    #[test]
    fn processing_stage_display_is_lowercase() {
        assert_eq!(ProcessingStage::Rasterize.to_string(), "rasterize");
        assert_eq!(ProcessingStage::DatasetProcessing.to_string(), "dataset processing");
    }
}
