//! Training configuration management.
//!
//! The configuration is a nested YAML document read once at process
//! start. It supports override-by-inheritance through a `_BASE_` key: a
//! child document names a base config whose keys it selectively
//! overrides at matching paths ([`base`]). The typed schema lives in
//! [`schema`] and range/consistency checks in [`validate`].

pub mod base;
pub mod schema;
pub mod validate;

pub use base::{load_yaml_with_bases, merge_values, BASE_KEY};
pub use schema::{
    AffineConfig, BaselineConfig, DataloaderConfig, DpiConfig, ElasticConfig, FlipConfig,
    GaussianConfig, InputConfig, IntensityConfig, ModelConfig, OrientationConfig,
    PreprocessConfig, RegionConfig, ResizeConfig, ResizeModeKind, Sampling, SemSegHeadConfig,
    SolverConfig, TestConfig, TrainWeightsConfig, TrainingConfig,
};
pub use validate::validate_config;

use std::path::Path;

use crate::core::LayprepResult;

impl TrainingConfig {
    /// Loads a training configuration from a YAML file, resolving
    /// `_BASE_` inheritance and validating the result.
    pub fn load(path: impl AsRef<Path>) -> LayprepResult<Self> {
        let merged = load_yaml_with_bases(path.as_ref())?;
        let config: TrainingConfig = serde_yaml::from_value(merged)?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Parses a configuration from a YAML string without `_BASE_`
    /// resolution. Primarily for tests and embedded defaults.
    pub fn from_yaml_str(yaml: &str) -> LayprepResult<Self> {
        let config: TrainingConfig = serde_yaml::from_str(yaml)?;
        validate_config(&config)?;
        Ok(config)
    }
}
