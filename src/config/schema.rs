//! Typed schema for the YAML training configuration.
//!
//! Keys follow the upper-case convention of the on-disk documents
//! (`PREPROCESS`, `INPUT`, `SOLVER`, ...). The `INPUT` section is the
//! contract of the external trainer's augmentation pipeline: it is
//! parsed and validated here but never applied by this crate.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::page::GroundTruthMode;

/// Root of the training configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct TrainingConfig {
    /// Dataset preprocessing: resizing, DPI policy, ground-truth
    /// extraction settings.
    #[serde(default)]
    pub preprocess: PreprocessConfig,
    /// Augmentation probabilities and parameter ranges (trainer-side).
    #[serde(default)]
    pub input: InputConfig,
    /// Dataloader worker settings (trainer-side).
    #[serde(default)]
    pub dataloader: DataloaderConfig,
    /// Solver hyperparameters: batch size, LR schedule, iteration budget.
    pub solver: SolverConfig,
    /// Model mode, head class count, weights path.
    pub model: ModelConfig,
    /// Training-time weights override.
    #[serde(default)]
    pub train: TrainWeightsConfig,
    /// Evaluation weights and period.
    #[serde(default)]
    pub test: TestConfig,
}

/// `PREPROCESS` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct PreprocessConfig {
    #[serde(default)]
    pub resize: ResizeConfig,
    #[serde(default)]
    pub dpi: DpiConfig,
    #[serde(default)]
    pub baseline: BaselineConfig,
    #[serde(default)]
    pub region: RegionConfig,
    /// Skip filesystem accessibility checks on the inputs.
    #[serde(default)]
    pub disable_check: bool,
    /// Regenerate outputs even when an up-to-date file already exists.
    #[serde(default)]
    pub overwrite: bool,
}

/// How the target size is selected when resizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeModeKind {
    /// Keep the original size.
    None,
    /// Resize so the shortest edge matches the selected size.
    ShortestEdge,
    /// Resize so the longest edge matches the selected size.
    LongestEdge,
    /// Resize by a fixed scale factor (optionally DPI-driven).
    Scaling,
}

/// How a size is picked from `MIN_SIZE` (trainer-side randomization
/// knob; preprocessing resolves it deterministically, see
/// [`crate::dataset::ResizePolicy`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sampling {
    /// Pick one of the listed sizes.
    Choice,
    /// Pick a size within `[min, max]` of the listed sizes.
    Range,
}

/// `PREPROCESS.RESIZE` subsection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ResizeConfig {
    pub resize_mode: ResizeModeKind,
    #[serde(default = "ResizeConfig::default_sampling")]
    pub resize_sampling: Sampling,
    #[serde(default = "ResizeConfig::default_min_size")]
    pub min_size: Vec<u32>,
    #[serde(default = "ResizeConfig::default_max_size")]
    pub max_size: u32,
    #[serde(default = "ResizeConfig::default_scaling")]
    pub scaling: f64,
}

impl ResizeConfig {
    fn default_sampling() -> Sampling {
        Sampling::Choice
    }

    fn default_min_size() -> Vec<u32> {
        vec![1024]
    }

    fn default_max_size() -> u32 {
        2048
    }

    fn default_scaling() -> f64 {
        0.5
    }
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            resize_mode: ResizeModeKind::None,
            resize_sampling: Self::default_sampling(),
            min_size: Self::default_min_size(),
            max_size: Self::default_max_size(),
            scaling: Self::default_scaling(),
        }
    }
}

/// `PREPROCESS.DPI` subsection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct DpiConfig {
    /// Read the DPI from image metadata when available.
    #[serde(default = "DpiConfig::default_auto_detect")]
    pub auto_detect: bool,
    /// Assumed DPI when metadata carries none.
    #[serde(default)]
    pub default_dpi: Option<u32>,
    /// Forced DPI, overriding detection entirely.
    #[serde(default)]
    pub manual_dpi: Option<u32>,
    /// Target DPI for DPI-driven scaling.
    #[serde(default)]
    pub target_dpi: Option<u32>,
}

impl DpiConfig {
    fn default_auto_detect() -> bool {
        true
    }
}

impl Default for DpiConfig {
    fn default() -> Self {
        Self {
            auto_detect: Self::default_auto_detect(),
            default_dpi: None,
            manual_dpi: None,
            target_dpi: None,
        }
    }
}

/// `PREPROCESS.BASELINE` subsection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct BaselineConfig {
    /// Thickness in pixels of rasterized baselines.
    #[serde(default = "BaselineConfig::default_line_width")]
    pub line_width: u32,
    /// Square off the round caps at baseline ends.
    #[serde(default = "BaselineConfig::default_square_lines")]
    pub square_lines: bool,
}

impl BaselineConfig {
    fn default_line_width() -> u32 {
        5
    }

    fn default_square_lines() -> bool {
        true
    }
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            line_width: Self::default_line_width(),
            square_lines: Self::default_square_lines(),
        }
    }
}

/// `PREPROCESS.REGION` subsection.
///
/// `MERGE_REGIONS` entries use the `canonical:alias1,alias2` form: every
/// alias maps onto the canonical region's class.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct RegionConfig {
    /// Ordered region names; class id is position + 1 (0 is background).
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default)]
    pub merge_regions: Vec<String>,
}

/// `INPUT` section: augmentation settings consumed by the external
/// trainer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct InputConfig {
    #[serde(default)]
    pub brightness: IntensityConfig,
    #[serde(default)]
    pub contrast: IntensityConfig,
    #[serde(default)]
    pub saturation: IntensityConfig,
    #[serde(default)]
    pub gaussian_filter: GaussianConfig,
    #[serde(default)]
    pub horizontal_flip: FlipConfig,
    #[serde(default)]
    pub vertical_flip: FlipConfig,
    #[serde(default)]
    pub elastic_deformation: ElasticConfig,
    #[serde(default)]
    pub affine: AffineConfig,
    #[serde(default)]
    pub orientation: OrientationConfig,
}

/// Intensity-style augmentation: brightness, contrast, saturation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct IntensityConfig {
    #[serde(default)]
    pub probability: f64,
    #[serde(default = "IntensityConfig::default_min_intensity")]
    pub min_intensity: f64,
    #[serde(default = "IntensityConfig::default_max_intensity")]
    pub max_intensity: f64,
}

impl IntensityConfig {
    fn default_min_intensity() -> f64 {
        0.5
    }

    fn default_max_intensity() -> f64 {
        1.5
    }
}

impl Default for IntensityConfig {
    fn default() -> Self {
        Self {
            probability: 0.0,
            min_intensity: Self::default_min_intensity(),
            max_intensity: Self::default_max_intensity(),
        }
    }
}

/// Gaussian blur augmentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct GaussianConfig {
    #[serde(default)]
    pub probability: f64,
    #[serde(default = "GaussianConfig::default_min_sigma")]
    pub min_sigma: f64,
    #[serde(default = "GaussianConfig::default_max_sigma")]
    pub max_sigma: f64,
}

impl GaussianConfig {
    fn default_min_sigma() -> f64 {
        0.5
    }

    fn default_max_sigma() -> f64 {
        2.0
    }
}

impl Default for GaussianConfig {
    fn default() -> Self {
        Self {
            probability: 0.0,
            min_sigma: Self::default_min_sigma(),
            max_sigma: Self::default_max_sigma(),
        }
    }
}

/// Horizontal or vertical flip augmentation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct FlipConfig {
    #[serde(default)]
    pub probability: f64,
}

/// Elastic deformation augmentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ElasticConfig {
    #[serde(default)]
    pub probability: f64,
    #[serde(default = "ElasticConfig::default_alpha")]
    pub alpha: f64,
    #[serde(default = "ElasticConfig::default_sigma")]
    pub sigma: f64,
}

impl ElasticConfig {
    fn default_alpha() -> f64 {
        0.1
    }

    fn default_sigma() -> f64 {
        0.01
    }
}

impl Default for ElasticConfig {
    fn default() -> Self {
        Self {
            probability: 0.0,
            alpha: Self::default_alpha(),
            sigma: Self::default_sigma(),
        }
    }
}

/// Affine transform augmentation (translation, rotation, shear, scale).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AffineConfig {
    #[serde(default)]
    pub probability: f64,
    /// Maximum translation as a fraction of the image size.
    #[serde(default = "AffineConfig::default_translation")]
    pub translation: f64,
    /// Maximum rotation in degrees.
    #[serde(default = "AffineConfig::default_rotation")]
    pub rotation: f64,
    /// Maximum shear in degrees.
    #[serde(default = "AffineConfig::default_shear")]
    pub shear: f64,
    /// Scale factor range.
    #[serde(default = "AffineConfig::default_min_scale")]
    pub min_scale: f64,
    #[serde(default = "AffineConfig::default_max_scale")]
    pub max_scale: f64,
}

impl AffineConfig {
    fn default_translation() -> f64 {
        0.02
    }

    fn default_rotation() -> f64 {
        2.5
    }

    fn default_shear() -> f64 {
        2.5
    }

    fn default_min_scale() -> f64 {
        0.9
    }

    fn default_max_scale() -> f64 {
        1.1
    }
}

impl Default for AffineConfig {
    fn default() -> Self {
        Self {
            probability: 0.0,
            translation: Self::default_translation(),
            rotation: Self::default_rotation(),
            shear: Self::default_shear(),
            min_scale: Self::default_min_scale(),
            max_scale: Self::default_max_scale(),
        }
    }
}

/// Page orientation augmentation: probability of rotating by each of
/// 0/90/180/270 degrees.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct OrientationConfig {
    #[serde(default)]
    pub probability: f64,
    /// Relative weight of each quarter-turn, in order 0/90/180/270.
    #[serde(default = "OrientationConfig::default_percentages")]
    pub percentages: Vec<f64>,
}

impl OrientationConfig {
    fn default_percentages() -> Vec<f64> {
        vec![1.0, 0.0, 0.0, 0.0]
    }
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            probability: 0.0,
            percentages: Self::default_percentages(),
        }
    }
}

/// `DATALOADER` section (trainer-side).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct DataloaderConfig {
    #[serde(default = "DataloaderConfig::default_num_workers")]
    pub num_workers: usize,
    #[serde(default)]
    pub filter_empty: bool,
}

impl DataloaderConfig {
    fn default_num_workers() -> usize {
        4
    }
}

impl Default for DataloaderConfig {
    fn default() -> Self {
        Self {
            num_workers: Self::default_num_workers(),
            filter_empty: false,
        }
    }
}

/// `SOLVER` section: batch size, learning-rate schedule, iteration
/// budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct SolverConfig {
    pub ims_per_batch: u32,
    pub base_lr: f64,
    #[serde(default = "SolverConfig::default_gamma")]
    pub gamma: f64,
    /// Iterations at which the learning rate decays by `GAMMA`.
    #[serde(default)]
    pub steps: Vec<u64>,
    pub max_iter: u64,
    #[serde(default = "SolverConfig::default_checkpoint_period")]
    pub checkpoint_period: u64,
}

impl SolverConfig {
    fn default_gamma() -> f64 {
        0.1
    }

    fn default_checkpoint_period() -> u64 {
        25_000
    }
}

/// `MODEL` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ModelConfig {
    /// Ground-truth extraction mode the model is trained against.
    pub mode: GroundTruthMode,
    #[serde(default)]
    pub sem_seg_head: SemSegHeadConfig,
    /// Initial weights path; empty means random initialization.
    #[serde(default)]
    pub weights: Option<PathBuf>,
}

/// `MODEL.SEM_SEG_HEAD` subsection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct SemSegHeadConfig {
    #[serde(default = "SemSegHeadConfig::default_num_classes")]
    pub num_classes: u32,
}

impl SemSegHeadConfig {
    fn default_num_classes() -> u32 {
        2
    }
}

impl Default for SemSegHeadConfig {
    fn default() -> Self {
        Self {
            num_classes: Self::default_num_classes(),
        }
    }
}

/// `TRAIN` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct TrainWeightsConfig {
    #[serde(default)]
    pub weights: Option<PathBuf>,
}

/// `TEST` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct TestConfig {
    #[serde(default)]
    pub weights: Option<PathBuf>,
    #[serde(default = "TestConfig::default_eval_period")]
    pub eval_period: u64,
}

impl TestConfig {
    fn default_eval_period() -> u64 {
        25_000
    }
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            weights: None,
            eval_period: Self::default_eval_period(),
        }
    }
}
