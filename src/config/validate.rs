//! Range and consistency checks for the training configuration.
//!
//! A document that parses is not necessarily usable: every augmentation
//! probability must be a real probability, the solver schedule must be
//! coherent, and the segmentation head's class count must agree with
//! what the configured ground-truth mode will actually rasterize.

use crate::config::schema::{InputConfig, ResizeModeKind, SolverConfig, TrainingConfig};
use crate::core::validation::{
    validate_non_empty, validate_positive, validate_probability, validate_range,
};
use crate::core::{LayprepError, LayprepResult};

/// Validates a parsed training configuration.
pub fn validate_config(config: &TrainingConfig) -> LayprepResult<()> {
    validate_preprocess(config)?;
    validate_input(&config.input)?;
    validate_solver(&config.solver)?;
    validate_model(config)?;
    Ok(())
}

fn validate_preprocess(config: &TrainingConfig) -> LayprepResult<()> {
    let resize = &config.preprocess.resize;
    match resize.resize_mode {
        ResizeModeKind::None => {}
        ResizeModeKind::Scaling => {
            validate_positive("PREPROCESS.RESIZE.SCALING", resize.scaling)?;
        }
        ResizeModeKind::ShortestEdge | ResizeModeKind::LongestEdge => {
            validate_non_empty("PREPROCESS.RESIZE.MIN_SIZE", &resize.min_size)?;
            validate_positive("PREPROCESS.RESIZE.MAX_SIZE", f64::from(resize.max_size))?;
            if let Some(&largest) = resize.min_size.iter().max() {
                if largest > resize.max_size {
                    return Err(LayprepError::invalid_field(
                        "PREPROCESS.RESIZE.MIN_SIZE",
                        format!("sizes <= MAX_SIZE ({})", resize.max_size),
                        format!("{largest}"),
                    ));
                }
            }
        }
    }

    validate_positive(
        "PREPROCESS.BASELINE.LINE_WIDTH",
        f64::from(config.preprocess.baseline.line_width),
    )?;

    let region = &config.preprocess.region;
    for entry in &region.merge_regions {
        let (canonical, _) = entry.split_once(':').ok_or_else(|| {
            LayprepError::invalid_field(
                "PREPROCESS.REGION.MERGE_REGIONS",
                "entries of the form 'canonical:alias1,alias2'",
                entry.clone(),
            )
        })?;
        if !region.regions.iter().any(|r| r == canonical) {
            return Err(LayprepError::config_error_detailed(
                "PREPROCESS.REGION.MERGE_REGIONS",
                format!("merge target '{canonical}' is not a listed region"),
            ));
        }
    }

    Ok(())
}

fn validate_input(input: &InputConfig) -> LayprepResult<()> {
    validate_probability("INPUT.BRIGHTNESS.PROBABILITY", input.brightness.probability)?;
    validate_range(
        "INPUT.BRIGHTNESS",
        input.brightness.min_intensity,
        input.brightness.max_intensity,
    )?;
    validate_probability("INPUT.CONTRAST.PROBABILITY", input.contrast.probability)?;
    validate_range(
        "INPUT.CONTRAST",
        input.contrast.min_intensity,
        input.contrast.max_intensity,
    )?;
    validate_probability("INPUT.SATURATION.PROBABILITY", input.saturation.probability)?;
    validate_range(
        "INPUT.SATURATION",
        input.saturation.min_intensity,
        input.saturation.max_intensity,
    )?;
    validate_probability(
        "INPUT.GAUSSIAN_FILTER.PROBABILITY",
        input.gaussian_filter.probability,
    )?;
    validate_range(
        "INPUT.GAUSSIAN_FILTER",
        input.gaussian_filter.min_sigma,
        input.gaussian_filter.max_sigma,
    )?;
    validate_probability(
        "INPUT.HORIZONTAL_FLIP.PROBABILITY",
        input.horizontal_flip.probability,
    )?;
    validate_probability(
        "INPUT.VERTICAL_FLIP.PROBABILITY",
        input.vertical_flip.probability,
    )?;
    validate_probability(
        "INPUT.ELASTIC_DEFORMATION.PROBABILITY",
        input.elastic_deformation.probability,
    )?;
    validate_probability("INPUT.AFFINE.PROBABILITY", input.affine.probability)?;
    validate_range(
        "INPUT.AFFINE scale",
        input.affine.min_scale,
        input.affine.max_scale,
    )?;
    validate_probability("INPUT.ORIENTATION.PROBABILITY", input.orientation.probability)?;
    if input.orientation.percentages.len() != 4 {
        return Err(LayprepError::invalid_field(
            "INPUT.ORIENTATION.PERCENTAGES",
            "exactly 4 weights (0/90/180/270 degrees)",
            format!("{} entries", input.orientation.percentages.len()),
        ));
    }
    for (i, &weight) in input.orientation.percentages.iter().enumerate() {
        if !(weight >= 0.0) || !weight.is_finite() {
            return Err(LayprepError::invalid_field(
                "INPUT.ORIENTATION.PERCENTAGES",
                "non-negative weights",
                format!("{weight} at index {i}"),
            ));
        }
    }
    Ok(())
}

fn validate_solver(solver: &SolverConfig) -> LayprepResult<()> {
    validate_positive("SOLVER.IMS_PER_BATCH", f64::from(solver.ims_per_batch))?;
    validate_positive("SOLVER.BASE_LR", solver.base_lr)?;
    validate_positive("SOLVER.GAMMA", solver.gamma)?;
    validate_positive("SOLVER.MAX_ITER", solver.max_iter as f64)?;
    validate_positive(
        "SOLVER.CHECKPOINT_PERIOD",
        solver.checkpoint_period as f64,
    )?;

    let increasing = solver.steps.windows(2).all(|w| w[0] < w[1]);
    if !increasing {
        return Err(LayprepError::invalid_field(
            "SOLVER.STEPS",
            "strictly increasing milestones",
            format!("{:?}", solver.steps),
        ));
    }
    if let Some(&last) = solver.steps.last() {
        if last >= solver.max_iter {
            return Err(LayprepError::config_error_detailed(
                "SOLVER.STEPS",
                format!(
                    "last milestone {last} must lie before MAX_ITER {}",
                    solver.max_iter
                ),
            ));
        }
    }
    Ok(())
}

fn validate_model(config: &TrainingConfig) -> LayprepResult<()> {
    let expected = config
        .model
        .mode
        .num_classes(config.preprocess.region.regions.len());
    let actual = config.model.sem_seg_head.num_classes as usize;
    if expected != actual {
        return Err(LayprepError::config_error_detailed(
            "MODEL.SEM_SEG_HEAD.NUM_CLASSES",
            format!(
                "mode '{}' produces {expected} classes (background included), config says {actual}",
                config.model.mode
            ),
        ));
    }
    Ok(())
}
