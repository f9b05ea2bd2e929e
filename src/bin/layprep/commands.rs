//! Subcommand implementations.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{info, warn};

use layprep::core::ParallelPolicy;
use layprep::dataset::Preprocessor;
use layprep::mask::GroundTruthBuilder;
use layprep::page::{parse_page_xml, GroundTruthMode, RegionSet};
use layprep::utils::save_image;
use layprep::{LayprepResult, TrainingConfig};

/// Command-line overrides applied on top of the loaded configuration.
pub struct ConvertOverrides {
    pub mode: Option<GroundTruthMode>,
    pub regions: Vec<String>,
    pub line_width: Option<u32>,
    pub square_lines: bool,
}

/// Converts a single PAGE XML into a semantic segmentation mask at the
/// page's annotated size.
pub fn convert(
    config_path: &Path,
    input: &Path,
    output: &Path,
    overrides: ConvertOverrides,
) -> LayprepResult<()> {
    let start = Instant::now();

    let mut config = TrainingConfig::load(config_path)?;
    if let Some(mode) = overrides.mode {
        config.model.mode = mode;
    }
    if !overrides.regions.is_empty() {
        config.preprocess.region.regions = overrides.regions;
    }
    if let Some(width) = overrides.line_width {
        config.preprocess.baseline.line_width = width;
    }
    config.preprocess.baseline.square_lines |= overrides.square_lines;
    let builder = GroundTruthBuilder::from_config(&config)?;

    info!("Converting {} (mode {})...", input.display(), builder.mode());
    let page = parse_page_xml(input)?;
    let sem_seg = builder.build_sem_seg(&page, page.size())?;
    save_image(output, &sem_seg)?;

    info!(
        "Wrote {} in {:.2}ms",
        output.display(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    Ok(())
}

/// Runs the dataset preprocessing pipeline.
pub fn preprocess(
    config_path: &Path,
    inputs: &[PathBuf],
    output: &Path,
    overwrite: bool,
    disable_check: bool,
    workers: Option<usize>,
) -> LayprepResult<()> {
    let start = Instant::now();

    let mut config = TrainingConfig::load(config_path)?;
    config.preprocess.overwrite |= overwrite;
    config.preprocess.disable_check |= disable_check;

    let parallel = ParallelPolicy::new().with_max_threads(workers);
    if let Err(err) = parallel.install_global_thread_pool() {
        warn!("Could not configure the thread pool: {err}");
    }

    let preprocessor = Preprocessor::from_config(&config, parallel)?;
    let manifest = preprocessor.run(inputs, output)?;

    info!(
        "Preprocessed {} scans in {:.2}s",
        manifest.data.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Loads and validates a configuration, printing what it resolves to
/// after `_BASE_` inheritance.
pub fn check_config(config_path: &Path) -> LayprepResult<()> {
    let config = TrainingConfig::load(config_path)?;
    let regions = RegionSet::from_config(&config)?;

    println!("Configuration OK: {}", config_path.display());
    println!("  mode: {}", regions.mode);
    println!(
        "  classes: {} (background + {})",
        regions.num_classes(),
        regions.num_classes() - 1
    );
    if regions.regions.is_empty() {
        println!("  regions: (none)");
    } else {
        println!("  regions: {}", regions.regions.join(", "));
    }
    println!("  line width: {}", regions.line_width);
    println!();
    println!("{}", serde_yaml::to_string(&config)?);
    Ok(())
}
