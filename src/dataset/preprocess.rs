//! The dataset preprocessing pipeline.
//!
//! For every input scan this writes the (possibly resized) image under
//! `original/`, the semantic mask under `sem_seg/`, and, when the mode
//! supports them, instance records under `instances/` and panoptic
//! output under `panos/`. A final `info.json` manifest ties the outputs
//! together for the training loop.

use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind};
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::TrainingConfig;
use crate::core::{LayprepError, LayprepResult, ParallelPolicy};
use crate::dataset::manifest::{DatasetManifest, FileOutputs, ManifestData};
use crate::dataset::paths;
use crate::dataset::resize::ResizePolicy;
use crate::mask::{GroundTruthBuilder, InstancesFile, PanoInfoFile};
use crate::page::{parse_page_xml, PageAnnotation};
use crate::utils;

const MODE_FILE: &str = "mode.txt";
const MANIFEST_FILE: &str = "info.json";

/// Runs the preprocessing pipeline over a set of input scans.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    builder: GroundTruthBuilder,
    resize: ResizePolicy,
    parallel: ParallelPolicy,
    disable_check: bool,
    overwrite: bool,
}

impl Preprocessor {
    pub fn new(
        builder: GroundTruthBuilder,
        resize: ResizePolicy,
        parallel: ParallelPolicy,
        disable_check: bool,
        overwrite: bool,
    ) -> Self {
        Self {
            builder,
            resize,
            parallel,
            disable_check,
            overwrite,
        }
    }

    /// Builds the pipeline from a training configuration.
    pub fn from_config(config: &TrainingConfig, parallel: ParallelPolicy) -> LayprepResult<Self> {
        Ok(Self::new(
            GroundTruthBuilder::from_config(config)?,
            ResizePolicy::from_config(&config.preprocess)?,
            parallel,
            config.preprocess.disable_check,
            config.preprocess.overwrite,
        ))
    }

    /// Preprocesses all scans found under `inputs` into `output_dir` and
    /// writes the manifest.
    pub fn run(&self, inputs: &[PathBuf], output_dir: &Path) -> LayprepResult<DatasetManifest> {
        let image_paths = paths::collect_image_paths(inputs, self.disable_check)?;
        if image_paths.is_empty() {
            return Err(LayprepError::invalid_input(format!(
                "no images found under the input paths ({})",
                inputs
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }
        paths::check_duplicate_stems(&image_paths)?;
        if !self.disable_check {
            for image_path in &image_paths {
                paths::image_path_to_xml_path(image_path, false)?;
            }
        }

        fs::create_dir_all(output_dir)?;
        let overwrite = self.overwrite || self.mode_changed(output_dir)?;
        fs::write(
            output_dir.join(MODE_FILE),
            self.builder.mode().to_string(),
        )?;

        info!(
            "preprocessing {} scans into {} (mode {})",
            image_paths.len(),
            output_dir.display(),
            self.builder.mode()
        );
        let results: Vec<LayprepResult<FileOutputs>> =
            if self.parallel.sequential_for(image_paths.len()) {
                image_paths
                    .iter()
                    .map(|path| self.process_file(path, output_dir, overwrite))
                    .collect()
            } else {
                image_paths
                    .par_iter()
                    .map(|path| self.process_file(path, output_dir, overwrite))
                    .collect()
            };

        let mut data = ManifestData::default();
        for result in results {
            data.push(result?);
        }
        let manifest = DatasetManifest {
            data,
            classes: self.builder.regions().regions.clone(),
            mode: self.builder.mode(),
        };
        let file = File::create(output_dir.join(MANIFEST_FILE))?;
        serde_json::to_writer(BufWriter::new(file), &manifest)?;
        info!("wrote manifest for {} scans", manifest.data.len());
        Ok(manifest)
    }

    /// A dataset written under a different mode is stale in every output,
    /// so a mode change forces a rewrite.
    fn mode_changed(&self, output_dir: &Path) -> LayprepResult<bool> {
        let mode_path = output_dir.join(MODE_FILE);
        if !mode_path.exists() {
            return Ok(false);
        }
        let previous = fs::read_to_string(&mode_path)?;
        let changed = previous.trim() != self.builder.mode().to_string();
        if changed {
            info!(
                "ground-truth mode changed ({} -> {}), rewriting all outputs",
                previous.trim(),
                self.builder.mode()
            );
        }
        Ok(changed)
    }

    fn process_file(
        &self,
        image_path: &Path,
        output_dir: &Path,
        overwrite: bool,
    ) -> LayprepResult<FileOutputs> {
        let stem = image_path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                LayprepError::invalid_input(format!(
                    "image path {} has no usable file name",
                    image_path.display()
                ))
            })?;
        let xml_path = paths::image_path_to_xml_path(image_path, self.disable_check)?;

        let original_shape = utils::probe_dimensions(image_path)?;
        let dpi = utils::probe_dpi(image_path);
        let out_shape = self.resize.output_shape(original_shape.0, original_shape.1, dpi);
        debug!(
            "{}: {}x{} -> {}x{}",
            image_path.display(),
            original_shape.1,
            original_shape.0,
            out_shape.1,
            out_shape.0
        );

        let mut page = parse_page_xml(&xml_path)?;
        page.set_size(original_shape);

        let mut outputs = FileOutputs {
            original_image_path: image_path.display().to_string(),
            ..Default::default()
        };
        outputs.image_path = Some(self.save_original(
            image_path,
            stem,
            original_shape,
            out_shape,
            output_dir,
            overwrite,
        )?);
        outputs.sem_seg_path =
            Some(self.save_sem_seg(&page, stem, out_shape, output_dir, overwrite)?);
        outputs.instances_path =
            self.save_instances(&page, stem, out_shape, output_dir, overwrite)?;
        if let Some((pano_path, segments_info_path)) =
            self.save_panos(&page, stem, out_shape, output_dir, overwrite)?
        {
            outputs.pano_path = Some(pano_path);
            outputs.segments_info_path = Some(segments_info_path);
        }
        Ok(outputs)
    }

    fn save_original(
        &self,
        image_path: &Path,
        stem: &str,
        original_shape: (u32, u32),
        out_shape: (u32, u32),
        output_dir: &Path,
        overwrite: bool,
    ) -> LayprepResult<String> {
        let image_dir = output_dir.join("original");
        let unscaled = original_shape == out_shape;
        let out_path = if unscaled {
            // A file name is guaranteed here, the stem was derived from it.
            let name = image_path.file_name().unwrap_or(std::ffi::OsStr::new(""));
            image_dir.join(name)
        } else {
            image_dir.join(format!("{stem}.png"))
        };

        if !overwrite
            && out_path.exists()
            && utils::probe_dimensions(&out_path)? == out_shape
        {
            return Ok(relative_to(&out_path, output_dir));
        }

        fs::create_dir_all(&image_dir)?;
        if unscaled {
            link_or_copy(image_path, &out_path)?;
        } else {
            let loaded = utils::load_image(image_path).ok_or_else(|| {
                LayprepError::invalid_input(format!(
                    "cannot decode {}",
                    image_path.display()
                ))
            })?;
            let resized = loaded
                .image
                .resize_exact(out_shape.1, out_shape.0, FilterType::Triangle)
                .to_rgb8();
            utils::save_image(&out_path, &resized)?;
        }
        Ok(relative_to(&out_path, output_dir))
    }

    fn save_sem_seg(
        &self,
        page: &PageAnnotation,
        stem: &str,
        out_shape: (u32, u32),
        output_dir: &Path,
        overwrite: bool,
    ) -> LayprepResult<String> {
        let out_path = output_dir.join("sem_seg").join(format!("{stem}.png"));
        if !overwrite
            && out_path.exists()
            && utils::probe_dimensions(&out_path)? == out_shape
        {
            return Ok(relative_to(&out_path, output_dir));
        }
        let sem_seg = self.builder.build_sem_seg(page, out_shape)?;
        utils::save_image(&out_path, &sem_seg)?;
        Ok(relative_to(&out_path, output_dir))
    }

    fn save_instances(
        &self,
        page: &PageAnnotation,
        stem: &str,
        out_shape: (u32, u32),
        output_dir: &Path,
        overwrite: bool,
    ) -> LayprepResult<Option<String>> {
        let instances_dir = output_dir.join("instances");
        let out_path = instances_dir.join(format!("{stem}.json"));
        let size_path = instances_dir.join(format!("{stem}.txt"));

        if !overwrite && out_path.exists() && size_path.exists() {
            let recorded = fs::read_to_string(&size_path)?;
            if parse_size(&recorded) == Some(out_shape) {
                return Ok(Some(relative_to(&out_path, output_dir)));
            }
        }

        let Some(annotations) = self.builder.build_instances(page, out_shape)? else {
            return Ok(None);
        };
        fs::create_dir_all(&instances_dir)?;
        let file = File::create(&out_path)?;
        serde_json::to_writer(
            BufWriter::new(file),
            &InstancesFile {
                image_size: out_shape,
                annotations,
            },
        )?;
        fs::write(&size_path, format!("{},{}", out_shape.0, out_shape.1))?;
        Ok(Some(relative_to(&out_path, output_dir)))
    }

    fn save_panos(
        &self,
        page: &PageAnnotation,
        stem: &str,
        out_shape: (u32, u32),
        output_dir: &Path,
        overwrite: bool,
    ) -> LayprepResult<Option<(String, String)>> {
        let panos_dir = output_dir.join("panos");
        let pano_path = panos_dir.join(format!("{stem}.png"));
        let info_path = panos_dir.join(format!("{stem}.json"));

        if !overwrite
            && pano_path.exists()
            && info_path.exists()
            && utils::probe_dimensions(&pano_path)? == out_shape
        {
            return Ok(Some((
                relative_to(&pano_path, output_dir),
                relative_to(&info_path, output_dir),
            )));
        }

        let Some((pano, segments_info)) = self.builder.build_pano(page, out_shape)? else {
            return Ok(None);
        };
        utils::save_image(&pano_path, &pano)?;
        let file = File::create(&info_path)?;
        serde_json::to_writer(
            BufWriter::new(file),
            &PanoInfoFile {
                image_size: out_shape,
                segments_info,
            },
        )?;
        Ok(Some((
            relative_to(&pano_path, output_dir),
            relative_to(&info_path, output_dir),
        )))
    }
}

fn relative_to(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

fn parse_size(recorded: &str) -> Option<(u32, u32)> {
    let (h, w) = recorded.trim().split_once(',')?;
    Some((h.trim().parse().ok()?, w.trim().parse().ok()?))
}

/// Hard-links an unscaled scan into the dataset, falling back to a copy
/// across filesystems.
fn link_or_copy(from: &Path, to: &Path) -> std::io::Result<()> {
    match fs::remove_file(to) {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }
    if fs::hard_link(from, to).is_err() {
        fs::copy(from, to)?;
    }
    Ok(())
}
