//! Input collection and path conventions for annotated datasets.
//!
//! A dataset directory holds scans next to a `page/` subdirectory with
//! one PAGE XML per scan, named after the scan's stem.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use walkdir::WalkDir;

use crate::core::{LayprepError, LayprepResult};

/// Image formats accepted as dataset inputs.
pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] =
    &["png", "jpg", "jpeg", "tif", "tiff", "bmp", "webp"];

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Collects image paths from files and directories. Directories are
/// walked recursively; the result is sorted for deterministic runs.
///
/// A file passed directly must have a supported extension; unsupported
/// files inside directories are silently skipped.
pub fn collect_image_paths(inputs: &[PathBuf], disable_check: bool) -> LayprepResult<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for entry in WalkDir::new(input).sort_by_file_name() {
                let entry = entry.map_err(|err| {
                    LayprepError::invalid_input(format!(
                        "cannot walk {}: {err}",
                        input.display()
                    ))
                })?;
                if entry.file_type().is_file() && has_supported_extension(entry.path()) {
                    paths.push(entry.into_path());
                }
            }
        } else if input.is_file() {
            if !has_supported_extension(input) {
                return Err(LayprepError::invalid_input(format!(
                    "{} is not a supported image format (expected one of {})",
                    input.display(),
                    SUPPORTED_IMAGE_EXTENSIONS.join(", ")
                )));
            }
            paths.push(input.clone());
        } else if !disable_check {
            return Err(LayprepError::invalid_input(format!(
                "input path {} does not exist",
                input.display()
            )));
        }
    }
    paths.sort();
    Ok(paths)
}

/// Rejects input sets where two files share a stem.
///
/// Outputs are keyed by stem, so `train/scan.png` and `extra/scan.jpg`
/// would silently overwrite each other's ground truth.
pub fn check_duplicate_stems(paths: &[PathBuf]) -> LayprepResult<()> {
    let mut by_stem: BTreeMap<&std::ffi::OsStr, Vec<&Path>> = BTreeMap::new();
    for path in paths {
        if let Some(stem) = path.file_stem() {
            by_stem.entry(stem).or_default().push(path);
        }
    }
    let duplicates: Vec<_> = by_stem.iter().filter(|(_, p)| p.len() > 1).collect();
    if duplicates.is_empty() {
        return Ok(());
    }
    let listing = duplicates
        .iter()
        .map(|(stem, paths)| {
            format!(
                "{}: {}",
                stem.to_string_lossy(),
                paths.iter().map(|p| p.display()).join(", ")
            )
        })
        .join("; ");
    Err(LayprepError::invalid_input(format!(
        "duplicate file stems across input paths ({} of {} files): {listing}",
        duplicates.iter().map(|(_, p)| p.len()).sum::<usize>(),
        paths.len()
    )))
}

/// Maps a scan to its PAGE XML: `<dir>/page/<stem>.xml`.
///
/// With checks enabled the XML must exist and be readable.
pub fn image_path_to_xml_path(image_path: &Path, disable_check: bool) -> LayprepResult<PathBuf> {
    let stem = image_path
        .file_stem()
        .ok_or_else(|| {
            LayprepError::invalid_input(format!(
                "image path {} has no file name",
                image_path.display()
            ))
        })?
        .to_os_string();
    let mut file_name = stem;
    file_name.push(".xml");
    let xml_path = image_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("page")
        .join(file_name);
    if !disable_check {
        check_path_accessible(&xml_path)?;
    }
    Ok(xml_path)
}

/// Checks that a path exists and can be opened for reading.
pub fn check_path_accessible(path: &Path) -> LayprepResult<()> {
    File::open(path).map_err(|err| {
        LayprepError::invalid_input(format!("cannot read {}: {err}", path.display()))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directories_are_walked_and_sorted() {
        let dir = tempfile::tempdir().expect("should create");
        let nested = dir.path().join("sub");
        std::fs::create_dir(&nested).expect("should create");
        std::fs::write(dir.path().join("b.png"), b"x").expect("should write");
        std::fs::write(dir.path().join("a.jpg"), b"x").expect("should write");
        std::fs::write(nested.join("c.tif"), b"x").expect("should write");
        std::fs::write(dir.path().join("notes.txt"), b"x").expect("should write");

        let paths =
            collect_image_paths(&[dir.path().to_path_buf()], false).expect("should collect");
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.jpg", "b.png", "c.tif"]);
    }

    #[test]
    fn explicit_files_must_be_images() {
        let dir = tempfile::tempdir().expect("should create");
        let text = dir.path().join("notes.txt");
        std::fs::write(&text, b"x").expect("should write");
        assert!(collect_image_paths(&[text], false).is_err());
    }

    #[test]
    fn missing_inputs_error_unless_checks_are_disabled() {
        let missing = PathBuf::from("/nonexistent/scans");
        assert!(collect_image_paths(&[missing.clone()], false).is_err());
        assert!(collect_image_paths(&[missing], true)
            .expect("should collect")
            .is_empty());
    }

    #[test]
    fn duplicate_stems_are_rejected_with_their_locations() {
        let paths = vec![
            PathBuf::from("/data/train/scan.png"),
            PathBuf::from("/data/extra/scan.png"),
            PathBuf::from("/data/train/other.png"),
        ];
        let err = check_duplicate_stems(&paths).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("scan"));
        assert!(message.contains("/data/extra"));
        assert!(check_duplicate_stems(&paths[1..]).is_ok());
    }

    #[test]
    fn stem_collisions_across_extensions_are_rejected() {
        // scan.png and scan.jpg both map onto sem_seg/scan.png.
        let paths = vec![
            PathBuf::from("/data/train/scan.png"),
            PathBuf::from("/data/extra/scan.jpg"),
        ];
        let err = check_duplicate_stems(&paths).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("scan.png"));
        assert!(message.contains("scan.jpg"));
    }

    #[test]
    fn xml_path_sits_in_the_page_subdirectory() {
        let xml = image_path_to_xml_path(Path::new("/data/train/scan_001.png"), true)
            .expect("should map");
        assert_eq!(xml, PathBuf::from("/data/train/page/scan_001.xml"));
    }

    #[test]
    fn xml_path_check_requires_the_file() {
        let dir = tempfile::tempdir().expect("should create");
        let image = dir.path().join("scan.png");
        std::fs::write(&image, b"x").expect("should write");
        assert!(image_path_to_xml_path(&image, false).is_err());

        std::fs::create_dir(dir.path().join("page")).expect("should create");
        std::fs::write(dir.path().join("page/scan.xml"), b"<xml/>").expect("should write");
        assert!(image_path_to_xml_path(&image, false).is_ok());
    }
}
