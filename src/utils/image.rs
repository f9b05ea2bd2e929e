//! Image loading, saving, and cheap metadata probes.
//!
//! Loading is tolerant: a corrupt scan is logged and skipped instead of
//! aborting a whole dataset run. Dimension and DPI probes read headers
//! only, so scanning thousands of files stays cheap.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::ops::Deref;
use std::path::Path;

use image::{DynamicImage, EncodableLayout, ImageBuffer, Pixel, PixelWithColorType};
use tracing::{debug, warn};

use crate::core::{LayprepError, LayprepResult, ProcessingStage};

/// A decoded scan together with its embedded resolution, if any.
#[derive(Debug)]
pub struct LoadedImage {
    pub image: DynamicImage,
    /// Square resolution in dots per inch.
    pub dpi: Option<u32>,
}

/// Loads an image, returning `None` when decoding fails.
///
/// Corrupt files happen in scanned collections; the caller decides
/// whether a skipped file is fatal.
pub fn load_image(path: &Path) -> Option<LoadedImage> {
    match image::open(path) {
        Ok(image) => Some(LoadedImage {
            image,
            dpi: probe_dpi(path),
        }),
        Err(err) => {
            warn!("cannot load image {}, skipping: {err}", path.display());
            None
        }
    }
}

/// Saves an image buffer, creating parent directories as needed.
pub fn save_image<P, Container>(
    path: &Path,
    image: &ImageBuffer<P, Container>,
) -> LayprepResult<()>
where
    P: Pixel + PixelWithColorType,
    [P::Subpixel]: EncodableLayout,
    Container: Deref<Target = [P::Subpixel]>,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    image
        .save(path)
        .map_err(|err| LayprepError::processing_for_path(ProcessingStage::ImageProcessing, path, err))?;
    debug!("wrote {}", path.display());
    Ok(())
}

/// Reads an image's dimensions as (height, width) from its header,
/// without decoding pixel data.
pub fn probe_dimensions(path: &Path) -> LayprepResult<(u32, u32)> {
    let (width, height) = image::ImageReader::open(path)?
        .with_guessed_format()?
        .into_dimensions()?;
    Ok((height, width))
}

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];
const METERS_PER_INCH: f64 = 0.0254;

/// Reads the embedded square resolution of a PNG from its `pHYs` chunk.
///
/// Returns `None` for non-PNG files, for PNGs without physical units,
/// and for non-square resolutions (which get a warning, since they
/// point at a broken scan). Only the chunk headers up to the pixel data
/// are read; chunk bodies are seeked over.
pub fn probe_dpi(path: &Path) -> Option<u32> {
    let mut file = File::open(path).ok()?;
    let mut signature = [0u8; 8];
    file.read_exact(&mut signature).ok()?;
    if signature != PNG_SIGNATURE {
        return None;
    }

    let mut header = [0u8; 8];
    loop {
        file.read_exact(&mut header).ok()?;
        let length = u32::from_be_bytes(header[..4].try_into().ok()?);
        let chunk_type = &header[4..8];
        if chunk_type == b"IDAT" || chunk_type == b"IEND" {
            return None;
        }
        if chunk_type == b"pHYs" {
            if length != 9 {
                return None;
            }
            let mut body = [0u8; 9];
            file.read_exact(&mut body).ok()?;
            let x = u32::from_be_bytes(body[..4].try_into().ok()?);
            let y = u32::from_be_bytes(body[4..8].try_into().ok()?);
            let unit = body[8];
            if unit != 1 {
                return None;
            }
            if x != y {
                warn!(
                    "non-square resolution ({x}x{y} pixels per meter) in {}",
                    path.display()
                );
                return None;
            }
            return Some((x as f64 * METERS_PER_INCH).round() as u32);
        }
        // Chunk body plus its CRC.
        file.seek(SeekFrom::Current(i64::from(length) + 4)).ok()?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_with_phys(x: u32, y: u32, unit: u8) -> Vec<u8> {
        let mut data = PNG_SIGNATURE.to_vec();
        // IHDR with placeholder body and CRC; the probe skips over it.
        data.extend_from_slice(&13u32.to_be_bytes());
        data.extend_from_slice(b"IHDR");
        data.extend_from_slice(&[0u8; 13 + 4]);
        data.extend_from_slice(&9u32.to_be_bytes());
        data.extend_from_slice(b"pHYs");
        data.extend_from_slice(&x.to_be_bytes());
        data.extend_from_slice(&y.to_be_bytes());
        data.push(unit);
        data.extend_from_slice(&[0u8; 4]);
        data.extend_from_slice(&0u32.to_be_bytes());
        data.extend_from_slice(b"IEND");
        data.extend_from_slice(&[0u8; 4]);
        data
    }

    #[test]
    fn phys_chunk_converts_to_dpi() {
        let dir = tempfile::tempdir().expect("should create");
        let path = dir.path().join("scan.png");
        // 11811 pixels per meter is 300 dpi.
        std::fs::write(&path, png_with_phys(11811, 11811, 1)).expect("should write");
        assert_eq!(probe_dpi(&path), Some(300));
    }

    #[test]
    fn non_square_or_unitless_resolution_is_ignored() {
        let dir = tempfile::tempdir().expect("should create");
        let skewed = dir.path().join("skewed.png");
        std::fs::write(&skewed, png_with_phys(11811, 7200, 1)).expect("should write");
        assert_eq!(probe_dpi(&skewed), None);

        let unitless = dir.path().join("unitless.png");
        std::fs::write(&unitless, png_with_phys(100, 100, 0)).expect("should write");
        assert_eq!(probe_dpi(&unitless), None);
    }

    #[test]
    fn chunks_before_phys_are_seeked_over() {
        let dir = tempfile::tempdir().expect("should create");
        let path = dir.path().join("annotated.png");
        let mut data = PNG_SIGNATURE.to_vec();
        data.extend_from_slice(&13u32.to_be_bytes());
        data.extend_from_slice(b"IHDR");
        data.extend_from_slice(&[0u8; 13 + 4]);
        // A large ancillary chunk between the header and pHYs.
        let text = vec![0u8; 4096];
        data.extend_from_slice(&(text.len() as u32).to_be_bytes());
        data.extend_from_slice(b"tEXt");
        data.extend_from_slice(&text);
        data.extend_from_slice(&[0u8; 4]);
        data.extend_from_slice(&9u32.to_be_bytes());
        data.extend_from_slice(b"pHYs");
        data.extend_from_slice(&11811u32.to_be_bytes());
        data.extend_from_slice(&11811u32.to_be_bytes());
        data.push(1);
        data.extend_from_slice(&[0u8; 4]);
        std::fs::write(&path, data).expect("should write");
        assert_eq!(probe_dpi(&path), Some(300));
    }

    #[test]
    fn truncated_png_has_no_dpi() {
        let dir = tempfile::tempdir().expect("should create");
        let path = dir.path().join("truncated.png");
        std::fs::write(&path, PNG_SIGNATURE).expect("should write");
        assert_eq!(probe_dpi(&path), None);
    }

    #[test]
    fn non_png_files_have_no_dpi() {
        let dir = tempfile::tempdir().expect("should create");
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"not an image").expect("should write");
        assert_eq!(probe_dpi(&path), None);
    }

    #[test]
    fn saved_images_probe_back_with_their_size() {
        let dir = tempfile::tempdir().expect("should create");
        let path = dir.path().join("masks/mask.png");
        let mask = image::GrayImage::new(64, 32);
        save_image(&path, &mask).expect("should save");
        assert_eq!(probe_dimensions(&path).expect("should probe"), (32, 64));
    }

    #[test]
    fn corrupt_images_load_as_none() {
        let dir = tempfile::tempdir().expect("should create");
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"\x89PNG\r\n\x1a\ngarbage").expect("should write");
        assert!(load_image(&path).is_none());
        assert!(load_image(&dir.path().join("missing.png")).is_none());
    }
}
