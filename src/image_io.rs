use std::path::{Path, PathBuf};
use std::fs;
use image::{ImageFormat, GrayImage, Luma};
use log::{debug, warn};

use crate::color_space::{ColorImage, ColorSpace};
use crate::errors::{ColorSegmentError, Result};
use crate::segmentation::SegmentationMask;

/// File extensions recognized as annotatable images
pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Represents an input image with its metadata
pub struct InputImage {
    pub image: ColorImage,
    pub path: PathBuf,
    pub filename: String,
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.iter().any(|known| *known == ext)
        })
        .unwrap_or(false)
}

/// List the image files directly inside a directory, sorted by path
pub fn load_image_paths<P: AsRef<Path>>(dir_path: P) -> Result<Vec<PathBuf>> {
    let dir_path = validate_directory(dir_path)?;

    let mut images = Vec::new();
    for entry in fs::read_dir(&dir_path)? {
        let path = entry?.path();
        if path.is_file() && has_image_extension(&path) {
            images.push(path);
        }
    }
    images.sort();

    debug!("Found {} images in {}", images.len(), dir_path.display());
    Ok(images)
}

/// Check that a directory exists and contains at least one image
pub fn validate_image_directory<P: AsRef<Path>>(dir_path: P) -> Result<Vec<PathBuf>> {
    let dir_path = dir_path.as_ref();
    let images = load_image_paths(dir_path)?;
    if images.is_empty() {
        return Err(ColorSegmentError::NoImagesFound(dir_path.to_path_buf()));
    }
    Ok(images)
}

/// Check that a path is an existing directory
pub fn validate_directory<P: AsRef<Path>>(dir_path: P) -> Result<PathBuf> {
    let dir_path = dir_path.as_ref();
    if !dir_path.is_dir() {
        return Err(ColorSegmentError::InvalidDirectory(dir_path.to_path_buf()));
    }
    Ok(dir_path.to_path_buf())
}

/// Load an image as an RGB buffer
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<InputImage> {
    let path = path.as_ref();

    // Get filename without extension
    let filename = path.file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ColorSegmentError::Config(format!("Invalid image path: {}", path.display())))?
        .to_string();

    let img = image::open(path)?;

    Ok(InputImage {
        image: ColorImage::new(img.to_rgb8(), ColorSpace::Rgb),
        path: path.to_path_buf(),
        filename,
    })
}

/// Derive the mask file name: the source base name up to its first
/// underscore, suffixed with `_mask.png`
pub fn mask_file_name<P: AsRef<Path>>(source: P) -> Result<String> {
    let source = source.as_ref();
    let stem = source.file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ColorSegmentError::Config(format!("Invalid image path: {}", source.display())))?;

    let base = stem.split('_').next().unwrap_or(stem);
    Ok(format!("{}_mask.png", base))
}

/// Write a segmentation as a single-channel 8-bit PNG.
///
/// Labels above 255 saturate.
pub fn save_mask<P: AsRef<Path>>(segmentation: &SegmentationMask, path: P) -> Result<()> {
    let (width, height) = segmentation.dimensions();
    let mut saturated = 0usize;

    let gray = GrayImage::from_fn(width, height, |x, y| {
        let label = segmentation.get_pixel(x, y)[0];
        if label > u8::MAX as u16 {
            saturated += 1;
        }
        Luma([label.min(u8::MAX as u16) as u8])
    });

    if saturated > 0 {
        warn!("{} mask pixels exceeded label 255 and were saturated", saturated);
    }

    gray.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Export a segmentation into `mask_dir` under the name derived from `source`
pub fn export_mask<P: AsRef<Path>, Q: AsRef<Path>>(
    segmentation: &SegmentationMask,
    source: P,
    mask_dir: Q,
) -> Result<PathBuf> {
    let mask_dir = validate_directory(mask_dir)?;
    let output_path = mask_dir.join(mask_file_name(source)?);
    save_mask(segmentation, &output_path)?;
    debug!("Saved mask to {}", output_path.display());
    Ok(output_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, RgbImage};
    use tempfile::tempdir;

    #[test]
    fn test_mask_file_name() {
        assert_eq!(mask_file_name("/data/plate01_2024_cam.png").unwrap(), "plate01_mask.png");
        assert_eq!(mask_file_name("scan.jpg").unwrap(), "scan_mask.png");
    }

    #[test]
    fn test_invalid_directory() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert!(matches!(
            load_image_paths(&missing),
            Err(ColorSegmentError::InvalidDirectory(_))
        ));
    }

    #[test]
    fn test_no_images_found() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "not an image").unwrap();
        assert!(matches!(
            validate_image_directory(dir.path()),
            Err(ColorSegmentError::NoImagesFound(_))
        ));
    }

    #[test]
    fn test_lists_images_sorted() {
        let dir = tempdir().unwrap();
        let img = RgbImage::from_pixel(2, 2, Rgb([1, 2, 3]));
        img.save_with_format(dir.path().join("b_1.png"), ImageFormat::Png).unwrap();
        img.save_with_format(dir.path().join("a_1.PNG"), ImageFormat::Png).unwrap();
        fs::write(dir.path().join("c.txt"), "x").unwrap();

        let images = validate_image_directory(dir.path()).unwrap();
        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a_1.PNG", "b_1.png"]);

        let loaded = load_image(&images[1]).unwrap();
        assert_eq!(loaded.filename, "b_1");
        assert_eq!(loaded.image.space(), ColorSpace::Rgb);
        assert_eq!(loaded.image.color_at(1, 1), Some([1, 2, 3]));
    }

    #[test]
    fn test_export_mask_saturates() {
        let dir = tempdir().unwrap();
        let segmentation: SegmentationMask =
            ImageBuffer::from_fn(2, 1, |x, _| Luma([if x == 0 { 3 } else { 300 }]));

        let path = export_mask(&segmentation, "tile_07.png", dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "tile_mask.png");

        let written = image::open(&path).unwrap().to_luma8();
        assert_eq!(written.get_pixel(0, 0)[0], 3);
        assert_eq!(written.get_pixel(1, 0)[0], 255);
    }
}
