// src/pipeline.rs - Working image preparation and batch mask generation

use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, error, info};

use crate::annotator::parse_threshold;
use crate::color_space::{convert_color_space, Color, ColorImage};
use crate::config::Settings;
use crate::errors::{ColorSegmentError, Result};
use crate::image_io::{export_mask, mask_file_name, InputImage};
use crate::image_utils::{cutout, resize_image};
use crate::session::SegmentationSession;

/// A color and threshold supplied up front rather than clicked.
///
/// Parsed from `c0,c1,c2:threshold`, channels in the processing color space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorPick {
    pub color: Color,
    pub threshold: f64,
}

impl FromStr for ColorPick {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (color_part, threshold_part) = s
            .split_once(':')
            .ok_or_else(|| format!("expected 'c0,c1,c2:threshold', got '{}'", s))?;

        let channels: Vec<u8> = color_part
            .split(',')
            .map(|c| c.trim().parse::<u8>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| format!("invalid color '{}': {}", color_part, e))?;

        let color: Color = channels
            .try_into()
            .map_err(|_| format!("color '{}' must have exactly 3 channels", color_part))?;

        let threshold = parse_threshold(threshold_part).map_err(|e| e.to_string())?;

        Ok(ColorPick { color, threshold })
    }
}

/// Turn a loaded image into the working image: convert to the processing
/// color space, cut out the configured region, resize to `size` x `size`.
pub fn prepare_working_image(image: &ColorImage, settings: &Settings) -> Result<ColorImage> {
    let converted = convert_color_space(image, settings.proc_c_space)?;

    let cropped = match settings.crop {
        Some(crop) => cutout(
            &converted,
            (crop.x[0], crop.x[1]),
            (crop.y[0], crop.y[1]),
        )?,
        None => converted,
    };

    Ok(resize_image(&cropped, [settings.size, settings.size]))
}

/// Segment one image with a fixed set of picks and export its mask.
///
/// With `preview` set, the false-color rendering is written next to the mask.
pub fn process_image(
    input_image: InputImage,
    settings: &Settings,
    picks: &[ColorPick],
    mask_dir: &Path,
    preview: bool,
) -> Result<PathBuf> {
    let InputImage { image, path, filename } = input_image;

    let working_image = prepare_working_image(&image, settings)?;
    debug!(
        "Working image for {}: {}x{} in {}",
        filename,
        working_image.dimensions().0,
        working_image.dimensions().1,
        working_image.space()
    );

    let mut session = SegmentationSession::from_settings(working_image, settings)?;
    debug!("Segmenting {} with {} picks ({})", filename, picks.len(), session.metric().name());
    for pick in picks {
        session.pick(pick.color, pick.threshold);
    }

    let segmentation = session.current_segmentation()?;
    let mask_path = export_mask(&segmentation, &path, mask_dir)?;

    if preview {
        let preview_name = mask_file_name(&path)?.replace("_mask.png", "_preview.png");
        let preview_path = mask_dir.join(preview_name);
        session
            .render()?
            .save_with_format(&preview_path, image::ImageFormat::Png)?;
        debug!("Saved preview to {}", preview_path.display());
    }

    info!("{} -> {}", path.display(), mask_path.display());
    Ok(mask_path)
}

/// Log every failed image of a batch run.
///
/// Returns the number of written masks, or `BatchFailed` if any image failed.
pub fn summarize_batch(results: &[(PathBuf, Result<PathBuf>)]) -> Result<usize> {
    let mut failed = 0;
    for (path, result) in results {
        if let Err(e) = result {
            error!("Error processing {}: {}", path.display(), e);
            failed += 1;
        }
    }

    if failed > 0 {
        return Err(ColorSegmentError::BatchFailed { failed, total: results.len() });
    }
    Ok(results.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color_space::ColorSpace;
    use crate::config::CropRegion;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_parse_color_pick() {
        let pick: ColorPick = "10, 20,30:12.5".parse().unwrap();
        assert_eq!(pick, ColorPick { color: [10, 20, 30], threshold: 12.5 });

        assert!("10,20:5".parse::<ColorPick>().is_err());
        assert!("10,20,300:5".parse::<ColorPick>().is_err());
        assert!("10,20,30:-1".parse::<ColorPick>().is_err());
        assert!("10,20,30".parse::<ColorPick>().is_err());
    }

    #[test]
    fn test_color_pick_threshold_matches_typed_input() {
        for bad in ["abc", "-3", "NaN", "inf", ""] {
            let expected = parse_threshold(bad).unwrap_err().to_string();
            assert_eq!(format!("1,2,3:{}", bad).parse::<ColorPick>(), Err(expected));
        }
        let pick: ColorPick = "1,2,3: 4 ".parse().unwrap();
        assert_eq!(pick.threshold, parse_threshold(" 4 ").unwrap());
    }

    #[test]
    fn test_prepare_working_image() {
        let pixels = RgbImage::from_fn(20, 10, |x, _| Rgb(if x < 10 { [255, 0, 0] } else { [0, 0, 255] }));
        let image = ColorImage::new(pixels, ColorSpace::Rgb);
        let settings = Settings {
            size: 4,
            proc_c_space: ColorSpace::Bgr,
            crop: Some(CropRegion { x: [12, 20], y: [0, 8] }),
            ..Settings::default()
        };

        let working = prepare_working_image(&image, &settings).unwrap();
        assert_eq!(working.dimensions(), (4, 4));
        assert_eq!(working.space(), ColorSpace::Bgr);
        // Only the blue half survives the crop; BGR puts blue first
        assert!(working
            .pixels()
            .pixels()
            .all(|p| p[0] >= 254 && p[1] <= 1 && p[2] <= 1));
    }

    #[test]
    fn test_prepare_working_image_crop_out_of_bounds() {
        let image = ColorImage::from_color(10, 10, [0, 0, 0], ColorSpace::Rgb);
        let settings = Settings {
            crop: Some(CropRegion { x: [525, 1400], y: [35, 910] }),
            ..Settings::default()
        };
        assert!(matches!(
            prepare_working_image(&image, &settings),
            Err(ColorSegmentError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_summarize_batch_fails_on_any_error() {
        let ok = |name: &str| -> (PathBuf, Result<PathBuf>) {
            (PathBuf::from(name), Ok(PathBuf::from("masks").join(name)))
        };
        assert_eq!(summarize_batch(&[ok("a.png"), ok("b.png")]).unwrap(), 2);
        assert_eq!(summarize_batch(&[]).unwrap(), 0);

        let results = vec![
            ok("a.png"),
            (PathBuf::from("b.png"), Err(ColorSegmentError::NoImageLoaded)),
            (PathBuf::from("c.png"), Err(ColorSegmentError::NoImagesFound(PathBuf::from("c")))),
        ];
        assert!(matches!(
            summarize_batch(&results),
            Err(ColorSegmentError::BatchFailed { failed: 2, total: 3 })
        ));
    }
}
