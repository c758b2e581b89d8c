//! Combining per-color masks into one labeled segmentation and rendering it.

use image::{ImageBuffer, Luma, Rgb, RgbImage};
use log::warn;

use crate::errors::{ColorSegmentError, Result};
use crate::morphology::Mask;

/// Per-pixel label: the sum of `(i + 1)` over every mask `i` selecting the pixel
pub type SegmentationMask = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Swatch for each label the renderer knows about
pub const COLOR_MAP: [[u8; 3]; 8] = [
    [0, 0, 0],       // background
    [255, 0, 0],     // red
    [0, 255, 0],     // green
    [0, 0, 255],     // blue
    [255, 255, 0],   // yellow
    [0, 255, 255],   // cyan
    [255, 0, 255],   // magenta
    [255, 255, 255], // white
];

/// Swatch painted for labels without a color map entry
pub const FALLBACK_COLOR: [u8; 3] = COLOR_MAP[0];

/// Combine binary masks into a labeled segmentation.
///
/// Mask `i` contributes `i + 1` to every pixel it selects. Overlaps add up
/// rather than taking the maximum, so two overlapping picks 0 and 1 produce
/// label 3. An empty slice yields an all-zero segmentation of `dimensions`.
pub fn combine_masks(dimensions: (u32, u32), masks: &[Mask]) -> Result<SegmentationMask> {
    let (width, height) = dimensions;
    let mut segmentation = SegmentationMask::new(width, height);

    for (i, mask) in masks.iter().enumerate() {
        if mask.dimensions() != dimensions {
            return Err(ColorSegmentError::DimensionMismatch {
                expected: dimensions,
                found: mask.dimensions(),
            });
        }

        let label = u16::try_from(i + 1).unwrap_or(u16::MAX);
        for (acc, selected) in segmentation.pixels_mut().zip(mask.pixels()) {
            if selected[0] > 0 {
                acc[0] = acc[0].saturating_add(label);
            }
        }
    }

    Ok(segmentation)
}

/// Render a segmentation with [`COLOR_MAP`].
///
/// Labels past the end of the map (reachable once picks overlap) are painted
/// with [`FALLBACK_COLOR`] and reported once per call.
pub fn render_segmentation(segmentation: &SegmentationMask) -> RgbImage {
    let (width, height) = segmentation.dimensions();
    let mut unmapped = 0usize;

    let rendered = RgbImage::from_fn(width, height, |x, y| {
        let label = segmentation.get_pixel(x, y)[0] as usize;
        match COLOR_MAP.get(label) {
            Some(color) => Rgb(*color),
            None => {
                unmapped += 1;
                Rgb(FALLBACK_COLOR)
            }
        }
    });

    if unmapped > 0 {
        warn!(
            "{} pixels carry labels above {} and were rendered as background",
            unmapped,
            COLOR_MAP.len() - 1
        );
    }

    rendered
}
