use image::imageops::{self, FilterType};

use crate::color_space::ColorImage;
use crate::errors::{ColorSegmentError, Result};

/// Resize an image to the specified `[width, height]`.
///
/// Bilinear resampling; the same input and dimensions always give the same output.
pub fn resize_image(
    image: &ColorImage,
    dimensions: [u32; 2],
) -> ColorImage {
    let (width, height) = (dimensions[0], dimensions[1]);
    let resized = imageops::resize(
        image.pixels(),
        width,
        height,
        FilterType::Triangle,
    );
    ColorImage::new(resized, image.space())
}

/// Cut out the region spanned by `x_range` (columns) and `y_range` (rows).
///
/// Ranges are half-open. The x range indexes columns and the y range indexes
/// rows, matching the crop coordinates found in existing settings files.
pub fn cutout(
    image: &ColorImage,
    x_range: (u32, u32),
    y_range: (u32, u32),
) -> Result<ColorImage> {
    let (width, height) = image.dimensions();
    let (x1, x2) = x_range;
    let (y1, y2) = y_range;

    if x1 >= x2 || y1 >= y2 || x2 > width || y2 > height {
        return Err(ColorSegmentError::OutOfBounds {
            x_range,
            y_range,
            width,
            height,
        });
    }

    let cropped = imageops::crop_imm(image.pixels(), x1, y1, x2 - x1, y2 - y1).to_image();
    Ok(ColorImage::new(cropped, image.space()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color_space::ColorSpace;
    use image::{Rgb, RgbImage};

    /// 4 columns x 3 rows, each pixel encodes its own (x, y)
    fn coordinate_image() -> ColorImage {
        let pixels = RgbImage::from_fn(4, 3, |x, y| Rgb([x as u8, y as u8, 0]));
        ColorImage::new(pixels, ColorSpace::Rgb)
    }

    #[test]
    fn test_cutout_x_selects_columns() {
        let image = coordinate_image();
        let cropped = cutout(&image, (1, 4), (0, 2)).unwrap();

        assert_eq!(cropped.dimensions(), (3, 2));
        assert_eq!(cropped.color_at(0, 0), Some([1, 0, 0]));
        assert_eq!(cropped.color_at(2, 1), Some([3, 1, 0]));
    }

    #[test]
    fn test_cutout_out_of_bounds() {
        let image = coordinate_image();
        // 4 rows requested from a 3 row image
        assert!(matches!(
            cutout(&image, (0, 3), (0, 4)),
            Err(ColorSegmentError::OutOfBounds { .. })
        ));
        assert!(matches!(
            cutout(&image, (2, 2), (0, 1)),
            Err(ColorSegmentError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_resize_exact_and_deterministic() {
        let image = coordinate_image();
        let first = resize_image(&image, [8, 5]);
        let second = resize_image(&image, [8, 5]);

        assert_eq!(first.dimensions(), (8, 5));
        assert_eq!(first.space(), ColorSpace::Rgb);
        assert_eq!(first, second);
    }
}
