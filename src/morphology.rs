use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{dilate_mut, erode_mut};

use crate::distance::DistanceField;

/// Binary mask: 1 where a pixel belongs to the picked color, 0 elsewhere
pub type Mask = GrayImage;

/// Largest structuring element radius the morphology backend accepts
const MAX_KERNEL_RADIUS: u32 = 254;

/// Threshold a distance field into a binary mask.
///
/// A pixel is selected only when its distance is strictly below `threshold`.
pub fn threshold_color_distance(field: &DistanceField, threshold: f64) -> Mask {
    let (width, height) = field.dimensions();
    Mask::from_fn(width, height, |x, y| {
        Luma([(field.get_pixel(x, y)[0] < threshold) as u8])
    })
}

/// Denoise a mask with a morphological opening: erode `iterations` times,
/// then dilate `iterations` times, with a square `kernel_size` element.
///
/// Even kernel sizes behave like the next odd size. Pixels outside the image
/// neither erode nor dilate their neighbours.
pub fn denoise_mask(mask: &Mask, kernel_size: u32, iterations: u32) -> Mask {
    if iterations == 0 {
        return mask.clone();
    }

    let radius = (kernel_size / 2).min(MAX_KERNEL_RADIUS) as u8;
    let mut work = mask.clone();

    for _ in 0..iterations {
        erode_mut(&mut work, Norm::LInf, radius);
    }
    for _ in 0..iterations {
        dilate_mut(&mut work, Norm::LInf, radius);
    }

    // Back from 0/255 to 0/1
    for pixel in work.pixels_mut() {
        pixel[0] = (pixel[0] > 0) as u8;
    }

    work
}

/// Number of selected pixels in a mask
pub fn count_selected(mask: &Mask) -> usize {
    mask.pixels().filter(|p| p[0] > 0).count()
}
