//! Per-pixel color distance fields.
//!
//! Both metrics read the three channels of the working image as-is. The
//! perceptual formula is written for Lab-like channels but is evaluated on
//! whatever encoding the working image carries; `Settings::validate` only
//! warns when the two disagree.

use image::{ImageBuffer, Luma};

use crate::color_space::{Color, ColorImage};
use crate::errors::{ColorSegmentError, Result};

/// Per-pixel distance to a picked color, same shape as the working image
pub type DistanceField = ImageBuffer<Luma<f64>, Vec<f64>>;

/// 25^7, the chroma normalisation constant of the perceptual formula
const CHROMA_POW7_REF: f64 = 6_103_515_625.0;

/// Distance strategy, fixed for the lifetime of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DistanceMetric {
    /// "Delta E 2000"-style perceptual difference
    DeltaE2000,
    /// Euclidean distance over the selected channel indices
    Euclidean { channels: Vec<usize> },
}

impl DistanceMetric {
    /// Parse the `method` setting
    pub fn from_method(method: Option<&str>, channels: Option<&[usize]>) -> Result<Self> {
        match method {
            Some("delta_e_2000") => Ok(Self::DeltaE2000),
            Some("euclidean") => {
                let channels = channels.map(|c| c.to_vec()).unwrap_or_else(|| vec![0, 1, 2]);
                if channels.is_empty() || channels.iter().any(|&c| c > 2) {
                    return Err(ColorSegmentError::Config(format!(
                        "euclidean channels must be a non-empty subset of [0, 1, 2], got {:?}",
                        channels
                    )));
                }
                Ok(Self::Euclidean { channels })
            }
            other => Err(ColorSegmentError::InvalidMethod(other.map(str::to_string))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::DeltaE2000 => "delta_e_2000",
            Self::Euclidean { .. } => "euclidean",
        }
    }

    /// Compute the distance field of `image` against `color`
    pub fn distance_field(&self, image: &ColorImage, color: Color) -> DistanceField {
        match self {
            Self::DeltaE2000 => match_delta_e_2000(image, color),
            Self::Euclidean { channels } => euclidean_match(image, color, channels),
        }
    }
}

/// Perceptual difference between one pixel and the reference color.
///
/// Channel 0 plays the role of the first opponent axis (the only one that
/// receives the G correction), channel 1 the second axis and channel 2 the
/// lightness.
pub fn delta_e_2000(pixel: [f64; 3], reference: [f64; 3]) -> f64 {
    let [h1, s1, v1] = pixel;
    let [h2, s2, v2] = reference;

    let c1 = (h1 * h1 + s1 * s1).sqrt();
    let c2 = (h2 * h2 + s2 * s2).sqrt();
    let c_mean = (c1 + c2) / 2.0;

    let c_mean_pow7 = c_mean.powi(7);
    let chroma_ratio = (c_mean_pow7 / (c_mean_pow7 + CHROMA_POW7_REF)).sqrt();
    let g = 0.5 * (1.0 - chroma_ratio);

    let h1_prime = h1 + g * h1;
    let h2_prime = h2 + g * h2;

    let c1_prime = (h1_prime * h1_prime + s1 * s1).sqrt();
    let c2_prime = (h2_prime * h2_prime + s2 * s2).sqrt();

    let delta_l = v1 - v2;
    let delta_c = c1_prime - c2_prime;
    let delta_h = ((h1_prime - h2_prime).powi(2) + (s1 - s2).powi(2)).sqrt() - delta_c;

    let l_mean = (v1 + v2) / 2.0;
    let l_offset_sq = (l_mean - 50.0).powi(2);
    let s_l = 1.0 + (0.015 * l_offset_sq) / (20.0 + l_offset_sq).sqrt();
    let s_c = 1.0 + 0.045 * c_mean;
    let s_h = 1.0 + 0.015 * c_mean;

    let delta_theta = 30.0 * (-((h1_prime - h2_prime).powi(2)) / 25.0).exp();
    let r_c = 2.0 * chroma_ratio;
    let r_t = -r_c * (2.0 * delta_theta.to_radians()).sin();

    let l_term = delta_l / s_l;
    let c_term = delta_c / s_c;
    let h_term = delta_h / s_h;

    // A negative radicand yields NaN, which no threshold selects
    (l_term * l_term + c_term * c_term + h_term * h_term + r_t * c_term * h_term).sqrt()
}

/// Perceptual distance field of every pixel against `color`
pub fn match_delta_e_2000(image: &ColorImage, color: Color) -> DistanceField {
    let reference = color.map(f64::from);
    let (width, height) = image.dimensions();
    let pixels = image.pixels();

    DistanceField::from_fn(width, height, |x, y| {
        let pixel = pixels.get_pixel(x, y).0.map(f64::from);
        Luma([delta_e_2000(pixel, reference)])
    })
}

/// Euclidean distance field over the given channel indices.
///
/// Channels are promoted to signed integers before subtraction.
pub fn euclidean_match(image: &ColorImage, color: Color, channels: &[usize]) -> DistanceField {
    let (width, height) = image.dimensions();
    let pixels = image.pixels();

    DistanceField::from_fn(width, height, |x, y| {
        let pixel = pixels.get_pixel(x, y);
        let sum_sq: i32 = channels
            .iter()
            .map(|&c| {
                let delta = pixel[c] as i32 - color[c] as i32;
                delta * delta
            })
            .sum();
        Luma([(sum_sq as f64).sqrt()])
    })
}
