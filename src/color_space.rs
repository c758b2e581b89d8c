//! Color space tagging and conversion of 8-bit working buffers.
//!
//! Every buffer carries the encoding its channels are stored in. HSV and Lab
//! use the usual 8-bit packing: hue is stored halved in `[0, 180)`, Lab stores
//! `L * 255 / 100`, `a + 128` and `b + 128` (sRGB primaries, D65 white).

use std::fmt;
use std::str::FromStr;

use image::{Rgb, RgbImage};
use palette::white_point::D65;
use palette::{FromColor, Lab, Srgb};
use serde::{Deserialize, Serialize};

use crate::errors::{ColorSegmentError, Result};

/// A picked color: one channel triple in the encoding of the image it was sampled from
pub type Color = [u8; 3];

/// Channel encodings a buffer can be stored in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColorSpace {
    /// Native camera order
    Bgr,
    /// Display order
    Rgb,
    /// Hue, saturation, value
    Hsv,
    /// Perceptual lightness plus two opponent axes
    Lab,
}

impl ColorSpace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bgr => "BGR",
            Self::Rgb => "RGB",
            Self::Hsv => "HSV",
            Self::Lab => "LAB",
        }
    }

    /// Whether the channels are a plain permutation of RGB
    pub fn is_rgb_family(&self) -> bool {
        matches!(self, Self::Bgr | Self::Rgb)
    }
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorSpace {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BGR" => Ok(Self::Bgr),
            "RGB" => Ok(Self::Rgb),
            "HSV" => Ok(Self::Hsv),
            "LAB" => Ok(Self::Lab),
            _ => Err(format!("Unknown color space: {}", s)),
        }
    }
}

/// An 8-bit three channel buffer together with the encoding of its channels
#[derive(Debug, Clone, PartialEq)]
pub struct ColorImage {
    pixels: RgbImage,
    space: ColorSpace,
}

impl ColorImage {
    pub fn new(pixels: RgbImage, space: ColorSpace) -> Self {
        Self { pixels, space }
    }

    /// Fill a `width` x `height` buffer with a single color
    pub fn from_color(width: u32, height: u32, color: Color, space: ColorSpace) -> Self {
        Self::new(RgbImage::from_pixel(width, height, Rgb(color)), space)
    }

    pub fn space(&self) -> ColorSpace {
        self.space
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut RgbImage {
        &mut self.pixels
    }

    pub fn into_pixels(self) -> RgbImage {
        self.pixels
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Channel triple at `(x, y)`, or `None` outside the buffer
    pub fn color_at(&self, x: u32, y: u32) -> Option<Color> {
        self.pixels.get_pixel_checked(x, y).map(|p| p.0)
    }
}

/// Check whether a direct conversion between two encodings is defined
pub fn is_supported_conversion(from: ColorSpace, to: ColorSpace) -> bool {
    from == to || from.is_rgb_family() || to.is_rgb_family()
}

/// Convert a buffer into another encoding.
///
/// Conversions between HSV and Lab are not defined and fail with
/// `UnsupportedConversion`; go through RGB explicitly instead.
pub fn convert_color_space(image: &ColorImage, to: ColorSpace) -> Result<ColorImage> {
    let from = image.space;
    if !is_supported_conversion(from, to) {
        return Err(ColorSegmentError::UnsupportedConversion { from, to });
    }
    if from == to {
        return Ok(image.clone());
    }

    let (width, height) = image.dimensions();
    let mut converted = RgbImage::new(width, height);
    for (src, dst) in image.pixels.pixels().zip(converted.pixels_mut()) {
        *dst = Rgb(convert_pixel(src.0, from, to));
    }

    Ok(ColorImage::new(converted, to))
}

/// Convert a single color triple, with the same pair rules as
/// [`convert_color_space`]
pub fn convert_color(color: Color, from: ColorSpace, to: ColorSpace) -> Result<Color> {
    if !is_supported_conversion(from, to) {
        return Err(ColorSegmentError::UnsupportedConversion { from, to });
    }
    Ok(convert_pixel(color, from, to))
}

fn convert_pixel(color: Color, from: ColorSpace, to: ColorSpace) -> Color {
    encode_rgb(decode_to_rgb(color, from), to)
}

fn decode_to_rgb(color: Color, space: ColorSpace) -> Color {
    match space {
        ColorSpace::Rgb => color,
        ColorSpace::Bgr => [color[2], color[1], color[0]],
        ColorSpace::Hsv => hsv_to_rgb(color),
        ColorSpace::Lab => lab_to_rgb(color),
    }
}

fn encode_rgb(rgb: Color, space: ColorSpace) -> Color {
    match space {
        ColorSpace::Rgb => rgb,
        ColorSpace::Bgr => [rgb[2], rgb[1], rgb[0]],
        ColorSpace::Hsv => rgb_to_hsv(rgb),
        ColorSpace::Lab => rgb_to_lab(rgb),
    }
}

#[inline]
fn quantize(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

fn rgb_to_hsv(rgb: Color) -> Color {
    let r = rgb[0] as f32;
    let g = rgb[1] as f32;
    let b = rgb[2] as f32;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = max - min;

    let s = if max == 0.0 { 0.0 } else { 255.0 * diff / max };
    let mut h = if diff == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / diff
    } else if max == g {
        120.0 + 60.0 * (b - r) / diff
    } else {
        240.0 + 60.0 * (r - g) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }

    // Hue is packed at half resolution; 360 degrees wraps back to 0
    let h = (h / 2.0).round() as u32 % 180;
    [h as u8, quantize(s), max as u8]
}

fn hsv_to_rgb(hsv: Color) -> Color {
    let h = (hsv[0] as f32 * 2.0) % 360.0;
    let s = hsv[1] as f32 / 255.0;
    let v = hsv[2] as f32 / 255.0;

    let c = v * s;
    let sector = h / 60.0;
    let x = c * (1.0 - (sector % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match sector as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    [
        quantize((r + m) * 255.0),
        quantize((g + m) * 255.0),
        quantize((b + m) * 255.0),
    ]
}

fn rgb_to_lab(rgb: Color) -> Color {
    let srgb = Srgb::new(
        rgb[0] as f32 / 255.0,
        rgb[1] as f32 / 255.0,
        rgb[2] as f32 / 255.0,
    );
    let lab: Lab<D65, f32> = Lab::from_color(srgb);
    [
        quantize(lab.l * 255.0 / 100.0),
        quantize(lab.a + 128.0),
        quantize(lab.b + 128.0),
    ]
}

fn lab_to_rgb(lab: Color) -> Color {
    let lab = Lab::<D65, f32>::new(
        lab[0] as f32 * 100.0 / 255.0,
        lab[1] as f32 - 128.0,
        lab[2] as f32 - 128.0,
    );
    let srgb: Srgb<f32> = Srgb::from_color(lab);
    [
        quantize(srgb.red * 255.0),
        quantize(srgb.green * 255.0),
        quantize(srgb.blue * 255.0),
    ]
}
