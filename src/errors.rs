use thiserror::Error;
use std::io;
use std::path::PathBuf;

use crate::color_space::ColorSpace;

/// Custom error types for the color segmentation engine
#[derive(Error, Debug)]
pub enum ColorSegmentError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration from {path}: {message}")]
    ConfigLoad {
        message: String,
        path: PathBuf,
    },

    #[error("Invalid distance method: {0:?} (expected \"delta_e_2000\" or \"euclidean\")")]
    InvalidMethod(Option<String>),

    #[error("There were no images found in {0}")]
    NoImagesFound(PathBuf),

    #[error("Not a valid directory: {0}")]
    InvalidDirectory(PathBuf),

    #[error("Unsupported color conversion: {from} to {to}")]
    UnsupportedConversion {
        from: ColorSpace,
        to: ColorSpace,
    },

    #[error("Region x={x_range:?}, y={y_range:?} is outside the {width}x{height} buffer")]
    OutOfBounds {
        x_range: (u32, u32),
        y_range: (u32, u32),
        width: u32,
        height: u32,
    },

    #[error("Entry index {index} out of range ({len} entries)")]
    IndexOutOfRange {
        index: usize,
        len: usize,
    },

    #[error("Invalid threshold input: {0:?}")]
    InvalidThresholdInput(String),

    #[error("Dimension mismatch: expected {expected:?}, found {found:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },

    #[error("No working image loaded")]
    NoImageLoaded,

    #[error("{failed} of {total} images failed")]
    BatchFailed {
        failed: usize,
        total: usize,
    },
}

/// Type alias for Result with our custom error type
pub type Result<T> = std::result::Result<T, ColorSegmentError>;
