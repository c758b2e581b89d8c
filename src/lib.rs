// src/lib.rs - Library interface for the color segmentation annotator

pub mod annotator;
pub mod color_space;
pub mod config;
pub mod distance;
pub mod errors;
pub mod image_io;
pub mod image_utils;
pub mod morphology;
pub mod pipeline;
pub mod segmentation;
pub mod session;

// Re-export commonly used types and functions
pub use errors::{ColorSegmentError, Result};
pub use config::{CropRegion, Settings};
pub use annotator::{parse_threshold, Annotator};
pub use session::{DenoiseOptions, Entry, SegmentationSession};
pub use pipeline::{prepare_working_image, process_image, summarize_batch, ColorPick};
pub use image_io::{InputImage, load_image, load_image_paths, export_mask, mask_file_name};

// Re-export the segmentation engine
pub use color_space::{convert_color_space, Color, ColorImage, ColorSpace};
pub use image_utils::{cutout, resize_image};
pub use distance::{
    delta_e_2000,
    euclidean_match,
    match_delta_e_2000,
    DistanceField,
    DistanceMetric,
};
pub use morphology::{denoise_mask, threshold_color_distance, Mask};
pub use segmentation::{
    combine_masks,
    render_segmentation,
    SegmentationMask,
    COLOR_MAP,
};
