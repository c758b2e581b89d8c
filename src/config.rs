// Settings for the color segmentation annotator

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use log::warn;

use crate::color_space::ColorSpace;
use crate::distance::DistanceMetric;
use crate::errors::{ColorSegmentError, Result};

/// Annotator settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Side length of the square working image
    #[serde(default = "default_size")]
    pub size: u32,

    /// Distance metric: "delta_e_2000" or "euclidean"
    #[serde(default)]
    pub method: Option<String>,

    /// Channel indices compared by the euclidean metric
    #[serde(default)]
    pub channels: Option<Vec<usize>>,

    /// Color space the working image is analysed in
    #[serde(default = "default_proc_c_space")]
    pub proc_c_space: ColorSpace,

    /// Color space used to show the working image
    #[serde(default = "default_display_c_space")]
    pub display_c_space: ColorSpace,

    #[serde(default = "default_denoise_kernel_size")]
    pub denoise_kernel_size: u32,

    /// Opening iterations applied to each mask; 0 disables denoising
    #[serde(default)]
    pub denoise_iterations: u32,

    #[serde(default = "default_parallel")]
    pub use_parallel: bool,

    /// Region cut out of every source image before resizing
    #[serde(default)]
    pub crop: Option<CropRegion>,
}

/// Crop ranges, half-open. `x` selects columns and `y` selects rows.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: [u32; 2],
    pub y: [u32; 2],
}

fn default_size() -> u32 {
    255
}

fn default_proc_c_space() -> ColorSpace {
    ColorSpace::Lab
}

fn default_display_c_space() -> ColorSpace {
    ColorSpace::Rgb
}

fn default_denoise_kernel_size() -> u32 {
    3
}

fn default_parallel() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            size: default_size(),
            method: Some("delta_e_2000".to_string()),
            channels: None,
            proc_c_space: default_proc_c_space(),
            display_c_space: default_display_c_space(),
            denoise_kernel_size: default_denoise_kernel_size(),
            denoise_iterations: 0,
            use_parallel: default_parallel(),
            crop: None,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file, or JSON when the extension is `.json`
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ColorSegmentError::Config(format!("Failed to read settings file '{}': {}", path.display(), e))
        })?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let settings = if is_json {
            serde_json::from_str(&content).map_err(|e| ColorSegmentError::ConfigLoad {
                message: e.to_string(),
                path: path.to_path_buf(),
            })?
        } else {
            toml::from_str(&content).map_err(|e| ColorSegmentError::ConfigLoad {
                message: e.to_string(),
                path: path.to_path_buf(),
            })?
        };

        Ok(settings)
    }

    /// Resolve the configured distance metric
    pub fn distance_metric(&self) -> Result<DistanceMetric> {
        DistanceMetric::from_method(self.method.as_deref(), self.channels.as_deref())
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        let metric = self.distance_metric()?;

        if self.size == 0 {
            return Err(ColorSegmentError::Config("size must be > 0".to_string()));
        }

        if self.denoise_kernel_size == 0 {
            return Err(ColorSegmentError::Config(
                "denoise_kernel_size must be > 0".to_string(),
            ));
        }

        if self.display_c_space != ColorSpace::Rgb {
            return Err(ColorSegmentError::Config(format!(
                "display_c_space must be RGB, got {}",
                self.display_c_space
            )));
        }

        if let Some(crop) = self.crop {
            if crop.x[0] >= crop.x[1] || crop.y[0] >= crop.y[1] {
                return Err(ColorSegmentError::Config(format!(
                    "crop ranges must be increasing, got x={:?} y={:?}",
                    crop.x, crop.y
                )));
            }
        }

        // The perceptual formula assumes Lab channels but runs on whatever is configured
        if metric == DistanceMetric::DeltaE2000 && self.proc_c_space != ColorSpace::Lab {
            warn!(
                "delta_e_2000 will run on {} channels; the formula expects LAB",
                self.proc_c_space
            );
        }

        Ok(())
    }

    /// Save settings to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            ColorSegmentError::Config(format!("Failed to serialize settings: {}", e))
        })?;

        fs::write(path, content)?;

        Ok(())
    }
}
