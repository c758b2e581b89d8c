// src/annotator.rs - User actions of an annotation front end as plain calls
//
// A UI shell owns one `Annotator` and forwards widget events to it: choosing
// directories, stepping through images, clicking a pixel with a typed
// threshold, editing a threshold, exporting. Picks survive image changes and
// are replayed on every newly opened image.

use std::path::{Path, PathBuf};

use image::RgbImage;
use log::{info, warn};

use crate::color_space::convert_color_space;
use crate::config::Settings;
use crate::errors::{ColorSegmentError, Result};
use crate::image_io::{export_mask, load_image, validate_directory, validate_image_directory};
use crate::pipeline::prepare_working_image;
use crate::session::SegmentationSession;

/// Parse a threshold typed by the user. Accepts non-negative finite numbers.
pub fn parse_threshold(input: &str) -> Result<f64> {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|t| t.is_finite() && *t >= 0.0)
        .ok_or_else(|| ColorSegmentError::InvalidThresholdInput(input.to_string()))
}

pub struct Annotator {
    settings: Settings,
    images: Vec<PathBuf>,
    current_index: Option<usize>,
    mask_dir: Option<PathBuf>,
    session: Option<SegmentationSession>,
    pub status_message: String,
}

impl Annotator {
    /// Create an annotator; invalid settings (including the distance method) are fatal
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            images: Vec::new(),
            current_index: None,
            mask_dir: None,
            session: None,
            status_message: String::from("Ready"),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn session(&self) -> Option<&SegmentationSession> {
        self.session.as_ref()
    }

    pub fn images(&self) -> &[PathBuf] {
        &self.images
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn current_image_path(&self) -> Option<&Path> {
        self.current_index
            .and_then(|idx| self.images.get(idx))
            .map(PathBuf::as_path)
    }

    pub fn mask_dir(&self) -> Option<&Path> {
        self.mask_dir.as_deref()
    }

    fn session_mut(&mut self) -> Result<&mut SegmentationSession> {
        self.session.as_mut().ok_or(ColorSegmentError::NoImageLoaded)
    }

    /// Choose the image directory and open its first image
    pub fn set_image_directory<P: AsRef<Path>>(&mut self, dir: P) -> Result<usize> {
        let images = validate_image_directory(&dir)?;
        self.open_image(&images[0])?;

        let count = images.len();
        self.images = images;
        self.current_index = Some(0);
        self.status_message = format!("Loaded {} images from {}", count, dir.as_ref().display());
        info!("{}", self.status_message);
        Ok(count)
    }

    /// Choose where exported masks go
    pub fn set_mask_directory<P: AsRef<Path>>(&mut self, dir: P) -> Result<()> {
        self.mask_dir = Some(validate_directory(dir)?);
        Ok(())
    }

    /// Load `path` as the new working image, replaying existing picks.
    /// On failure the previous image and picks stay in place.
    fn open_image(&mut self, path: &Path) -> Result<()> {
        let input = load_image(path)?;
        let working_image = prepare_working_image(&input.image, &self.settings)?;

        match self.session.as_mut() {
            Some(session) => session.set_working_image(working_image)?,
            None => {
                self.session = Some(SegmentationSession::from_settings(working_image, &self.settings)?);
            }
        }
        Ok(())
    }

    fn step(&mut self, forward: bool) -> Result<()> {
        let (Some(current), count) = (self.current_index, self.images.len()) else {
            return Ok(());
        };

        let next = if forward {
            (current + 1) % count
        } else {
            (current + count - 1) % count
        };

        let path = self.images[next].clone();
        self.open_image(&path)?;
        self.current_index = Some(next);
        self.status_message = format!("Image {}/{}: {}", next + 1, count, path.display());
        Ok(())
    }

    /// Move to the next image, wrapping around
    pub fn next_image(&mut self) -> Result<()> {
        self.step(true)
    }

    /// Move to the previous image, wrapping around
    pub fn previous_image(&mut self) -> Result<()> {
        self.step(false)
    }

    /// Pick the working-image color under `(x, y)` with a typed threshold.
    ///
    /// A threshold that does not parse leaves the session untouched and is
    /// reported through `status_message`.
    pub fn pick_at(&mut self, x: u32, y: u32, threshold_input: &str) -> Result<usize> {
        let threshold = match parse_threshold(threshold_input) {
            Ok(t) => t,
            Err(e) => {
                warn!("{}", e);
                self.status_message = "Please enter a valid number.".to_string();
                return Err(e);
            }
        };

        let session = self.session_mut()?;
        let color = session.color_at(x, y)?;
        let index = session.pick(color, threshold);
        self.status_message = format!("Color {} {:?} at threshold {}", index, color, threshold);
        Ok(index)
    }

    /// Re-threshold an existing pick from typed input
    pub fn set_threshold(&mut self, index: usize, threshold_input: &str) -> Result<()> {
        let threshold = match parse_threshold(threshold_input) {
            Ok(t) => t,
            Err(e) => {
                warn!("{}", e);
                self.status_message = "Please enter a valid number.".to_string();
                return Err(e);
            }
        };
        self.session_mut()?.update_threshold(index, threshold)?;
        self.status_message = format!("Color {} threshold set to {}", index, threshold);
        Ok(())
    }

    /// Forget every pick
    pub fn reset_picks(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.reset();
        }
        self.status_message = "Picks cleared".to_string();
    }

    /// The working image in the display color space
    pub fn display_image(&self) -> Result<RgbImage> {
        let session = self.session.as_ref().ok_or(ColorSegmentError::NoImageLoaded)?;
        let display = convert_color_space(session.working_image(), self.settings.display_c_space)?;
        Ok(display.into_pixels())
    }

    /// False-color rendering of the current segmentation
    pub fn mask_image(&self) -> Result<RgbImage> {
        self.session
            .as_ref()
            .ok_or(ColorSegmentError::NoImageLoaded)?
            .render()
    }

    /// Write the current segmentation to the mask directory
    pub fn export_mask(&mut self) -> Result<PathBuf> {
        let mask_dir = self.mask_dir.clone().ok_or_else(|| {
            ColorSegmentError::Config("mask directory not set".to_string())
        })?;
        let source = self
            .current_image_path()
            .ok_or(ColorSegmentError::NoImageLoaded)?
            .to_path_buf();
        let session = self.session.as_ref().ok_or(ColorSegmentError::NoImageLoaded)?;

        let path = export_mask(&session.current_segmentation()?, &source, &mask_dir)?;
        self.status_message = format!("Saved {}", path.display());
        Ok(path)
    }
}
