// src/session.rs - Segmentation session: picked colors, cached distance fields and masks

use image::RgbImage;
use log::debug;

use crate::color_space::{convert_color_space, Color, ColorImage};
use crate::config::Settings;
use crate::distance::{DistanceField, DistanceMetric};
use crate::errors::{ColorSegmentError, Result};
use crate::morphology::{count_selected, denoise_mask, threshold_color_distance, Mask};
use crate::segmentation::{combine_masks, render_segmentation, SegmentationMask};

/// One picked color with its threshold.
///
/// `index` is the number of entries that existed when it was picked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entry {
    pub index: usize,
    pub color: Color,
    pub threshold: f64,
}

/// Morphological opening applied to every derived mask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DenoiseOptions {
    pub kernel_size: u32,
    pub iterations: u32,
}

/// Owns the working image and everything derived from it.
///
/// `entries`, `distance_fields` and `masks` always have the same length and
/// are indexed by entry index. A distance field is computed once per
/// (image, color); changing a threshold only re-derives the mask.
pub struct SegmentationSession {
    working_image: ColorImage,
    metric: DistanceMetric,
    denoise: Option<DenoiseOptions>,
    entries: Vec<Entry>,
    distance_fields: Vec<DistanceField>,
    masks: Vec<Mask>,
}

impl SegmentationSession {
    pub fn new(working_image: ColorImage, metric: DistanceMetric) -> Self {
        Self {
            working_image,
            metric,
            denoise: None,
            entries: Vec::new(),
            distance_fields: Vec::new(),
            masks: Vec::new(),
        }
    }

    /// Build a session with the metric and denoising configured in `settings`
    pub fn from_settings(working_image: ColorImage, settings: &Settings) -> Result<Self> {
        let session = Self::new(working_image, settings.distance_metric()?);
        Ok(if settings.denoise_iterations > 0 {
            session.with_denoise(DenoiseOptions {
                kernel_size: settings.denoise_kernel_size,
                iterations: settings.denoise_iterations,
            })
        } else {
            session
        })
    }

    pub fn with_denoise(mut self, denoise: DenoiseOptions) -> Self {
        self.denoise = Some(denoise);
        self
    }

    pub fn working_image(&self) -> &ColorImage {
        &self.working_image
    }

    pub fn metric(&self) -> &DistanceMetric {
        &self.metric
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn distance_field(&self, index: usize) -> Option<&DistanceField> {
        self.distance_fields.get(index)
    }

    pub fn mask(&self, index: usize) -> Option<&Mask> {
        self.masks.get(index)
    }

    /// Sample a pick color from the working image
    pub fn color_at(&self, x: u32, y: u32) -> Result<Color> {
        self.working_image.color_at(x, y).ok_or_else(|| {
            let (width, height) = self.working_image.dimensions();
            ColorSegmentError::OutOfBounds {
                x_range: (x, x.saturating_add(1)),
                y_range: (y, y.saturating_add(1)),
                width,
                height,
            }
        })
    }

    fn derive_mask(&self, field: &DistanceField, threshold: f64) -> Mask {
        let mask = threshold_color_distance(field, threshold);
        match self.denoise {
            Some(opts) => denoise_mask(&mask, opts.kernel_size, opts.iterations),
            None => mask,
        }
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.entries.len() {
            return Err(ColorSegmentError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            });
        }
        Ok(())
    }

    /// Add a picked color, compute and cache its distance field and mask.
    /// Returns the new entry's index.
    pub fn pick(&mut self, color: Color, threshold: f64) -> usize {
        let index = self.entries.len();
        let field = self.metric.distance_field(&self.working_image, color);
        let mask = self.derive_mask(&field, threshold);

        debug!(
            "Picked color {:?} as entry {} (threshold {}, {} pixels)",
            color,
            index,
            threshold,
            count_selected(&mask)
        );

        self.entries.push(Entry { index, color, threshold });
        self.distance_fields.push(field);
        self.masks.push(mask);
        index
    }

    /// Re-threshold an entry from its cached distance field
    pub fn update_threshold(&mut self, index: usize, threshold: f64) -> Result<()> {
        self.check_index(index)?;

        let mask = self.derive_mask(&self.distance_fields[index], threshold);
        debug!("Entry {} threshold {} selects {} pixels", index, threshold, count_selected(&mask));
        self.masks[index] = mask;
        self.entries[index].threshold = threshold;
        Ok(())
    }

    /// Replace an entry's color, recomputing its distance field
    pub fn update_color(&mut self, index: usize, color: Color, threshold: f64) -> Result<()> {
        self.check_index(index)?;

        let field = self.metric.distance_field(&self.working_image, color);
        self.masks[index] = self.derive_mask(&field, threshold);
        self.distance_fields[index] = field;
        self.entries[index].color = color;
        self.entries[index].threshold = threshold;
        Ok(())
    }

    /// Drop every entry, field and mask
    pub fn reset(&mut self) {
        self.entries.clear();
        self.distance_fields.clear();
        self.masks.clear();
    }

    /// Swap in a new working image and recompute every entry against it.
    ///
    /// The image is converted to the current working encoding first; if that
    /// fails the session is left untouched.
    pub fn set_working_image(&mut self, image: ColorImage) -> Result<()> {
        let image = convert_color_space(&image, self.working_image.space())?;
        self.working_image = image;

        let entries = std::mem::take(&mut self.entries);
        self.reset();
        for entry in entries {
            self.pick(entry.color, entry.threshold);
        }
        Ok(())
    }

    /// Combine every current mask, in entry order
    pub fn current_segmentation(&self) -> Result<SegmentationMask> {
        combine_masks(self.working_image.dimensions(), &self.masks)
    }

    /// False-color rendering of the current segmentation
    pub fn render(&self) -> Result<RgbImage> {
        Ok(render_segmentation(&self.current_segmentation()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color_space::ColorSpace;
    use image::Rgb;

    const RED: Color = [200, 30, 30];
    const BLUE: Color = [20, 40, 220];

    fn euclidean() -> DistanceMetric {
        DistanceMetric::Euclidean { channels: vec![0, 1, 2] }
    }

    /// Left half red, right half blue
    fn split_image() -> ColorImage {
        let pixels = RgbImage::from_fn(6, 4, |x, _| Rgb(if x < 3 { RED } else { BLUE }));
        ColorImage::new(pixels, ColorSpace::Rgb)
    }

    #[test]
    fn test_pick_assigns_sequential_indices() {
        let mut session = SegmentationSession::new(split_image(), euclidean());
        assert!(session.is_empty());
        assert_eq!(session.pick(RED, 10.0), 0);
        assert_eq!(session.pick(BLUE, 10.0), 1);
        assert_eq!(session.len(), 2);
        assert_eq!(session.entries()[1], Entry { index: 1, color: BLUE, threshold: 10.0 });
    }

    #[test]
    fn test_pick_selects_matching_half() {
        let mut session = SegmentationSession::new(split_image(), euclidean());
        session.pick(RED, 10.0);
        assert_eq!(count_selected(session.mask(0).unwrap()), 12);

        session.update_threshold(0, 0.0).unwrap();
        assert_eq!(count_selected(session.mask(0).unwrap()), 0);
    }

    #[test]
    fn test_update_threshold_out_of_range() {
        let mut session = SegmentationSession::new(split_image(), euclidean());
        session.pick(RED, 10.0);
        assert!(matches!(
            session.update_threshold(1, 5.0),
            Err(ColorSegmentError::IndexOutOfRange { index: 1, len: 1 })
        ));
    }

    #[test]
    fn test_update_threshold_reuses_cached_field() {
        let mut session = SegmentationSession::new(split_image(), euclidean());
        session.pick(RED, 1.0);
        let cached = session.distance_field(0).unwrap().clone();

        // Repaint the whole working image; a recomputed field would now select everything
        for pixel in session.working_image.pixels_mut().pixels_mut() {
            *pixel = Rgb(RED);
        }

        session.update_threshold(0, 1.0).unwrap();
        assert_eq!(session.distance_fields.len(), 1);
        assert_eq!(session.distance_field(0).unwrap(), &cached);
        assert_eq!(session.mask(0).unwrap(), &threshold_color_distance(&cached, 1.0));
        assert_eq!(session.entries()[0].threshold, 1.0);

        let selected = session.mask(0).unwrap().pixels().filter(|p| p[0] == 1).count();
        assert_eq!(selected, 12);
    }

    #[test]
    fn test_update_color_recomputes_field() {
        let mut session = SegmentationSession::new(split_image(), euclidean());
        session.pick(RED, 1.0);
        session.update_color(0, BLUE, 1.0).unwrap();

        let mask = session.mask(0).unwrap();
        assert_eq!(mask.get_pixel(0, 0)[0], 0);
        assert_eq!(mask.get_pixel(5, 0)[0], 1);
        assert_eq!(session.entries()[0].color, BLUE);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut session = SegmentationSession::new(split_image(), euclidean());
        session.pick(RED, 1.0);
        session.pick(BLUE, 1.0);
        session.reset();

        assert!(session.is_empty());
        assert!(session.distance_field(0).is_none());
        assert!(session.mask(0).is_none());
        assert!(session.current_segmentation().unwrap().pixels().all(|p| p[0] == 0));
        assert_eq!(session.pick(BLUE, 1.0), 0);
    }

    #[test]
    fn test_segmentation_reflects_latest_threshold() {
        let mut session = SegmentationSession::new(split_image(), euclidean());
        session.pick(RED, 1.0);
        assert_eq!(session.current_segmentation().unwrap().get_pixel(0, 0)[0], 1);

        session.update_threshold(0, 0.0).unwrap();
        assert!(session.current_segmentation().unwrap().pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_set_working_image_replays_entries() {
        let mut session = SegmentationSession::new(split_image(), euclidean());
        session.pick(RED, 1.0);
        session.pick(BLUE, 1.0);

        let all_blue = ColorImage::from_color(6, 4, BLUE, ColorSpace::Rgb);
        session.set_working_image(all_blue).unwrap();

        assert_eq!(session.len(), 2);
        assert_eq!(session.entries()[1].index, 1);
        let segmentation = session.current_segmentation().unwrap();
        assert!(segmentation.pixels().all(|p| p[0] == 2));
    }

    #[test]
    fn test_set_working_image_failure_keeps_state() {
        let hsv = ColorImage::from_color(6, 4, [0, 0, 0], ColorSpace::Hsv);
        let mut session = SegmentationSession::new(hsv.clone(), euclidean());
        session.pick([0, 0, 0], 1.0);

        let lab = ColorImage::from_color(2, 2, [0, 128, 128], ColorSpace::Lab);
        assert!(matches!(
            session.set_working_image(lab),
            Err(ColorSegmentError::UnsupportedConversion { .. })
        ));
        assert_eq!(session.working_image(), &hsv);
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn test_color_at_bounds() {
        let session = SegmentationSession::new(split_image(), euclidean());
        assert_eq!(session.color_at(5, 3).unwrap(), BLUE);
        assert!(matches!(
            session.color_at(6, 0),
            Err(ColorSegmentError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_denoise_applies_to_derived_masks() {
        let mut pixels = RgbImage::from_pixel(9, 9, Rgb(BLUE));
        pixels.put_pixel(4, 4, Rgb(RED));
        let image = ColorImage::new(pixels, ColorSpace::Rgb);

        let mut session = SegmentationSession::new(image, euclidean())
            .with_denoise(DenoiseOptions { kernel_size: 3, iterations: 1 });
        session.pick(RED, 1.0);
        assert!(session.mask(0).unwrap().pixels().all(|p| p[0] == 0));
    }
}
