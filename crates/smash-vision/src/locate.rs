use crate::geometry::{deduplicate, offset, Point, DEFAULT_MIN_DISTANCE};
use crate::matching::match_template;
use crate::preprocess::{binarize, crop};
use anyhow::{bail, Context, Result};
use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};
use smash_data::{Glyph, TemplateRepository};
use tracing::debug;

/// Tuning for percent-glyph search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Minimum correlation for a candidate position
    pub cutoff: f32,
    /// Luminance cutoff used to binarize the search band
    pub threshold: u8,
    /// Candidates closer than this to an earlier one are dropped
    pub min_distance: f64,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            cutoff: 0.6,
            threshold: 20,
            min_distance: DEFAULT_MIN_DISTANCE,
        }
    }
}

/// Finds the top-left corner of every percent glyph on screen.
///
/// Only the bottom quarter of the frame is searched; that is where the HUD
/// lives. The number of glyphs found is the number of players on screen.
#[derive(Debug, Clone)]
pub struct PercentLocator {
    height: u32,
    template: GrayImage,
    config: LocatorConfig,
}

impl PercentLocator {
    pub fn load<R: TemplateRepository + ?Sized>(
        repo: &R,
        height: u32,
        config: LocatorConfig,
    ) -> Result<Self> {
        let template = repo
            .template(height, Glyph::Percent)
            .with_context(|| format!("Percent template unavailable for {}p", height))?;
        Ok(Self::new(height, template, config))
    }

    pub fn new(height: u32, template: GrayImage, config: LocatorConfig) -> Self {
        Self {
            height,
            template,
            config,
        }
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Percent glyph positions in full-frame coordinates, in scan order
    /// (top to bottom, left to right).
    pub fn find_percents(&self, frame: &RgbImage) -> Result<Vec<Point>> {
        let (width, height) = frame.dimensions();
        if height != self.height {
            bail!(
                "Frame is {}p but the percent template is for {}p",
                height,
                self.height
            );
        }

        let band_top = (height * 3 / 4) as i32;
        let band = crop(
            frame,
            Point::new(0, band_top),
            Point::new(width as i32, height as i32),
        );
        let binary = binarize(&band, self.config.threshold);

        let hits = match_template(&binary, &self.template).positions_at_least(self.config.cutoff);
        let points: Vec<Point> = deduplicate(&hits, self.config.min_distance)
            .into_iter()
            .map(|p| offset(p, Point::new(0, band_top), 1.0))
            .collect();

        debug!(
            "Percent search: {} raw hit(s), {} glyph(s)",
            hits.len(),
            points.len()
        );
        Ok(points)
    }
}
