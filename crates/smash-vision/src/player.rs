use crate::digit_reader::{combine_digits, DigitReader, DigitTemplates};
use crate::geometry::Point;
use crate::layout::{DigitPlace, PlayerLayout};
use crate::preprocess::{binarize, crop, crop_padded};
use crate::preview::{NoopPreview, PreviewSink};
use anyhow::{bail, Result};
use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};
use smash_data::HudLayout;
use std::sync::Arc;
use tracing::debug;

/// What was read for one player on the most recent analyzed frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub percent: Option<u32>,
}

/// Tracks one player's HUD box across frames.
pub struct Player {
    layout: PlayerLayout,
    threshold: u8,
    reader: DigitReader,
    frame: GrayImage,
    stats: PlayerStats,
    preview: Arc<dyn PreviewSink>,
}

impl Player {
    /// Place a player around the percent glyph at `percent_point` and take
    /// `base_frame` as its first working frame.
    ///
    /// Fails if the digit templates were made for a different resolution.
    pub fn new(
        base_frame: &RgbImage,
        percent_point: Point,
        hud: &HudLayout,
        templates: Arc<DigitTemplates>,
    ) -> Result<Self> {
        let height = base_frame.height();
        if templates.height() != height {
            bail!(
                "No digit templates for {}p video (loaded set is {}p)",
                height,
                templates.height()
            );
        }

        let layout = PlayerLayout::compute(hud, height, percent_point);
        debug!(
            "Player at {:?}: HUD box {:?}..{:?} (scale {:.3})",
            percent_point, layout.basepoint, layout.endpoint, layout.scale
        );

        let mut player = Self {
            layout,
            threshold: hud.threshold,
            reader: DigitReader::new(templates, hud.digit_cutoff),
            frame: GrayImage::new(0, 0),
            stats: PlayerStats::default(),
            preview: Arc::new(NoopPreview),
        };
        player.update_frame(base_frame);
        Ok(player)
    }

    pub fn with_preview(mut self, preview: Arc<dyn PreviewSink>) -> Self {
        self.preview = preview;
        self
    }

    pub fn layout(&self) -> &PlayerLayout {
        &self.layout
    }

    /// Current binarized HUD box.
    pub fn frame(&self) -> &GrayImage {
        &self.frame
    }

    pub fn stats(&self) -> PlayerStats {
        self.stats
    }

    /// Replace the working frame with this player's HUD box cut from `frame`.
    ///
    /// The working frame always spans the whole box, blank where the box
    /// leaves the frame, so digit offsets stay relative to `basepoint`.
    pub fn update_frame(&mut self, frame: &RgbImage) {
        let hud = crop_padded(frame, self.layout.basepoint, self.layout.endpoint);
        self.frame = binarize(&hud, self.threshold);
    }

    /// Read the working frame and store the result as the current stats.
    pub fn analyze(&mut self) {
        self.stats = PlayerStats {
            percent: self.percent(),
        };
    }

    /// Damage percent shown in the working frame, if the ones digit is legible.
    pub fn percent(&self) -> Option<u32> {
        let ones = self.read_place(DigitPlace::Ones);
        let tens = self.read_place(DigitPlace::Tens);
        let hundreds = self.read_place(DigitPlace::Hundreds);
        combine_digits(ones, tens, hundreds)
    }

    /// Binary crop of one digit box.
    pub fn digit_frame(&self, place: DigitPlace) -> GrayImage {
        let (start, end) = self.layout.digit_box(place);
        crop(&self.frame, start, end)
    }

    fn read_place(&self, place: DigitPlace) -> Option<u8> {
        let digit = self.digit_frame(place);
        self.preview.show_digit(place.label(), &digit);
        self.reader.read_digit(&digit)
    }
}
