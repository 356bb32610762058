use anyhow::{bail, Context, Result};
use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// HUD geometry for one game title, expressed at the reference resolution.
///
/// Every offset and size is multiplied by `frame_height / reference_height`
/// before use, so a single layout serves every video resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HudLayout {
    /// Frame height the constants below were measured at
    pub reference_height: f64,
    /// Size of one player's HUD box
    pub size: (i32, i32),
    /// Position of the percent glyph relative to the HUD box top-left
    pub percent_offset: (i32, i32),
    /// Size of a single damage digit box
    pub digit_size: (i32, i32),
    /// Position of the ones digit relative to the HUD box top-left
    pub ones_offset: (i32, i32),
    /// Pixels (at reference scale) trimmed from the digit pitch
    pub pitch_trim: f64,
    /// Luminance cutoff used to binarize the HUD box
    pub threshold: u8,
    /// Minimum correlation for a digit template position to count
    pub digit_cutoff: f32,
}

impl Default for HudLayout {
    /// Super Smash Bros. Ultimate, measured at 1080p.
    fn default() -> Self {
        Self {
            reference_height: 1080.0,
            size: (325, 195),
            percent_offset: (290, 100),
            digit_size: (70, 80),
            ones_offset: (213, 47),
            pitch_trim: 5.0,
            threshold: 40,
            digit_cutoff: 0.7,
        }
    }
}

impl HudLayout {
    /// Scale factor mapping reference-resolution constants onto a frame of `height` pixels.
    pub fn scale_for(&self, height: u32) -> f64 {
        height as f64 / self.reference_height
    }
}

/// Identifier of a reference image in a template repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Glyph {
    Percent,
    Digit(u8),
}

impl Glyph {
    /// The ten digit glyphs in index order.
    pub fn digits() -> impl Iterator<Item = Glyph> {
        (0..10).map(Glyph::Digit)
    }

    /// File stem used for this glyph on disk.
    pub fn file_stem(&self) -> String {
        match self {
            Glyph::Percent => "percent".to_string(),
            Glyph::Digit(d) => d.to_string(),
        }
    }
}

impl fmt::Display for Glyph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.file_stem())
    }
}

/// Source of pre-decoded single-channel reference images, keyed by video height.
///
/// Lookups are exact: there is no scaling between resolutions, so a missing
/// resolution is an error.
pub trait TemplateRepository {
    fn template(&self, height: u32, glyph: Glyph) -> Result<GrayImage>;
}

/// Templates stored on disk as `<root>/<game>/<height>/<glyph>.png`.
#[derive(Debug, Clone)]
pub struct TemplateDir {
    dir: PathBuf,
}

impl TemplateDir {
    pub const DEFAULT_GAME: &'static str = "ultimate";

    pub fn new(root: &Path, game: &str) -> Self {
        Self {
            dir: root.join(game),
        }
    }

    pub fn path_for(&self, height: u32, glyph: Glyph) -> PathBuf {
        self.dir
            .join(height.to_string())
            .join(format!("{}.png", glyph.file_stem()))
    }

    /// Heights for which a template directory exists, ascending.
    pub fn available_heights(&self) -> Vec<u32> {
        let mut heights: Vec<u32> = std::fs::read_dir(&self.dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.path().is_dir())
                    .filter_map(|e| e.file_name().to_str()?.parse().ok())
                    .collect()
            })
            .unwrap_or_default();
        heights.sort_unstable();
        heights
    }
}

impl TemplateRepository for TemplateDir {
    fn template(&self, height: u32, glyph: Glyph) -> Result<GrayImage> {
        let path = self.path_for(height, glyph);
        if !path.exists() {
            bail!(
                "No {} template for {}p video (expected {})",
                glyph,
                height,
                path.display()
            );
        }
        let img = image::open(&path)
            .with_context(|| format!("Failed to open template {}", path.display()))?;
        tracing::debug!("Loaded {} template from {}", glyph, path.display());
        Ok(img.to_luma8())
    }
}

/// In-memory template repository, for templates decoded ahead of time.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    templates: HashMap<(u32, Glyph), GrayImage>,
}

impl TemplateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, height: u32, glyph: Glyph, image: GrayImage) {
        self.templates.insert((height, glyph), image);
    }

    pub fn with(mut self, height: u32, glyph: Glyph, image: GrayImage) -> Self {
        self.insert(height, glyph, image);
        self
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl TemplateRepository for TemplateSet {
    fn template(&self, height: u32, glyph: Glyph) -> Result<GrayImage> {
        match self.templates.get(&(height, glyph)) {
            Some(img) => Ok(img.clone()),
            None => bail!("No {} template for {}p video", glyph, height),
        }
    }
}
