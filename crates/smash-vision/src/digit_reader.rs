use crate::matching::match_template;
use anyhow::{bail, Context, Result};
use image::GrayImage;
use smash_data::{Glyph, TemplateRepository};
use std::sync::Arc;
use tracing::debug;

/// Default minimum correlation for a template position to count as a hit.
pub const DEFAULT_DIGIT_CUTOFF: f32 = 0.7;

/// The ten binary digit templates for one video resolution, indexed 0-9.
#[derive(Debug, Clone)]
pub struct DigitTemplates {
    height: u32,
    digits: Vec<GrayImage>,
}

impl DigitTemplates {
    /// Look up all ten digits for `height`. Any missing digit fails the load.
    pub fn load<R: TemplateRepository + ?Sized>(repo: &R, height: u32) -> Result<Self> {
        let digits = Glyph::digits()
            .map(|glyph| {
                repo.template(height, glyph)
                    .with_context(|| format!("Digit templates unavailable for {}p", height))
            })
            .collect::<Result<Vec<_>>>()?;
        debug!("Loaded digit templates for {}p", height);
        Self::from_images(height, digits)
    }

    pub fn from_images(height: u32, digits: Vec<GrayImage>) -> Result<Self> {
        if digits.len() != 10 {
            bail!("Expected 10 digit templates, got {}", digits.len());
        }
        Ok(Self { height, digits })
    }

    /// Video height these templates were made for.
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, digit: u8) -> &GrayImage {
        &self.digits[digit as usize]
    }
}

/// Classifies binary digit crops by template correlation.
#[derive(Debug, Clone)]
pub struct DigitReader {
    templates: Arc<DigitTemplates>,
    cutoff: f32,
}

impl DigitReader {
    pub fn new(templates: Arc<DigitTemplates>, cutoff: f32) -> Self {
        Self { templates, cutoff }
    }

    pub fn templates(&self) -> &Arc<DigitTemplates> {
        &self.templates
    }

    /// For each digit, the number of positions where its template correlates
    /// with `region` at or above the cutoff.
    pub fn match_counts(&self, region: &GrayImage) -> [usize; 10] {
        let mut counts = [0usize; 10];
        for (digit, count) in counts.iter_mut().enumerate() {
            *count = match_template(region, self.templates.get(digit as u8))
                .count_at_least(self.cutoff);
        }
        counts
    }

    /// Most likely digit in `region`, or `None` when no template matches.
    pub fn read_digit(&self, region: &GrayImage) -> Option<u8> {
        best_digit(&self.match_counts(region))
    }
}

/// Digit with the most hits; ties go to the lowest digit. `None` if nothing hit.
pub fn best_digit(counts: &[usize; 10]) -> Option<u8> {
    let mut best: Option<(u8, usize)> = None;
    for (digit, &count) in counts.iter().enumerate() {
        if count > best.map_or(0, |(_, c)| c) {
            best = Some((digit as u8, count));
        }
    }
    best.map(|(digit, _)| digit)
}

/// Assemble a damage percent from its digits.
///
/// Without a ones digit there is no reading. Tens are only added on top of a
/// ones digit, and hundreds only on top of tens.
pub fn combine_digits(ones: Option<u8>, tens: Option<u8>, hundreds: Option<u8>) -> Option<u32> {
    let ones = ones? as u32;
    let Some(tens) = tens else {
        return Some(ones);
    };
    let value = tens as u32 * 10 + ones;
    match hundreds {
        Some(hundreds) => Some(hundreds as u32 * 100 + value),
        None => Some(value),
    }
}
