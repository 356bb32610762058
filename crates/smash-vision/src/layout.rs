use crate::geometry::{offset, scale_point, Point};
use serde::{Deserialize, Serialize};
use smash_data::HudLayout;

/// Which damage digit a box holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DigitPlace {
    Ones,
    Tens,
    Hundreds,
}

impl DigitPlace {
    pub fn label(&self) -> &'static str {
        match self {
            DigitPlace::Ones => "ones",
            DigitPlace::Tens => "tens",
            DigitPlace::Hundreds => "hundreds",
        }
    }
}

/// Pixel geometry of one player's HUD box, resolved for a concrete frame height.
///
/// `basepoint`/`endpoint` are frame coordinates. Digit offsets are relative to
/// `basepoint`, i.e. coordinates inside the cropped HUD box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerLayout {
    pub scale: f64,
    pub basepoint: Point,
    pub endpoint: Point,
    pub size: Point,
    pub percent_offset: Point,
    pub digit_size: Point,
    pub ones_offset: Point,
    pub tens_offset: Point,
    pub hundreds_offset: Point,
}

impl PlayerLayout {
    /// Resolve the HUD box around a percent glyph found at `percent_point`.
    pub fn compute(hud: &HudLayout, frame_height: u32, percent_point: Point) -> Self {
        let scale = hud.scale_for(frame_height);
        let percent = Point::from(hud.percent_offset);
        let basepoint = offset(percent_point, -percent, scale);
        let endpoint = offset(basepoint, Point::from(hud.size), scale);

        let ones = Point::from(hud.ones_offset);
        let pitch = digit_pitch(hud, scale);
        let tens = offset(ones, Point::new(-pitch, 0), 1.0);
        let hundreds = offset(ones, Point::new(-pitch * 2, 0), 1.0);

        Self {
            scale,
            basepoint,
            endpoint,
            size: scale_point(Point::from(hud.size), scale),
            percent_offset: scale_point(percent, scale),
            digit_size: scale_point(Point::from(hud.digit_size), scale),
            ones_offset: scale_point(ones, scale),
            tens_offset: scale_point(tens, scale),
            hundreds_offset: scale_point(hundreds, scale),
        }
    }

    pub fn digit_offset(&self, place: DigitPlace) -> Point {
        match place {
            DigitPlace::Ones => self.ones_offset,
            DigitPlace::Tens => self.tens_offset,
            DigitPlace::Hundreds => self.hundreds_offset,
        }
    }

    /// Start and end corner of a digit box, relative to the HUD box.
    pub fn digit_box(&self, place: DigitPlace) -> (Point, Point) {
        let start = self.digit_offset(place);
        (start, offset(start, self.digit_size, 1.0))
    }
}

/// Horizontal distance between neighbouring digits, in reference pixels.
///
/// Nine tenths of the digit width (integer division) less the pitch trim,
/// where the trim is scaled and truncated to whole pixels.
pub fn digit_pitch(hud: &HudLayout, scale: f64) -> i32 {
    (hud.digit_size.0 * 9) / 10 - (hud.pitch_trim * scale).trunc() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_1080p() {
        let layout = PlayerLayout::compute(&HudLayout::default(), 1080, Point::new(1000, 900));
        assert_eq!(layout.scale, 1.0);
        assert_eq!(layout.basepoint, Point::new(710, 800));
        assert_eq!(layout.endpoint, Point::new(1035, 995));
        assert_eq!(layout.ones_offset, Point::new(213, 47));
        assert_eq!(layout.tens_offset, Point::new(155, 47));
        assert_eq!(layout.hundreds_offset, Point::new(97, 47));
        assert_eq!(layout.digit_size, Point::new(70, 80));
        assert_eq!(
            layout.digit_box(DigitPlace::Ones),
            (Point::new(213, 47), Point::new(283, 127))
        );
    }

    #[test]
    fn test_layout_720p() {
        let layout = PlayerLayout::compute(&HudLayout::default(), 720, Point::new(600, 600));
        assert_eq!(layout.basepoint, Point::new(407, 533));
        assert_eq!(layout.endpoint, Point::new(624, 663));
        assert_eq!(layout.ones_offset, Point::new(142, 31));
        assert_eq!(layout.tens_offset, Point::new(102, 31));
        assert_eq!(layout.hundreds_offset, Point::new(62, 31));
        assert_eq!(layout.digit_size, Point::new(47, 53));
    }

    #[test]
    fn test_layout_216p() {
        let layout = PlayerLayout::compute(&HudLayout::default(), 216, Point::new(100, 162));
        assert_eq!(layout.basepoint, Point::new(42, 142));
        assert_eq!(layout.endpoint, Point::new(107, 181));
        assert_eq!(layout.ones_offset, Point::new(43, 9));
        assert_eq!(layout.tens_offset, Point::new(30, 9));
        assert_eq!(layout.hundreds_offset, Point::new(18, 9));
        assert_eq!(layout.digit_size, Point::new(14, 16));
    }

    #[test]
    fn test_digit_pitch_truncates_trim() {
        let hud = HudLayout::default();
        assert_eq!(digit_pitch(&hud, 1.0), 58);
        assert_eq!(digit_pitch(&hud, 720.0 / 1080.0), 60);
        // 5 * 1.333.. = 6.67 is truncated to 6
        assert_eq!(digit_pitch(&hud, 1440.0 / 1080.0), 57);
    }
}
