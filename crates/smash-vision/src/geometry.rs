use serde::{Deserialize, Serialize};
use std::ops::Neg;

/// Default radius within which glyph candidates are considered the same hit.
pub const DEFAULT_MIN_DISTANCE: f64 = 5.0;

/// Integer pixel coordinate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl Neg for Point {
    type Output = Point;

    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

/// Round to the nearest pixel, halves to even.
fn round_px(v: f64) -> i32 {
    v.round_ties_even() as i32
}

/// Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> f64 {
    let dx = (a.x - b.x) as f64;
    let dy = (a.y - b.y) as f64;
    (dx * dx + dy * dy).sqrt()
}

/// Displace `base` by `delta * scale`, rounding to whole pixels.
///
/// Also used to turn a region's start corner and size into its end corner.
pub fn offset(base: Point, delta: Point, scale: f64) -> Point {
    Point::new(
        round_px(base.x as f64 + delta.x as f64 * scale),
        round_px(base.y as f64 + delta.y as f64 * scale),
    )
}

pub fn scale_point(p: Point, scale: f64) -> Point {
    Point::new(round_px(p.x as f64 * scale), round_px(p.y as f64 * scale))
}

/// Collapse clusters of nearby points to one representative each.
///
/// Single greedy pass in input order: a point survives only if it is at least
/// `min_distance` away from every point kept before it. The first point seen
/// in a cluster is the one that survives.
pub fn deduplicate(points: &[Point], min_distance: f64) -> Vec<Point> {
    let mut kept: Vec<Point> = Vec::new();
    for &point in points {
        if kept.iter().all(|&k| distance(point, k) >= min_distance) {
            kept.push(point);
        }
    }
    kept
}
