use crate::geometry::Point;
use image::GrayImage;

/// Below this the window (or template) is treated as having no variance.
const MIN_VARIANCE: f64 = 1e-6;

/// Correlation scores for every position a template fits inside an image.
///
/// Position `(x, y)` scores the template with its top-left corner at `(x, y)`.
#[derive(Debug, Clone)]
pub struct CorrelationMap {
    width: u32,
    height: u32,
    scores: Vec<f32>,
}

impl CorrelationMap {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.scores[(y * self.width + x) as usize]
    }

    /// Highest score anywhere in the map, if the map is non-empty.
    pub fn max(&self) -> Option<f32> {
        self.scores.iter().copied().reduce(f32::max)
    }

    /// Number of positions scoring at least `cutoff`.
    pub fn count_at_least(&self, cutoff: f32) -> usize {
        self.scores.iter().filter(|&&s| s >= cutoff).count()
    }

    /// Positions scoring at least `cutoff`, in row-major order.
    pub fn positions_at_least(&self, cutoff: f32) -> Vec<Point> {
        self.scores
            .iter()
            .enumerate()
            .filter(|(_, &s)| s >= cutoff)
            .map(|(i, _)| {
                let i = i as u32;
                Point::new((i % self.width) as i32, (i / self.width) as i32)
            })
            .collect()
    }
}

/// Summed-area table with one row/column of zero padding.
struct Integral {
    stride: usize,
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
}

impl Integral {
    fn new(img: &GrayImage) -> Self {
        let (w, h) = (img.width() as usize, img.height() as usize);
        let stride = w + 1;
        let mut sum = vec![0.0; stride * (h + 1)];
        let mut sum_sq = vec![0.0; stride * (h + 1)];
        for y in 0..h {
            let mut row = 0.0;
            let mut row_sq = 0.0;
            for x in 0..w {
                let v = img.get_pixel(x as u32, y as u32)[0] as f64;
                row += v;
                row_sq += v * v;
                let i = (y + 1) * stride + x + 1;
                sum[i] = sum[i - stride] + row;
                sum_sq[i] = sum_sq[i - stride] + row_sq;
            }
        }
        Self {
            stride,
            sum,
            sum_sq,
        }
    }

    /// Sum and sum of squares over the `w` x `h` window at `(x, y)`.
    fn window(&self, x: usize, y: usize, w: usize, h: usize) -> (f64, f64) {
        let s = self.stride;
        let (a, b) = (y * s + x, y * s + x + w);
        let (c, d) = ((y + h) * s + x, (y + h) * s + x + w);
        (
            self.sum[d] - self.sum[b] - self.sum[c] + self.sum[a],
            self.sum_sq[d] - self.sum_sq[b] - self.sum_sq[c] + self.sum_sq[a],
        )
    }
}

/// Slide `template` over `image` and score each position with the zero-mean
/// normalized cross-correlation coefficient, in `[-1, 1]`.
///
/// Windows or templates without variance score 0. A template larger than the
/// image yields an empty map.
pub fn match_template(image: &GrayImage, template: &GrayImage) -> CorrelationMap {
    let (iw, ih) = image.dimensions();
    let (tw, th) = template.dimensions();
    if tw == 0 || th == 0 || tw > iw || th > ih {
        return CorrelationMap {
            width: 0,
            height: 0,
            scores: Vec::new(),
        };
    }

    let n = (tw * th) as f64;
    let tmpl_mean = template.pixels().map(|p| p[0] as f64).sum::<f64>() / n;
    // Only template pixels that differ from the mean contribute to the cross term
    let centered: Vec<(usize, usize, f64)> = template
        .enumerate_pixels()
        .map(|(x, y, p)| (x as usize, y as usize, p[0] as f64 - tmpl_mean))
        .filter(|&(_, _, v)| v != 0.0)
        .collect();
    let tmpl_norm: f64 = centered.iter().map(|&(_, _, v)| v * v).sum();

    let (mw, mh) = (iw - tw + 1, ih - th + 1);
    let mut scores = vec![0.0f32; (mw * mh) as usize];
    if tmpl_norm < MIN_VARIANCE {
        return CorrelationMap {
            width: mw,
            height: mh,
            scores,
        };
    }

    let integral = Integral::new(image);
    let raw = image.as_raw();
    let row_len = iw as usize;

    for y in 0..mh as usize {
        for x in 0..mw as usize {
            let (sum, sum_sq) = integral.window(x, y, tw as usize, th as usize);
            let window_var = sum_sq - sum * sum / n;
            if window_var < MIN_VARIANCE {
                continue;
            }

            let cross: f64 = centered
                .iter()
                .map(|&(tx, ty, tv)| raw[(y + ty) * row_len + x + tx] as f64 * tv)
                .sum();

            let score = cross / (window_var * tmpl_norm).sqrt();
            scores[y * mw as usize + x] = score.clamp(-1.0, 1.0) as f32;
        }
    }

    CorrelationMap {
        width: mw,
        height: mh,
        scores,
    }
}
