use crate::geometry::Point;
use image::{GrayImage, ImageBuffer, Pixel, RgbImage};

/// Convert to single-channel intensity and binarize: pixels brighter than
/// `threshold` become 255, everything else 0.
pub fn binarize(image: &RgbImage, threshold: u8) -> GrayImage {
    let gray = image::imageops::grayscale(image);
    threshold_gray(&gray, threshold)
}

pub fn threshold_gray(gray: &GrayImage, threshold: u8) -> GrayImage {
    let (w, h) = gray.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        if gray.get_pixel(x, y)[0] > threshold {
            image::Luma([255u8])
        } else {
            image::Luma([0u8])
        }
    })
}

/// Copy the region between `start` (inclusive) and `end` (exclusive).
///
/// Corners are clamped to the image, so a box hanging over an edge yields the
/// part that lies inside, and an inverted box yields an empty image.
pub fn crop<P>(
    image: &ImageBuffer<P, Vec<P::Subpixel>>,
    start: Point,
    end: Point,
) -> ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel + 'static,
    P::Subpixel: 'static,
{
    let (w, h) = image.dimensions();
    let x0 = start.x.clamp(0, w as i32) as u32;
    let y0 = start.y.clamp(0, h as i32) as u32;
    let x1 = end.x.clamp(0, w as i32) as u32;
    let y1 = end.y.clamp(0, h as i32) as u32;

    image::imageops::crop_imm(image, x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
        .to_image()
}

/// Copy the region between `start` and `end` into an image of exactly
/// `end - start` pixels, with `start` at its origin.
///
/// Parts of the box outside `image` are left at the zero pixel, so positions
/// measured from `start` stay valid near the frame edges.
pub fn crop_padded<P>(
    image: &ImageBuffer<P, Vec<P::Subpixel>>,
    start: Point,
    end: Point,
) -> ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel + 'static,
    P::Subpixel: 'static,
{
    let w = (end.x - start.x).max(0) as u32;
    let h = (end.y - start.y).max(0) as u32;
    let mut canvas = ImageBuffer::new(w, h);
    let inside = crop(image, start, end);
    if inside.width() > 0 && inside.height() > 0 {
        let dx = start.x.max(0) - start.x;
        let dy = start.y.max(0) - start.y;
        image::imageops::replace(&mut canvas, &inside, dx as i64, dy as i64);
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binarize_threshold_is_exclusive() {
        let img = RgbImage::from_fn(3, 1, |x, _| {
            let v = [40u8, 41, 200][x as usize];
            image::Rgb([v, v, v])
        });
        let bin = binarize(&img, 40);
        assert_eq!(bin.get_pixel(0, 0)[0], 0);
        assert_eq!(bin.get_pixel(1, 0)[0], 255);
        assert_eq!(bin.get_pixel(2, 0)[0], 255);
    }

    #[test]
    fn test_crop_inside() {
        let img = GrayImage::from_fn(20, 10, |x, y| image::Luma([(x + y * 20) as u8]));
        let cropped = crop(&img, Point::new(3, 2), Point::new(8, 6));
        assert_eq!(cropped.dimensions(), (5, 4));
        assert_eq!(cropped.get_pixel(0, 0)[0], 43);
    }

    #[test]
    fn test_crop_clamps() {
        let img = RgbImage::new(20, 10);
        let cropped = crop(&img, Point::new(-5, 7), Point::new(4, 30));
        assert_eq!(cropped.dimensions(), (4, 3));

        let empty = crop(&img, Point::new(10, 5), Point::new(2, 1));
        assert_eq!(empty.dimensions(), (0, 0));
    }

    #[test]
    fn test_crop_padded_keeps_origin() {
        let img = GrayImage::from_fn(20, 10, |x, y| image::Luma([(x + y * 20) as u8]));

        // Hangs 3 px off the left and 2 px off the top
        let padded = crop_padded(&img, Point::new(-3, -2), Point::new(5, 4));
        assert_eq!(padded.dimensions(), (8, 6));
        assert_eq!(padded.get_pixel(0, 0)[0], 0);
        assert_eq!(padded.get_pixel(2, 1)[0], 0);
        // Frame pixel (0, 0) lands at (3, 2), (4, 3) at (7, 5)
        assert_eq!(padded.get_pixel(3, 2)[0], 0);
        assert_eq!(padded.get_pixel(4, 2)[0], 1);
        assert_eq!(padded.get_pixel(7, 5)[0], 64);

        // Fully inside matches a plain crop
        let inner = crop_padded(&img, Point::new(3, 2), Point::new(8, 6));
        assert_eq!(inner, crop(&img, Point::new(3, 2), Point::new(8, 6)));

        // Off the right edge keeps the full size
        let right = crop_padded(&img, Point::new(17, 0), Point::new(23, 2));
        assert_eq!(right.dimensions(), (6, 2));
        assert_eq!(right.get_pixel(2, 1)[0], 39);
        assert_eq!(right.get_pixel(3, 1)[0], 0);

        assert_eq!(crop_padded(&img, Point::new(5, 5), Point::new(1, 1)).dimensions(), (0, 0));
    }
}
