// Contour extraction and region filling for binary masks

use image::GrayImage;
use imageproc::contours::BorderType;

use crate::image_impl::Rect;

#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    pub points: Vec<(i32, i32)>,
}

impl Contour {
    pub fn new(points: Vec<(i32, i32)>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Polygon area by the shoelace formula (same as OpenCV's contourArea).
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    fn signed_area(&self) -> f64 {
        if self.points.len() < 3 {
            return 0.0;
        }

        let n = self.points.len();
        let mut area = 0.0f64;
        for i in 0..n {
            let j = (i + 1) % n;
            let (x1, y1) = self.points[i];
            let (x2, y2) = self.points[j];
            area += (x1 as f64 * y2 as f64) - (x2 as f64 * y1 as f64);
        }

        area * 0.5
    }

    /// Centroid from the polygon's first-order moments.
    ///
    /// Degenerate (zero-area) contours fall back to the mean of their points.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.points.is_empty() {
            return None;
        }

        let m00 = self.signed_area();
        if m00.abs() > f64::EPSILON {
            let n = self.points.len();
            let (mut m10, mut m01) = (0.0f64, 0.0f64);
            for i in 0..n {
                let (x1, y1) = self.points[i];
                let (x2, y2) = self.points[(i + 1) % n];
                let (x1, y1, x2, y2) = (x1 as f64, y1 as f64, x2 as f64, y2 as f64);
                let cross = x1 * y2 - x2 * y1;
                m10 += (x1 + x2) * cross;
                m01 += (y1 + y2) * cross;
            }
            return Some((m10 / (6.0 * m00), m01 / (6.0 * m00)));
        }

        let n = self.points.len() as f64;
        let sx: f64 = self.points.iter().map(|p| p.0 as f64).sum();
        let sy: f64 = self.points.iter().map(|p| p.1 as f64).sum();
        Some((sx / n, sy / n))
    }

    pub fn bounding_rect(&self) -> Option<Rect> {
        Rect::from_points(self.points.iter().copied())
    }
}

/// Outermost borders of the non-zero regions of a binary mask
/// (OpenCV's findContours with RETR_EXTERNAL).
pub fn find_external_contours(binary_img: &GrayImage) -> Vec<Contour> {
    imageproc::contours::find_contours::<i32>(binary_img)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| Contour::new(c.points.iter().map(|p| (p.x, p.y)).collect()))
        .collect()
}

/// Flood fill from `seed` over 4-connected pixels holding the seed's value.
///
/// Returns the number of pixels set to `new_value`.
pub fn flood_fill(img: &mut GrayImage, seed: (u32, u32), new_value: u8) -> usize {
    let (width, height) = img.dimensions();
    if seed.0 >= width || seed.1 >= height {
        return 0;
    }

    let target = img.get_pixel(seed.0, seed.1)[0];
    if target == new_value {
        return 0;
    }

    let mut filled = 0;
    let mut stack = vec![(seed.0 as i64, seed.1 as i64)];

    while let Some((x, y)) = stack.pop() {
        if x < 0 || x >= width as i64 || y < 0 || y >= height as i64 {
            continue;
        }

        let pixel = img.get_pixel_mut(x as u32, y as u32);
        if pixel[0] != target {
            continue;
        }

        pixel[0] = new_value;
        filled += 1;

        // 4-connected neighbors
        stack.push((x + 1, y));
        stack.push((x - 1, y));
        stack.push((x, y + 1));
        stack.push((x, y - 1));
    }

    filled
}
