//! Raster primitives on top of `image` and `imageproc`.
//!
//! Binary masks are `GrayImage`s holding 0 or 255. Kernel anchors and color
//! conversions follow OpenCV conventions so thresholds tuned on OpenCV keep
//! their meaning.

use std::path::Path;

use image::{GrayImage, ImageBuffer, Luma, Pixel, Rgb, RgbImage};
use imageproc::morphology::{self, Mask};
use serde::{Deserialize, Serialize};

use crate::error::{CoreBoxError, Result};

pub const FOREGROUND: u8 = 255;
pub const BACKGROUND: u8 = 0;

/// Axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Smallest rectangle containing every point. `None` for no points.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (i32, i32)>,
    {
        let mut iter = points.into_iter();
        let (x0, y0) = iter.next()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (x0, y0, x0, y0);
        for (x, y) in iter {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        let min_x = min_x.max(0);
        let min_y = min_y.max(0);
        if max_x < min_x || max_y < min_y {
            return None;
        }

        Some(Self::new(
            min_x as u32,
            min_y as u32,
            (max_x - min_x + 1) as u32,
            (max_y - min_y + 1) as u32,
        ))
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Grows the rectangle by `ratio` of its own width/height on every side,
    /// clamped to a `width` x `height` image.
    pub fn expand(&self, ratio: f64, width: u32, height: u32) -> Self {
        let dx = (self.width as f64 * ratio).round() as i64;
        let dy = (self.height as f64 * ratio).round() as i64;

        let x0 = (self.x as i64 - dx).max(0);
        let y0 = (self.y as i64 - dy).max(0);
        let x1 = (self.right() as i64 + dx).min(width as i64);
        let y1 = (self.bottom() as i64 + dy).min(height as i64);

        Self::new(
            x0 as u32,
            y0 as u32,
            (x1 - x0).max(0) as u32,
            (y1 - y0).max(0) as u32,
        )
    }
}

pub fn imread<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
    Ok(image::open(path)?.to_rgb8())
}

/// Copies `rect` out of an RGB photo or a gray mask alike.
pub fn crop<P>(
    img: &ImageBuffer<P, Vec<P::Subpixel>>,
    rect: Rect,
) -> Result<ImageBuffer<P, Vec<P::Subpixel>>>
where
    P: Pixel + 'static,
{
    let (w, h) = img.dimensions();
    if rect.is_empty() || rect.right() > w || rect.bottom() > h {
        return Err(CoreBoxError::ImageProcessing(format!(
            "crop {:?} outside of {}x{} image",
            rect, w, h
        )));
    }
    Ok(image::imageops::crop_imm(img, rect.x, rect.y, rect.width, rect.height).to_image())
}

/// BT.601 luma, the weights OpenCV uses for RGB -> GRAY.
fn luma(p: &Rgb<u8>) -> u8 {
    let y = 0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32;
    y.round().clamp(0.0, 255.0) as u8
}

pub fn to_gray(img: &RgbImage) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        Luma([luma(img.get_pixel(x, y))])
    })
}

pub fn bitwise_and(a: &GrayImage, b: &GrayImage) -> GrayImage {
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        Luma([a.get_pixel(x, y)[0] & b.get_pixel(x, y)[0]])
    })
}

/// 8-bit HSV with H in 0..180, as produced by OpenCV.
pub fn rgb_to_hsv(p: &Rgb<u8>) -> [u8; 3] {
    let (r, g, b) = (p[0] as f32, p[1] as f32, p[2] as f32);
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = v - min;

    let s = if v > 0.0 { diff * 255.0 / v } else { 0.0 };
    let h = if diff == 0.0 {
        0.0
    } else if v == r {
        60.0 * (g - b) / diff
    } else if v == g {
        120.0 + 60.0 * (b - r) / diff
    } else {
        240.0 + 60.0 * (r - g) / diff
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    [
        (h / 2.0).round().min(180.0) as u8,
        s.round().min(255.0) as u8,
        v as u8,
    ]
}

/// 255 where every HSV channel lies inside `[low, high]`.
pub fn in_range_hsv(img: &RgbImage, low: [u8; 3], high: [u8; 3]) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let hsv = rgb_to_hsv(img.get_pixel(x, y));
        let inside = (0..3).all(|c| hsv[c] >= low[c] && hsv[c] <= high[c]);
        Luma([if inside { FOREGROUND } else { BACKGROUND }])
    })
}

pub fn rgb_to_yuv(p: &Rgb<u8>) -> [f32; 3] {
    let (r, g, b) = (p[0] as f32, p[1] as f32, p[2] as f32);
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let u = (b - y) * 0.492 + 128.0;
    let v = (r - y) * 0.877 + 128.0;
    [y, u, v]
}

pub fn yuv_to_rgb(y: f32, u: f32, v: f32) -> Rgb<u8> {
    let r = y + 1.140 * (v - 128.0);
    let g = y - 0.395 * (u - 128.0) - 0.581 * (v - 128.0);
    let b = y + 2.032 * (u - 128.0);
    Rgb([
        r.round().clamp(0.0, 255.0) as u8,
        g.round().clamp(0.0, 255.0) as u8,
        b.round().clamp(0.0, 255.0) as u8,
    ])
}

/// Histogram-equalizes the luminance channel only, leaving chroma untouched.
pub fn equalize_luminance(img: &RgbImage) -> RgbImage {
    let (w, h) = img.dimensions();
    let yuv: Vec<[f32; 3]> = img.pixels().map(rgb_to_yuv).collect();

    let y_plane = GrayImage::from_fn(w, h, |x, y| {
        let luma = yuv[(y * w + x) as usize][0];
        Luma([luma.round().clamp(0.0, 255.0) as u8])
    });
    let equalized = imageproc::contrast::equalize_histogram(&y_plane);

    RgbImage::from_fn(w, h, |x, y| {
        let [_, u, v] = yuv[(y * w + x) as usize];
        yuv_to_rgb(equalized.get_pixel(x, y)[0] as f32, u, v)
    })
}

/// Widest kernel `Mask::from_image` accepts.
const MAX_KERNEL: u32 = 511;

/// `k` x `k` rectangle anchored at `(k / 2, k / 2)` like OpenCV's default,
/// so even kernels shift the result by one pixel towards the bottom right.
fn rect_kernel(k: u32) -> Mask {
    let k = k.min(MAX_KERNEL);
    let anchor = (k / 2) as u8;
    Mask::from_image(&GrayImage::from_pixel(k, k, Luma([FOREGROUND])), anchor, anchor)
}

pub fn erode(img: &GrayImage, k: u32) -> GrayImage {
    if k <= 1 {
        return img.clone();
    }
    morphology::grayscale_erode(img, &rect_kernel(k))
}

pub fn dilate(img: &GrayImage, k: u32) -> GrayImage {
    if k <= 1 {
        return img.clone();
    }
    morphology::grayscale_dilate(img, &rect_kernel(k))
}

/// Erosion followed by dilation with a `k` x `k` kernel.
pub fn open(img: &GrayImage, k: u32) -> GrayImage {
    if k <= 1 {
        return img.clone();
    }
    morphology::grayscale_open(img, &rect_kernel(k))
}

/// Dilation followed by erosion with a `k` x `k` kernel.
pub fn close(img: &GrayImage, k: u32) -> GrayImage {
    if k <= 1 {
        return img.clone();
    }
    morphology::grayscale_close(img, &rect_kernel(k))
}

/// Bounding rectangle of all non-zero pixels.
pub fn mask_bounding_rect(mask: &GrayImage) -> Option<Rect> {
    Rect::from_points(
        mask.enumerate_pixels()
            .filter(|(_, _, p)| p[0] != BACKGROUND)
            .map(|(x, y, _)| (x as i32, y as i32)),
    )
}

/// Overwrites every pixel whose mask value is zero with `color`.
pub fn fill_background(img: &mut RgbImage, mask: &GrayImage, color: [u8; 3]) {
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        if mask.get_pixel(x, y)[0] == BACKGROUND {
            *pixel = Rgb(color);
        }
    }
}
