use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};
use imageproc::contrast::{threshold, ThresholdType};
use ndarray::Array4;

use crate::image_impl::{equalize_luminance, open, to_gray};
use crate::types::{OcrConfig, SegmenterConfig};

/// Binarizes depth labels into black text on a white page, which is what
/// Tesseract reads best.
pub struct OcrPreProcess {
    pub binarize_thresh: u8,
    pub open_kernel: u32,
    pub median_radius: u32,
}

impl OcrPreProcess {
    pub fn new(cfg: &OcrConfig) -> Self {
        Self {
            binarize_thresh: cfg.binarize_thresh,
            open_kernel: cfg.open_kernel,
            median_radius: cfg.median_radius,
        }
    }

    /// Broad pass: median blur, threshold, invert, open.
    pub fn run(&self, img: &RgbImage) -> GrayImage {
        let gray = to_gray(img);
        let blurred = if self.median_radius > 0 {
            imageproc::filter::median_filter(&gray, self.median_radius, self.median_radius)
        } else {
            gray
        };
        self.binarize_gray(&blurred)
    }

    /// Precise pass on a small crop: same binarization without the blur.
    pub fn run_unblurred(&self, img: &RgbImage) -> GrayImage {
        self.binarize_gray(&to_gray(img))
    }

    fn binarize_gray(&self, gray: &GrayImage) -> GrayImage {
        let mask = threshold(gray, self.binarize_thresh, ThresholdType::BinaryInverted);
        open(&mask, self.open_kernel)
    }
}

/// Prepares a core section for the background segmentation model.
pub struct SegPreProcess {
    /// Fixed model input `[width, height]`, native size when `None`.
    pub input_size: Option<[u32; 2]>,
}

impl SegPreProcess {
    pub fn new(cfg: &SegmenterConfig) -> Self {
        Self {
            input_size: cfg.input_size,
        }
    }

    /// Luminance equalization only; the model sees the colors unchanged.
    pub fn equalize(&self, img: &RgbImage) -> RgbImage {
        equalize_luminance(img)
    }

    /// NHWC tensor scaled to `[0, 1]`.
    pub fn run(&self, img: &RgbImage) -> Array4<f32> {
        let resized;
        let src = match self.input_size {
            Some([w, h]) if (w, h) != img.dimensions() && w > 0 && h > 0 => {
                resized = imageops::resize(img, w, h, FilterType::Triangle);
                &resized
            }
            _ => img,
        };

        let (w, h) = src.dimensions();
        let mut out = Array4::<f32>::zeros((1, h as usize, w as usize, 3));
        let scale = 1.0 / 255.0;

        for (x, y, pix) in src.enumerate_pixels() {
            for c in 0..3 {
                out[[0, y as usize, x as usize, c]] = pix[c] as f32 * scale;
            }
        }

        out
    }
}
