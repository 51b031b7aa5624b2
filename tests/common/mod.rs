#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use corebox::error::Result;
use corebox::ocr::RecognitionRequest;
use corebox::{BinarySegmenter, CoreBoxError, OcrToken, TextRecognizer};
use image::{GrayImage, Luma, Rgb, RgbImage};

pub const CORE_COLOR: [u8; 3] = [150, 100, 60];

fn fill(img: &mut RgbImage, x0: u32, y0: u32, w: u32, h: u32, color: [u8; 3]) {
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            img.put_pixel(x, y, Rgb(color));
        }
    }
}

/// 700x300 photo: three boxes of core side by side at x 100..400,
/// y 40..260, and a 200 px scale bar of 20 px white/gray ticks on the left.
pub fn synthetic_photo() -> RgbImage {
    let mut img = RgbImage::new(700, 300);
    fill(&mut img, 100, 40, 300, 220, CORE_COLOR);
    for tick in 0..10u32 {
        let color = if tick % 2 == 0 { [255, 255, 255] } else { [127, 127, 127] };
        fill(&mut img, 20, 50 + tick * 20, 20, 20, color);
    }
    img
}

/// Returns the same words for every request and counts the calls.
pub struct FixedRecognizer {
    pub tokens: Vec<OcrToken>,
    pub calls: AtomicUsize,
}

impl FixedRecognizer {
    pub fn new(texts: &[&str]) -> Self {
        let tokens = texts
            .iter()
            .enumerate()
            .map(|(i, t)| OcrToken::new(110 + 100 * i as i32, 12, 60, 20, *t))
            .collect();
        Self {
            tokens,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextRecognizer for FixedRecognizer {
    fn recognize(
        &self,
        _image: &GrayImage,
        _request: &RecognitionRequest<'_>,
    ) -> Result<Vec<OcrToken>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.tokens.clone())
    }
}

/// Fails every request; for paths that must not need OCR.
pub struct UnavailableRecognizer;

impl TextRecognizer for UnavailableRecognizer {
    fn recognize(
        &self,
        _image: &GrayImage,
        _request: &RecognitionRequest<'_>,
    ) -> Result<Vec<OcrToken>> {
        Err(CoreBoxError::Ocr("tesseract is not installed".to_string()))
    }
}

/// Core wherever a pixel is clearly redder than blue.
pub struct ChromaSegmenter;

impl BinarySegmenter for ChromaSegmenter {
    fn predict(&self, img: &RgbImage) -> Result<GrayImage> {
        Ok(GrayImage::from_fn(img.width(), img.height(), |x, y| {
            let p = img.get_pixel(x, y);
            Luma([u8::from(p[0] as i32 - p[2] as i32 > 30)])
        }))
    }
}
