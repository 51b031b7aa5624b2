//! Text recognition seam and the depth-label reader built on it.

mod depth;
mod tesseract;

pub use depth::{
    is_depth_sequence_consistent, merge_close_tokens, DepthOcrReader, DepthRecognition,
    RecognitionPass,
};
pub use tesseract::TesseractCli;

use image::GrayImage;

use crate::error::Result;
use crate::image_impl::Rect;

/// Tesseract page segmentation modes used by the depth reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSegMode {
    /// Sparse text anywhere in the image (psm 11).
    SparseText,
    /// The image is a single line of text (psm 7).
    SingleLine,
}

impl PageSegMode {
    pub fn psm(&self) -> u8 {
        match self {
            PageSegMode::SparseText => 11,
            PageSegMode::SingleLine => 7,
        }
    }
}

/// Which trained model family to recognize with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelQuality {
    Fast,
    Normal,
}

#[derive(Debug, Clone)]
pub struct RecognitionRequest<'a> {
    pub mode: PageSegMode,
    pub quality: ModelQuality,
    /// Only these characters may be recognized.
    pub whitelist: &'a str,
}

pub trait TextRecognizer: Send + Sync {
    /// Word-level tokens found in a binarized image, in pixel coordinates of `image`.
    fn recognize(
        &self,
        image: &GrayImage,
        request: &RecognitionRequest<'_>,
    ) -> Result<Vec<OcrToken>>;
}

/// One recognized word and its box.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrToken {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
    pub text: String,
}

impl OcrToken {
    pub fn new(left: i32, top: i32, width: i32, height: i32, text: impl Into<String>) -> Self {
        Self {
            left,
            top,
            width,
            height,
            text: text.into(),
        }
    }

    pub fn right(&self) -> i32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.top + self.height
    }
}

/// Tokens that share a vertical band of the image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OcrCluster {
    pub tokens: Vec<OcrToken>,
}

impl OcrCluster {
    pub fn new(tokens: Vec<OcrToken>) -> Self {
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn has_only_numbers(&self) -> bool {
        self.tokens.iter().all(|t| safe_atof(&t.text).is_some())
    }

    /// Tokens ordered left to right.
    pub fn sorted_by_left(&self) -> Vec<OcrToken> {
        let mut tokens = self.tokens.clone();
        tokens.sort_by_key(|t| t.left);
        tokens
    }

    /// Box spanning the extreme left/top/right/bottom of all tokens.
    pub fn bounding_rect(&self) -> Option<Rect> {
        let left = self.tokens.iter().map(|t| t.left).min()?;
        let top = self.tokens.iter().map(|t| t.top).min()?;
        let right = self.tokens.iter().map(OcrToken::right).max()?;
        let bottom = self.tokens.iter().map(OcrToken::bottom).max()?;

        let (left, top) = (left.max(0), top.max(0));
        if right <= left || bottom <= top {
            return None;
        }
        Some(Rect::new(
            left as u32,
            top as u32,
            (right - left) as u32,
            (bottom - top) as u32,
        ))
    }
}

/// Parses a depth printed with `,` as decimal separator and `.` as digit
/// grouping (`"1.234,5"`). Returns `None` for anything that is not a finite number.
pub fn safe_atof(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let normalized = trimmed.replace('.', "").replace(',', ".");
    if !normalized
        .chars()
        .all(|c| c.is_ascii_digit() || c == '.' || c == '-' || c == '+')
    {
        return None;
    }

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_atof() {
        assert_eq!(safe_atof("100,50"), Some(100.5));
        assert_eq!(safe_atof(" 101 "), Some(101.0));
        assert_eq!(safe_atof("1.234,5"), Some(1234.5));
        assert_eq!(safe_atof("100,5,0"), None);
        assert_eq!(safe_atof(""), None);
        assert_eq!(safe_atof("T"), None);
        assert_eq!(safe_atof("cx"), None);
        assert_eq!(safe_atof("1/2"), None);
        assert_eq!(safe_atof("inf"), None);
    }

    #[test]
    fn test_cluster_bounding_rect() {
        let row = OcrCluster::new(vec![
            OcrToken::new(300, 12, 40, 10, "101,00"),
            OcrToken::new(100, 10, 40, 12, "100,00"),
        ]);
        assert_eq!(row.bounding_rect(), Some(Rect::new(100, 10, 240, 12)));
        assert_eq!(row.sorted_by_left()[0].text, "100,00");
        assert!(row.has_only_numbers());
        assert_eq!(OcrCluster::default().bounding_rect(), None);
    }
}
