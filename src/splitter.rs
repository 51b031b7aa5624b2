// Equal-width vertical split of the cropped core region

use image::RgbImage;

use crate::error::{CoreBoxError, Result};
use crate::image_impl::{crop, Rect};

#[derive(Debug, Default, Clone, Copy)]
pub struct CoreSplitter;

impl CoreSplitter {
    /// Column rectangles of `n` sections of a `width` x `height` image.
    /// Columns left over by the integer division are dropped.
    pub fn section_rects(width: u32, height: u32, n: usize) -> Result<Vec<Rect>> {
        if n == 0 {
            return Err(CoreBoxError::ImageProcessing("cannot split into 0 sections".to_string()));
        }

        let section_width = width / n as u32;
        if section_width == 0 || height == 0 {
            return Err(CoreBoxError::ImageProcessing(format!(
                "{}x{} image is too small for {} sections",
                width, height, n
            )));
        }

        Ok((0..n as u32)
            .map(|i| Rect::new(i * section_width, 0, section_width, height))
            .collect())
    }

    pub fn split(&self, img: &RgbImage, n: usize) -> Result<Vec<RgbImage>> {
        let (width, height) = img.dimensions();
        Self::section_rects(width, height, n)?
            .into_iter()
            .map(|rect| crop(img, rect))
            .collect()
    }
}
