// Crops a box photograph down to the region holding the cores

use std::sync::Arc;

use image::{GrayImage, RgbImage};
use imageproc::contrast::{threshold, ThresholdType};

use crate::contours::find_external_contours;
use crate::error::{CoreBoxError, Result};
use crate::image_impl::{bitwise_and, close, crop, in_range_hsv, open, to_gray, Rect};
use crate::selector::RegionSelector;
use crate::types::BorderConfig;

pub struct BorderCropper {
    cfg: BorderConfig,
    selector: Arc<dyn RegionSelector>,
}

impl BorderCropper {
    pub fn new(cfg: BorderConfig, selector: Arc<dyn RegionSelector>) -> Self {
        Self { cfg, selector }
    }

    /// Mask of pixels that are neither white paper, black background nor
    /// scale-bar gray, cleaned with an open then a close.
    pub fn core_region_mask(&self, img: &RgbImage) -> GrayImage {
        let gray = to_gray(img);

        let not_white = threshold(&gray, self.cfg.white_thresh, ThresholdType::BinaryInverted);

        // gray >= black_thresh
        let black_level = self.cfg.black_thresh.saturating_sub(1);
        let not_black = threshold(&gray, black_level, ThresholdType::Binary);

        let mut not_scale = in_range_hsv(img, self.cfg.scale_gray_low, self.cfg.scale_gray_high);
        image::imageops::invert(&mut not_scale);

        let mask = bitwise_and(&bitwise_and(&not_white, &not_black), &not_scale);
        close(&open(&mask, self.cfg.open_kernel), self.cfg.close_kernel)
    }

    /// Bounding box of the region the selector picks as the cores.
    pub fn find_core_region(&self, img: &RgbImage) -> Result<Rect> {
        let mask = self.core_region_mask(img);
        let contours = find_external_contours(&mask);

        let rect = self
            .selector
            .select_core_region(&contours)
            .and_then(|idx| contours.get(idx))
            .and_then(|c| c.bounding_rect())
            .ok_or_else(|| {
                CoreBoxError::ImageProcessing("no core region found in photo".to_string())
            })?;

        tracing::debug!("core region {:?} out of {} candidates", rect, contours.len());
        Ok(rect)
    }

    pub fn crop(&self, img: &RgbImage) -> Result<RgbImage> {
        let rect = self.find_core_region(img)?;
        crop(img, rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::LargestRegionSelector;
    use image::Rgb;

    fn fill(img: &mut RgbImage, x0: u32, y0: u32, w: u32, h: u32, color: [u8; 3]) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                img.put_pixel(x, y, Rgb(color));
            }
        }
    }

    fn cropper() -> BorderCropper {
        BorderCropper::new(BorderConfig::default(), Arc::new(LargestRegionSelector))
    }

    #[test]
    fn test_crops_to_largest_core_region() {
        let mut img = RgbImage::new(200, 120);
        // white label, gray scale tick, small stone, core row
        fill(&mut img, 0, 0, 200, 10, [255, 255, 255]);
        fill(&mut img, 5, 20, 10, 80, [127, 127, 127]);
        fill(&mut img, 25, 20, 12, 12, [90, 60, 40]);
        fill(&mut img, 60, 30, 120, 70, [150, 100, 60]);

        // the even 20x20 close shifts the region by one pixel, as OpenCV does
        let rect = cropper().find_core_region(&img).unwrap();
        assert_eq!(rect, Rect::new(61, 31, 120, 70));

        let cropped = cropper().crop(&img).unwrap();
        assert_eq!(cropped.dimensions(), (120, 70));
        assert_eq!(cropped.get_pixel(0, 0), &Rgb([150, 100, 60]));
    }

    #[test]
    fn test_scale_gray_is_excluded() {
        let mut img = RgbImage::new(50, 50);
        fill(&mut img, 10, 10, 30, 30, [127, 127, 127]);

        let mask = cropper().core_region_mask(&img);
        assert!(mask.pixels().all(|p| p[0] == 0));
        assert!(matches!(
            cropper().find_core_region(&img),
            Err(CoreBoxError::ImageProcessing(_))
        ));
    }
}
