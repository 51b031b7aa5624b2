//! Scale bar length measurement.
//!
//! The bar alternates white and gray ticks of equal length. White ticks are
//! found as a cluster of same-sized blobs on one vertical line; the gray ticks
//! sit half a period below them. Flood filling the edge map from the topmost
//! and bottommost tick gives the bar's full pixel extent.

use std::sync::Arc;

use image::{GrayImage, RgbImage};
use imageproc::contrast::{threshold, ThresholdType};
use ndarray::Array2;

use crate::clustering::MeanShift;
use crate::contours::{find_external_contours, flood_fill};
use crate::error::{CoreBoxError, Result};
use crate::image_impl::{close, open, to_gray};
use crate::selector::RegionSelector;
use crate::types::ScaleBarConfig;

pub struct ScaleBarMeasurer {
    cfg: ScaleBarConfig,
    selector: Arc<dyn RegionSelector>,
}

impl ScaleBarMeasurer {
    pub fn new(cfg: ScaleBarConfig, selector: Arc<dyn RegionSelector>) -> Self {
        Self { cfg, selector }
    }

    /// Length of the scale bar in pixels.
    pub fn measure(&self, img: &RgbImage) -> Result<u32> {
        let gray = to_gray(img);
        let (width, height) = gray.dimensions();

        let ticks = self.white_tick_centers(&gray)?;
        let (top, bottom) = tick_extremes(&ticks)?;

        let seed = |(x, y): (f64, f64)| -> Result<(u32, u32)> {
            let (sx, sy) = (x.round(), y.round());
            if sx < 0.0 || sy < 0.0 || sx >= width as f64 || sy >= height as f64 {
                return Err(CoreBoxError::ScaleBarDetection(format!(
                    "tick at ({:.1}, {:.1}) is outside the photo",
                    x, y
                )));
            }
            Ok((sx as u32, sy as u32))
        };
        let (top, bottom) = (seed(top)?, seed(bottom)?);

        let edges = imageproc::edges::canny(&gray, self.cfg.canny_low, self.cfg.canny_high);
        let mut edges = close(&edges, self.cfg.edge_close_kernel);

        flood_fill(&mut edges, top, self.cfg.sentinel);
        flood_fill(&mut edges, bottom, self.cfg.sentinel);

        let length = filled_extent(&edges, self.cfg.sentinel);
        tracing::debug!("scale bar: {} white ticks, {} px", ticks.len(), length);

        if length == 0 {
            return Err(CoreBoxError::ScaleBarDetection("scale bar has no length".to_string()));
        }
        Ok(length)
    }

    /// Centroids of the white ticks, sorted top to bottom.
    fn white_tick_centers(&self, gray: &GrayImage) -> Result<Vec<(f64, f64)>> {
        let (width, height) = gray.dimensions();
        let k = ((self.cfg.kernel_ratio * height as f64).round() as u32).max(1);

        let white = threshold(gray, self.cfg.white_thresh, ThresholdType::Binary);
        let white = close(&open(&white, k), k);

        let blobs: Vec<((f64, f64), f64)> = find_external_contours(&white)
            .iter()
            .filter_map(|c| c.centroid().map(|center| (center, c.area())))
            .collect();

        if blobs.len() < 2 {
            return Err(CoreBoxError::ScaleBarDetection(format!(
                "{} white blobs in photo",
                blobs.len()
            )));
        }

        // (relative area, relative horizontal position)
        let h2 = (height as f64) * (height as f64);
        let mut features = Array2::<f64>::zeros((blobs.len(), 2));
        for (i, ((cx, _), area)) in blobs.iter().enumerate() {
            features[[i, 0]] = area / h2;
            features[[i, 1]] = cx / width as f64;
        }

        let clusters = MeanShift::new(self.cfg.bandwidth).fit(features.view());
        let chosen = self
            .selector
            .select_tick_cluster(&clusters.cluster_sizes())
            .ok_or_else(|| CoreBoxError::ScaleBarDetection("no tick cluster".to_string()))?;

        let mut centers: Vec<(f64, f64)> = clusters
            .members(chosen)
            .into_iter()
            .map(|i| blobs[i].0)
            .collect();
        centers.sort_by(|a, b| a.1.total_cmp(&b.1));

        if centers.len() < 2 {
            return Err(CoreBoxError::ScaleBarDetection(format!(
                "only {} white tick found",
                centers.len()
            )));
        }
        Ok(centers)
    }
}

/// Topmost and bottommost tick once every white tick is mirrored half a
/// period down onto its gray neighbour.
fn tick_extremes(white: &[(f64, f64)]) -> Result<((f64, f64), (f64, f64))> {
    if white.len() < 2 {
        return Err(CoreBoxError::ScaleBarDetection("need at least two ticks".to_string()));
    }

    let half_period = (white[1].1 - white[0].1) / 2.0;
    let candidates = white
        .iter()
        .copied()
        .chain(white.iter().map(|&(x, y)| (x, y + half_period)));

    let mut top = white[0];
    let mut bottom = white[0];
    for c in candidates {
        if c.1 < top.1 {
            top = c;
        }
        if c.1 > bottom.1 {
            bottom = c;
        }
    }
    Ok((top, bottom))
}

/// Vertical span of the pixels holding `value`.
fn filled_extent(img: &GrayImage, value: u8) -> u32 {
    let mut rows = img
        .enumerate_pixels()
        .filter(|(_, _, p)| p[0] == value)
        .map(|(_, y, _)| y);

    let Some(first) = rows.next() else {
        return 0;
    };
    let (min, max) = rows.fold((first, first), |(lo, hi), y| (lo.min(y), hi.max(y)));
    max - min
}
