// Reads the printed depth labels above the core boxes

use std::sync::Arc;

use image::RgbImage;

use super::{
    safe_atof, ModelQuality, OcrCluster, OcrToken, PageSegMode, RecognitionRequest, TextRecognizer,
};
use crate::clustering::MeanShift;
use crate::error::{CoreBoxError, Result};
use crate::image_impl::crop;
use crate::preprocess::OcrPreProcess;
use crate::selector::RegionSelector;
use crate::types::OcrConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionPass {
    /// Whole photo, fast models.
    Broad,
    /// Label row crop, accurate models.
    Precise,
}

/// Accepted depth labels, left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthRecognition {
    pub depths: Vec<f64>,
    /// Merged label tokens the depths were parsed from.
    pub labels: Vec<OcrToken>,
    pub pass: RecognitionPass,
}

/// What one recognition pass produced before validation.
struct PassOutcome {
    row: Option<OcrCluster>,
    labels: Vec<OcrToken>,
    depths: Option<Vec<f64>>,
}

pub struct DepthOcrReader {
    cfg: OcrConfig,
    preprocess: OcrPreProcess,
    recognizer: Arc<dyn TextRecognizer>,
    selector: Arc<dyn RegionSelector>,
}

impl DepthOcrReader {
    pub fn new(
        cfg: OcrConfig,
        recognizer: Arc<dyn TextRecognizer>,
        selector: Arc<dyn RegionSelector>,
    ) -> Self {
        let preprocess = OcrPreProcess::new(&cfg);
        Self {
            cfg,
            preprocess,
            recognizer,
            selector,
        }
    }

    /// Recognizes the depth labels of `img`.
    ///
    /// A broad pass runs over the whole photo; when its depths are missing or
    /// inconsistent, the selected label row is re-read on its own with the
    /// accurate models.
    pub fn read(&self, img: &RgbImage) -> Result<DepthRecognition> {
        let binary = self.preprocess.run(img);
        let broad = self.run_pass(&binary, PageSegMode::SparseText, ModelQuality::Fast)?;
        if let Some(depths) = self.accept(&broad) {
            tracing::debug!("depths recognized on the broad pass: {:?}", depths);
            return Ok(DepthRecognition {
                depths,
                labels: broad.labels,
                pass: RecognitionPass::Broad,
            });
        }

        let Some(rect) = broad.row.as_ref().and_then(OcrCluster::bounding_rect) else {
            return Err(CoreBoxError::DepthRecognition(
                "no row of numeric labels found".to_string(),
            ));
        };

        let (w, h) = img.dimensions();
        let roi = rect.expand(self.cfg.crop_margin, w, h);
        tracing::debug!(
            "broad pass rejected ({:?}), re-reading label row {:?}",
            broad.depths,
            roi
        );

        let row_img = crop(img, roi)?;
        let precise = self.run_pass(
            &self.preprocess.run_unblurred(&row_img),
            PageSegMode::SingleLine,
            ModelQuality::Normal,
        )?;

        match self.accept(&precise) {
            Some(depths) => Ok(DepthRecognition {
                depths,
                labels: precise.labels,
                pass: RecognitionPass::Precise,
            }),
            None => Err(CoreBoxError::DepthRecognition(format!(
                "inconsistent depth labels {:?}",
                precise.depths.unwrap_or_default()
            ))),
        }
    }

    fn accept(&self, outcome: &PassOutcome) -> Option<Vec<f64>> {
        outcome
            .depths
            .as_ref()
            .filter(|d| {
                is_depth_sequence_consistent(d, self.cfg.min_gap_ratio, self.cfg.max_gap_ratio)
            })
            .cloned()
    }

    fn run_pass(
        &self,
        binary: &image::GrayImage,
        mode: PageSegMode,
        quality: ModelQuality,
    ) -> Result<PassOutcome> {
        let request = RecognitionRequest {
            mode,
            quality,
            whitelist: &self.cfg.whitelist,
        };

        let tokens: Vec<OcrToken> = self
            .recognizer
            .recognize(binary, &request)?
            .into_iter()
            .map(|mut t| {
                t.text = t.text.replace('.', ",");
                t
            })
            .collect();

        let rows = cluster_rows(&tokens, self.cfg.row_bandwidth);
        let row = self.selector.select_label_row(&rows).and_then(|idx| rows.into_iter().nth(idx));

        let Some(row) = row else {
            return Ok(PassOutcome {
                row: None,
                labels: Vec::new(),
                depths: None,
            });
        };

        let labels = merge_close_tokens(&row.sorted_by_left(), self.cfg.merge_gap_px);
        let depths = labels.iter().map(|t| safe_atof(&t.text)).collect::<Option<Vec<f64>>>();

        Ok(PassOutcome {
            row: Some(row),
            labels,
            depths,
        })
    }
}

/// Groups tokens into horizontal rows by mean-shift over their `top`.
fn cluster_rows(tokens: &[OcrToken], bandwidth: f64) -> Vec<OcrCluster> {
    let tops: Vec<f64> = tokens.iter().map(|t| t.top as f64).collect();
    let result = MeanShift::new(bandwidth).fit_1d(&tops);

    let mut rows = vec![OcrCluster::default(); result.n_clusters()];
    for (token, &label) in tokens.iter().zip(result.labels.iter()) {
        rows[label].tokens.push(token.clone());
    }
    rows
}

/// Joins neighbouring tokens of a left-sorted row when the gap between one
/// token's right edge and the next one's left edge is under `max_gap`.
///
/// A merged token concatenates the texts and keeps the smallest left/top and
/// the largest width/height of its parts.
pub fn merge_close_tokens(sorted: &[OcrToken], max_gap: i32) -> Vec<OcrToken> {
    let mut merged: Vec<OcrToken> = Vec::new();
    let mut prev_right: Option<i32> = None;

    for token in sorted {
        match (merged.last_mut(), prev_right) {
            (Some(current), Some(right)) if token.left - right < max_gap => {
                current.text.push_str(&token.text);
                current.left = current.left.min(token.left);
                current.top = current.top.min(token.top);
                current.width = current.width.max(token.width);
                current.height = current.height.max(token.height);
            }
            _ => merged.push(token.clone()),
        }
        prev_right = Some(token.right());
    }

    merged
}

/// Checks that depths are non-empty, non-decreasing, and that every gap
/// between consecutive labels is strictly between `min_ratio` and `max_ratio`
/// times the mean gap.
pub fn is_depth_sequence_consistent(depths: &[f64], min_ratio: f64, max_ratio: f64) -> bool {
    if depths.is_empty() || depths.iter().any(|d| !d.is_finite()) {
        return false;
    }
    if depths.windows(2).any(|w| w[1] < w[0]) {
        return false;
    }
    if depths.len() == 1 {
        return true;
    }

    let gaps: Vec<f64> = depths.windows(2).map(|w| w[1] - w[0]).collect();
    let mean_gap = gaps.iter().sum::<f64>() / gaps.len() as f64;
    if mean_gap <= 0.0 {
        return false;
    }

    gaps.iter().all(|g| {
        let ratio = g / mean_gap;
        ratio > min_ratio && ratio < max_ratio
    })
}
