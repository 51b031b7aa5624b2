use std::sync::Arc;

use crate::border::BorderCropper;
use crate::error::Result;
use crate::ocr::{DepthOcrReader, TesseractCli, TextRecognizer};
use crate::scale_bar::ScaleBarMeasurer;
use crate::segmenter::{BackgroundSegmenter, BinarySegmenter, OnnxBinarySegmenter};
use crate::selector::{LargestRegionSelector, RegionSelector};
use crate::splitter::CoreSplitter;
use crate::types::PipelineConfig;

/// Configuration plus the external collaborators every stage draws on.
///
/// Defaults to Tesseract for text, the stock region heuristics, and the
/// shared ONNX segmentation model, which is only loaded when a photo
/// actually reaches the segmentation stage.
#[derive(Clone)]
pub struct Pipeline {
    pub config: PipelineConfig,
    recognizer: Arc<dyn TextRecognizer>,
    selector: Arc<dyn RegionSelector>,
    segmenter: Option<Arc<dyn BinarySegmenter>>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let recognizer = Arc::new(TesseractCli::from_config(&config.ocr));
        Self {
            config,
            recognizer,
            selector: Arc::new(LargestRegionSelector),
            segmenter: None,
        }
    }

    pub fn with_recognizer(mut self, recognizer: Arc<dyn TextRecognizer>) -> Self {
        self.recognizer = recognizer;
        self
    }

    pub fn with_selector(mut self, selector: Arc<dyn RegionSelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_segmenter(mut self, segmenter: Arc<dyn BinarySegmenter>) -> Self {
        self.segmenter = Some(segmenter);
        self
    }

    pub fn border_cropper(&self) -> BorderCropper {
        BorderCropper::new(self.config.border.clone(), self.selector.clone())
    }

    pub fn scale_bar_measurer(&self) -> ScaleBarMeasurer {
        ScaleBarMeasurer::new(self.config.scale_bar.clone(), self.selector.clone())
    }

    pub fn depth_reader(&self) -> DepthOcrReader {
        DepthOcrReader::new(self.config.ocr.clone(), self.recognizer.clone(), self.selector.clone())
    }

    pub fn splitter(&self) -> CoreSplitter {
        CoreSplitter
    }

    pub fn background_segmenter(&self) -> Result<BackgroundSegmenter> {
        let segmenter: Arc<dyn BinarySegmenter> = match &self.segmenter {
            Some(segmenter) => segmenter.clone(),
            None => OnnxBinarySegmenter::shared(&self.config)?,
        };
        Ok(BackgroundSegmenter::new(segmenter, &self.config.segmenter))
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}
