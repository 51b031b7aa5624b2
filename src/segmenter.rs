//! Core/background separation of a single box section.
//!
//! The model itself sits behind [`BinarySegmenter`]; the ONNX backend is
//! loaded once per process and shared by every photograph.

use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbImage};
use ndarray::{ArrayD, Axis, Ix2};
use once_cell::sync::OnceCell;

use crate::assets::get_asset;
use crate::engine::{EngineError, OrtSession};
use crate::error::{CoreBoxError, Result};
use crate::image_impl::{
    close, crop, fill_background, mask_bounding_rect, BACKGROUND, FOREGROUND,
};
use crate::preprocess::SegPreProcess;
use crate::types::{PipelineConfig, SegmenterConfig};

pub trait BinarySegmenter: Send + Sync {
    /// Per-pixel mask of `img`: 1 for core, 0 for background.
    fn predict(&self, img: &RgbImage) -> Result<GrayImage>;
}

pub struct OnnxBinarySegmenter {
    session: OrtSession,
    preprocess: SegPreProcess,
    threshold: f32,
}

static SHARED_MODEL: OnceCell<Arc<OnnxBinarySegmenter>> = OnceCell::new();

impl OnnxBinarySegmenter {
    pub fn new(session: OrtSession, cfg: &SegmenterConfig) -> Self {
        Self {
            session,
            preprocess: SegPreProcess::new(cfg),
            threshold: cfg.threshold,
        }
    }

    pub fn from_config(cfg: &PipelineConfig) -> Result<Self> {
        let model_path = get_asset(&cfg.segmenter.asset_name, cfg.assets_dir.as_deref())?;
        tracing::info!("loading segmentation model {}", model_path.display());
        let session = OrtSession::from_path(&model_path, &cfg.engine)?;
        Ok(Self::new(session, &cfg.segmenter))
    }

    /// Process-wide model, loaded on first use. A failed load is returned to
    /// the caller and retried by the next one. Later configs do not reload it.
    pub fn shared(cfg: &PipelineConfig) -> Result<Arc<Self>> {
        SHARED_MODEL
            .get_or_try_init(|| Self::from_config(cfg).map(Arc::new))
            .cloned()
    }

    /// Thresholds the first channel (or the foreground channel of a two-class
    /// output) of an `NHWC`/`NHW`/`NCHW` probability map.
    fn to_mask(&self, output: ArrayD<f32>, width: u32, height: u32) -> Result<GrayImage> {
        let (w, h) = (width as usize, height as usize);
        let shape = output.shape().to_vec();
        let probs = match *shape.as_slice() {
            [1, hh, ww, c] if hh == h && ww == w && c > 0 => {
                output.index_axis(Axis(0), 0).index_axis(Axis(2), c - 1).to_owned()
            }
            [1, c, hh, ww] if hh == h && ww == w && c > 0 => {
                output.index_axis(Axis(0), 0).index_axis(Axis(0), c - 1).to_owned()
            }
            [1, hh, ww] if hh == h && ww == w => output.index_axis(Axis(0), 0).to_owned(),
            [hh, ww] if hh == h && ww == w => output,
            _ => {
                tracing::warn!("segmentation output shape {:?} for {}x{} input", shape, w, h);
                return Err(EngineError::InvalidOutputShape.into());
            }
        };
        let probs = probs
            .into_dimensionality::<Ix2>()
            .map_err(|_| EngineError::InvalidOutputShape)?;

        Ok(GrayImage::from_fn(width, height, |x, y| {
            let p = probs[[y as usize, x as usize]];
            Luma([u8::from(p > self.threshold)])
        }))
    }
}

impl BinarySegmenter for OnnxBinarySegmenter {
    fn predict(&self, img: &RgbImage) -> Result<GrayImage> {
        let input = self.preprocess.run(img);
        let (_, in_h, in_w, _) = input.dim();

        let output = self.session.run(input.into_dyn())?;
        let mask = self.to_mask(output, in_w as u32, in_h as u32)?;

        if mask.dimensions() == img.dimensions() {
            Ok(mask)
        } else {
            Ok(imageops::resize(&mask, img.width(), img.height(), FilterType::Nearest))
        }
    }
}

/// A section with its background painted over and cropped to the core.
#[derive(Debug, Clone)]
pub struct SegmentedSection {
    pub image: RgbImage,
    /// 255 on core pixels, cropped like `image`.
    pub mask: GrayImage,
}

pub struct BackgroundSegmenter {
    segmenter: Arc<dyn BinarySegmenter>,
    preprocess: SegPreProcess,
    close_kernel: u32,
    fill_color: [u8; 3],
}

impl BackgroundSegmenter {
    pub fn new(segmenter: Arc<dyn BinarySegmenter>, cfg: &SegmenterConfig) -> Self {
        Self {
            segmenter,
            preprocess: SegPreProcess::new(cfg),
            close_kernel: cfg.close_kernel,
            fill_color: cfg.fill_color,
        }
    }

    pub fn run(&self, section: &RgbImage) -> Result<SegmentedSection> {
        let equalized = self.preprocess.equalize(section);
        let prediction = self.segmenter.predict(&equalized)?;

        if prediction.dimensions() != section.dimensions() {
            return Err(CoreBoxError::Segmentation(format!(
                "mask is {:?}, section is {:?}",
                prediction.dimensions(),
                section.dimensions()
            )));
        }

        let binary = GrayImage::from_fn(section.width(), section.height(), |x, y| {
            if prediction.get_pixel(x, y)[0] > 0 {
                Luma([FOREGROUND])
            } else {
                Luma([BACKGROUND])
            }
        });
        let mask = close(&binary, self.close_kernel);

        let mut image = section.clone();
        fill_background(&mut image, &mask, self.fill_color);

        let Some(rect) = mask_bounding_rect(&mask) else {
            tracing::info!(
                "no core pixels in {:?} section, keeping it uncropped",
                section.dimensions()
            );
            return Ok(SegmentedSection { image, mask });
        };

        Ok(SegmentedSection {
            image: crop(&image, rect)?,
            mask: crop(&mask, rect)?,
        })
    }
}
