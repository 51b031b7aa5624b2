use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub intra_op_num_threads: usize,
    pub inter_op_num_threads: usize,
    pub use_gpu: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        // Auto-detect optimal thread count (use all available CPUs)
        let num_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);

        Self {
            intra_op_num_threads: num_threads,
            inter_op_num_threads: 1,
            use_gpu: false,
        }
    }
}

/// Thresholds used to isolate the core region from the photo border.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BorderConfig {
    pub white_thresh: u8,
    pub black_thresh: u8,
    /// HSV range of the scale bar gray, OpenCV scale (H 0..180).
    pub scale_gray_low: [u8; 3],
    pub scale_gray_high: [u8; 3],
    pub open_kernel: u32,
    pub close_kernel: u32,
}

impl Default for BorderConfig {
    fn default() -> Self {
        Self {
            white_thresh: 220,
            black_thresh: 10,
            scale_gray_low: [0, 0, 124],
            scale_gray_high: [0, 0, 130],
            open_kernel: 5,
            close_kernel: 20,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleBarConfig {
    pub white_thresh: u8,
    /// Denoising kernel side as a fraction of the image height.
    pub kernel_ratio: f64,
    pub bandwidth: f64,
    pub canny_low: f32,
    pub canny_high: f32,
    pub edge_close_kernel: u32,
    pub sentinel: u8,
}

impl Default for ScaleBarConfig {
    fn default() -> Self {
        Self {
            white_thresh: 220,
            kernel_ratio: 0.006,
            bandwidth: 0.001,
            canny_low: 10.0,
            canny_high: 150.0,
            edge_close_kernel: 3,
            sentinel: 127,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Tesseract executable, looked up on `PATH` when unset.
    pub tesseract_path: Option<PathBuf>,
    /// Fast trained models, used by the broad first pass.
    pub fast_tessdata_dir: Option<PathBuf>,
    /// Normal (accurate) trained models, used by the precise second pass.
    pub best_tessdata_dir: Option<PathBuf>,
    pub language: String,
    pub whitelist: String,
    pub binarize_thresh: u8,
    pub open_kernel: u32,
    pub median_radius: u32,
    pub row_bandwidth: f64,
    pub merge_gap_px: i32,
    /// Margin added on each side of the label row before the second pass.
    pub crop_margin: f64,
    pub min_gap_ratio: f64,
    pub max_gap_ratio: f64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_path: None,
            fast_tessdata_dir: None,
            best_tessdata_dir: None,
            language: "eng".to_string(),
            whitelist: "0123456789,. Tcx/".to_string(),
            binarize_thresh: 220,
            open_kernel: 2,
            median_radius: 1,
            row_bandwidth: 10.0,
            merge_gap_px: 20,
            crop_margin: 0.3,
            min_gap_ratio: 0.25,
            max_gap_ratio: 4.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    pub asset_name: String,
    pub close_kernel: u32,
    pub fill_color: [u8; 3],
    pub threshold: f32,
    /// Fixed model input `[width, height]`; the section is fed at native size when unset.
    pub input_size: Option<[u32; 2]>,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            asset_name: "unet-binary-segop.onnx".to_string(),
            close_kernel: 15,
            fill_color: [0, 0, 0],
            threshold: 0.5,
            input_size: None,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub border: BorderConfig,
    pub scale_bar: ScaleBarConfig,
    pub ocr: OcrConfig,
    pub segmenter: SegmenterConfig,
    pub engine: EngineConfig,
    pub assets_dir: Option<PathBuf>,
}

impl PipelineConfig {
    /// Reads a JSON config; missing fields keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
