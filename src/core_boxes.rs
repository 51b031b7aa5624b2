//! Box photographs and the depth-labeled cores cut out of them.

use std::path::{Path, PathBuf};

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::{CoreBoxError, Result};
use crate::filename::{CoreBoxFileMetadata, CoreImageCategory};
use crate::image_impl::imread;
use crate::pipeline::Pipeline;

/// Known top depth and length of one physical box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthTableEntry {
    pub start: f64,
    pub height: f64,
}

impl DepthTableEntry {
    /// Loads a depth table from JSON (`[{"start": .., "height": ..}]`) or
    /// from CSV lines of `start,height`. Lines that are not two numbers,
    /// such as a header, are skipped.
    pub fn read_table<P: AsRef<Path>>(path: P) -> Result<Vec<Self>> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let is_json = path
            .as_ref()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
            || text.trim_start().starts_with('[');

        if is_json {
            return Ok(serde_json::from_str(&text)?);
        }

        let mut table = Vec::new();
        for line in text.lines() {
            let fields: Vec<&str> = line.split([',', ';', '\t']).map(str::trim).collect();
            let [start, height] = fields.as_slice() else {
                continue;
            };
            match (start.parse::<f64>(), height.parse::<f64>()) {
                (Ok(start), Ok(height)) => table.push(Self { start, height }),
                _ => tracing::debug!("skipping depth table line {:?}", line),
            }
        }
        Ok(table)
    }
}

/// How depths are obtained when loading cores.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Load cores as soon as the file is opened.
    pub load: bool,
    /// Per physical box, indexed by `box_number - 1`.
    pub depth_table: Vec<DepthTableEntry>,
    /// Length of every box, used together with `start_depth`.
    pub default_depth: Option<f64>,
    /// Top depth of the first box in the photo.
    pub start_depth: Option<f64>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            load: true,
            depth_table: Vec::new(),
            default_depth: None,
            start_depth: None,
        }
    }
}

/// One core section cut out of a box photograph.
#[derive(Debug, Clone)]
pub struct CoreBox {
    image: RgbImage,
    box_number: usize,
    core_id: u32,
    category: CoreImageCategory,
    height: f64,
    start_depth: f64,
}

impl CoreBox {
    pub fn new(
        image: RgbImage,
        box_number: usize,
        core_id: u32,
        category: CoreImageCategory,
        height: f64,
        start_depth: f64,
    ) -> Result<Self> {
        let fail = |reason: String| CoreBoxError::BoxConstruction { box_number, reason };

        if image.width() == 0 || image.height() == 0 {
            return Err(fail("empty image".to_string()));
        }
        if !height.is_finite() || height <= 0.0 {
            return Err(fail(format!("invalid height {}", height)));
        }
        if !start_depth.is_finite() {
            return Err(fail(format!("invalid start depth {}", start_depth)));
        }

        Ok(Self {
            image,
            box_number,
            core_id,
            category,
            height,
            start_depth,
        })
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Position in the photo, 0 for the leftmost box.
    pub fn box_number(&self) -> usize {
        self.box_number
    }

    pub fn core_id(&self) -> u32 {
        self.core_id
    }

    pub fn category(&self) -> CoreImageCategory {
        self.category
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn start_depth(&self) -> f64 {
        self.start_depth
    }

    pub fn end_depth(&self) -> f64 {
        self.start_depth + self.height
    }

    pub fn record(&self, first_box_number: u32) -> CoreBoxRecord {
        CoreBoxRecord {
            box_number: self.box_number,
            physical_box_number: first_box_number as usize + self.box_number,
            core_id: self.core_id,
            category: self.category,
            start_depth: self.start_depth,
            height: self.height,
            width_px: self.image.width(),
            height_px: self.image.height(),
        }
    }
}

/// Serializable summary of a [`CoreBox`], without the pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreBoxRecord {
    pub box_number: usize,
    pub physical_box_number: usize,
    pub core_id: u32,
    pub category: CoreImageCategory,
    pub start_depth: f64,
    pub height: f64,
    pub width_px: u32,
    pub height_px: u32,
}

/// A box photograph on disk and the cores loaded from it.
pub struct CoreBoxesImageFile {
    path: PathBuf,
    metadata: CoreBoxFileMetadata,
    options: LoadOptions,
    pipeline: Pipeline,
    cores: Vec<CoreBox>,
}

impl CoreBoxesImageFile {
    pub fn new<P: AsRef<Path>>(path: P, options: LoadOptions) -> Result<Self> {
        Self::with_pipeline(path, options, Pipeline::default())
    }

    pub fn with_pipeline<P: AsRef<Path>>(
        path: P,
        options: LoadOptions,
        pipeline: Pipeline,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata =
            CoreBoxFileMetadata::from_path(&path).inspect_err(|e| tracing::warn!("{}", e))?;

        let mut file = Self {
            path,
            metadata,
            options,
            pipeline,
            cores: Vec::new(),
        };

        if file.options.load {
            file.load_cores()?;
        }
        Ok(file)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata(&self) -> &CoreBoxFileMetadata {
        &self.metadata
    }

    /// Cores ordered by box number.
    pub fn list(&self) -> &[CoreBox] {
        &self.cores
    }

    /// Depth span from the top of the first core to the bottom of the last.
    pub fn total_height(&self) -> Option<f64> {
        let first = self.cores.first()?;
        let last = self.cores.last()?;
        Some((last.end_depth() - first.start_depth).abs())
    }

    pub fn records(&self) -> Vec<CoreBoxRecord> {
        self.cores
            .iter()
            .map(|c| c.record(self.metadata.first_box_number))
            .collect()
    }

    /// Reads the photograph and rebuilds every core.
    pub fn load_cores(&mut self) -> Result<()> {
        let img = imread(&self.path)
            .inspect_err(|e| tracing::warn!("{}: {}", self.path.display(), e))?;
        self.load_cores_from_image(&img)
    }

    /// Rebuilds every core from an already decoded photograph.
    pub fn load_cores_from_image(&mut self, img: &RgbImage) -> Result<()> {
        self.cores.clear();
        let result = self.build_cores(img);
        if let Err(e) = &result {
            tracing::warn!("{}: {}", self.path.display(), e);
        }
        result
    }

    /// `(start, height)` of a box known without looking at the photo.
    fn known_depth(&self, index: usize) -> Option<(f64, f64)> {
        let physical = self.metadata.first_box_number as usize + index;
        if let Some(entry) = physical
            .checked_sub(1)
            .and_then(|i| self.options.depth_table.get(i))
        {
            return Some((entry.start, entry.height));
        }

        match (self.options.start_depth, self.options.default_depth) {
            (Some(start), Some(step)) => Some((start + step * index as f64, step)),
            _ => None,
        }
    }

    fn build_cores(&mut self, img: &RgbImage) -> Result<()> {
        let total = self.metadata.total_box_number as usize;
        let all_known = total > 0 && (0..total).all(|i| self.known_depth(i).is_some());

        let (count, ocr_depths) = if all_known {
            tracing::debug!("all {} boxes have known depths, skipping OCR", total);
            (total, Vec::new())
        } else {
            let recognition = self.pipeline.depth_reader().read(img)?;
            if recognition.depths.len() != total {
                tracing::warn!(
                    "{}: file name announces {} boxes, {} depth labels found",
                    self.path.display(),
                    total,
                    recognition.depths.len()
                );
            }
            (recognition.depths.len(), recognition.depths)
        };

        let needs_scale = (0..count).any(|i| self.known_depth(i).is_none());
        let scale_px = if needs_scale {
            Some(self.pipeline.scale_bar_measurer().measure(img)?)
        } else {
            None
        };

        let cropped = self.pipeline.border_cropper().crop(img)?;
        let sections = self.pipeline.splitter().split(&cropped, count)?;
        let segmenter = self.pipeline.background_segmenter()?;

        for (index, section) in sections.iter().enumerate() {
            let segmented = segmenter.run(section)?;

            let (start, height) = match self.known_depth(index) {
                Some(known) => known,
                None => {
                    let scale = scale_px.ok_or_else(|| {
                        CoreBoxError::ScaleBarDetection("scale bar was not measured".to_string())
                    })?;
                    let start = ocr_depths.get(index).copied().ok_or_else(|| {
                        CoreBoxError::DepthRecognition(format!("no depth label for box {}", index))
                    })?;
                    (start, segmented.image.height() as f64 / scale as f64)
                }
            };

            match CoreBox::new(
                segmented.image,
                index,
                self.metadata.core_id,
                self.metadata.category,
                height,
                start,
            ) {
                Ok(core) => self.insert(core),
                Err(e) => tracing::warn!("{}: {}", self.path.display(), e),
            }
        }

        tracing::info!(
            "{}: {} of {} cores loaded",
            self.path.display(),
            self.cores.len(),
            count
        );
        Ok(())
    }

    fn insert(&mut self, core: CoreBox) {
        let pos = self.cores.partition_point(|c| c.box_number <= core.box_number);
        self.cores.insert(pos, core);
    }
}
