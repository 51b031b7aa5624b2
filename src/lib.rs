//! # corebox - core-box photograph digitization
//!
//! Turns a photograph of drill-core boxes into depth-labeled core images.
//! The photo's file name carries the core id and box range; the printed depth
//! labels are read with OCR, the scale bar gives the pixel size, and every box
//! is cut out and separated from its background by a segmentation model.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use corebox::{CoreBoxesImageFile, LoadOptions};
//!
//! let file = CoreBoxesImageFile::new("12cx3-7_5_uv.png", LoadOptions::default())?;
//! for core in file.list() {
//!     println!(
//!         "box {} starts at {:.2} m, {:.2} m long",
//!         core.box_number(),
//!         core.start_depth(),
//!         core.height()
//!     );
//! }
//! # Ok::<(), corebox::CoreBoxError>(())
//! ```
//!
//! OCR, segmentation and the region heuristics are traits
//! ([`TextRecognizer`], [`BinarySegmenter`], [`RegionSelector`]) that can be
//! swapped through [`Pipeline`].

pub mod assets;
pub mod border;
pub mod clustering;
pub mod contours;
pub mod core_boxes;
pub mod engine;
pub mod error;
pub mod filename;
pub mod image_impl;
pub mod ocr;
pub mod pipeline;
pub mod preprocess;
pub mod scale_bar;
pub mod segmenter;
pub mod selector;
pub mod splitter;
pub mod types;

pub use crate::core_boxes::{
    CoreBox, CoreBoxRecord, CoreBoxesImageFile, DepthTableEntry, LoadOptions,
};
pub use crate::error::{CoreBoxError, Result};
pub use crate::filename::{CoreBoxFileMetadata, CoreImageCategory};
pub use crate::ocr::{OcrToken, TextRecognizer};
pub use crate::pipeline::Pipeline;
pub use crate::segmenter::BinarySegmenter;
pub use crate::selector::{LargestRegionSelector, RegionSelector};
pub use crate::types::PipelineConfig;
