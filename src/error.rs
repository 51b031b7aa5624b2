use crate::engine::EngineError;

/// Everything that can go wrong while digitizing a core-box photograph.
///
/// `FilenameParse`, `DepthRecognition` and `ScaleBarDetection` are fatal for a
/// whole photograph. `BoxConstruction` only drops the affected box.
#[derive(thiserror::Error, Debug)]
pub enum CoreBoxError {
    #[error("invalid core box file name '{name}': {reason}")]
    FilenameParse { name: String, reason: String },

    #[error("depth values of the core boxes could not be recognized: {0}")]
    DepthRecognition(String),

    #[error("scale bar could not be detected: {0}")]
    ScaleBarDetection(String),

    #[error("core box {box_number} could not be built: {reason}")]
    BoxConstruction { box_number: usize, reason: String },

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("Segmentation error: {0}")]
    Segmentation(String),

    #[error("asset '{0}' not found")]
    Asset(String),

    #[error("Image decode error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl CoreBoxError {
    /// True for errors that make the whole photograph unusable.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, CoreBoxError::BoxConstruction { .. })
    }
}

pub type Result<T> = std::result::Result<T, CoreBoxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_construction_is_recoverable() {
        let err = CoreBoxError::BoxConstruction {
            box_number: 2,
            reason: "empty image".to_string(),
        };
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "core box 2 could not be built: empty image");

        let err = CoreBoxError::DepthRecognition("inconsistent".to_string());
        assert!(err.is_fatal());
    }
}
