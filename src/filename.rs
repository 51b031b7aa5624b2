//! Core identity encoded in box photograph file names.
//!
//! `<core_id>cx<first_box>-<last_box>_<total_boxes>[_<tokens>].<ext>`,
//! e.g. `12cx3-7_5_uv.png`.

use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CoreBoxError, Result};

const FILENAME_PATTERN: &str = r"^([0-9]+)cx([0-9]+)-([0-9]+)_([0-9]+)(_(\S+))?\.\S+$";

fn filename_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(FILENAME_PATTERN).expect("valid file name pattern"))
}

/// Which kind of box photograph a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CoreImageCategory {
    /// Slabbed ("serrado") full core.
    FullCoreImage,
    /// Full core under UV light.
    FullCoreUVImage,
    #[default]
    CoreWithoutPlugImage,
}

impl CoreImageCategory {
    pub fn name(&self) -> &'static str {
        match self {
            CoreImageCategory::FullCoreImage => "FullCoreImage",
            CoreImageCategory::FullCoreUVImage => "FullCoreUVImage",
            CoreImageCategory::CoreWithoutPlugImage => "CoreWithoutPlugImage",
        }
    }

    pub fn suffix(&self) -> Option<&'static str> {
        match self {
            CoreImageCategory::FullCoreImage => Some("serrado"),
            CoreImageCategory::FullCoreUVImage => Some("uv"),
            CoreImageCategory::CoreWithoutPlugImage => None,
        }
    }

    /// Resolves the category from the underscore-separated suffix tokens.
    /// `uv` wins over `serrado`; anything else is the default category.
    pub fn from_suffix(suffix: Option<&str>) -> Self {
        let Some(suffix) = suffix else {
            return CoreImageCategory::CoreWithoutPlugImage;
        };

        let lowered = suffix.to_lowercase();
        let tokens: Vec<&str> = lowered.split('_').collect();
        if tokens.contains(&"uv") {
            CoreImageCategory::FullCoreUVImage
        } else if tokens.contains(&"serrado") {
            CoreImageCategory::FullCoreImage
        } else {
            CoreImageCategory::CoreWithoutPlugImage
        }
    }
}

impl fmt::Display for CoreImageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreBoxFileMetadata {
    pub core_id: u32,
    pub first_box_number: u32,
    pub last_box_number: u32,
    pub total_box_number: u32,
    pub category: CoreImageCategory,
}

impl CoreBoxFileMetadata {
    /// Parses the base name of `path`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let name = path
            .as_ref()
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| CoreBoxError::FilenameParse {
                name: path.as_ref().display().to_string(),
                reason: "path has no UTF-8 file name".to_string(),
            })?;
        Self::parse(name)
    }

    pub fn parse(name: &str) -> Result<Self> {
        let err = |reason: String| CoreBoxError::FilenameParse {
            name: name.to_string(),
            reason,
        };

        let caps = filename_regex().captures(name).ok_or_else(|| {
            err("expected <core>cx<first>-<last>_<total>[_<category>].<ext>".to_string())
        })?;

        let number = |idx: usize, what: &str| -> Result<u32> {
            caps[idx]
                .parse::<u32>()
                .map_err(|e| err(format!("{} '{}': {}", what, &caps[idx], e)))
        };

        let metadata = Self {
            core_id: number(1, "core id")?,
            first_box_number: number(2, "first box number")?,
            last_box_number: number(3, "last box number")?,
            total_box_number: number(4, "total box number")?,
            category: CoreImageCategory::from_suffix(caps.get(6).map(|m| m.as_str())),
        };

        if metadata.first_box_number > metadata.last_box_number {
            tracing::debug!(
                "{}: first box {} is after last box {}",
                name,
                metadata.first_box_number,
                metadata.last_box_number
            );
        }

        Ok(metadata)
    }
}
