use std::path::PathBuf;
use std::process::Command;

use image::GrayImage;
use tempfile::NamedTempFile;

use super::{ModelQuality, OcrToken, RecognitionRequest, TextRecognizer};
use crate::error::{CoreBoxError, Result};
use crate::types::OcrConfig;

/// Runs the `tesseract` executable and reads its TSV word boxes.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    pub executable: PathBuf,
    pub fast_tessdata_dir: Option<PathBuf>,
    pub best_tessdata_dir: Option<PathBuf>,
    pub language: String,
}

impl TesseractCli {
    pub fn from_config(cfg: &OcrConfig) -> Self {
        Self {
            executable: cfg
                .tesseract_path
                .clone()
                .unwrap_or_else(|| PathBuf::from("tesseract")),
            fast_tessdata_dir: cfg.fast_tessdata_dir.clone(),
            best_tessdata_dir: cfg.best_tessdata_dir.clone(),
            language: cfg.language.clone(),
        }
    }

    fn tessdata_dir(&self, quality: ModelQuality) -> Option<&PathBuf> {
        match quality {
            ModelQuality::Fast => self.fast_tessdata_dir.as_ref(),
            ModelQuality::Normal => self.best_tessdata_dir.as_ref(),
        }
    }
}

impl TextRecognizer for TesseractCli {
    fn recognize(
        &self,
        image: &GrayImage,
        request: &RecognitionRequest<'_>,
    ) -> Result<Vec<OcrToken>> {
        let temp_input = NamedTempFile::with_suffix(".png")?;
        image.save(temp_input.path())?;

        let mut command = Command::new(&self.executable);
        command
            .arg(temp_input.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(request.mode.psm().to_string())
            .arg("-c")
            .arg(format!("tessedit_char_whitelist={}", request.whitelist));

        if let Some(dir) = self.tessdata_dir(request.quality) {
            command.arg("--tessdata-dir").arg(dir);
        } else {
            tracing::debug!(
                "no tessdata dir for {:?} models, using tesseract's default",
                request.quality
            );
        }

        let output = command.arg("tsv").output().map_err(|e| {
            CoreBoxError::Ocr(format!("failed to run {}: {}", self.executable.display(), e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CoreBoxError::Ocr(format!("tesseract failed: {}", stderr.trim())));
        }

        Ok(parse_tsv_output(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Word rows (level 5) of Tesseract's TSV output.
///
/// Columns: level, page_num, block_num, par_num, line_num, word_num,
/// left, top, width, height, conf, text
fn parse_tsv_output(tsv: &str) -> Vec<OcrToken> {
    let mut tokens = Vec::new();

    for line in tsv.lines().skip(1) {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        if fields[0].parse::<i32>().ok() != Some(5) {
            continue;
        }

        let text = fields[11].trim();
        if text.is_empty() {
            continue;
        }

        let num = |idx: usize| fields[idx].trim().parse::<i32>().ok();
        let (Some(left), Some(top), Some(width), Some(height)) = (num(6), num(7), num(8), num(9))
        else {
            continue;
        };

        tokens.push(OcrToken::new(left, top, width, height, text));
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tsv_output() {
        let tsv = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\t\
                   left\ttop\twidth\theight\tconf\ttext\n\
                   1\t1\t0\t0\t0\t0\t0\t0\t800\t600\t-1\t\n\
                   4\t1\t1\t1\t1\t0\t90\t20\t400\t30\t-1\t\n\
                   5\t1\t1\t1\t1\t1\t90\t20\t60\t28\t91.5\t100,00\n\
                   5\t1\t1\t1\t1\t2\t300\t22\t61\t27\t88.0\t100,50\n\
                   5\t1\t1\t1\t1\t3\t500\t21\t10\t27\t12.0\t \n\
                   5\t1\t2\t1\t1\t1\tx\t21\t10\t27\t12.0\tT\n";

        let tokens = parse_tsv_output(tsv);
        assert_eq!(
            tokens,
            vec![
                OcrToken::new(90, 20, 60, 28, "100,00"),
                OcrToken::new(300, 22, 61, 27, "100,50"),
            ]
        );
    }

    #[test]
    fn test_tessdata_dir_per_quality() {
        let cfg = OcrConfig {
            fast_tessdata_dir: Some(PathBuf::from("/models/fast")),
            ..OcrConfig::default()
        };
        let cli = TesseractCli::from_config(&cfg);
        assert_eq!(cli.executable, PathBuf::from("tesseract"));
        assert_eq!(cli.tessdata_dir(ModelQuality::Fast), Some(&PathBuf::from("/models/fast")));
        assert_eq!(cli.tessdata_dir(ModelQuality::Normal), None);
    }
}
