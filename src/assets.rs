use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::error::{CoreBoxError, Result};

/// Overrides every other asset location when set.
pub const ASSETS_DIR_ENV: &str = "COREBOX_ASSETS_DIR";

static EXE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Directory containing the running executable.
pub fn exe_dir() -> &'static PathBuf {
    EXE_DIR.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Directories searched for assets, most specific first:
/// `$COREBOX_ASSETS_DIR`, `assets_dir`, `./assets`, `<exe_dir>/assets`.
pub fn search_dirs(assets_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(env_dir) = std::env::var_os(ASSETS_DIR_ENV) {
        dirs.push(PathBuf::from(env_dir));
    }
    if let Some(dir) = assets_dir {
        dirs.push(dir.to_path_buf());
    }
    dirs.push(PathBuf::from("assets"));
    dirs.push(exe_dir().join("assets"));
    dirs
}

/// Resolves a named asset such as a model file.
pub fn get_asset(name: &str, assets_dir: Option<&Path>) -> Result<PathBuf> {
    let dirs = search_dirs(assets_dir);
    for dir in &dirs {
        let candidate = dir.join(name);
        if candidate.is_file() {
            tracing::debug!("asset {} resolved to {}", name, candidate.display());
            return Ok(candidate);
        }
    }

    tracing::warn!("asset {} not found in {:?}", name, dirs);
    Err(CoreBoxError::Asset(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_asset_in_explicit_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("model.onnx"), b"onnx").unwrap();

        let found = get_asset("model.onnx", Some(dir.path())).unwrap();
        assert_eq!(found.file_name().unwrap(), "model.onnx");

        let err = get_asset("missing-model.onnx", Some(dir.path())).unwrap_err();
        assert!(matches!(err, CoreBoxError::Asset(name) if name == "missing-model.onnx"));
    }
}
