use std::fs;
use std::path::{Path, PathBuf};

use crate::renderer::{BOOTSTRAP_FILE_NAME, BOOTSTRAP_SCRIPT};

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Not a markdown document: {0}")]
    NotMarkdown(PathBuf),
}

/// Write content to a file, creating parent directories as needed
pub fn write_file(path: &Path, content: &str) -> Result<(), IoError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(IoError::Io)?;
    }

    fs::write(path, content).map_err(IoError::Io)
}

/// Write the bootstrap plugin into `assets_dir`, returning its path.
///
/// An up-to-date copy is left untouched.
pub fn materialize_bootstrap(assets_dir: &Path) -> Result<PathBuf, IoError> {
    let path = assets_dir.join(BOOTSTRAP_FILE_NAME);
    match fs::read_to_string(&path) {
        Ok(existing) if existing == BOOTSTRAP_SCRIPT => {}
        _ => write_file(&path, BOOTSTRAP_SCRIPT)?,
    }
    Ok(path)
}

/// Check that `path` names an existing markdown document
pub fn validate_document(path: &Path) -> Result<(), IoError> {
    if !path.is_file() {
        return Err(IoError::NotFound(path.to_path_buf()));
    }
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("md" | "markdown") => Ok(()),
        _ => Err(IoError::NotMarkdown(path.to_path_buf())),
    }
}
