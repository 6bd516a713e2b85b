use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Identity of a source document, keyed by its file path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId {
    path: PathBuf,
}

impl DocumentId {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name for display, e.g. in the preview panel title
    pub fn display_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("Untitled")
    }

    /// Directory relative asset references resolve against
    pub fn parent_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Title of the preview panel showing this document
    pub fn preview_title(&self) -> String {
        format!("Preview {}", self.display_name())
    }

    /// Where an export of this document is written: the same stem with an
    /// `.html` extension, beside the source.
    pub fn export_path(&self) -> PathBuf {
        self.path.with_extension("html")
    }
}

impl From<PathBuf> for DocumentId {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

impl From<&str> for DocumentId {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}
