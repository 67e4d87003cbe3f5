use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

/// Conventional Hugo content root, used when no output directory is given.
pub const DEFAULT_OUTPUT_DIR: &str = "content";

#[derive(Debug, Serialize, Deserialize)]
pub struct ConvertConfig {
    /// Path to the Blogger Atom export file.
    pub archive_path: PathBuf,
    /// Root the `posts/` tree is written under.
    pub output_dir: PathBuf,
}

impl ConvertConfig {
    pub fn new(archive_path: PathBuf, output_dir: Option<PathBuf>) -> ConvertConfig {
        ConvertConfig {
            archive_path,
            output_dir: output_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            archive = %self.archive_path.display(),
            output_dir = %self.output_dir.display(),
            "Loaded ConvertConfig"
        );
        debug!(config = ?self, "ConvertConfig loaded (full debug)");
    }
}
