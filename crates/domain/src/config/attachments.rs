use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Attachment ingest
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentsConfig {
    /// When false, attachment URLs are passed through to the bridge as
    /// metadata without downloading.
    #[serde(default)]
    pub download_enabled: bool,
    #[serde(default = "d_max_bytes")]
    pub download_max_bytes: u64,
    #[serde(default = "d_storage_dir")]
    pub storage_dir: PathBuf,
}

impl Default for AttachmentsConfig {
    fn default() -> Self {
        Self {
            download_enabled: false,
            download_max_bytes: d_max_bytes(),
            storage_dir: d_storage_dir(),
        }
    }
}

fn d_max_bytes() -> u64 {
    8 * 1024 * 1024
}
fn d_storage_dir() -> PathBuf {
    PathBuf::from(".runtime/attachments")
}
