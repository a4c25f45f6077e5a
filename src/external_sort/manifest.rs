use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use anyhow::Result;
use crate::constants::*;
use crate::external_sort::key::SortKey;
use crate::external_sort::SortReport;

/// Summary of the last successful sort run, written next to the derivative files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortManifest {
    pub version: u32,
    pub timestamp: u64,
    pub source_file: PathBuf,
    pub source_size_bytes: u64,
    pub source_modified: u64,
    pub report: SortReport,
    pub derivatives: Vec<DerivativeEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivativeEntry {
    pub key: SortKey,
    pub file_name: String,
    pub record_count: usize,
    pub file_size_bytes: u64,
}

/// Size and modification time of the source, in whole seconds since the epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceFingerprint {
    pub size_bytes: u64,
    pub modified: u64,
}

impl SourceFingerprint {
    pub fn from_metadata(metadata: &std::fs::Metadata) -> Self {
        let modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self { size_bytes: metadata.len(), modified }
    }

    pub fn of_path(path: &Path) -> Result<Self> {
        Ok(Self::from_metadata(&std::fs::metadata(path)?))
    }
}

impl SortManifest {
    /// `fingerprint` must describe the source as it was when the run opened it.
    pub fn new(
        source_file: &Path,
        fingerprint: SourceFingerprint,
        report: SortReport,
        derivatives: Vec<DerivativeEntry>,
    ) -> Self {
        Self {
            version: MANIFEST_VERSION,
            timestamp: current_timestamp(),
            source_file: source_file.to_path_buf(),
            source_size_bytes: fingerprint.size_bytes,
            source_modified: fingerprint.modified,
            report,
            derivatives,
        }
    }

    /// Writes the manifest through a temporary file so readers never see a
    /// partial document.
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(data_dir)?;
        let manifest_path = data_dir.join(MANIFEST_FILE_NAME);
        let temp_path = data_dir.join(format!("{}.tmp", MANIFEST_FILE_NAME));
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&temp_path, content)?;
        std::fs::rename(&temp_path, manifest_path)?;
        Ok(())
    }

    pub fn load(data_dir: &Path) -> Result<Self> {
        let manifest_path = data_dir.join(MANIFEST_FILE_NAME);
        let content = std::fs::read_to_string(manifest_path)?;
        let manifest: Self = serde_json::from_str(&content)?;
        Ok(manifest)
    }

    pub fn exists(data_dir: &Path) -> bool {
        data_dir.join(MANIFEST_FILE_NAME).exists()
    }

    /// True when the source changed size or modification time since this run,
    /// or can no longer be read.
    pub fn is_stale(&self, source_file: &Path) -> bool {
        match SourceFingerprint::of_path(source_file) {
            Ok(current) => {
                current.size_bytes != self.source_size_bytes
                    || current.modified != self.source_modified
            }
            Err(_) => true,
        }
    }

    pub fn entry(&self, key: SortKey) -> Option<&DerivativeEntry> {
        self.derivatives.iter().find(|d| d.key == key)
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
