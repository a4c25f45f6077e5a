pub mod config;
pub mod constants;
pub mod processor;
pub mod manifest;
pub mod record;
pub mod key;
pub mod chunk;
pub mod merger;


pub use config::SorterConfig;
pub use processor::CatalogSorter;
pub use record::{LineOutcome, ParseFailure, Price, Product};
pub use key::SortKey;
pub use manifest::{SortManifest, SourceFingerprint};

use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::error::{CatalogError, Result};

/// Outcome of one sort run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortReport {
    pub lines_read: usize,
    pub records_accepted: usize,
    /// Record-looking lines that failed to decode.
    pub records_rejected: usize,
    /// Blank and header lines.
    pub non_record_lines: usize,
    pub batches: usize,
    pub runs_written: usize,
    pub elapsed_ms: u64,
}

impl Default for SortReport {
    fn default() -> Self {
        Self {
            lines_read: 0,
            records_accepted: 0,
            records_rejected: 0,
            non_record_lines: 0,
            batches: 0,
            runs_written: 0,
            elapsed_ms: 0,
        }
    }
}

/// Sorts `source_file` into `target_dir`. A sorter configuration that fails
/// validation is an internal fault, not a caller error.
pub async fn sort_catalog(
    source_file: &Path,
    target_dir: &Path,
    config: SorterConfig,
) -> Result<SortReport> {
    let sorter = CatalogSorter::new(config)
        .map_err(|e| CatalogError::internal(format!("sorter configuration rejected: {}", e)))?;
    sorter.sort(source_file, target_dir).await
}
