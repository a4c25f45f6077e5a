use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

use crate::error::{CatalogError, Result};
use crate::external_sort::chunk::BatchProcessor;
use crate::external_sort::constants::*;
use crate::external_sort::key::SortKey;
use crate::external_sort::manifest::{DerivativeEntry, SortManifest, SourceFingerprint};
use crate::external_sort::merger::RunMerger;
use crate::external_sort::{SortReport, SorterConfig};

/// Turns the raw source into the three derivative files.
///
/// Everything is built in a private work directory inside the target
/// directory and each finished file is renamed over its derivative. Until the
/// renames, nothing a reader can see has changed, so a missing source, an IO
/// failure or a cancellation leaves the previous derivative files in place.
pub struct CatalogSorter {
    config: SorterConfig,
    shutdown_flag: Arc<AtomicBool>,
}

impl CatalogSorter {
    pub fn new(config: SorterConfig) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            shutdown_flag: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn with_shutdown_signal(mut self, shutdown_flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = shutdown_flag;
        self
    }

    pub async fn sort(&self, source_file: &Path, target_dir: &Path) -> Result<SortReport> {
        let start_time = Instant::now();
        let (source, fingerprint) = open_source(source_file)?;

        std::fs::create_dir_all(target_dir)?;
        let work_dir = target_dir.join(work_dir_name());
        std::fs::create_dir_all(&work_dir)?;
        debug!("Work directory: {}", work_dir.display());

        let result = self
            .sort_in(source, fingerprint, source_file, target_dir, &work_dir, start_time)
            .await;

        if let Err(e) = std::fs::remove_dir_all(&work_dir) {
            warn!("Failed to remove work directory {}: {}", work_dir.display(), e);
        }

        match &result {
            Ok(report) => info!(
                "Sort completed: {} lines read, {} accepted, {} rejected, {} batches in {} ms",
                report.lines_read, report.records_accepted, report.records_rejected,
                report.batches, report.elapsed_ms
            ),
            Err(e) => warn!("Sort run failed, derivative files left untouched: {}", e),
        }

        result
    }

    async fn sort_in(
        &self,
        source: File,
        fingerprint: SourceFingerprint,
        source_file: &Path,
        target_dir: &Path,
        work_dir: &Path,
        start_time: Instant,
    ) -> Result<SortReport> {
        let batch_size = self.config.effective_batch_size();
        if batch_size != self.config.batch_size {
            info!(
                "Batch size lowered from {} to {} to fit the memory budget",
                self.config.batch_size, batch_size
            );
        }

        let io_buffer_size = self.config.io_buffer_size_bytes();
        let batch_processor = BatchProcessor::new(batch_size, io_buffer_size, work_dir.to_path_buf());
        let reader = BufReader::with_capacity(io_buffer_size, source);

        info!("Reading {} in batches of {} records", source_file.display(), batch_size);
        let mut output = batch_processor.split_into_runs(reader, &self.shutdown_flag).await?;
        let runs_written = output.run_count();
        self.check_shutdown()?;

        let merger = RunMerger::new(
            io_buffer_size,
            self.config.merge_fan_in,
            work_dir.to_path_buf(),
            self.config.merge_progress_interval_seconds,
        );

        let mut staged = Vec::with_capacity(SortKey::ALL.len());
        for key in SortKey::ALL {
            let runs = output.take_runs(key);
            let staging_path = work_dir.join(format!("{}{}", key.file_name(), STAGING_FILE_SUFFIX));
            let record_count = merger.merge_runs(key, runs, &staging_path, &self.shutdown_flag).await?;
            staged.push((key, staging_path, record_count));
        }
        self.check_shutdown()?;

        let mut derivatives = Vec::with_capacity(staged.len());
        for (key, staging_path, record_count) in staged {
            let final_path = target_dir.join(key.file_name());
            std::fs::rename(&staging_path, &final_path)?;
            let file_size_bytes = std::fs::metadata(&final_path)?.len();
            derivatives.push(DerivativeEntry {
                key,
                file_name: key.file_name().to_string(),
                record_count,
                file_size_bytes,
            });
        }

        let stats = output.stats;
        let report = SortReport {
            lines_read: stats.lines_read,
            records_accepted: stats.records_accepted,
            records_rejected: stats.records_rejected,
            non_record_lines: stats.non_record_lines,
            batches: stats.batches,
            runs_written,
            elapsed_ms: start_time.elapsed().as_millis() as u64,
        };

        let manifest = SortManifest::new(source_file, fingerprint, report.clone(), derivatives);
        if let Err(e) = manifest.save(target_dir) {
            warn!("Derivative files updated but the manifest could not be written: {}", e);
        }

        Ok(report)
    }

    fn check_shutdown(&self) -> Result<()> {
        if self.shutdown_flag.load(Ordering::Relaxed) {
            return Err(CatalogError::Cancelled);
        }
        Ok(())
    }
}

/// Opens the source and fingerprints the opened handle, so the manifest
/// describes the content this run actually read.
fn open_source(source_file: &Path) -> Result<(File, SourceFingerprint)> {
    let unavailable = |source: std::io::Error| CatalogError::SourceUnavailable {
        path: source_file.to_path_buf(),
        source,
    };

    let metadata = std::fs::metadata(source_file).map_err(unavailable)?;
    if !metadata.is_file() {
        return Err(unavailable(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "not a regular file",
        )));
    }
    let file = File::open(source_file).map_err(unavailable)?;
    let fingerprint = SourceFingerprint::from_metadata(&file.metadata().map_err(unavailable)?);
    Ok((file, fingerprint))
}

fn work_dir_name() -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    PathBuf::from(format!("{}{}-{}", WORK_DIR_PREFIX, std::process::id(), nanos))
}
