use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::constants::BYTES_PER_KB;
use crate::error::{CatalogError, Result};
use crate::external_sort::chunk::{run_file_name, RunFile};
use crate::external_sort::constants::*;
use crate::external_sort::key::SortKey;
use crate::external_sort::record::{classify_bytes, LineOutcome, Product};

/// k-way merge of sorted runs into one globally sorted file per key.
pub struct RunMerger {
    io_buffer_size: usize,
    fan_in: usize,
    work_directory: PathBuf,
    progress_interval_seconds: u64,
}

struct MergeEntry {
    record: Product,
    source: usize,
    key: SortKey,
}

impl PartialEq for MergeEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for MergeEntry {}

impl PartialOrd for MergeEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MergeEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // BinaryHeap pops the largest entry, so both comparisons are reversed:
        // smallest record first, earlier run first on ties.
        self.key
            .compare(&other.record, &self.record)
            .then_with(|| other.source.cmp(&self.source))
    }
}

impl RunMerger {
    pub fn new(
        io_buffer_size: usize,
        fan_in: usize,
        work_directory: PathBuf,
        progress_interval_seconds: u64,
    ) -> Self {
        Self {
            io_buffer_size,
            fan_in: fan_in.max(2),
            work_directory,
            progress_interval_seconds,
        }
    }

    /// Merges all runs of one key into `output_file` and returns the number of
    /// records written. Runs are consumed and deleted. Groups of at most
    /// `fan_in` consecutive runs are merged into intermediate runs until a
    /// single final pass remains.
    pub async fn merge_runs(
        &self,
        key: SortKey,
        mut runs: Vec<RunFile>,
        output_file: &Path,
        shutdown_flag: &AtomicBool,
    ) -> Result<usize> {
        let mut pass = 1;
        while runs.len() > self.fan_in {
            debug!("Merge pass {} for {}: {} runs", pass, key, runs.len());
            let mut next_runs = Vec::with_capacity(runs.len().div_ceil(self.fan_in));

            for (group_id, group) in runs.chunks(self.fan_in).enumerate() {
                let path = self.work_directory.join(run_file_name(pass, group_id, key));
                let record_count = self.merge_into(key, group, &path, shutdown_flag)?;
                remove_runs(group);
                next_runs.push(RunFile {
                    run_id: group_id,
                    key,
                    file_path: path,
                    record_count,
                });
                tokio::task::yield_now().await;
            }

            runs = next_runs;
            pass += 1;
        }

        let written = self.merge_into(key, &runs, output_file, shutdown_flag)?;
        remove_runs(&runs);

        info!("Merged {} records by {} in {} pass(es)", written, key, pass);
        Ok(written)
    }

    fn merge_into(
        &self,
        key: SortKey,
        runs: &[RunFile],
        output_file: &Path,
        shutdown_flag: &AtomicBool,
    ) -> Result<usize> {
        let mut readers = Vec::with_capacity(runs.len());
        for run in runs {
            let file = File::open(&run.file_path)?;
            readers.push(BufReader::with_capacity(self.io_buffer_size, file));
        }

        let output = File::create(output_file)?;
        let mut writer = BufWriter::with_capacity(OUTPUT_BUFFER_SIZE_KB * BYTES_PER_KB, output);

        let mut heap = BinaryHeap::with_capacity(readers.len());
        for (source, reader) in readers.iter_mut().enumerate() {
            if let Some(record) = read_next_record(reader)? {
                heap.push(MergeEntry { record, source, key });
            }
        }

        let total_expected: usize = runs.iter().map(|r| r.record_count).sum();
        let progress_interval = Duration::from_secs(self.progress_interval_seconds);
        let mut last_progress_time = Instant::now();
        let mut written = 0;

        while let Some(entry) = heap.pop() {
            if written % MERGE_CANCEL_CHECK_INTERVAL_RECORDS == 0
                && shutdown_flag.load(Ordering::Relaxed)
            {
                warn!("Merge by {} interrupted after {} records", key, written);
                return Err(CatalogError::Cancelled);
            }

            writeln!(writer, "{}", entry.record.encode())?;
            written += 1;

            if let Some(record) = read_next_record(&mut readers[entry.source])? {
                heap.push(MergeEntry { record, source: entry.source, key });
            }

            if last_progress_time.elapsed() >= progress_interval {
                let progress_pct = if total_expected > 0 {
                    (written as f64 / total_expected as f64 * 100.0).min(100.0)
                } else {
                    0.0
                };
                info!("Merge progress by {}: {:.1}% ({} records)", key, progress_pct, written);
                last_progress_time = Instant::now();
            }
        }

        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(written)
    }
}

fn read_next_record<R: BufRead>(reader: &mut R) -> Result<Option<Product>> {
    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        if reader.read_until(b'\n', &mut buffer)? == 0 {
            return Ok(None);
        }
        // Runs only hold records this process encoded; anything else is skipped.
        if let LineOutcome::Record(record) = classify_bytes(&buffer) {
            return Ok(Some(record));
        }
    }
}

fn remove_runs(runs: &[RunFile]) {
    for run in runs {
        if let Err(e) = std::fs::remove_file(&run.file_path) {
            warn!("Failed to remove run {}: {}", run.file_path.display(), e);
        }
    }
}
