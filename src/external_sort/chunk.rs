use rayon::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

use crate::error::{CatalogError, Result};
use crate::external_sort::constants::*;
use crate::external_sort::key::SortKey;
use crate::external_sort::record::{classify_bytes, LineOutcome, Product};

/// One batch's records sorted by one key, on disk.
#[derive(Debug, Clone)]
pub struct RunFile {
    pub run_id: usize,
    pub key: SortKey,
    pub file_path: PathBuf,
    pub record_count: usize,
}

/// Line accounting for one pass over the source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub lines_read: usize,
    pub records_accepted: usize,
    pub records_rejected: usize,
    pub non_record_lines: usize,
    pub batches: usize,
}

/// Runs produced by the batch phase, grouped by key.
#[derive(Debug, Default)]
pub struct BatchOutput {
    pub by_id: Vec<RunFile>,
    pub by_name: Vec<RunFile>,
    pub by_price: Vec<RunFile>,
    pub stats: ScanStats,
}

impl BatchOutput {
    pub fn take_runs(&mut self, key: SortKey) -> Vec<RunFile> {
        match key {
            SortKey::Id => std::mem::take(&mut self.by_id),
            SortKey::Name => std::mem::take(&mut self.by_name),
            SortKey::Price => std::mem::take(&mut self.by_price),
        }
    }

    pub fn run_count(&self) -> usize {
        self.by_id.len() + self.by_name.len() + self.by_price.len()
    }

    fn push(&mut self, run: RunFile) {
        match run.key {
            SortKey::Id => self.by_id.push(run),
            SortKey::Name => self.by_name.push(run),
            SortKey::Price => self.by_price.push(run),
        }
    }
}

/// Splits the raw source into sorted runs, one run per key per batch.
pub struct BatchProcessor {
    batch_size: usize,
    io_buffer_size: usize,
    work_directory: PathBuf,
}

impl BatchProcessor {
    pub fn new(batch_size: usize, io_buffer_size: usize, work_directory: PathBuf) -> Self {
        Self {
            batch_size: batch_size.max(1),
            io_buffer_size,
            work_directory,
        }
    }

    pub async fn split_into_runs<R: BufRead>(
        &self,
        mut reader: R,
        shutdown_flag: &AtomicBool,
    ) -> Result<BatchOutput> {
        let mut output = BatchOutput::default();
        let mut batch: Vec<Product> = Vec::with_capacity(self.batch_size.min(1 << 16));
        let mut buffer = Vec::new();

        loop {
            buffer.clear();
            if reader.read_until(b'\n', &mut buffer)? == 0 {
                break;
            }
            output.stats.lines_read += 1;

            match classify_bytes(&buffer) {
                LineOutcome::NonRecord => output.stats.non_record_lines += 1,
                LineOutcome::Malformed(failure) => {
                    output.stats.records_rejected += 1;
                    debug!("Skipping malformed line {}: {}", output.stats.lines_read, failure);
                }
                LineOutcome::Record(product) => {
                    output.stats.records_accepted += 1;
                    batch.push(product);
                }
            }

            if batch.len() >= self.batch_size {
                self.finish_batch(&mut batch, &mut output)?;
                tokio::task::yield_now().await;
                if shutdown_flag.load(Ordering::Relaxed) {
                    return Err(CatalogError::Cancelled);
                }
            }
        }

        if !batch.is_empty() {
            self.finish_batch(&mut batch, &mut output)?;
        }

        Ok(output)
    }

    fn finish_batch(&self, batch: &mut Vec<Product>, output: &mut BatchOutput) -> Result<()> {
        let run_id = output.stats.batches;
        for key in SortKey::ALL {
            let run = self.sort_and_write_run(run_id, key, batch)?;
            output.push(run);
        }
        output.stats.batches += 1;

        if output.stats.batches % PROGRESS_REPORT_INTERVAL_BATCHES == 0 {
            info!(
                "Sorted {} batches ({} records accepted, {} rejected)",
                output.stats.batches, output.stats.records_accepted, output.stats.records_rejected
            );
        }

        batch.clear();
        Ok(())
    }

    pub fn sort_and_write_run(
        &self,
        run_id: usize,
        key: SortKey,
        records: &mut [Product],
    ) -> Result<RunFile> {
        records.par_sort_by(|a, b| key.compare(a, b));

        let file_path = self.work_directory.join(run_file_name(0, run_id, key));
        write_records(&file_path, self.io_buffer_size, records.iter())?;

        Ok(RunFile {
            run_id,
            key,
            file_path,
            record_count: records.len(),
        })
    }
}

pub fn run_file_name(pass: usize, run_id: usize, key: SortKey) -> String {
    format!("{}p{}_{}_{}{}", RUN_FILE_PREFIX, pass, run_id, key, RUN_FILE_EXTENSION)
}

/// Writes records one per line and flushes before returning.
pub fn write_records<'a, I>(path: &Path, io_buffer_size: usize, records: I) -> Result<usize>
where
    I: IntoIterator<Item = &'a Product>,
{
    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(io_buffer_size, file);
    let mut written = 0;
    for record in records {
        writeln!(writer, "{}", record.encode())?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}
