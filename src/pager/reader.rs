use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::error::{CatalogError, Result};
use crate::external_sort::record::classify_bytes;
use crate::external_sort::{LineOutcome, Product, SortKey};
use crate::pager::request::{Page, PageMeta, PageRequest, PageWindow};

/// Answers page queries by streaming one derivative file.
///
/// Positions count decodable record lines only. Every query reads its file to
/// the end, so `totalCount` is always exact.
pub struct PaginatedReader {
    data_directory: PathBuf,
    io_buffer_size: usize,
    shutdown_flag: Arc<AtomicBool>,
}

impl PaginatedReader {
    pub fn new(data_directory: impl Into<PathBuf>) -> Self {
        Self {
            data_directory: data_directory.into(),
            io_buffer_size: 64 * 1024,
            shutdown_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_io_buffer_size(mut self, io_buffer_size: usize) -> Self {
        self.io_buffer_size = io_buffer_size.max(1);
        self
    }

    /// Aborts in-flight scans once the flag is set.
    pub fn with_shutdown_signal(mut self, shutdown_flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = shutdown_flag;
        self
    }

    pub fn data_directory(&self) -> &Path {
        &self.data_directory
    }

    pub fn derivative_path(&self, key: SortKey) -> PathBuf {
        self.data_directory.join(key.file_name())
    }

    pub async fn get_page(&self, sort_key: &str, page_number: i64, page_size: i64) -> Result<Page> {
        self.fetch(&PageRequest::new(sort_key, page_number, page_size)).await
    }

    pub async fn fetch(&self, request: &PageRequest) -> Result<Page> {
        let window = request.validate()?;
        let (records, total_count) = self.scan(&window).await?;

        if records.is_empty() && window.page_number > 1 {
            return Err(CatalogError::PageOutOfRange { page_number: window.page_number });
        }

        Ok(Page {
            records,
            meta: PageMeta::new(total_count, window.page_number, window.page_size),
        })
    }

    async fn scan(&self, window: &PageWindow) -> Result<(Vec<Product>, usize)> {
        let path = self.derivative_path(window.key);
        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CatalogError::DerivativeMissing { path });
            }
            Err(e) => return Err(e.into()),
        };

        let mut reader = BufReader::with_capacity(self.io_buffer_size, file);
        let mut buffer = Vec::new();
        let mut records = Vec::with_capacity(window.page_size);
        let mut position = 0usize;
        let mut skipped = 0usize;

        loop {
            if self.shutdown_flag.load(Ordering::Relaxed) {
                return Err(CatalogError::Cancelled);
            }

            buffer.clear();
            if reader.read_until(b'\n', &mut buffer).await? == 0 {
                break;
            }

            match classify_bytes(&buffer) {
                LineOutcome::Record(product) => {
                    if window.contains(position) {
                        records.push(product);
                    }
                    position += 1;
                }
                LineOutcome::Malformed(_) => skipped += 1,
                LineOutcome::NonRecord => {}
            }
        }

        if skipped > 0 {
            debug!("Skipped {} undecodable lines in {}", skipped, path.display());
        }

        Ok((records, position))
    }
}
