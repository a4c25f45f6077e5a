use serde::Serialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Notify;
use tracing::{error, info};

use crate::config::Config;
use crate::error::{CatalogError, Result};
use crate::external_sort::{CatalogSorter, SortReport};
use crate::pager::{PageRequest, PaginatedReader};

/// Status plus body, the shape the shell hands back for every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

impl Response {
    pub fn from_error(err: &CatalogError) -> Self {
        if err.status_code() >= 500 {
            error!("Request failed: {}", err);
        }
        Self {
            status: err.status_code(),
            body: json!({ "error": err.public_message() }),
        }
    }
}

/// Sorts once at startup, then answers page requests.
pub struct CatalogService {
    source_file: PathBuf,
    sorter: CatalogSorter,
    reader: PaginatedReader,
}

impl CatalogService {
    pub fn new(config: &Config, shutdown_flag: Arc<AtomicBool>) -> anyhow::Result<Self> {
        let sorter = CatalogSorter::new(config.sorter.clone())?
            .with_shutdown_signal(shutdown_flag.clone());
        let reader = PaginatedReader::new(&config.data_directory)
            .with_io_buffer_size(config.sorter.io_buffer_size_bytes())
            .with_shutdown_signal(shutdown_flag);

        Ok(Self {
            source_file: config.source_file.clone(),
            sorter,
            reader,
        })
    }

    /// Runs the sorter. A failure here is logged and returned; previously
    /// sorted files, if any, keep being served.
    pub async fn startup(&self) -> Result<SortReport> {
        info!("Sorting {} at startup", self.source_file.display());
        self.sorter.sort(&self.source_file, self.reader.data_directory()).await
    }

    pub async fn handle(&self, request: &PageRequest) -> Response {
        match self.reader.fetch(request).await {
            Ok(page) => match serde_json::to_value(&page) {
                Ok(body) => Response { status: 200, body },
                Err(e) => Response::from_error(&CatalogError::from(e)),
            },
            Err(e) => Response::from_error(&e),
        }
    }

    /// Parses one JSON request line. An unparseable line is a client error.
    pub async fn handle_line(&self, line: &str) -> Response {
        match serde_json::from_str::<PageRequest>(line) {
            Ok(request) => self.handle(&request).await,
            Err(e) => Response::from_error(&CatalogError::invalid_argument(format!(
                "malformed request: {}",
                e
            ))),
        }
    }

    /// Answers newline-delimited JSON requests from `input` with one JSON
    /// response line each on `output`, until the input ends or `shutdown` is
    /// notified. A notification stored before the call stops it immediately.
    /// Returns the number of requests answered.
    pub async fn serve<R, W>(&self, input: R, mut output: W, shutdown: &Notify) -> Result<usize>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        let mut answered = 0;

        loop {
            let line = tokio::select! {
                _ = shutdown.notified() => {
                    info!("Shutdown requested, stopping after {} requests", answered);
                    break;
                }
                line = lines.next_line() => line?,
            };
            let Some(line) = line else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            let response = self.handle_line(&line).await;
            let mut encoded = serde_json::to_vec(&response)?;
            encoded.push(b'\n');
            output.write_all(&encoded).await?;
            output.flush().await?;
            answered += 1;
        }

        Ok(answered)
    }
}
