use serde::{Deserialize, Serialize};
use anyhow::Result;
use crate::constants::*;
use crate::external_sort::constants::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SorterConfig {
    /// Records per batch. Bounds peak memory only; output does not depend on it.
    pub batch_size: usize,
    pub io_buffer_size_kb: usize,
    /// Maximum number of runs opened at once during a merge pass.
    pub merge_fan_in: usize,
    /// Share of system memory a single batch may occupy.
    pub memory_usage_percent: f64,
    pub merge_progress_interval_seconds: u64,
}

impl Default for SorterConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            io_buffer_size_kb: DEFAULT_IO_BUFFER_SIZE_KB,
            merge_fan_in: DEFAULT_MERGE_FAN_IN,
            memory_usage_percent: DEFAULT_MEMORY_USAGE_PERCENT,
            merge_progress_interval_seconds: DEFAULT_PROGRESS_INTERVAL_SECONDS,
        }
    }
}

impl SorterConfig {
    pub fn with_batch_size(batch_size: usize) -> Self {
        Self { batch_size, ..Default::default() }
    }

    pub fn validate(&self) -> Result<()> {
        // No upper bound: oversized batches are lowered to the memory budget
        // by `effective_batch_size`.
        if self.batch_size < MIN_BATCH_SIZE {
            return Err(anyhow::anyhow!(
                "Batch size must be at least {} record",
                MIN_BATCH_SIZE
            ));
        }

        if self.io_buffer_size_kb < MIN_IO_BUFFER_SIZE_KB
            || self.io_buffer_size_kb > MAX_IO_BUFFER_SIZE_KB {
            return Err(anyhow::anyhow!(
                "IO buffer size must be between {} and {} KB",
                MIN_IO_BUFFER_SIZE_KB, MAX_IO_BUFFER_SIZE_KB
            ));
        }

        if self.merge_fan_in < MIN_MERGE_FAN_IN || self.merge_fan_in > MAX_MERGE_FAN_IN {
            return Err(anyhow::anyhow!(
                "Merge fan-in must be between {} and {}",
                MIN_MERGE_FAN_IN, MAX_MERGE_FAN_IN
            ));
        }

        if self.memory_usage_percent < MIN_MEMORY_USAGE_PERCENT
            || self.memory_usage_percent > MAX_MEMORY_USAGE_PERCENT {
            return Err(anyhow::anyhow!(
                "Memory usage percent must be between {} and {}",
                MIN_MEMORY_USAGE_PERCENT, MAX_MEMORY_USAGE_PERCENT
            ));
        }

        Ok(())
    }

    pub fn memory_limit_bytes(&self) -> usize {
        use sysinfo::System;
        let mut system = System::new();
        system.refresh_memory();

        let total_memory = system.total_memory() as f64;
        (total_memory * self.memory_usage_percent / 100.0) as usize
    }

    /// Configured batch size, lowered if a batch would not fit the memory budget.
    ///
    /// Never below one record. When the total memory cannot be determined the
    /// configured value is used as is.
    pub fn effective_batch_size(&self) -> usize {
        let limit = self.memory_limit_bytes();
        if limit == 0 {
            return self.batch_size.max(MIN_BATCH_SIZE);
        }
        let fits = limit / ESTIMATED_RECORD_SIZE_BYTES;
        self.batch_size.min(fits).max(MIN_BATCH_SIZE)
    }

    pub fn io_buffer_size_bytes(&self) -> usize {
        self.io_buffer_size_kb * BYTES_PER_KB
    }
}
