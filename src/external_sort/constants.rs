pub const DEFAULT_BATCH_SIZE: usize = 10_000;
pub const DEFAULT_IO_BUFFER_SIZE_KB: usize = 64;
pub const DEFAULT_MERGE_FAN_IN: usize = 64;
pub const DEFAULT_MEMORY_USAGE_PERCENT: f64 = 25.0;

pub const MIN_BATCH_SIZE: usize = 1;
pub const MIN_IO_BUFFER_SIZE_KB: usize = 4;
pub const MAX_IO_BUFFER_SIZE_KB: usize = 16 * 1024;
pub const MIN_MERGE_FAN_IN: usize = 2;
pub const MAX_MERGE_FAN_IN: usize = 1024;
pub const MIN_MEMORY_USAGE_PERCENT: f64 = 1.0;
pub const MAX_MEMORY_USAGE_PERCENT: f64 = 90.0;

pub const WORK_DIR_PREFIX: &str = ".sort-work-";
pub const RUN_FILE_PREFIX: &str = "run_";
pub const RUN_FILE_EXTENSION: &str = ".csv";
pub const STAGING_FILE_SUFFIX: &str = ".staging";

pub const ESTIMATED_RECORD_SIZE_BYTES: usize = 128;
pub const PROGRESS_REPORT_INTERVAL_BATCHES: usize = 10;
pub const MERGE_CANCEL_CHECK_INTERVAL_RECORDS: usize = 1000;
pub const OUTPUT_BUFFER_SIZE_KB: usize = 512;
