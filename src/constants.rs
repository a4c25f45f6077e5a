pub const BYTES_PER_KB: usize = 1024;

// Record encoding
pub const FIELD_SEPARATOR: char = ',';
pub const MIN_RECORD_FIELDS: usize = 3;
pub const MAX_PRICE_SCALE: u32 = 18;

// Derivative files, one per sort key
pub const PRODUCTS_BY_ID_FILE: &str = "products_by_id.csv";
pub const PRODUCTS_BY_NAME_FILE: &str = "products_by_name.csv";
pub const PRODUCTS_BY_PRICE_FILE: &str = "products_by_price.csv";
pub const MANIFEST_FILE_NAME: &str = "sort_manifest.json";
pub const MANIFEST_VERSION: u32 = 1;

// Pagination
pub const DEFAULT_PAGE_NUMBER: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: usize = 100;
pub const DEFAULT_SORT_KEY: &str = "id";

pub const DEFAULT_PROGRESS_INTERVAL_SECONDS: u64 = 10;
